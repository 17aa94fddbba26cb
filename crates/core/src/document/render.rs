use std::collections::BTreeMap;

use crate::document::image::ImageRef;
use crate::document::pdf::{literal, num, ContentStream, ObjectId, PdfWriter};
use crate::document::theme::{Brand, BORDER_GRAY, MED_GRAY, NAVY, ORANGE};
use crate::errors::DomainError;
use crate::layout::block::{Align, Color, ContentBlock, RowEmphasis, TableBlock, TableRow, TextBlock};
use crate::layout::engine::{Layout, Page, PageGeometry};
use crate::layout::metrics::{text_width, Font};

/// Share of a line's leading that sits above the baseline.
const ASCENT_SHARE: f32 = 0.78;
const LOGO_MAX_WIDTH: f32 = 120.0;

/// Document-wide text the chrome and metadata need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderMeta {
    pub title: String,
    pub proposal_number: String,
}

/// Images registered as page resources, keyed by digest so a repeated image is
/// embedded once.
struct ImageResources {
    by_digest: BTreeMap<String, (String, ObjectId)>,
}

impl ImageResources {
    fn register(&mut self, writer: &mut PdfWriter, image: &ImageRef) -> Result<String, DomainError> {
        if let Some((name, _)) = self.by_digest.get(&image.digest) {
            return Ok(name.clone());
        }
        let embedding = image.embedding()?;
        let mut entries = format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Filter /{}",
            image.width_px, image.height_px, embedding.color_space, embedding.filter
        );
        if let Some(parms) = &embedding.decode_parms {
            entries.push_str(" /DecodeParms ");
            entries.push_str(parms);
        }
        let id = writer.add_stream(&entries, &embedding.stream);
        let name = format!("Im{}", self.by_digest.len() + 1);
        self.by_digest.insert(image.digest.clone(), (name.clone(), id));
        Ok(name)
    }

    fn dictionary(&self) -> String {
        let mut entries: Vec<(&String, &ObjectId)> =
            self.by_digest.values().map(|(name, id)| (name, id)).collect();
        entries.sort_by(|left, right| left.0.cmp(right.0));
        entries
            .into_iter()
            .map(|(name, id)| format!("/{name} {}", id.reference()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Paints a laid-out document as a complete PDF file.
pub fn render_pdf(layout: &Layout, brand: &Brand, meta: &RenderMeta) -> Result<Vec<u8>, DomainError> {
    let mut writer = PdfWriter::new();
    let catalog = writer.reserve();
    let pages_root = writer.reserve();
    let regular = writer.add(format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        Font::Helvetica.base_font()
    ));
    let bold = writer.add(format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        Font::HelveticaBold.base_font()
    ));

    let mut images = ImageResources { by_digest: BTreeMap::new() };
    let logo = match &brand.logo {
        Some(logo) => Some((images.register(&mut writer, logo)?, logo)),
        None => None,
    };

    let geometry = &layout.geometry;
    let mut streams = Vec::with_capacity(layout.pages.len());
    for page in &layout.pages {
        let mut content = ContentStream::new();
        paint_chrome(&mut content, geometry, page, brand, meta, logo.as_ref().map(|(name, image)| (name.as_str(), *image)));
        for placed in &page.blocks {
            let top = geometry.content_top() - placed.offset;
            match &placed.block {
                ContentBlock::Text(block) => paint_text(&mut content, geometry, top, block),
                ContentBlock::Table(table) => paint_table(&mut content, geometry, top, table),
                ContentBlock::Image(block) => {
                    let name = images.register(&mut writer, &block.image)?;
                    let x = geometry.margin_left + (geometry.content_width() - block.width) / 2.0;
                    content.image(&name, x, top - block.height, block.width, block.height);
                }
                ContentBlock::Spacer(_) => {}
            }
        }
        streams.push(writer.add_stream("", &content.into_bytes()));
    }

    let resources = format!(
        "<< /Font << /F1 {} /F2 {} >> /XObject << {} >> >>",
        regular.reference(),
        bold.reference(),
        images.dictionary()
    );
    let mut kids = Vec::with_capacity(streams.len());
    for stream in streams {
        kids.push(writer.add(format!(
            "<< /Type /Page /Parent {} /MediaBox [0 0 {} {}] /Resources {resources} /Contents {} >>",
            pages_root.reference(),
            num(geometry.width),
            num(geometry.height),
            stream.reference()
        )));
    }
    let kid_refs = kids.iter().map(|kid| kid.reference()).collect::<Vec<_>>().join(" ");
    writer.set(pages_root, format!("<< /Type /Pages /Kids [{kid_refs}] /Count {} >>", kids.len()).into_bytes());
    writer.set(catalog, format!("<< /Type /Catalog /Pages {} >>", pages_root.reference()).into_bytes());

    let mut info = b"<< /Title ".to_vec();
    info.extend_from_slice(&literal(&meta.title));
    info.extend_from_slice(b" /Author ");
    info.extend_from_slice(&literal(&brand.company_name));
    info.extend_from_slice(b" /Producer (proposey) >>");
    let info = writer.add(info);

    Ok(writer.finish(catalog, info))
}

fn paint_chrome(
    content: &mut ContentStream,
    geometry: &PageGeometry,
    page: &Page,
    brand: &Brand,
    meta: &RenderMeta,
    logo: Option<(&str, &ImageRef)>,
) {
    let left = geometry.margin_left;
    let right = geometry.width - geometry.margin_right;
    content.line((0.0, geometry.height - 4.0), (geometry.width, geometry.height - 4.0), 3.0, ORANGE);

    let band_top = geometry.height - geometry.margin_top;
    let band_bottom = band_top - geometry.header_height;
    if geometry.header_height > 0.0 {
        let baseline = band_bottom + geometry.header_height * 0.35;
        let mut name_x = left;
        if let Some((name, image)) = logo {
            let height = (geometry.header_height - 6.0).max(1.0);
            let mut width = height / image.aspect_ratio().max(0.01);
            let mut drawn_height = height;
            if width > LOGO_MAX_WIDTH {
                width = LOGO_MAX_WIDTH;
                drawn_height = width * image.aspect_ratio();
            }
            content.image(name, left, band_bottom + 3.0, width, drawn_height);
            name_x += width + 8.0;
        }
        content.text(name_x, baseline, Font::HelveticaBold, 10.0, NAVY, &brand.company_name);
        let number = format!("Proposal {}", meta.proposal_number);
        let width = text_width(Font::Helvetica, 8.5, &number);
        content.text(right - width, baseline, Font::Helvetica, 8.5, MED_GRAY, &number);
        content.line((left, band_bottom + 1.0), (right, band_bottom + 1.0), 0.5, BORDER_GRAY);
    }

    let footer_baseline = footer_baseline(geometry);
    let footer = brand.footer_text.as_str();
    let footer_width = text_width(Font::Helvetica, 7.5, footer);
    content.text((geometry.width - footer_width) / 2.0, footer_baseline, Font::Helvetica, 7.5, MED_GRAY, footer);

    let page_label = format!("Page {} of {}", page.chrome.page_number, page.chrome.page_count);
    let label_width = text_width(Font::Helvetica, 7.5, &page_label);
    content.text(right - label_width, footer_baseline, Font::Helvetica, 7.5, MED_GRAY, &page_label);
    content.text(left, footer_baseline, Font::Helvetica, 7.5, MED_GRAY, &format!("ID {}", page.chrome.proposal_id));
}

/// Baseline inside the band reserved below the content area.
fn footer_baseline(geometry: &PageGeometry) -> f32 {
    geometry.margin_bottom + geometry.footer_height * 0.35
}

fn aligned_x(align: Align, left: f32, width: f32, text_width: f32) -> f32 {
    match align {
        Align::Left => left,
        Align::Center => left + (width - text_width) / 2.0,
        Align::Right => left + width - text_width,
    }
}

fn paint_text(content: &mut ContentStream, geometry: &PageGeometry, top: f32, block: &TextBlock) {
    let left = geometry.margin_left;
    let width = geometry.content_width();
    let mut cursor = top - block.space_before;
    for line in &block.lines {
        let style = line.style;
        let baseline = cursor - style.leading * ASCENT_SHARE;
        let measured = text_width(style.font, style.size, &line.text);
        let x = aligned_x(style.align, left, width, measured);
        content.text(x, baseline, style.font, style.size, style.color, &line.text);
        cursor -= style.leading;
    }
    if let Some(rule) = block.rule_below {
        cursor -= rule.gap + rule.thickness / 2.0;
        content.line((left, cursor), (left + width, cursor), rule.thickness, rule.color);
    }
}

fn paint_table(content: &mut ContentStream, geometry: &PageGeometry, top: f32, table: &TableBlock) {
    let left = geometry.margin_left;
    let width = geometry.content_width();
    let mut cursor = top;
    if let Some(header) = &table.header {
        if let Some(fill) = table.style.header_fill {
            content.fill_rect(left, cursor - header.height, width, header.height, fill);
        }
        paint_row(content, table, header, left, width, cursor, Font::HelveticaBold, table.style.header_text);
        cursor -= header.height;
    }
    for (index, row) in table.rows.iter().enumerate() {
        let (fill, font, color) = match row.emphasis {
            RowEmphasis::Total => (Some(NAVY), Font::HelveticaBold, Color::WHITE),
            RowEmphasis::Strong => (None, Font::HelveticaBold, table.style.text),
            RowEmphasis::Normal => {
                (table.style.zebra_fill.filter(|_| index % 2 == 1), Font::Helvetica, table.style.text)
            }
        };
        if let Some(fill) = fill {
            content.fill_rect(left, cursor - row.height, width, row.height, fill);
        }
        paint_row(content, table, row, left, width, cursor, font, color);
        cursor -= row.height;
    }
}

#[allow(clippy::too_many_arguments)]
fn paint_row(
    content: &mut ContentStream,
    table: &TableBlock,
    row: &TableRow,
    left: f32,
    width: f32,
    top: f32,
    font: Font,
    color: Color,
) {
    let style = &table.style;
    let mut x = left;
    for (column, lines) in table.columns.iter().zip(&row.cells) {
        let cell_width = column.width * width;
        if let Some(grid) = style.grid {
            content.stroke_rect(x, top - row.height, cell_width, row.height, 0.5, grid);
        }
        let inner_left = x + style.padding;
        let inner_width = cell_width - 2.0 * style.padding;
        let mut cursor = top - style.padding;
        for line in lines {
            let baseline = cursor - style.leading * ASCENT_SHARE;
            let measured = text_width(font, style.font_size, line);
            let text_x = aligned_x(column.align, inner_left, inner_width, measured);
            content.text(text_x, baseline, font, style.font_size, color, line);
            cursor -= style.leading;
        }
        x += cell_width;
    }
}

#[cfg(test)]
mod tests {
    use super::{footer_baseline, render_pdf, RenderMeta};
    use crate::document::image::fixtures::tiny_png;
    use crate::document::image::ImageRef;
    use crate::document::theme::Brand;
    use crate::layout::block::{Color, ContentBlock, ImageBlock, TextBlock, TextStyle};
    use crate::layout::engine::{LayoutEngine, PageGeometry, PageSize};
    use crate::layout::metrics::Font;

    fn meta() -> RenderMeta {
        RenderMeta { title: "Proposal - Roof".to_string(), proposal_number: "P-2026-0220".to_string() }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|window| *window == needle).count()
    }

    #[test]
    fn every_page_gets_chrome_and_a_page_object() {
        let engine = LayoutEngine::new(PageGeometry::new(PageSize::Letter, 54.0, 30.0, 24.0)).expect("geometry");
        let style = TextStyle::new(Font::Helvetica, 10.0, Color::BLACK).with_leading(100.0);
        let blocks: Vec<ContentBlock> = (0..12)
            .map(|index| ContentBlock::Text(TextBlock::new().line(format!("Block {index}"), style)))
            .collect();
        let layout = engine.layout(&blocks, "0a1b2c3d4e5f").expect("layout");

        let bytes = render_pdf(&layout, &Brand::default(), &meta()).expect("render");

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(count(&bytes, b"/Type /Page "), layout.page_count());
        assert_eq!(count(&bytes, b"(ID 0a1b2c3d4e5f) Tj"), layout.page_count());
        assert_eq!(count(&bytes, format!("(Page 1 of {}) Tj", layout.page_count()).as_bytes()), 1);
    }

    #[test]
    fn footer_sits_in_the_reserved_band_below_content() {
        let geometry = PageGeometry::new(PageSize::Letter, 54.0, 30.0, 24.0);
        let content_bottom = geometry.content_top() - geometry.content_height();

        let baseline = footer_baseline(&geometry);

        assert!(baseline >= geometry.margin_bottom);
        assert!(baseline + 7.5 <= content_bottom);
        assert_eq!(content_bottom, geometry.margin_bottom + geometry.footer_height);
    }

    #[test]
    fn repeated_images_are_embedded_once() {
        let engine = LayoutEngine::new(PageGeometry::new(PageSize::Letter, 54.0, 30.0, 24.0)).expect("geometry");
        let image = ImageRef::from_bytes(tiny_png()).expect("png");
        let block = ContentBlock::Image(ImageBlock::fitted(image.clone(), 200.0, 100.0));
        let layout = engine.layout(&[block.clone(), block], "0a1b2c3d4e5f").expect("layout");

        let brand = Brand { logo: Some(image), ..Brand::default() };
        let bytes = render_pdf(&layout, &brand, &meta()).expect("render");

        assert_eq!(count(&bytes, b"/Subtype /Image"), 1);
        assert!(count(&bytes, b"/Im1 Do") >= 3);
    }
}
