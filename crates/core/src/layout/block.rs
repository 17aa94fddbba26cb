use crate::document::image::ImageRef;
use crate::layout::engine::FIT_TOLERANCE;
use crate::layout::metrics::{wrap, Font};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font: Font,
    pub size: f32,
    pub leading: f32,
    pub color: Color,
    pub align: Align,
}

impl TextStyle {
    pub fn new(font: Font, size: f32, color: Color) -> Self {
        Self { font, size, leading: size * 1.35, color, align: Align::Left }
    }

    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_leading(mut self, leading: f32) -> Self {
        self.leading = leading;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rule {
    pub gap: f32,
    pub thickness: f32,
    pub color: Color,
}

/// A run of pre-wrapped lines that must stay together on one page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub space_before: f32,
    pub space_after: f32,
    pub rule_below: Option<Rule>,
}

impl TextBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `text` to `width` and appends the resulting lines.
    pub fn paragraph(mut self, text: &str, style: TextStyle, width: f32) -> Self {
        for line in wrap(text, style.font, style.size, width) {
            self.lines.push(TextLine { text: line, style });
        }
        self
    }

    pub fn line(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.lines.push(TextLine { text: text.into(), style });
        self
    }

    pub fn spaced(mut self, before: f32, after: f32) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }

    pub fn ruled(mut self, rule: Rule) -> Self {
        self.rule_below = Some(rule);
        self
    }

    pub fn height(&self) -> f32 {
        let lines: f32 = self.lines.iter().map(|line| line.style.leading).sum();
        let rule = self.rule_below.map_or(0.0, |rule| rule.gap + rule.thickness);
        self.space_before + lines + rule + self.space_after
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    /// Share of the table width, 0..=1.
    pub width: f32,
    pub align: Align,
}

impl TableColumn {
    pub fn new(width: f32, align: Align) -> Self {
        Self { width, align }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowEmphasis {
    #[default]
    Normal,
    Strong,
    Total,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    /// Wrapped lines per cell, one entry per column.
    pub cells: Vec<Vec<String>>,
    pub height: f32,
    pub emphasis: RowEmphasis,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableStyle {
    pub font_size: f32,
    pub leading: f32,
    pub padding: f32,
    pub text: Color,
    pub header_fill: Option<Color>,
    pub header_text: Color,
    pub zebra_fill: Option<Color>,
    pub grid: Option<Color>,
}

/// Rows may be split across pages unless `keep_together` is set; every fragment
/// repeats `header`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableBlock {
    pub columns: Vec<TableColumn>,
    pub header: Option<TableRow>,
    pub rows: Vec<TableRow>,
    pub style: TableStyle,
    pub space_after: f32,
    pub keep_together: bool,
}

impl TableBlock {
    pub fn new(columns: Vec<TableColumn>, style: TableStyle) -> Self {
        Self {
            columns,
            header: None,
            rows: Vec::new(),
            style,
            space_after: 0.0,
            keep_together: false,
        }
    }

    pub fn kept_together(mut self) -> Self {
        self.keep_together = true;
        self
    }

    /// Wraps each cell to its column width and sizes the row to its tallest cell.
    pub fn measure_row(
        &self,
        cells: &[String],
        emphasis: RowEmphasis,
        table_width: f32,
    ) -> TableRow {
        let font = match emphasis {
            RowEmphasis::Normal => Font::Helvetica,
            RowEmphasis::Strong | RowEmphasis::Total => Font::HelveticaBold,
        };
        self.measure_with_font(cells, emphasis, font, table_width)
    }

    fn measure_with_font(
        &self,
        cells: &[String],
        emphasis: RowEmphasis,
        font: Font,
        table_width: f32,
    ) -> TableRow {
        let padding = self.style.padding;
        let wrapped: Vec<Vec<String>> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let text = cells.get(index).map(String::as_str).unwrap_or("");
                let inner = (column.width * table_width - 2.0 * padding).max(1.0);
                wrap(text, font, self.style.font_size, inner)
            })
            .collect();
        let tallest = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        TableRow {
            cells: wrapped,
            height: tallest as f32 * self.style.leading + 2.0 * padding,
            emphasis,
        }
    }

    pub fn with_header(mut self, titles: &[&str], table_width: f32) -> Self {
        let titles: Vec<String> = titles.iter().map(|title| title.to_string()).collect();
        self.header =
            Some(self.measure_with_font(&titles, RowEmphasis::Strong, Font::HelveticaBold, table_width));
        self
    }

    pub fn push_row(&mut self, cells: &[String], emphasis: RowEmphasis, table_width: f32) {
        let row = self.measure_row(cells, emphasis, table_width);
        self.rows.push(row);
    }

    pub fn with_space_after(mut self, space_after: f32) -> Self {
        self.space_after = space_after;
        self
    }

    pub fn header_height(&self) -> f32 {
        self.header.as_ref().map_or(0.0, |header| header.height)
    }

    pub fn height(&self) -> f32 {
        self.header_height() + self.rows.iter().map(|row| row.height).sum::<f32>() + self.space_after
    }

    /// Smallest fragment worth placing: the header plus the first row.
    pub fn min_height(&self) -> f32 {
        self.header_height() + self.rows.first().map_or(0.0, |row| row.height)
    }

    /// How many leading rows fit in `available` points, header included.
    pub fn rows_fitting(&self, available: f32) -> usize {
        let mut used = self.header_height();
        let mut count = 0;
        for row in &self.rows {
            used += row.height;
            if used > available + FIT_TOLERANCE {
                break;
            }
            count += 1;
        }
        count
    }

    /// Splits after `count` rows. Both halves keep the header; only the tail keeps
    /// the trailing space.
    pub fn split_at(&self, count: usize) -> (Self, Self) {
        let head = Self {
            columns: self.columns.clone(),
            header: self.header.clone(),
            rows: self.rows[..count].to_vec(),
            style: self.style,
            space_after: 0.0,
            keep_together: self.keep_together,
        };
        let tail = Self { rows: self.rows[count..].to_vec(), ..self.clone() };
        (head, tail)
    }

    /// Appends the rows of a later fragment of the same table.
    pub fn absorb(&mut self, fragment: TableBlock) {
        self.rows.extend(fragment.rows);
        self.space_after = fragment.space_after;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    pub image: ImageRef,
    pub width: f32,
    pub height: f32,
    pub space_after: f32,
}

impl ImageBlock {
    /// Scales to `max_width`, then shrinks further if taller than `max_height`.
    pub fn fitted(image: ImageRef, max_width: f32, max_height: f32) -> Self {
        let ratio = image.aspect_ratio();
        let mut width = max_width;
        let mut height = width * ratio;
        if height > max_height {
            height = max_height;
            width = height / ratio;
        }
        Self { image, width, height, space_after: 0.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpacerBlock {
    pub height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ContentBlock {
    Text(TextBlock),
    Table(TableBlock),
    Image(ImageBlock),
    Spacer(SpacerBlock),
}

impl ContentBlock {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Table(_) => "table",
            Self::Image(_) => "image",
            Self::Spacer(_) => "spacer",
        }
    }

    pub fn height(&self) -> f32 {
        match self {
            Self::Text(block) => block.height(),
            Self::Table(block) => block.height(),
            Self::Image(block) => block.height + block.space_after,
            Self::Spacer(block) => block.height,
        }
    }

    /// Height that must be available before any part of the block can be placed.
    pub fn min_height(&self) -> f32 {
        match self {
            Self::Table(block) if !block.keep_together => block.min_height(),
            other => other.height(),
        }
    }

    pub fn is_breakable(&self) -> bool {
        matches!(self, Self::Table(table) if !table.keep_together)
    }
}
