use crate::document::format;
use crate::document::theme::{Brand, BORDER_GRAY, DARK_GRAY, LIGHT_GRAY, MED_GRAY, NAVY, ORANGE};
use crate::domain::acceptance::{AcceptanceEvidence, AcceptanceState};
use crate::domain::proposal::ProposalConfig;
use crate::layout::block::{
    Align, Color, ContentBlock, ImageBlock, RowEmphasis, Rule, SpacerBlock, TableBlock, TableColumn,
    TableStyle, TextBlock, TextStyle,
};
use crate::layout::metrics::{char_width, wrap, Font};

/// Longest run of wrapped lines kept in one text block; longer paragraphs are
/// continued in a following block so free-form terms never overflow a page.
const MAX_LINES_PER_BLOCK: usize = 24;
const EXHIBIT_WIDTH_SHARE: f32 = 0.9;
const EXHIBIT_MAX_HEIGHT: f32 = 5.5 * 72.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Cover,
    ClientProject,
    ScopeOfWork,
    Pricing,
    Exhibit,
    Terms,
    Signature,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComposedSection {
    pub section: Section,
    pub blocks: Vec<ContentBlock>,
}

pub struct SectionContext<'a> {
    pub config: &'a ProposalConfig,
    pub brand: &'a Brand,
    pub state: AcceptanceState,
    pub evidence: Option<&'a AcceptanceEvidence>,
    pub width: f32,
}

fn title_style() -> TextStyle {
    TextStyle::new(Font::HelveticaBold, 22.0, NAVY).with_leading(26.0)
}

fn heading_style() -> TextStyle {
    TextStyle::new(Font::HelveticaBold, 12.0, NAVY).with_leading(16.0)
}

fn body_style() -> TextStyle {
    TextStyle::new(Font::Helvetica, 9.5, DARK_GRAY).with_leading(13.0)
}

fn small_style() -> TextStyle {
    TextStyle::new(Font::Helvetica, 9.0, MED_GRAY).with_leading(13.0)
}

fn grid_table_style() -> TableStyle {
    TableStyle {
        font_size: 9.0,
        leading: 12.0,
        padding: 5.0,
        text: DARK_GRAY,
        header_fill: Some(NAVY),
        header_text: Color::WHITE,
        zebra_fill: Some(LIGHT_GRAY),
        grid: Some(BORDER_GRAY),
    }
}

fn plain_table_style() -> TableStyle {
    TableStyle {
        font_size: 9.5,
        leading: 13.0,
        padding: 2.0,
        text: DARK_GRAY,
        header_fill: None,
        header_text: MED_GRAY,
        zebra_fill: None,
        grid: None,
    }
}

fn thin_rule() -> Rule {
    Rule { gap: 6.0, thickness: 0.5, color: BORDER_GRAY }
}

/// Splits wrapped paragraph lines into blocks of at most [`MAX_LINES_PER_BLOCK`].
fn paragraph_blocks(text: &str, style: TextStyle, width: f32, space_after: f32) -> Vec<ContentBlock> {
    let lines = wrap(text, style.font, style.size, width);
    let chunks: Vec<&[String]> = lines.chunks(MAX_LINES_PER_BLOCK).collect();
    let last = chunks.len().saturating_sub(1);
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            let mut block = TextBlock::new();
            for line in chunk {
                block = block.line(line.clone(), style);
            }
            if index == last {
                block = block.spaced(0.0, space_after);
            }
            ContentBlock::Text(block)
        })
        .collect()
}

/// Sequential "1.", "2.", ... numbering over the sections actually present.
struct Numbering(usize);

impl Numbering {
    fn heading(&mut self, title: &str) -> String {
        self.0 += 1;
        format!("{}. {}", self.0, title.to_uppercase())
    }
}

fn heading_block(text: String) -> TextBlock {
    TextBlock::new().line(text, heading_style()).spaced(12.0, 4.0)
}

pub fn compose(context: &SectionContext<'_>) -> Vec<ComposedSection> {
    let mut numbering = Numbering(0);
    let mut sections = vec![
        cover(context),
        client_project(context, &mut numbering),
        scope_of_work(context, &mut numbering),
        pricing(context, &mut numbering),
    ];
    if let Some(exhibit) = exhibit(context) {
        sections.push(exhibit);
    }
    sections.push(terms(context, &mut numbering));
    sections.push(signature(context, &mut numbering));
    sections
}

fn cover(context: &SectionContext<'_>) -> ComposedSection {
    let config = context.config;
    let right = small_style().aligned(Align::Right);
    let block = TextBlock::new()
        .line(format!("Proposal No: {}", config.proposal_number()), right)
        .line(format!("Date: {}", format::long_date(config.proposal_date)), right)
        .line(format!("Valid Through: {}", format::long_date(config.valid_through())), right)
        .line("PROPOSAL", title_style())
        .spaced(0.0, 8.0)
        .ruled(Rule { gap: 4.0, thickness: 2.0, color: ORANGE });
    ComposedSection { section: Section::Cover, blocks: vec![ContentBlock::Text(block)] }
}

fn client_project(context: &SectionContext<'_>, numbering: &mut Numbering) -> ComposedSection {
    let config = context.config;
    let width = context.width;

    let mut from = vec![context.brand.company_name.clone()];
    from.extend(context.brand.contact_lines.iter().cloned());

    let client = &config.client;
    let mut to: Vec<String> = [&client.company, &client.contact, &client.title, &client.phone, &client.email]
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if to.is_empty() {
        to.push("Client".to_string());
    }

    let project = &config.project;
    let project_lines: Vec<String> =
        [project.name.trim().to_string(), project.full_address(), project.section.trim().to_string()]
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect();

    let mut table = TableBlock::new(
        vec![
            TableColumn::new(0.33, Align::Left),
            TableColumn::new(0.33, Align::Left),
            TableColumn::new(0.34, Align::Left),
        ],
        plain_table_style(),
    )
    .with_header(&["FROM", "TO", "PROJECT"], width)
    .kept_together();
    table.push_row(&[from.join("\n"), to.join("\n"), project_lines.join("\n")], RowEmphasis::Normal, width);

    let mut blocks = vec![
        ContentBlock::Table(table.with_space_after(8.0)),
        ContentBlock::Text(TextBlock::new().ruled(thin_rule())),
    ];

    let description = project.description.trim();
    if !description.is_empty() {
        blocks.push(ContentBlock::Text(heading_block(numbering.heading("Project Overview"))));
        blocks.extend(paragraph_blocks(description, body_style(), width, 6.0));
    }

    ComposedSection { section: Section::ClientProject, blocks }
}

fn scope_of_work(context: &SectionContext<'_>, numbering: &mut Numbering) -> ComposedSection {
    let config = context.config;
    let width = context.width;
    let mut blocks =
        vec![ContentBlock::Text(heading_block(numbering.heading("Scope of Work")))];

    let rows: Vec<(String, String)> = if config.scope.is_empty() {
        config
            .pricing
            .line_items
            .iter()
            .map(|item| {
                let unit = item.unit.as_deref().map(|unit| format!(" {unit}")).unwrap_or_default();
                (item.description.clone(), format!("Quantity: {}{unit}", format::quantity(item.quantity)))
            })
            .collect()
    } else {
        config.scope.iter().map(|item| (item.title.clone(), item.detail.clone())).collect()
    };

    if rows.is_empty() {
        blocks.extend(paragraph_blocks("Scope to be confirmed.", body_style(), width, 6.0));
    } else {
        let mut table = TableBlock::new(
            vec![
                TableColumn::new(0.08, Align::Center),
                TableColumn::new(0.37, Align::Left),
                TableColumn::new(0.55, Align::Left),
            ],
            grid_table_style(),
        )
        .with_header(&["#", "Item", "Details"], width);
        for (index, (title, detail)) in rows.into_iter().enumerate() {
            table.push_row(&[(index + 1).to_string(), title, detail], RowEmphasis::Normal, width);
        }
        blocks.push(ContentBlock::Table(table.with_space_after(8.0)));
    }

    ComposedSection { section: Section::ScopeOfWork, blocks }
}

fn pricing(context: &SectionContext<'_>, numbering: &mut Numbering) -> ComposedSection {
    let config = context.config;
    let pricing = &config.pricing;
    let symbol = context.brand.currency_symbol.as_str();
    let width = context.width;
    let mut blocks = vec![ContentBlock::Text(heading_block(numbering.heading("Investment")))];

    let mut table = TableBlock::new(
        vec![
            TableColumn::new(0.46, Align::Left),
            TableColumn::new(0.14, Align::Right),
            TableColumn::new(0.20, Align::Right),
            TableColumn::new(0.20, Align::Right),
        ],
        grid_table_style(),
    )
    .with_header(&["Description", "Qty", "Unit Price", "Amount"], width);

    for item in &pricing.line_items {
        let quantity = match &item.unit {
            Some(unit) => format!("{} {unit}", format::quantity(item.quantity)),
            None => format::quantity(item.quantity),
        };
        table.push_row(
            &[
                item.description.clone(),
                quantity,
                format::money(item.unit_price, symbol),
                item.extended_amount().map(|amount| format::money(amount, symbol)).unwrap_or_default(),
            ],
            RowEmphasis::Normal,
            width,
        );
    }
    let summary = [
        ("Subtotal".to_string(), pricing.subtotal, RowEmphasis::Strong),
        (format!("Tax ({})", format::percent(pricing.tax_rate)), pricing.tax, RowEmphasis::Strong),
        ("Total".to_string(), pricing.total, RowEmphasis::Total),
    ];
    for (label, amount, emphasis) in summary {
        table.push_row(
            &[label, String::new(), String::new(), format::money(amount, symbol)],
            emphasis,
            width,
        );
    }
    blocks.push(ContentBlock::Table(table.with_space_after(8.0)));

    if let Some(schedule) = &config.payment_schedule {
        blocks.push(ContentBlock::Text(
            TextBlock::new().line("Payment Schedule", heading_style()).spaced(4.0, 4.0),
        ));
        let mut payments = TableBlock::new(
            vec![TableColumn::new(0.7, Align::Left), TableColumn::new(0.3, Align::Right)],
            grid_table_style(),
        )
        .with_header(&["Payment", "Amount"], width)
        .kept_together();
        payments.push_row(
            &[
                format!("Deposit ({}%) due upon execution", schedule.deposit_percent.normalize()),
                format::money(schedule.deposit, symbol),
            ],
            RowEmphasis::Normal,
            width,
        );
        payments.push_row(
            &["Balance due upon completion".to_string(), format::money(schedule.balance, symbol)],
            RowEmphasis::Normal,
            width,
        );
        blocks.push(ContentBlock::Table(payments.with_space_after(8.0)));
    }

    ComposedSection { section: Section::Pricing, blocks }
}

fn exhibit(context: &SectionContext<'_>) -> Option<ComposedSection> {
    let config = context.config;
    let image = config.image.as_ref()?;
    let project = &config.project;
    let title = match &config.image_caption {
        Some(caption) => format!("EXHIBIT A: {}", caption.trim().to_uppercase()),
        None => "EXHIBIT A".to_string(),
    };
    let subtitle = [project.name.trim().to_string(), project.full_address(), project.section.trim().to_string()]
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    let mut heading = TextBlock::new()
        .paragraph(&title, heading_style(), context.width)
        .spaced(12.0, 6.0)
        .ruled(Rule { gap: 2.0, thickness: 2.0, color: ORANGE });
    if !subtitle.is_empty() {
        heading = heading.paragraph(&subtitle, small_style(), context.width);
    }

    let mut picture =
        ImageBlock::fitted(image.clone(), context.width * EXHIBIT_WIDTH_SHARE, EXHIBIT_MAX_HEIGHT);
    picture.space_after = 8.0;

    Some(ComposedSection {
        section: Section::Exhibit,
        blocks: vec![ContentBlock::Text(heading), ContentBlock::Image(picture)],
    })
}

fn terms(context: &SectionContext<'_>, numbering: &mut Numbering) -> ComposedSection {
    let config = context.config;
    let mut blocks =
        vec![ContentBlock::Text(heading_block(numbering.heading("Terms and Conditions")))];

    for paragraph in config.terms.split("\n\n").map(str::trim).filter(|text| !text.is_empty()) {
        blocks.extend(paragraph_blocks(paragraph, body_style(), context.width, 6.0));
    }
    let validity = format!(
        "This proposal is valid for {} days from the date of issue (through {}). Pricing is subject to revision after that date.",
        config.valid_days,
        format::long_date(config.valid_through())
    );
    blocks.extend(paragraph_blocks(&validity, body_style(), context.width, 6.0));

    ComposedSection { section: Section::Terms, blocks }
}

/// Underscores filling `width` at the signature font size.
fn signature_line(width: f32, size: f32) -> String {
    let underscore = f32::from(char_width(Font::Helvetica, '_')) * size / 1000.0;
    "_".repeat((width / underscore).floor().max(1.0) as usize)
}

fn signature(context: &SectionContext<'_>, numbering: &mut Numbering) -> ComposedSection {
    let config = context.config;
    let width = context.width;
    let mut blocks = vec![ContentBlock::Text(heading_block(numbering.heading("Acceptance")))];
    blocks.extend(paragraph_blocks(
        "By signing below, the authorized representative of the client accepts this proposal and the terms described herein. This document constitutes a binding agreement between the parties upon execution.",
        body_style(),
        width,
        12.0,
    ));

    let style = plain_table_style();
    let column_width = width * 0.45 - 2.0 * style.padding;
    let blank = signature_line(column_width, style.font_size);
    let client_name = match config.client.display_name() {
        "" => "Client".to_string(),
        name => name.to_string(),
    };

    let signed = match (context.state, context.evidence) {
        (AcceptanceState::Accepted, Some(evidence)) => Some(evidence),
        _ => None,
    };
    let (client_signature, client_printed, client_date) = match signed {
        Some(evidence) => {
            let printed = match &evidence.signer_title {
                Some(title) => format!("{}, {title}", evidence.signer_name),
                None => evidence.signer_name.clone(),
            };
            (
                format!("/s/ {}", evidence.signer_name),
                printed,
                format::long_date(evidence.accepted_at.date_naive()),
            )
        }
        None => (blank.clone(), blank.clone(), blank.clone()),
    };

    let mut table = TableBlock::new(
        vec![
            TableColumn::new(0.45, Align::Left),
            TableColumn::new(0.10, Align::Left),
            TableColumn::new(0.45, Align::Left),
        ],
        style,
    )
    .kept_together();
    let rows = [
        ([context.brand.company_name.clone(), client_name], RowEmphasis::Strong),
        ([blank.clone(), client_signature], RowEmphasis::Normal),
        (["Signature".to_string(), "Signature".to_string()], RowEmphasis::Normal),
        ([blank.clone(), client_printed], RowEmphasis::Normal),
        (["Printed Name / Title".to_string(), "Printed Name / Title".to_string()], RowEmphasis::Normal),
        ([blank, client_date], RowEmphasis::Normal),
        (["Date".to_string(), "Date".to_string()], RowEmphasis::Normal),
    ];
    for ([left, right], emphasis) in rows {
        table.push_row(&[left, String::new(), right], emphasis, width);
    }
    blocks.push(ContentBlock::Table(table));

    if let Some(evidence) = signed {
        blocks.push(ContentBlock::Spacer(SpacerBlock { height: 10.0 }));
        blocks.push(ContentBlock::Text(evidence_block(evidence, width)));
    }

    ComposedSection { section: Section::Signature, blocks }
}

fn evidence_block(evidence: &AcceptanceEvidence, width: f32) -> TextBlock {
    let style = small_style();
    let mut block = TextBlock::new()
        .line("Electronic acceptance record", TextStyle::new(Font::HelveticaBold, 9.0, NAVY))
        .paragraph(
            &format!(
                "Accepted by {} via {} on {} UTC.",
                evidence.signer_name,
                evidence.method.label(),
                evidence.accepted_at.format("%Y-%m-%d %H:%M:%S")
            ),
            style,
            width,
        );
    if let Some(option) = evidence.selected_option {
        block = block.line(format!("Selected payment option: {option}"), style);
    }
    if let Some(reported) = &evidence.client_reported_date {
        block = block.paragraph(&format!("Client-reported date: {reported}"), style, width);
    }
    if let Some(ip) = &evidence.ip_address {
        block = block.line(format!("Client address: {ip}"), style);
    }
    if let Some(agent) = &evidence.user_agent {
        block = block.paragraph(&format!("User agent: {agent}"), style, width);
    }
    block
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{compose, ComposedSection, Section, SectionContext};
    use crate::document::theme::Brand;
    use crate::domain::acceptance::{AcceptanceEvidence, AcceptanceMethod, AcceptanceState};
    use crate::domain::proposal::{
        ClientInfo, ProposalConfig, ProposalDefaults, ProposalInput, ScopeItem,
    };
    use crate::layout::block::ContentBlock;
    use crate::pricing::{LineItem, PricingCalculator};

    fn config(input: ProposalInput) -> ProposalConfig {
        let defaults = ProposalDefaults {
            tax_rate: Decimal::new(8, 2),
            valid_days: 30,
            today: NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid date"),
        };
        ProposalConfig::from_input(input, &defaults, &PricingCalculator).expect("valid input")
    }

    fn base_input() -> ProposalInput {
        ProposalInput {
            client: ClientInfo { company: "Acme Property".to_string(), ..ClientInfo::default() },
            line_items: vec![
                LineItem::new("Duct cleaning", Decimal::ONE, Decimal::new(45_000, 2)),
                LineItem::new("Vent sealing", Decimal::from(3), Decimal::new(6_000, 2)),
            ],
            terms: "Net 30.\n\nWork scheduled within two weeks.".to_string(),
            ..ProposalInput::default()
        }
    }

    fn sections(config: &ProposalConfig, state: AcceptanceState, evidence: Option<&AcceptanceEvidence>) -> Vec<ComposedSection> {
        let brand = Brand::default();
        compose(&SectionContext { config, brand: &brand, state, evidence, width: 468.0 })
    }

    fn all_text(sections: &[ComposedSection]) -> String {
        let mut text = String::new();
        for block in sections.iter().flat_map(|section| &section.blocks) {
            match block {
                ContentBlock::Text(block) => {
                    for line in &block.lines {
                        text.push_str(&line.text);
                        text.push('\n');
                    }
                }
                ContentBlock::Table(table) => {
                    for row in table.header.iter().chain(&table.rows) {
                        for cell in &row.cells {
                            text.push_str(&cell.join(" "));
                            text.push('\n');
                        }
                    }
                }
                _ => {}
            }
        }
        text
    }

    #[test]
    fn sections_follow_the_fixed_order_without_an_image() {
        let config = config(base_input());
        let order: Vec<Section> = sections(&config, AcceptanceState::Draft, None)
            .iter()
            .map(|section| section.section)
            .collect();
        assert_eq!(
            order,
            vec![
                Section::Cover,
                Section::ClientProject,
                Section::ScopeOfWork,
                Section::Pricing,
                Section::Terms,
                Section::Signature,
            ]
        );
    }

    #[test]
    fn pricing_table_shows_lines_and_totals() {
        let config = config(base_input());
        let composed = sections(&config, AcceptanceState::Draft, None);
        let text = all_text(&composed);
        assert!(text.contains("$630.00"));
        assert!(text.contains("Tax (8%)"));
        assert!(text.contains("$50.40"));
        assert!(text.contains("$680.40"));
        assert!(text.contains("valid for 30 days"));
        assert!(text.contains("P-2026-0220"));
    }

    #[test]
    fn scope_items_replace_the_line_item_fallback() {
        let mut input = base_input();
        input.scope = vec![ScopeItem { title: "Assessment".to_string(), detail: "Full survey".to_string() }];
        let config = config(input);
        let text = all_text(&sections(&config, AcceptanceState::Draft, None));
        assert!(text.contains("Assessment"));
        assert!(text.contains("Full survey"));
    }

    #[test]
    fn signature_is_blank_until_accepted() {
        let config = config(base_input());
        let accepted_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time");
        let evidence = AcceptanceEvidence {
            signer_name: "Dana Client".to_string(),
            signer_title: Some("Owner".to_string()),
            method: AcceptanceMethod::TypedName,
            selected_option: None,
            client_reported_date: None,
            ip_address: None,
            user_agent: None,
            accepted_at,
        };

        let shared = all_text(&sections(&config, AcceptanceState::Shared, Some(&evidence)));
        assert!(!shared.contains("Dana Client"));

        let accepted = all_text(&sections(&config, AcceptanceState::Accepted, Some(&evidence)));
        assert!(accepted.contains("/s/ Dana Client"));
        assert!(accepted.contains("Dana Client, Owner"));
        assert!(accepted.contains("March 1, 2026"));
        assert!(accepted.contains("Electronic acceptance record"));
    }

    #[test]
    fn long_terms_are_chunked_into_page_sized_blocks() {
        let mut input = base_input();
        input.terms = "word ".repeat(3_000);
        let config = config(input);
        let composed = sections(&config, AcceptanceState::Draft, None);
        let terms = composed
            .iter()
            .find(|section| section.section == Section::Terms)
            .expect("terms section");
        assert!(terms.blocks.len() > 3);
        for block in &terms.blocks {
            assert!(block.height() < 400.0);
        }
    }
}
