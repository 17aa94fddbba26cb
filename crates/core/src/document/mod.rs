pub mod format;
pub mod image;
pub mod pdf;
pub mod render;
pub mod sections;
pub mod theme;

use crate::domain::acceptance::{AcceptanceEvidence, AcceptanceState};
use crate::domain::proposal::{ProposalConfig, ProposalId, RenderedDocument};
use crate::errors::DomainError;
use crate::layout::block::ContentBlock;
use crate::layout::engine::{Layout, LayoutEngine, PageGeometry};

pub use image::{ImageFormat, ImageRef};
pub use render::RenderMeta;
pub use sections::{ComposedSection, Section};
pub use theme::Brand;

/// Turns a proposal into its branded, paginated PDF.
#[derive(Clone, Debug)]
pub struct DocumentBuilder {
    brand: Brand,
    engine: LayoutEngine,
}

impl DocumentBuilder {
    pub fn new(brand: Brand, geometry: PageGeometry) -> Result<Self, DomainError> {
        if let Some(logo) = &brand.logo {
            logo.embedding()?;
        }
        Ok(Self { brand, engine: LayoutEngine::new(geometry)? })
    }

    pub fn brand(&self) -> &Brand {
        &self.brand
    }

    pub fn geometry(&self) -> &PageGeometry {
        self.engine.geometry()
    }

    pub fn compose(
        &self,
        config: &ProposalConfig,
        state: AcceptanceState,
        evidence: Option<&AcceptanceEvidence>,
    ) -> Vec<ComposedSection> {
        sections::compose(&sections::SectionContext {
            config,
            brand: &self.brand,
            state,
            evidence,
            width: self.engine.geometry().content_width(),
        })
    }

    pub fn layout(
        &self,
        id: &ProposalId,
        config: &ProposalConfig,
        state: AcceptanceState,
        evidence: Option<&AcceptanceEvidence>,
    ) -> Result<Layout, DomainError> {
        let blocks: Vec<ContentBlock> = self
            .compose(config, state, evidence)
            .into_iter()
            .flat_map(|section| section.blocks)
            .collect();
        self.engine.layout(&blocks, id.as_str())
    }

    /// Same (config, state, evidence) always yields byte-identical output.
    pub fn render(
        &self,
        id: &ProposalId,
        config: &ProposalConfig,
        state: AcceptanceState,
        evidence: Option<&AcceptanceEvidence>,
    ) -> Result<RenderedDocument, DomainError> {
        let layout = self.layout(id, config, state, evidence)?;
        let meta = RenderMeta {
            title: format!("{} Proposal - {}", self.brand.company_name, config.project.name),
            proposal_number: config.proposal_number(),
        };
        let bytes = render::render_pdf(&layout, &self.brand, &meta)?;
        Ok(RenderedDocument::new(bytes, layout.page_count()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::image::fixtures::tiny_jpeg;
    use super::{Brand, DocumentBuilder, ImageRef};
    use crate::domain::acceptance::{AcceptanceEvidence, AcceptanceMethod, AcceptanceState};
    use crate::domain::proposal::{
        ClientInfo, ProjectInfo, ProposalConfig, ProposalDefaults, ProposalId, ProposalInput,
    };
    use crate::layout::block::ContentBlock;
    use crate::layout::engine::{PageGeometry, PageSize};
    use crate::pricing::{LineItem, PricingCalculator};

    fn builder() -> DocumentBuilder {
        DocumentBuilder::new(Brand::default(), PageGeometry::new(PageSize::Letter, 54.0, 30.0, 24.0))
            .expect("valid builder")
    }

    fn config(image: Option<ImageRef>, line_count: usize) -> ProposalConfig {
        let input = ProposalInput {
            client: ClientInfo { company: "Acme Property".to_string(), ..ClientInfo::default() },
            project: ProjectInfo {
                name: "Riverside Roof".to_string(),
                address: "100 Main St".to_string(),
                city: "Denver".to_string(),
                state: "CO".to_string(),
                ..ProjectInfo::default()
            },
            line_items: (0..line_count)
                .map(|index| LineItem::new(format!("Item {index}"), Decimal::ONE, Decimal::new(10_000, 2)))
                .collect(),
            tax_rate: Some(Decimal::new(8, 2)),
            terms: "Net 30.".to_string(),
            image,
            image_caption: Some("Vent placement map".to_string()),
            ..ProposalInput::default()
        };
        let defaults = ProposalDefaults {
            tax_rate: Decimal::ZERO,
            valid_days: 30,
            today: NaiveDate::from_ymd_opt(2026, 2, 20).expect("valid date"),
        };
        ProposalConfig::from_input(input, &defaults, &PricingCalculator).expect("valid input")
    }

    fn id() -> ProposalId {
        ProposalId("0a1b2c3d4e5f".to_string())
    }

    #[test]
    fn rendering_is_byte_identical_for_the_same_inputs() {
        let builder = builder();
        let config = config(None, 3);
        let first = builder.render(&id(), &config, AcceptanceState::Shared, None).expect("render");
        let second = builder.render(&id(), &config, AcceptanceState::Shared, None).expect("render");

        assert_eq!(first.bytes(), second.bytes());
        assert_eq!(first.digest(), second.digest());
        assert!(first.page_count() >= 1);
    }

    #[test]
    fn proposal_without_image_has_no_image_block() {
        let builder = builder();
        let layout = builder.layout(&id(), &config(None, 3), AcceptanceState::Draft, None).expect("layout");
        let has_image = layout
            .pages
            .iter()
            .flat_map(|page| &page.blocks)
            .any(|placed| matches!(placed.block, ContentBlock::Image(_)));
        assert!(!has_image);

        let document = builder.render(&id(), &config(None, 3), AcceptanceState::Draft, None).expect("render");
        assert_eq!(document.page_count(), layout.page_count());
    }

    #[test]
    fn image_exhibit_is_embedded_when_present() {
        let image = ImageRef::from_bytes(tiny_jpeg(800, 600)).expect("jpeg");
        let builder = builder();
        let config = config(Some(image), 3);
        let layout = builder.layout(&id(), &config, AcceptanceState::Draft, None).expect("layout");
        let image_block = layout
            .pages
            .iter()
            .flat_map(|page| &page.blocks)
            .find_map(|placed| match &placed.block {
                ContentBlock::Image(block) => Some(block.clone()),
                _ => None,
            })
            .expect("image block");
        let content_width = builder.geometry().content_width();
        assert!((image_block.width - content_width * 0.9).abs() < 0.01);

        let document = builder.render(&id(), &config, AcceptanceState::Draft, None).expect("render");
        let bytes = document.bytes();
        assert!(bytes.windows(10).any(|window| window == b"/DCTDecode"));
    }

    #[test]
    fn long_pricing_tables_paginate() {
        let document = builder()
            .render(&id(), &config(None, 120), AcceptanceState::Draft, None)
            .expect("render");
        assert!(document.page_count() >= 3);
    }

    #[test]
    fn acceptance_changes_the_rendered_signature() {
        let builder = builder();
        let config = config(None, 2);
        let evidence = AcceptanceEvidence {
            signer_name: "Dana Client".to_string(),
            signer_title: None,
            method: AcceptanceMethod::ClickThrough,
            selected_option: Some(1),
            client_reported_date: None,
            ip_address: Some("203.0.113.9".to_string()),
            user_agent: None,
            accepted_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid time"),
        };

        let shared = builder.render(&id(), &config, AcceptanceState::Shared, None).expect("render");
        let accepted = builder
            .render(&id(), &config, AcceptanceState::Accepted, Some(&evidence))
            .expect("render");
        let again = builder
            .render(&id(), &config, AcceptanceState::Accepted, Some(&evidence))
            .expect("render");

        assert_ne!(shared.digest(), accepted.digest());
        assert_eq!(accepted.bytes(), again.bytes());
        assert!(accepted.bytes().windows(15).any(|window| window == b"/s/ Dana Client"));
    }
}
