use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::layout::block::{ContentBlock, TableBlock};

/// Slack allowed when comparing accumulated `f32` heights.
pub const FIT_TOLERANCE: f32 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    /// Width and height in points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            Self::Letter => (612.0, 792.0),
            Self::A4 => (595.28, 841.89),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Reserved for page chrome; never used by block flow.
    pub header_height: f32,
    pub footer_height: f32,
}

impl PageGeometry {
    pub fn new(size: PageSize, margin: f32, header_height: f32, footer_height: f32) -> Self {
        let (width, height) = size.dimensions();
        Self {
            width,
            height,
            margin_top: margin,
            margin_bottom: margin,
            margin_left: margin,
            margin_right: margin,
            header_height,
            footer_height,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom - self.header_height - self.footer_height
    }

    /// PDF y coordinate (origin bottom-left) of the top edge of the content area.
    pub fn content_top(&self) -> f32 {
        self.height - self.margin_top - self.header_height
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let values = [
            self.width,
            self.height,
            self.margin_top,
            self.margin_bottom,
            self.margin_left,
            self.margin_right,
            self.header_height,
            self.footer_height,
        ];
        if values.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(DomainError::invalid_input("page geometry values must be finite and non-negative"));
        }
        if self.content_width() <= 0.0 || self.content_height() <= 0.0 {
            return Err(DomainError::invalid_input(format!(
                "page geometry leaves no content area ({:.2} x {:.2}pt)",
                self.content_width(),
                self.content_height()
            )));
        }
        Ok(())
    }
}

/// Per-page chrome, stamped after flow so it never competes with content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageChrome {
    pub page_number: usize,
    pub page_count: usize,
    pub proposal_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedBlock {
    pub source_index: usize,
    /// Distance from the top of the content area.
    pub offset: f32,
    /// 0 for the first fragment of a block, then 1, 2, ...
    pub part: usize,
    pub block: ContentBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub chrome: PageChrome,
    pub blocks: Vec<PlacedBlock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Rejoins split fragments and returns the blocks in placement order.
    pub fn reassemble(&self) -> Vec<ContentBlock> {
        let mut blocks: Vec<(usize, ContentBlock)> = Vec::new();
        for placed in self.pages.iter().flat_map(|page| &page.blocks) {
            if placed.part > 0 {
                if let (Some((index, ContentBlock::Table(head))), ContentBlock::Table(tail)) =
                    (blocks.last_mut(), &placed.block)
                {
                    if *index == placed.source_index {
                        head.absorb(tail.clone());
                        continue;
                    }
                }
            }
            blocks.push((placed.source_index, placed.block.clone()));
        }
        blocks.into_iter().map(|(_, block)| block).collect()
    }
}

#[derive(Default)]
struct PageBuilder {
    blocks: Vec<PlacedBlock>,
    used: f32,
}

impl PageBuilder {
    fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn place(&mut self, source_index: usize, part: usize, block: ContentBlock) {
        let height = block.height();
        self.blocks.push(PlacedBlock { source_index, offset: self.used, part, block });
        self.used += height;
    }
}

/// Greedy first-fit pagination in document order.
#[derive(Clone, Copy, Debug)]
pub struct LayoutEngine {
    geometry: PageGeometry,
}

impl LayoutEngine {
    pub fn new(geometry: PageGeometry) -> Result<Self, DomainError> {
        geometry.validate()?;
        Ok(Self { geometry })
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn layout(&self, blocks: &[ContentBlock], proposal_id: &str) -> Result<Layout, DomainError> {
        let capacity = self.geometry.content_height();
        let mut finished: Vec<Vec<PlacedBlock>> = Vec::new();
        let mut page = PageBuilder::default();

        for (index, block) in blocks.iter().enumerate() {
            let mut pending = block.clone();
            let mut part = 0;
            loop {
                let remaining = capacity - page.used;
                if pending.height() <= remaining + FIT_TOLERANCE {
                    page.place(index, part, pending);
                    break;
                }

                let fit = match &pending {
                    ContentBlock::Table(table) if pending.is_breakable() => {
                        Some(self.split_table(table, remaining, page.is_empty(), index)?)
                    }
                    _ => None,
                };
                match fit {
                    Some(TableFit::Whole) => {
                        // Only the trailing space overflowed; the page end absorbs it.
                        page.place(index, part, pending);
                        break;
                    }
                    Some(TableFit::Split(head, tail)) => {
                        page.place(index, part, ContentBlock::Table(head));
                        finished.push(std::mem::take(&mut page).blocks);
                        pending = ContentBlock::Table(tail);
                        part += 1;
                        continue;
                    }
                    Some(TableFit::NextPage) => {}
                    None if page.is_empty() || pending.min_height() > capacity + FIT_TOLERANCE => {
                        return Err(DomainError::layout_overflow(
                            index,
                            pending.kind(),
                            pending.min_height(),
                            capacity,
                        ));
                    }
                    None => {}
                }

                finished.push(std::mem::take(&mut page).blocks);
            }
        }

        if !page.is_empty() || finished.is_empty() {
            finished.push(page.blocks);
        }

        let page_count = finished.len();
        let pages = finished
            .into_iter()
            .enumerate()
            .map(|(position, blocks)| Page {
                chrome: PageChrome {
                    page_number: position + 1,
                    page_count,
                    proposal_id: proposal_id.to_string(),
                },
                blocks,
            })
            .collect();

        Ok(Layout { geometry: self.geometry, pages })
    }

    fn split_table(
        &self,
        table: &TableBlock,
        remaining: f32,
        page_is_empty: bool,
        index: usize,
    ) -> Result<TableFit, DomainError> {
        let fitting = table.rows_fitting(remaining);
        if fitting >= table.rows.len() && table.header_height() <= remaining + FIT_TOLERANCE {
            return Ok(TableFit::Whole);
        }
        if fitting == 0 {
            if page_is_empty {
                return Err(DomainError::layout_overflow(
                    index,
                    "table",
                    table.min_height(),
                    self.geometry.content_height(),
                ));
            }
            return Ok(TableFit::NextPage);
        }
        let (head, tail) = table.split_at(fitting);
        Ok(TableFit::Split(head, tail))
    }
}

enum TableFit {
    Whole,
    Split(TableBlock, TableBlock),
    NextPage,
}
