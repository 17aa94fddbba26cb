pub mod block;
pub mod engine;
pub mod metrics;

pub use block::{
    Align, Color, ContentBlock, ImageBlock, RowEmphasis, Rule, SpacerBlock, TableBlock, TableColumn,
    TableRow, TableStyle, TextBlock, TextLine, TextStyle,
};
pub use engine::{Layout, LayoutEngine, Page, PageChrome, PageGeometry, PageSize, PlacedBlock};
pub use metrics::Font;
