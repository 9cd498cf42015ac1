pub mod document;
pub mod listing;
pub mod panel;

pub use document::{AssembledDocument, ChapterArtifact, OutputMode, PageSize};
pub use listing::{dedup_by_href, ListingRecord};
pub use panel::{NormalizedImage, PanelReference};
