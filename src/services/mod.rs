//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，不持有浏览器，也不知道 HTTP 的存在。

pub mod document_assembler;
pub mod pagination;
pub mod panel_fetcher;
pub mod record_extractor;

pub use document_assembler::DocumentAssembler;
pub use pagination::{PaginationDriver, PaginationOutcome, PaginationState, TerminationReason};
pub use panel_fetcher::{normalize, HttpImageSource, ImageSource, PanelFetcher};
pub use record_extractor::{extract_panels, parse_selector, RecordExtractor, SelectorSet};
