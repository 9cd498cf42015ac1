//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是整个系统的"指挥中心"：管理浏览器会话的生命周期，
//! 按顺序调用各项能力，自身不做解析和图片处理。
//!
//! ## 层次关系
//!
//! ```text
//! api (HTTP 路由)
//!     ↓
//! orchestrator::Pipeline (list_catalog / fetch_and_assemble_chapter / fetch_composite_panels)
//!     ↓
//! services (pagination / record_extractor / panel_fetcher / document_assembler)
//!     ↓
//! browser (SessionLauncher / PageSession) + infrastructure (JsExecutor)
//! ```

pub mod pipeline;

pub use pipeline::{chapter_filename, Pipeline, COMPOSITE_FILENAME};
