//! # Panel Harvest
//!
//! 抓取漫画站点目录，并把章节分镜合成为 PDF 或长图的 Rust 服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Browser / Infrastructure）
//! - `browser/` - 会话能力接口（`Navigator` / `DomQuery` / `PageSession`）及 Chromium 实现
//! - `infrastructure/` - `JsExecutor`，唯一直接执行页面脚本的地方
//!
//! ### ② 业务能力层（Services）
//! - `PaginationDriver` - 点击"加载更多"直到展开完毕
//! - `RecordExtractor` - 从 DOM 快照中提取目录记录和分镜引用
//! - `PanelFetcher` - 串行下载并规范化分镜
//! - `DocumentAssembler` - 生成分页 PDF 或纵向拼图
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator::Pipeline` - 管理会话生命周期，串联各项能力
//!
//! ### ④ 接口层（API）
//! - `api/` - axum 路由，错误统一转换为 JSON 信封
//!
//! ## 模块结构

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{AssembledDocument, ChapterArtifact, ListingRecord, OutputMode};
pub use orchestrator::Pipeline;
