//! 浏览器层
//!
//! - `capability`：流程代码依赖的能力接口和请求过滤策略
//! - `session`：基于 chromiumoxide 的实现

pub mod capability;
pub mod session;

pub use capability::{
    AllowAll, BlockList, ControlLookup, DomQuery, FilterDecision, Navigator, PageSession,
    RequestFilter, ResourceClass, SessionLauncher, SessionOptions,
};
pub use session::{ChromiumLauncher, ChromiumSession};
