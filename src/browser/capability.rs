//! 浏览器能力接口
//!
//! 流程代码只依赖这里的 trait，不接触 chromiumoxide 的类型：
//! - `Navigator`：导航
//! - `DomQuery`：查找 / 点击 / 快照
//! - `RequestFilter`：请求拦截策略
//!
//! `PageSession` 把前两者组合成一个可关闭的会话，`SessionLauncher` 负责打开会话。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// 请求的资源类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    Xhr,
    Fetch,
    Websocket,
    Other,
}

/// 拦截决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Allow,
    Block,
}

/// 请求拦截策略
pub trait RequestFilter: Send + Sync + std::fmt::Debug {
    fn decide(&self, class: ResourceClass) -> FilterDecision;

    /// 策略是否可能屏蔽任何请求；不会屏蔽时会话无需开启拦截
    fn blocks_anything(&self) -> bool;
}

/// 按资源类别屏蔽（目录页会话使用，只需要 DOM）
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    blocked: Vec<ResourceClass>,
}

impl BlockList {
    pub fn new(blocked: impl Into<Vec<ResourceClass>>) -> Self {
        Self {
            blocked: blocked.into(),
        }
    }
}

impl RequestFilter for BlockList {
    fn decide(&self, class: ResourceClass) -> FilterDecision {
        if self.blocked.contains(&class) {
            FilterDecision::Block
        } else {
            FilterDecision::Allow
        }
    }

    fn blocks_anything(&self) -> bool {
        !self.blocked.is_empty()
    }
}

/// 放行所有请求（章节会话使用，图片必须能加载）
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl RequestFilter for AllowAll {
    fn decide(&self, _class: ResourceClass) -> FilterDecision {
        FilterDecision::Allow
    }

    fn blocks_anything(&self) -> bool {
        false
    }
}

/// 打开会话时的选项
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub navigation_timeout: Duration,
    pub user_agent: Option<String>,
    pub request_filter: Arc<dyn RequestFilter>,
}

impl SessionOptions {
    pub fn new(navigation_timeout: Duration, request_filter: Arc<dyn RequestFilter>) -> Self {
        Self {
            navigation_timeout,
            user_agent: None,
            request_filter,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// 单次查找控件的结果
///
/// `NotFound` 与 `TransientError` 是两个不同的信号，
/// 是否把它们视为同一种状态转换由调用方的策略决定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLookup {
    Found,
    NotFound,
    TransientError(String),
}

#[async_trait]
pub trait Navigator: Send + Sync {
    /// 导航到 `url`，超时或失败都是致命错误
    async fn navigate(&self, url: &str) -> AppResult<()>;
}

#[async_trait]
pub trait DomQuery: Send + Sync {
    /// 在 `timeout` 内等待 `selector` 出现
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> ControlLookup;

    /// 点击第一个匹配 `selector` 的元素
    async fn click(&self, selector: &str) -> AppResult<()>;

    /// 等待网络安静，最多等待 `timeout`
    async fn wait_for_network_idle(&self, timeout: Duration) -> AppResult<()>;

    /// 当前 DOM 的 HTML 快照
    async fn content(&self) -> AppResult<String>;
}

/// 一个已打开的渲染页面会话
#[async_trait]
pub trait PageSession: Navigator + DomQuery {
    async fn close(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn open(&self, options: SessionOptions) -> AppResult<Box<dyn PageSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_list_only_blocks_listed_classes() {
        let filter = BlockList::new(vec![
            ResourceClass::Image,
            ResourceClass::Stylesheet,
            ResourceClass::Font,
            ResourceClass::Media,
        ]);
        assert_eq!(filter.decide(ResourceClass::Image), FilterDecision::Block);
        assert_eq!(filter.decide(ResourceClass::Media), FilterDecision::Block);
        assert_eq!(filter.decide(ResourceClass::Document), FilterDecision::Allow);
        assert_eq!(filter.decide(ResourceClass::Xhr), FilterDecision::Allow);
        assert!(filter.blocks_anything());
    }

    #[test]
    fn test_allow_all_never_blocks() {
        assert_eq!(AllowAll.decide(ResourceClass::Image), FilterDecision::Allow);
        assert!(!AllowAll.blocks_anything());
        assert!(!BlockList::default().blocks_anything());
    }
}
