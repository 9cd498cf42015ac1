//! 基于 chromiumoxide 的渲染页面会话
//!
//! 一个会话 = 一个浏览器进程 + 一个页面。会话关闭时浏览器随之退出；
//! 即使调用方忘记 `close`，`Drop` 也会结束后台任务，浏览器进程由
//! chromiumoxide 在 `Browser` 被丢弃时回收。

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use super::capability::{
    ControlLookup, DomQuery, FilterDecision, Navigator, PageSession, ResourceClass,
    SessionLauncher, SessionOptions,
};
use crate::config::BrowserSettings;
use crate::error::{AppError, AppResult, BrowserError, ConfigError};
use crate::infrastructure::{js_string_literal, JsExecutor};

/// 轮询选择器的间隔
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// 资源条目数保持不变多久视为网络空闲
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);
const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 启动 Chromium 会话
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> AppResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.viewport_width, self.settings.viewport_height)
            .args(self.settings.args.clone());

        builder = if self.settings.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };

        if let Some(path) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(|message| {
            error!("配置无头浏览器失败: {}", message);
            ConfigError::InvalidBrowserConfig { message }.into()
        })
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn open(&self, options: SessionOptions) -> AppResult<Box<dyn PageSession>> {
        info!("🚀 启动无头浏览器...");
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动无头浏览器失败: {}", e);
            BrowserError::LaunchFailed {
                source: Box::new(e),
            }
        })?;
        debug!("无头浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("浏览器事件处理出错: {}", e);
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            executor: None,
            navigation_timeout: options.navigation_timeout,
            handler_task,
            interception_task: None,
        };

        let page = session.browser.new_page("about:blank").await.map_err(|e| {
            error!("创建页面失败: {}", e);
            BrowserError::PageCreationFailed {
                source: Box::new(e),
            }
        })?;

        if let Some(user_agent) = &options.user_agent {
            page.set_user_agent(user_agent.as_str()).await?;
        }

        if options.request_filter.blocks_anything() {
            session.interception_task = Some(install_request_filter(&page, &options).await?);
            debug!("已启用请求拦截: {:?}", options.request_filter);
        }

        session.executor = Some(JsExecutor::new(page));
        Ok(Box::new(session))
    }
}

/// 开启 CDP Fetch 拦截，并在后台按策略放行或中止每个请求
async fn install_request_filter(
    page: &Page,
    options: &SessionOptions,
) -> AppResult<JoinHandle<()>> {
    let interception_failed = |e: chromiumoxide::error::CdpError| -> AppError {
        BrowserError::InterceptionFailed {
            source: Box::new(e),
        }
        .into()
    };

    let mut paused = page
        .event_listener::<EventRequestPaused>()
        .await
        .map_err(interception_failed)?;
    page.execute(EnableParams::builder().build())
        .await
        .map_err(interception_failed)?;

    let page = page.clone();
    let filter = options.request_filter.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let class = classify(&event.resource_type);
            let outcome = match filter.decide(class) {
                FilterDecision::Block => page
                    .execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ()),
                FilterDecision::Allow => page
                    .execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ()),
            };
            if let Err(e) = outcome {
                debug!("处理被拦截的请求失败 ({:?}): {}", class, e);
            }
        }
    }))
}

/// CDP 资源类型 → 内部资源类别
pub fn classify(resource_type: &ResourceType) -> ResourceClass {
    match resource_type {
        ResourceType::Document => ResourceClass::Document,
        ResourceType::Stylesheet => ResourceClass::Stylesheet,
        ResourceType::Image => ResourceClass::Image,
        ResourceType::Media => ResourceClass::Media,
        ResourceType::Font => ResourceClass::Font,
        ResourceType::Script => ResourceClass::Script,
        ResourceType::Xhr => ResourceClass::Xhr,
        ResourceType::Fetch => ResourceClass::Fetch,
        ResourceType::WebSocket => ResourceClass::Websocket,
        _ => ResourceClass::Other,
    }
}

/// 一个打开中的 Chromium 会话
pub struct ChromiumSession {
    browser: Browser,
    executor: Option<JsExecutor>,
    navigation_timeout: Duration,
    handler_task: JoinHandle<()>,
    interception_task: Option<JoinHandle<()>>,
}

impl ChromiumSession {
    fn executor(&self) -> AppResult<&JsExecutor> {
        self.executor.as_ref().ok_or_else(|| {
            BrowserError::PageCreationFailed {
                source: "会话没有可用页面".into(),
            }
            .into()
        })
    }

    async fn resource_count(&self) -> AppResult<u64> {
        self.executor()?
            .eval_as::<u64>("performance.getEntriesByType('resource').length")
            .await
    }
}

#[async_trait]
impl Navigator for ChromiumSession {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        info!("🌐 正在导航到: {}", url);
        let page = self.executor()?.page();
        match timeout(self.navigation_timeout, page.goto(url)).await {
            Ok(Ok(_)) => {
                debug!("页面导航成功");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("导航到 {} 失败: {}", url, e);
                Err(AppError::navigation_failed(url, e))
            }
            Err(_) => {
                error!("导航到 {} 超时", url);
                Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: self.navigation_timeout.as_millis() as u64,
                }
                .into())
            }
        }
    }
}

#[async_trait]
impl DomQuery for ChromiumSession {
    async fn wait_for_selector(&self, selector: &str, wait: Duration) -> ControlLookup {
        let executor = match self.executor() {
            Ok(executor) => executor,
            Err(e) => return ControlLookup::TransientError(e.to_string()),
        };
        let script = format!(
            "document.querySelector({}) !== null",
            js_string_literal(selector)
        );
        let deadline = Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let probe = executor.eval_as::<bool>(script.as_str());
            match timeout(remaining + SELECTOR_POLL_INTERVAL, probe).await {
                Ok(Ok(true)) => return ControlLookup::Found,
                Ok(Ok(false)) => {}
                Ok(Err(e)) => return ControlLookup::TransientError(e.to_string()),
                Err(_) => return ControlLookup::NotFound,
            }
            if remaining.is_zero() {
                return ControlLookup::NotFound;
            }
            sleep(SELECTOR_POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn click(&self, selector: &str) -> AppResult<()> {
        let element = self.executor()?.page().find_element(selector).await?;
        element.click().await?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, wait: Duration) -> AppResult<()> {
        let deadline = Instant::now() + wait;
        let mut last = self.resource_count().await?;
        let mut stable_since = Instant::now();

        while Instant::now() < deadline {
            sleep(NETWORK_POLL_INTERVAL).await;
            let count = self.resource_count().await?;
            if count != last {
                last = count;
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= NETWORK_QUIET_WINDOW {
                return Ok(());
            }
        }
        debug!("等待网络空闲超时 ({:?})", wait);
        Ok(())
    }

    async fn content(&self) -> AppResult<String> {
        Ok(self.executor()?.page().content().await?)
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn close(self: Box<Self>) -> AppResult<()> {
        let mut session = self;
        if let Some(task) = session.interception_task.take() {
            task.abort();
        }
        session.executor = None;

        if let Err(e) = session.browser.close().await {
            warn!("关闭浏览器失败: {}", e);
            return Err(e.into());
        }
        if let Err(e) = session.browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        debug!("浏览器已关闭");
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(task) = self.interception_task.take() {
            task.abort();
        }
        self.handler_task.abort();
    }
}
