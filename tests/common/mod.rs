//! 集成测试共用的假实现：脚本化的浏览器会话和内存图片来源
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use panel_harvest::browser::{
    ControlLookup, DomQuery, Navigator, PageSession, ResourceClass, SessionLauncher,
    SessionOptions,
};
use panel_harvest::config::{Config, SelectorConfig};
use panel_harvest::error::{AppError, AppResult, BrowserError, FetchError};
use panel_harvest::models::PanelReference;
use panel_harvest::services::ImageSource;
use panel_harvest::Pipeline;

pub const LOAD_MORE: &str = "button.load-more";

/// 测试用配置：无等待、简短选择器
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.catalog_url = "https://comics.test/comics".to_string();
    config.timeouts.click_delay_ms = 0;
    config.timeouts.network_idle_ms = 0;
    config.timeouts.panel_delay_ms = 0;
    config.selectors = SelectorConfig {
        load_more: LOAD_MORE.to_string(),
        container: "div.grid".to_string(),
        title: "h1".to_string(),
        status: "div.status".to_string(),
        image: "img".to_string(),
        chapters: "span.chapters".to_string(),
        panel: "img.panel".to_string(),
    };
    config
}

/// 一个生成器可观察到的会话记录
#[derive(Default)]
pub struct SessionLog {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub clicks: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub blocked_images: Mutex<Vec<bool>>,
}

/// 脚本化的会话启动器
///
/// `stages[k]` 是点击 k 次"加载更多"之后的 DOM；
/// 点击次数达到 `stages.len() - 1` 后按钮消失。
#[derive(Clone)]
pub struct ScriptedLauncher {
    pub stages: Vec<String>,
    pub fail_navigation: bool,
    pub log: Arc<SessionLog>,
}

impl ScriptedLauncher {
    pub fn new(stages: Vec<String>) -> Self {
        Self {
            stages,
            fail_navigation: false,
            log: Arc::new(SessionLog::default()),
        }
    }

    pub fn single(html: &str) -> Self {
        Self::new(vec![html.to_string()])
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn open(&self, options: SessionOptions) -> AppResult<Box<dyn PageSession>> {
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        self.log.blocked_images.lock().unwrap().push(
            options.request_filter.decide(ResourceClass::Image)
                == panel_harvest::browser::FilterDecision::Block,
        );
        Ok(Box::new(ScriptedSession {
            stages: self.stages.clone(),
            fail_navigation: self.fail_navigation,
            clicks: AtomicUsize::new(0),
            log: self.log.clone(),
        }))
    }
}

pub struct ScriptedSession {
    stages: Vec<String>,
    fail_navigation: bool,
    clicks: AtomicUsize,
    log: Arc<SessionLog>,
}

#[async_trait]
impl Navigator for ScriptedSession {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        self.log.navigations.lock().unwrap().push(url.to_string());
        if self.fail_navigation {
            return Err(AppError::Browser(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: 15_000,
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl DomQuery for ScriptedSession {
    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> ControlLookup {
        if selector != LOAD_MORE {
            return ControlLookup::Found;
        }
        if self.clicks.load(Ordering::SeqCst) + 1 < self.stages.len() {
            ControlLookup::Found
        } else {
            ControlLookup::NotFound
        }
    }

    async fn click(&self, _selector: &str) -> AppResult<()> {
        self.clicks.fetch_add(1, Ordering::SeqCst);
        self.log.clicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> AppResult<()> {
        Ok(())
    }

    async fn content(&self) -> AppResult<String> {
        let stage = self
            .clicks
            .load(Ordering::SeqCst)
            .min(self.stages.len().saturating_sub(1));
        Ok(self.stages.get(stage).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn close(self: Box<Self>) -> AppResult<()> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 内存图片来源，URL 不存在时返回 404
#[derive(Default)]
pub struct MemoryImages {
    pub images: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<String>>,
}

impl MemoryImages {
    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ImageSource for MemoryImages {
    async fn fetch(&self, panel: &PanelReference, _referer: Option<&str>) -> AppResult<Vec<u8>> {
        self.requests.lock().unwrap().push(panel.source_url.clone());
        self.images.get(&panel.source_url).cloned().ok_or_else(|| {
            FetchError::BadStatus {
                index: panel.sequence_index,
                url: panel.source_url.clone(),
                status: 404,
            }
            .into()
        })
    }
}

/// 指定尺寸的纯色 PNG
pub fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// 只含分镜图片的章节页
pub fn chapter_page(urls: &[&str]) -> String {
    let images: String = urls
        .iter()
        .map(|url| format!(r#"<img class="panel" src="{}">"#, url))
        .collect();
    format!("<html><body><main>{}</main></body></html>", images)
}

/// 目录页：每个 (href, title) 一个卡片
pub fn catalog_page(entries: &[(&str, &str)]) -> String {
    let cards: String = entries
        .iter()
        .map(|(href, title)| {
            format!(
                r#"<a href="{}"><h1>{}</h1><div class="status">Ongoing</div></a>"#,
                href, title
            )
        })
        .collect();
    format!(r#"<html><body><div class="grid">{}</div></body></html>"#, cards)
}

pub fn pipeline(launcher: ScriptedLauncher, images: MemoryImages) -> (Pipeline, Arc<SessionLog>, Arc<MemoryImages>) {
    let log = launcher.log.clone();
    let images = Arc::new(images);
    let pipeline = Pipeline::new(test_config(), Arc::new(launcher), images.clone())
        .expect("测试配置应当有效");
    (pipeline, log, images)
}
