//! 流水线控制器 - 编排层
//!
//! ## 职责
//!
//! 把会话、分页、提取、下载、合成串成三个对外操作：
//!
//! - `list_catalog` - 展开并抓取整个目录
//! - `fetch_and_assemble_chapter` - 抓取一个章节并生成 PDF
//! - `fetch_composite_panels` - 抓取一个页面的分镜并拼成一张 PNG
//!
//! ## 资源规则
//!
//! 每个操作独占一个会话，无论成功失败都会在返回前关闭；
//! 关闭失败只记日志，不覆盖操作本身的结果。

use std::sync::Arc;

use regex::Regex;
use scraper::Selector;
use tracing::{error, info, warn};
use url::Url;

use crate::browser::{
    AllowAll, BlockList, ChromiumLauncher, ControlLookup, PageSession, RequestFilter,
    SessionLauncher, SessionOptions,
};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{
    AssembledDocument, ChapterArtifact, ListingRecord, OutputMode, PanelReference,
};
use crate::services::{
    extract_panels, parse_selector, DocumentAssembler, HttpImageSource, ImageSource,
    PaginationDriver, PanelFetcher, RecordExtractor,
};

/// 拼图模式的固定文件名
pub const COMPOSITE_FILENAME: &str = "merged-panels.png";

/// 流水线控制器
///
/// 只持有配置和各项能力，不持有浏览器；浏览器在每次操作时按需启动。
pub struct Pipeline {
    config: Config,
    launcher: Arc<dyn SessionLauncher>,
    extractor: RecordExtractor,
    panel_selector: Selector,
    fetcher: PanelFetcher,
    assembler: DocumentAssembler,
    driver: PaginationDriver,
}

impl Pipeline {
    /// 用给定的会话启动器和图片来源构建流水线
    pub fn new(
        config: Config,
        launcher: Arc<dyn SessionLauncher>,
        images: Arc<dyn ImageSource>,
    ) -> AppResult<Self> {
        let extractor = RecordExtractor::new(&config.selectors)?;
        let panel_selector = parse_selector(&config.selectors.panel)?;
        let fetcher = PanelFetcher::new(images, &config);
        let driver = PaginationDriver::new(&config);

        Ok(Self {
            config,
            launcher,
            extractor,
            panel_selector,
            fetcher,
            assembler: DocumentAssembler::new(),
            driver,
        })
    }

    /// 使用 Chromium 和 HTTP 图片来源构建流水线
    pub fn from_config(config: Config) -> AppResult<Self> {
        let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
        let images = Arc::new(HttpImageSource::new(&config)?);
        Self::new(config, launcher, images)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 抓取完整目录
    ///
    /// 先把"加载更多"点到底，再对最终 DOM 做一次提取。
    /// 没有任何记录时返回空列表，不视为错误。
    pub async fn list_catalog(&self) -> AppResult<Vec<ListingRecord>> {
        let url = self.config.catalog_url.as_str();
        info!("📚 开始抓取目录: {}", url);

        let options = self
            .session_options(Arc::new(BlockList::new(self.config.blocked_resources.clone())));
        let session = self.launcher.open(options).await?;
        let result = self.collect_catalog(session.as_ref(), url).await;
        close_session(session).await;

        match &result {
            Ok(records) => info!("✅ 目录抓取完成: {} 条记录", records.len()),
            Err(e) => error!("❌ 目录抓取失败: {}", e),
        }
        result
    }

    async fn collect_catalog(
        &self,
        session: &dyn PageSession,
        url: &str,
    ) -> AppResult<Vec<ListingRecord>> {
        session.navigate(url).await?;

        let lookup = session
            .wait_for_selector(
                &self.config.selectors.container,
                self.config.timeouts.navigation(),
            )
            .await;
        if lookup != ControlLookup::Found {
            warn!("⚠️ 未等到目录容器出现，继续处理: {:?}", lookup);
        }

        let outcome = self.driver.run(session).await;
        info!(
            "📊 分页结束: {} 次点击, 原因 {:?}",
            outcome.clicks, outcome.reason
        );

        let html = session.content().await?;
        let base_url = Url::parse(url).ok();
        Ok(self.extractor.extract(&html, base_url.as_ref()))
    }

    /// 抓取一个章节并生成分页 PDF
    pub async fn fetch_and_assemble_chapter(&self, chapter_url: &str) -> AppResult<ChapterArtifact> {
        info!("📖 开始处理章节: {}", chapter_url);
        let (filename, chapter_number) = chapter_filename(chapter_url);

        let document = self
            .fetch_panels_as(chapter_url, OutputMode::Paginated)
            .await?;

        info!("✅ 章节处理完成: {} ({} 页)", filename, document.page_count());
        Ok(ChapterArtifact {
            document,
            filename,
            chapter_number,
        })
    }

    /// 抓取一个页面的分镜并纵向拼接
    pub async fn fetch_composite_panels(&self, page_url: &str) -> AppResult<ChapterArtifact> {
        info!("🧩 开始拼接分镜: {}", page_url);
        let document = self
            .fetch_panels_as(page_url, OutputMode::VerticalComposite)
            .await?;

        Ok(ChapterArtifact {
            document,
            filename: COMPOSITE_FILENAME.to_string(),
            chapter_number: chapter_filename(page_url).1,
        })
    }

    async fn fetch_panels_as(
        &self,
        page_url: &str,
        mode: OutputMode,
    ) -> AppResult<AssembledDocument> {
        let session = self
            .launcher
            .open(self.session_options(Arc::new(AllowAll)))
            .await?;
        let result = self.collect_and_assemble(session.as_ref(), page_url, mode).await;
        close_session(session).await;

        if let Err(e) = &result {
            error!("❌ 处理页面失败 ({}): {}", page_url, e);
        }
        result
    }

    async fn collect_and_assemble(
        &self,
        session: &dyn PageSession,
        page_url: &str,
        mode: OutputMode,
    ) -> AppResult<AssembledDocument> {
        let panels = self.collect_panels(session, page_url).await?;
        let images = self.fetcher.fetch(page_url, &panels).await?;
        self.assembler.assemble(&images, mode)
    }

    async fn collect_panels(
        &self,
        session: &dyn PageSession,
        page_url: &str,
    ) -> AppResult<Vec<PanelReference>> {
        session.navigate(page_url).await?;

        let lookup = session
            .wait_for_selector(&self.config.selectors.panel, self.config.timeouts.panel_wait())
            .await;
        if lookup != ControlLookup::Found {
            warn!("⚠️ 未等到分镜图片出现，继续处理: {:?}", lookup);
        }

        let html = session.content().await?;
        let base_url = Url::parse(page_url).ok();
        let panels = extract_panels(&html, &self.panel_selector, base_url.as_ref());
        info!("🖼️ 找到 {} 张分镜", panels.len());
        Ok(panels)
    }

    fn session_options(&self, filter: Arc<dyn RequestFilter>) -> SessionOptions {
        SessionOptions::new(self.config.timeouts.navigation(), filter)
            .with_user_agent(self.config.browser.user_agent.clone())
    }
}

/// 关闭会话，失败只记录日志
async fn close_session(session: Box<dyn PageSession>) {
    if let Err(e) = session.close().await {
        warn!("⚠️ 关闭浏览器会话失败: {}", e);
    }
}

/// 根据章节 URL 生成文件名
///
/// URL 中含 `chapter-<数字>` 时取该数字，否则使用 `unknown`。
/// 返回 (文件名, 章节号)。
pub fn chapter_filename(url: &str) -> (String, Option<String>) {
    let number = match Regex::new(r"chapter-(\d+)") {
        Ok(re) => re
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
        Err(_) => None,
    };

    let filename = format!("chapter_{}.pdf", number.as_deref().unwrap_or("unknown"));
    (filename, number)
}
