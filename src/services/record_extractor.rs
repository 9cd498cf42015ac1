//! 记录提取 - 业务能力层
//!
//! 对一份 DOM 快照做纯函数式解析：不发请求、不改变顺序，
//! 同一份快照两次提取的结果完全相同。

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::config::SelectorConfig;
use crate::error::{AppResult, ConfigError};
use crate::models::{ListingRecord, PanelReference};

/// 目录记录的声明式选择器
#[derive(Debug, Clone)]
pub struct SelectorSet {
    container: Selector,
    anchor: Selector,
    title: Selector,
    status: Selector,
    image: Selector,
    chapters: Selector,
}

impl SelectorSet {
    /// 编译选择器，任一选择器无效即为配置错误
    pub fn compile(config: &SelectorConfig) -> AppResult<Self> {
        Ok(Self {
            container: parse_selector(&config.container)?,
            anchor: parse_selector("a")?,
            title: parse_selector(&config.title)?,
            status: parse_selector(&config.status)?,
            image: parse_selector(&config.image)?,
            chapters: parse_selector(&config.chapters)?,
        })
    }
}

pub fn parse_selector(selector: &str) -> AppResult<Selector> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// 记录提取器
pub struct RecordExtractor {
    selectors: SelectorSet,
}

impl RecordExtractor {
    pub fn new(config: &SelectorConfig) -> AppResult<Self> {
        Ok(Self {
            selectors: SelectorSet::compile(config)?,
        })
    }

    /// 提取目录记录
    ///
    /// 只看第一个容器；容器不存在时返回空列表。
    /// `base_url` 用于把相对链接转成绝对链接。
    pub fn extract(&self, html: &str, base_url: Option<&Url>) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        let Some(container) = document.select(&self.selectors.container).next() else {
            debug!("未找到目录容器");
            return Vec::new();
        };

        let records: Vec<ListingRecord> = container
            .select(&self.selectors.anchor)
            .filter_map(|anchor| self.record_from_anchor(anchor, base_url))
            .collect();

        debug!("📚 提取到 {} 条记录", records.len());
        records
    }

    fn record_from_anchor(
        &self,
        anchor: ElementRef<'_>,
        base_url: Option<&Url>,
    ) -> Option<ListingRecord> {
        let href = anchor
            .value()
            .attr("href")
            .map(|raw| resolve_url(raw, base_url))
            .unwrap_or_default();

        let title = first_text(anchor, &self.selectors.title)
            .or_else(|| {
                anchor
                    .value()
                    .attr("title")
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| element_text(anchor));

        if href.is_empty() || title.is_empty() {
            return None;
        }

        let status =
            first_text(anchor, &self.selectors.status).unwrap_or_else(|| "Unknown".to_string());

        let image_url = anchor
            .select(&self.selectors.image)
            .next()
            .and_then(image_source)
            .map(|src| resolve_url(src, base_url));

        let chapters = first_text(anchor, &self.selectors.chapters)
            .map(|text| leading_number(&text))
            .unwrap_or(0);

        Some(ListingRecord {
            href,
            title,
            status,
            image_url,
            chapters,
        })
    }
}

/// 提取章节页中的分镜引用，顺序即 DOM 顺序
///
/// 优先读 `src`，为空或为 `data:` 占位图时退回 `data-src`；
/// 两者都没有的图片被跳过，序号保持连续。
pub fn extract_panels(
    html: &str,
    panel_selector: &Selector,
    base_url: Option<&Url>,
) -> Vec<PanelReference> {
    let document = Html::parse_document(html);
    document
        .select(panel_selector)
        .filter_map(|img| {
            let src = image_source(img)?;
            let alt = img
                .value()
                .attr("alt")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or("Panel")
                .to_string();
            Some((resolve_url(src, base_url), alt))
        })
        .enumerate()
        .map(|(sequence_index, (source_url, alt_text))| PanelReference {
            source_url,
            sequence_index,
            alt_text,
        })
        .collect()
}

fn image_source<'a>(img: ElementRef<'a>) -> Option<&'a str> {
    let element = img.value();
    element
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .or_else(|| {
            element
                .attr("data-src")
                .map(str::trim)
                .filter(|src| !src.is_empty())
        })
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// 元素的文本内容，去掉首尾空白并把连续空白压成一个空格
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_url(raw: &str, base_url: Option<&Url>) -> String {
    let raw = raw.trim();
    match base_url {
        Some(base) => base
            .join(raw)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}

/// 解析文本开头的数字，例如 "120 Chapters" → 120
fn leading_number(text: &str) -> u32 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}
