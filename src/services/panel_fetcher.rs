//! 分镜下载服务 - 业务能力层
//!
//! 严格串行地下载每张分镜，两次请求之间固定间隔，
//! 每张图片都重新编码为 JPEG（即使源图本来就是 JPEG）。
//! 任意一张失败即整体失败，已下载的部分直接丢弃。

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, FetchError};
use crate::models::{NormalizedImage, PanelReference};

/// 图片来源能力
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// 下载分镜原始字节；`referer` 为所在章节页
    async fn fetch(&self, panel: &PanelReference, referer: Option<&str>) -> AppResult<Vec<u8>>;
}

/// 基于 reqwest 的图片来源
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeouts.panel_fetch())
            .user_agent(config.browser.user_agent.as_str())
            .build()
            .map_err(|source| ConfigError::HttpClient { source })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, panel: &PanelReference, referer: Option<&str>) -> AppResult<Vec<u8>> {
        let index = panel.sequence_index;
        let url = panel.source_url.as_str();

        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(reqwest::header::REFERER, referer);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::panel_request_failed(index, url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                index,
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::panel_request_failed(index, url, e))?;
        Ok(bytes.to_vec())
    }
}

/// 分镜下载服务
///
/// 职责：
/// - 按序号顺序逐张下载
/// - 规范化为统一格式
/// - 不负责合成
pub struct PanelFetcher {
    source: Arc<dyn ImageSource>,
    delay: Duration,
    jpeg_quality: u8,
}

impl PanelFetcher {
    pub fn new(source: Arc<dyn ImageSource>, config: &Config) -> Self {
        Self {
            source,
            delay: config.timeouts.panel_delay(),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// 下载并规范化所有分镜
    ///
    /// # 参数
    /// - `page_url`: 章节页 URL（作为 Referer，也用于错误信息）
    /// - `panels`: 按 DOM 顺序排列的分镜引用
    pub async fn fetch(
        &self,
        page_url: &str,
        panels: &[PanelReference],
    ) -> AppResult<Vec<NormalizedImage>> {
        if panels.is_empty() {
            error!("❌ 页面中未找到任何分镜: {}", page_url);
            return Err(AppError::no_panels(page_url));
        }

        let total = panels.len();
        let mut images = Vec::with_capacity(total);

        for (position, panel) in panels.iter().enumerate() {
            if position > 0 && !self.delay.is_zero() {
                sleep(self.delay).await;
            }

            debug!("处理分镜 {}/{}: {}", position + 1, total, panel.source_url);
            let raw = self
                .source
                .fetch(panel, Some(page_url))
                .await
                .inspect_err(|e| error!("❌ 下载第 {} 张分镜失败: {}", position + 1, e))?;

            let image = normalize(&raw, panel, self.jpeg_quality)
                .inspect_err(|e| error!("❌ 处理第 {} 张分镜失败: {}", position + 1, e))?;
            debug!(
                "✅ 分镜 {} 规范化完成: {}x{}",
                position + 1,
                image.width,
                image.height
            );
            images.push(image);
        }

        info!("✅ 共下载 {} 张分镜", images.len());
        Ok(images)
    }
}

/// 把任意受支持格式的图片重新编码为 JPEG
///
/// 透明像素先铺到白底上；宽高从编码后的结果读取。
pub fn normalize(raw: &[u8], panel: &PanelReference, quality: u8) -> AppResult<NormalizedImage> {
    let index = panel.sequence_index;
    let decoded = image::load_from_memory(raw).map_err(|source| FetchError::DecodeFailed {
        index,
        url: panel.source_url.clone(),
        source,
    })?;

    let rgb = flatten_on_white(&decoded);
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|source| FetchError::EncodeFailed { index, source })?;

    let (width, height) = ImageReader::with_format(Cursor::new(&bytes), ImageFormat::Jpeg)
        .into_dimensions()
        .map_err(|source| FetchError::EncodeFailed { index, source })?;

    Ok(NormalizedImage {
        bytes,
        width,
        height,
        sequence_index: index,
    })
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = u32::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            ((u32::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn panel(index: usize, url: &str) -> PanelReference {
        PanelReference {
            source_url: url.to_string(),
            sequence_index: index,
            alt_text: "Panel".to_string(),
        }
    }

    struct MapSource {
        images: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageSource for MapSource {
        async fn fetch(&self, panel: &PanelReference, _referer: Option<&str>) -> AppResult<Vec<u8>> {
            self.requested.lock().unwrap().push(panel.source_url.clone());
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

    fn fetcher(images: HashMap<String, Vec<u8>>) -> (PanelFetcher, Arc<MapSource>) {
        let source = Arc::new(MapSource {
            images,
            requested: Mutex::new(Vec::new()),
        });
        let mut config = Config::default();
        config.timeouts.panel_delay_ms = 0;
        (PanelFetcher::new(source.clone(), &config), source)
    }

    #[test]
    fn test_normalize_reencodes_to_jpeg_and_reads_dimensions() {
        let raw = png_bytes(40, 25, Rgba([10, 20, 30, 255]));
        let image = normalize(&raw, &panel(3, "u"), 100).unwrap();
        assert_eq!((image.width, image.height), (40, 25));
        assert_eq!(image.sequence_index, 3);
        assert_eq!(image::guess_format(&image.bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_normalize_flattens_transparency_on_white() {
        let raw = png_bytes(8, 8, Rgba([0, 0, 0, 0]));
        let image = normalize(&raw, &panel(0, "u"), 100).unwrap();
        let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgb8();
        let pixel = decoded.get_pixel(4, 4);
        assert!(pixel[0] > 240 && pixel[1] > 240 && pixel[2] > 240);
    }

    #[test]
    fn test_normalize_rejects_corrupt_bytes() {
        let err = normalize(b"not an image", &panel(1, "https://x/1.jpg"), 100).unwrap_err();
        assert_eq!(err.kind(), "panel_decode");
    }

    #[tokio::test]
    async fn test_empty_panel_list_is_no_panels_error() {
        let (fetcher, _) = fetcher(HashMap::new());
        let err = fetcher.fetch("https://x/chapter-1", &[]).await.unwrap_err();
        assert_eq!(err.kind(), "no_panels");
    }

    #[tokio::test]
    async fn test_fetches_in_sequence_order() {
        let mut images = HashMap::new();
        images.insert("a".to_string(), png_bytes(10, 30, Rgba([255, 0, 0, 255])));
        images.insert("b".to_string(), png_bytes(10, 20, Rgba([0, 255, 0, 255])));
        let (fetcher, source) = fetcher(images);

        let result = fetcher
            .fetch("https://x/chapter-1", &[panel(0, "a"), panel(1, "b")])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].height, 30);
        assert_eq!(result[1].height, 20);
        assert_eq!(result[1].sequence_index, 1);
        assert_eq!(*source.requested.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_single_failure_aborts_remaining_fetches() {
        let mut images = HashMap::new();
        images.insert("a".to_string(), png_bytes(10, 10, Rgba([0, 0, 0, 255])));
        images.insert("c".to_string(), png_bytes(10, 10, Rgba([0, 0, 0, 255])));
        let (fetcher, source) = fetcher(images);

        let result = fetcher
            .fetch(
                "https://x/chapter-2",
                &[panel(0, "a"), panel(1, "missing"), panel(2, "c")],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), "panel_fetch");
        assert_eq!(*source.requested.lock().unwrap(), vec!["a", "missing"]);
    }
}
