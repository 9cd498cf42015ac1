//! 文档合成服务 - 业务能力层
//!
//! 两种输出：
//! - 分页：每张图片一页的 PDF，页面尺寸等于图片尺寸（1px = 1pt）
//! - 拼图：全部图片自上而下拼接成一张 PNG
//!
//! 全部在内存中完成，不落盘。

use std::io::Cursor;

use image::{imageops, ImageFormat, Rgb, RgbImage};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use tracing::{debug, info};

use crate::error::{AppResult, AssemblyError};
use crate::models::{AssembledDocument, NormalizedImage, OutputMode, PageSize};

const IMAGE_NAME: Name<'static> = Name(b"Im0");

/// 文档合成器
///
/// 输入的图片已按序号排好，合成器不重新排序。
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentAssembler;

impl DocumentAssembler {
    pub fn new() -> Self {
        Self
    }

    /// 按指定模式合成
    pub fn assemble(
        &self,
        images: &[NormalizedImage],
        mode: OutputMode,
    ) -> AppResult<AssembledDocument> {
        if images.is_empty() {
            return Err(AssemblyError::Empty.into());
        }

        match mode {
            OutputMode::Paginated => self.paginate(images),
            OutputMode::VerticalComposite => self.stack_vertically(images),
        }
    }

    /// 每张图片一页
    ///
    /// JPEG 数据原样嵌入（DCTDecode），不再解码。
    pub fn paginate(&self, images: &[NormalizedImage]) -> AppResult<AssembledDocument> {
        if images.is_empty() {
            return Err(AssemblyError::Empty.into());
        }

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        // 每页占用三个对象：page、content、image
        let ids: Vec<(Ref, Ref, Ref)> = (0..images.len() as i32)
            .map(|i| {
                let base = 3 + i * 3;
                (Ref::new(base), Ref::new(base + 1), Ref::new(base + 2))
            })
            .collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id)
            .kids(ids.iter().map(|(page_id, _, _)| *page_id))
            .count(images.len() as i32);

        let mut pages = Vec::with_capacity(images.len());
        for (image, (page_id, content_id, image_id)) in images.iter().zip(ids) {
            let width = image.width as f32;
            let height = image.height as f32;

            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(0.0, 0.0, width, height));
            page.parent(page_tree_id);
            page.contents(content_id);
            page.resources().x_objects().pair(IMAGE_NAME, image_id);
            page.finish();

            let mut xobject = pdf.image_xobject(image_id, &image.bytes);
            xobject.filter(Filter::DctDecode);
            xobject.width(image.width as i32);
            xobject.height(image.height as i32);
            xobject.color_space().device_rgb();
            xobject.bits_per_component(8);
            xobject.finish();

            let mut content = Content::new();
            content.save_state();
            content.transform([width, 0.0, 0.0, height, 0.0, 0.0]);
            content.x_object(IMAGE_NAME);
            content.restore_state();
            pdf.stream(content_id, &content.finish());

            debug!(
                "📄 第 {} 页: {}x{}",
                image.sequence_index + 1,
                image.width,
                image.height
            );
            pages.push(PageSize {
                width: image.width,
                height: image.height,
            });
        }

        let bytes = pdf.finish();
        info!("✅ PDF 生成完成: {} 页, {} 字节", pages.len(), bytes.len());
        Ok(AssembledDocument::Paginated { bytes, pages })
    }

    /// 自上而下拼接
    ///
    /// 画布宽度取第一张图片的宽度；更宽的图片右侧被裁掉，
    /// 更窄的图片右侧留白。
    pub fn stack_vertically(&self, images: &[NormalizedImage]) -> AppResult<AssembledDocument> {
        let first = images.first().ok_or(AssemblyError::Empty)?;
        let width = first.width;
        let height: u32 = images.iter().map(|img| img.height).sum();

        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let mut top: i64 = 0;
        for image in images {
            let decoded = image::load_from_memory_with_format(&image.bytes, ImageFormat::Jpeg)
                .map_err(|source| AssemblyError::DecodeFailed {
                    sequence_index: image.sequence_index,
                    source,
                })?
                .to_rgb8();
            if decoded.width() != width {
                debug!(
                    "第 {} 张图片宽度 {} 与画布宽度 {} 不一致",
                    image.sequence_index + 1,
                    decoded.width(),
                    width
                );
            }
            imageops::overlay(&mut canvas, &decoded, 0, top);
            top += i64::from(decoded.height());
        }

        let mut bytes = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|source| AssemblyError::EncodeFailed { source })?;

        info!("✅ 拼图完成: {}x{}, {} 字节", width, height, bytes.len());
        Ok(AssembledDocument::Composite {
            bytes,
            width,
            height,
        })
    }
}
