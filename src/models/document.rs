/// 输出模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// 每张图片一页的 PDF
    Paginated,
    /// 所有图片自上而下拼成一张 PNG
    VerticalComposite,
}

/// 单页尺寸（像素，1px = 1pt）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

/// 合成结果，始终是内存中的字节
#[derive(Debug, Clone)]
pub enum AssembledDocument {
    Paginated { bytes: Vec<u8>, pages: Vec<PageSize> },
    Composite { bytes: Vec<u8>, width: u32, height: u32 },
}

impl AssembledDocument {
    pub fn bytes(&self) -> &[u8] {
        match self {
            AssembledDocument::Paginated { bytes, .. } => bytes,
            AssembledDocument::Composite { bytes, .. } => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            AssembledDocument::Paginated { bytes, .. } => bytes,
            AssembledDocument::Composite { bytes, .. } => bytes,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AssembledDocument::Paginated { .. } => "application/pdf",
            AssembledDocument::Composite { .. } => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AssembledDocument::Paginated { .. } => "pdf",
            AssembledDocument::Composite { .. } => "png",
        }
    }

    /// 页数（拼图模式视为 1）
    pub fn page_count(&self) -> usize {
        match self {
            AssembledDocument::Paginated { pages, .. } => pages.len(),
            AssembledDocument::Composite { .. } => 1,
        }
    }
}

/// 编排层交给 HTTP 层的最终产物
#[derive(Debug, Clone)]
pub struct ChapterArtifact {
    pub document: AssembledDocument,
    pub filename: String,
    /// 从 URL 中解析出的章节号
    pub chapter_number: Option<String>,
}
