/// 章节页中的一张分镜引用
///
/// `sequence_index` 是 DOM 中的出现顺序，也是合成时唯一的排序依据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelReference {
    pub source_url: String,
    pub sequence_index: usize,
    pub alt_text: String,
}

/// 重新编码后的分镜
///
/// `bytes` 固定为 JPEG；宽高在规范化之后读取，而不是来自源图片。
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence_index: usize,
}
