use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 目录中的一条作品记录
///
/// 由 RecordExtractor 按 DOM 顺序生成，创建后不再修改。
/// 提取器本身不去重，源页面重复的锚点会产生重复记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub href: String,
    pub title: String,
    /// 连载状态，页面未提供时为 "Unknown"
    pub status: String,
    pub image_url: Option<String>,
    /// 章节数，页面未提供或无法解析时为 0
    pub chapters: u32,
}

/// 按 `href` 去重，保留首次出现的顺序
pub fn dedup_by_href(records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.href.clone()))
        .collect()
}
