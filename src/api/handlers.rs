//! 路由处理函数
//!
//! 参数校验在这里完成，缺少参数时直接返回 400，不会启动浏览器。

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::response::{attachment, ApiError, CatalogResponse};
use super::AppState;
use crate::error::{AppError, BusinessError};

/// `POST /chapter` 请求体
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRequest {
    pub chapter_url: Option<String>,
}

/// `GET /panels` 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PanelsQuery {
    pub url: Option<String>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

pub async fn catalog(State(pipeline): State<AppState>) -> Result<Json<CatalogResponse>, ApiError> {
    info!("📡 收到目录请求");
    let records = pipeline.list_catalog().await?;
    Ok(Json(CatalogResponse::new(records)))
}

pub async fn chapter(
    State(pipeline): State<AppState>,
    body: Option<Json<ChapterRequest>>,
) -> Result<Response, ApiError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let chapter_url = required(request.chapter_url, "chapterUrl")?;

    info!("📡 收到章节下载请求: {}", chapter_url);
    let artifact = pipeline.fetch_and_assemble_chapter(&chapter_url).await?;
    Ok(attachment(artifact))
}

pub async fn panels(
    State(pipeline): State<AppState>,
    Query(query): Query<PanelsQuery>,
) -> Result<Response, ApiError> {
    let url = required(query.url, "url")?;

    info!("📡 收到分镜拼图请求: {}", url);
    let artifact = pipeline.fetch_composite_panels(&url).await?;
    Ok(attachment(artifact))
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Route not found" })),
    )
        .into_response()
}

/// 取出非空参数，否则返回调用方错误
fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::Business(BusinessError::MissingParameter {
                name: name.to_string(),
            })
            .into()
        })
}
