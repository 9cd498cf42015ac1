//! 响应信封
//!
//! 成功的 JSON 响应带 `success: true`；失败统一为
//! `{ success: false, error, kind }`，调用方错误是 400，其余是 500。

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::{ChapterArtifact, ListingRecord};

/// 目录接口的响应体
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ListingRecord>,
}

impl CatalogResponse {
    pub fn new(data: Vec<ListingRecord>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// 接口层错误，包装 [`AppError`]
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = json!({
            "success": false,
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        (status, Json(body)).into_response()
    }
}

/// 以附件形式返回合成好的文档
pub fn attachment(artifact: ChapterArtifact) -> Response {
    let content_type = artifact.document.content_type();
    let disposition = format!("attachment; filename=\"{}\"", artifact.filename);

    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.document.into_bytes(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusinessError;

    #[test]
    fn test_missing_parameter_maps_to_bad_request() {
        let err = ApiError(AppError::Business(BusinessError::MissingParameter {
            name: "chapterUrl".to_string(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_core_failure_maps_to_server_error() {
        let err = ApiError(AppError::no_panels("https://x/chapter-1"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_catalog_response_counts_records() {
        let response = CatalogResponse::new(vec![]);
        assert!(response.success);
        assert_eq!(response.count, 0);
    }
}
