use crate::fs::model::{DriveError, NodeId};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use uuid::Uuid;

pub mod files;
pub mod shared;
pub mod shares;

impl ResponseError for DriveError {
    fn status_code(&self) -> StatusCode {
        match self {
            DriveError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DriveError::NotFound(_) => StatusCode::NOT_FOUND,
            DriveError::Conflict(_) => StatusCode::CONFLICT,
            DriveError::Forbidden(_) => StatusCode::FORBIDDEN,
            DriveError::Unauthenticated
            | DriveError::PasswordRequired
            | DriveError::InvalidPassword => StatusCode::UNAUTHORIZED,
            DriveError::Storage(_) | DriveError::PurgeIncomplete(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // 内部细节只进日志，不回给客户端
            DriveError::Storage(detail) => {
                error!("存储层错误: {}", detail);
                HttpResponse::InternalServerError().json(json!({ "error": "服务器内部错误" }))
            }
            DriveError::PasswordRequired => HttpResponse::Unauthorized().json(json!({
                "error": self.to_string(),
                "requiresPassword": true
            })),
            DriveError::PurgeIncomplete(failures) => {
                HttpResponse::InternalServerError().json(json!({
                    "error": self.to_string(),
                    "failed": failures
                }))
            }
            other => HttpResponse::build(self.status_code())
                .json(json!({ "error": other.to_string() })),
        }
    }
}

/// 解析路径中的节点 id
pub(crate) fn parse_node_id(raw: &str) -> Result<NodeId, DriveError> {
    Uuid::parse_str(raw).map_err(|_| DriveError::InvalidArgument("无效的节点 ID".to_string()))
}

/// 解析父目录参数；空串、"null"、"root" 都表示根层级
pub(crate) fn parse_parent_param(raw: Option<&str>) -> Result<Option<NodeId>, DriveError> {
    match raw {
        None | Some("") | Some("null") | Some("root") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|_| DriveError::InvalidArgument("无效的父目录 ID".to_string())),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/files", web::get().to(files::list_files))
            .route("/files/upload-url", web::post().to(files::create_upload_url))
            .route("/files/{id}", web::get().to(files::get_node))
            .route("/files/{id}", web::delete().to(files::soft_delete))
            .route("/files/{id}/download", web::get().to(files::download))
            .route("/files/{id}/rename", web::put().to(files::rename))
            .route("/files/{id}/move", web::put().to(files::move_node))
            .route("/files/{id}/restore", web::post().to(files::restore))
            .route("/files/{id}/permanent", web::delete().to(files::purge))
            .route("/folders", web::post().to(files::create_folder))
            .route("/shares", web::post().to(shares::create_share))
            .route("/shares", web::get().to(shares::list_shares))
            .route("/shares/{id}", web::get().to(shares::get_share))
            .route("/shares/{id}", web::put().to(shares::update_share))
            .route("/shares/{id}", web::delete().to(shares::delete_share)),
    )
    .service(
        web::scope("/shared")
            .route("/{token}", web::get().to(shared::get_metadata))
            .route("/{token}/files", web::get().to(shared::list_files))
            .route("/{token}/download", web::get().to(shared::download))
            .route("/{token}/upload-url", web::post().to(shared::create_upload_url))
            .route("/{token}/folders", web::post().to(shared::create_folder)),
    );
}
