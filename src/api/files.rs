use crate::api::{parse_node_id, parse_parent_param};
use crate::auth::AuthOwner;
use crate::fs::model::{DriveError, FsNode, ListQuery, NodeType};
use crate::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    page: Option<i64>,
    limit: Option<i64>,
    parent_id: Option<String>,
    search: Option<String>,
}

/// GET /api/files — 列出某层目录的内容
pub async fn list_files(
    owner: AuthOwner,
    query: web::Query<ListFilesQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let parent_id = parse_parent_param(query.parent_id.as_deref())?;
    let list_query = ListQuery::new(query.page, query.limit, query.search.clone());
    let page = state.fs.list(&owner.0, parent_id, list_query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/files/{id}
pub async fn get_node(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    let node = state.fs.get(&owner.0, id).await?;
    Ok(HttpResponse::Ok().json(node))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    name: Option<String>,
    parent_id: Option<String>,
}

/// POST /api/folders
pub async fn create_folder(
    owner: AuthOwner,
    body: web::Json<CreateFolderRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let name = body
        .name
        .as_deref()
        .ok_or_else(|| DriveError::InvalidArgument("需要提供文件夹名称".to_string()))?;
    let parent_id = parse_parent_param(body.parent_id.as_deref())?;

    let folder = state.fs.create_folder(&owner.0, name, parent_id).await?;
    Ok(HttpResponse::Created().json(folder))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    filename: Option<String>,
    mime_type: Option<String>,
    size: Option<i64>,
    parent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    pub file: FsNode,
    pub upload_url: String,
}

/// POST /api/files/upload-url — 登记文件元数据并签发上传 URL
pub async fn create_upload_url(
    owner: AuthOwner,
    body: web::Json<UploadUrlRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let filename = body
        .filename
        .as_deref()
        .ok_or_else(|| DriveError::InvalidArgument("需要提供文件名".to_string()))?;
    let size = body
        .size
        .ok_or_else(|| DriveError::InvalidArgument("需要提供文件大小".to_string()))?;
    let parent_id = parse_parent_param(body.parent_id.as_deref())?;

    let file = state
        .fs
        .create_file(&owner.0, filename, body.mime_type.clone(), size, parent_id)
        .await?;

    let upload_url = state
        .storage
        .put_presigned(
            file.storage_key.as_deref().unwrap_or(""),
            file.mime_type.as_deref().unwrap_or("application/octet-stream"),
        )
        .await?;

    info!("登记上传: {} ({})", file.name, file.id);
    Ok(HttpResponse::Created().json(UploadUrlResponse { file, upload_url }))
}

/// GET /api/files/{id}/download — 签发下载 URL
pub async fn download(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    let node = state.fs.get(&owner.0, id).await?;

    if node.node_type != NodeType::File {
        return Err(DriveError::InvalidArgument(
            "只有文件可以下载".to_string(),
        ));
    }

    let download_url = state
        .storage
        .get_presigned(node.storage_key.as_deref().unwrap_or(""), &node.name)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "downloadUrl": download_url })))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    name: Option<String>,
}

/// PUT /api/files/{id}/rename
pub async fn rename(
    owner: AuthOwner,
    path: web::Path<String>,
    body: web::Json<RenameRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    let name = body
        .name
        .as_deref()
        .ok_or_else(|| DriveError::InvalidArgument("需要提供新名称".to_string()))?;
    let node = state.fs.rename(&owner.0, id, name).await?;
    Ok(HttpResponse::Ok().json(node))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    destination_folder_id: Option<String>,
}

/// PUT /api/files/{id}/move
pub async fn move_node(
    owner: AuthOwner,
    path: web::Path<String>,
    body: web::Json<MoveRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    let dest = parse_parent_param(body.destination_folder_id.as_deref())?;
    let node = state.fs.move_node(&owner.0, id, dest).await?;
    Ok(HttpResponse::Ok().json(node))
}

/// DELETE /api/files/{id} — 软删除，文件夹级联
pub async fn soft_delete(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    let node = state.fs.soft_delete(&owner.0, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "node": node })))
}

/// POST /api/files/{id}/restore
pub async fn restore(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    let outcome = state.fs.restore(&owner.0, id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "node": outcome.node,
        "hasDeletedChildren": outcome.has_deleted_children
    })))
}

/// DELETE /api/files/{id}/permanent — 彻底删除元数据与存储对象
pub async fn purge(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_node_id(&path)?;
    state.fs.purge(&owner.0, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
