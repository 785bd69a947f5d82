use crate::fs::model::{DriveError, FsNode, ListQuery, NodeId, NodeType, Page};
use crate::share::require_edit;
use crate::AppState;
use actix_web::{web, HttpResponse};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SharedAccessQuery {
    password: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

/// 分享目标是文件夹时就在其下操作；是文件时落到它的父目录
fn shared_target(node: &FsNode) -> Result<NodeId, DriveError> {
    match node.node_type {
        NodeType::Folder => Ok(node.id),
        NodeType::File => node.parent_id.ok_or_else(|| {
            DriveError::InvalidArgument("无法在该位置执行此操作".to_string())
        }),
    }
}

/// GET /shared/{token} — 共享资源的元数据
pub async fn get_metadata(
    path: web::Path<String>,
    query: web::Query<SharedAccessQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let (share, node) = state
        .shares
        .validate_token(&path, query.password.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "id": node.id,
        "name": node.name,
        "type": node.node_type,
        "size": node.size,
        "mimeType": node.mime_type,
        "createdAt": node.created_at,
        "updatedAt": node.updated_at,
        "permissions": share.permissions,
        "accessLevel": share.access_level,
        "hasPassword": share.has_password()
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SharedListing {
    parent_name: String,
    parent_id: NodeId,
    #[serde(flatten)]
    page: Page<FsNode>,
}

/// GET /shared/{token}/files — 浏览共享文件夹。
/// 列表以节点属主为作用域，访问者只能沿子树向下浏览。
pub async fn list_files(
    path: web::Path<String>,
    query: web::Query<SharedAccessQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let (_share, node) = state
        .shares
        .validate_token(&path, query.password.as_deref())
        .await?;

    if node.node_type != NodeType::Folder {
        return Err(DriveError::InvalidArgument(
            "共享资源不是文件夹".to_string(),
        ));
    }

    let list_query = ListQuery::new(query.page, query.limit, None);
    let page = state
        .fs
        .list(&node.owner, Some(node.id), list_query)
        .await?;

    Ok(HttpResponse::Ok().json(SharedListing {
        parent_name: node.name.clone(),
        parent_id: node.id,
        page,
    }))
}

/// GET /shared/{token}/download
pub async fn download(
    path: web::Path<String>,
    query: web::Query<SharedAccessQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let (share, node) = state
        .shares
        .validate_token(&path, query.password.as_deref())
        .await?;

    if !share.permissions.can_view {
        return Err(DriveError::Forbidden(
            "没有查看该文件的权限".to_string(),
        ));
    }
    if node.node_type != NodeType::File {
        return Err(DriveError::InvalidArgument(
            "共享资源不是文件".to_string(),
        ));
    }

    let download_url = state
        .storage
        .get_presigned(node.storage_key.as_deref().unwrap_or(""), &node.name)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "downloadUrl": download_url })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedUploadRequest {
    filename: Option<String>,
    mime_type: Option<String>,
    size: Option<i64>,
    password: Option<String>,
}

/// POST /shared/{token}/upload-url — 通过分享链接上传。
/// 新建的节点归原属主所有，存储键也以属主 id 开头，访问者身份不参与。
pub async fn create_upload_url(
    path: web::Path<String>,
    query: web::Query<SharedAccessQuery>,
    body: web::Json<SharedUploadRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let password = body.password.as_deref().or(query.password.as_deref());
    let (share, node) = state.shares.validate_token(&path, password).await?;
    require_edit(&share)?;

    let filename = body
        .filename
        .as_deref()
        .ok_or_else(|| DriveError::InvalidArgument("需要提供文件名".to_string()))?;
    let size = body
        .size
        .ok_or_else(|| DriveError::InvalidArgument("需要提供文件大小".to_string()))?;
    let target = shared_target(&node)?;

    let file = state
        .fs
        .create_file(&node.owner, filename, body.mime_type.clone(), size, Some(target))
        .await?;

    let upload_url = state
        .storage
        .put_presigned(
            file.storage_key.as_deref().unwrap_or(""),
            file.mime_type.as_deref().unwrap_or("application/octet-stream"),
        )
        .await?;

    info!("分享上传: {} -> 节点 {} (属主 {})", file.name, target, node.owner);
    Ok(HttpResponse::Created().json(json!({ "file": file, "uploadUrl": upload_url })))
}

#[derive(Debug, Deserialize)]
pub struct SharedFolderRequest {
    name: Option<String>,
    password: Option<String>,
}

/// POST /shared/{token}/folders — 在共享位置创建文件夹，同样归原属主
pub async fn create_folder(
    path: web::Path<String>,
    query: web::Query<SharedAccessQuery>,
    body: web::Json<SharedFolderRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let password = body.password.as_deref().or(query.password.as_deref());
    let (share, node) = state.shares.validate_token(&path, password).await?;
    require_edit(&share)?;

    let name = body
        .name
        .as_deref()
        .ok_or_else(|| DriveError::InvalidArgument("需要提供文件夹名称".to_string()))?;
    let target = shared_target(&node)?;

    let folder = state
        .fs
        .create_folder(&node.owner, name, Some(target))
        .await?;
    Ok(HttpResponse::Created().json(folder))
}
