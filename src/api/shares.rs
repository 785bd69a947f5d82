use crate::api::parse_node_id;
use crate::auth::AuthOwner;
use crate::fs::model::{DriveError, ListQuery};
use crate::share::model::{AccessLevel, NewShare, PermissionsPatch, SharePermissions, ShareUpdate};
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::env;
use uuid::Uuid;

/// 区分“字段缺席”和“字段显式为 null”：缺席不改动，null 清除
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn share_url(token: &str) -> String {
    let base = env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    format!("{}/shared/{}", base, token)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    node_id: Option<String>,
    permissions: Option<PermissionsPatch>,
    access_level: Option<AccessLevel>,
    expires_at: Option<DateTime<Utc>>,
    password: Option<String>,
}

/// POST /api/shares
pub async fn create_share(
    owner: AuthOwner,
    body: web::Json<CreateShareRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let node_id = body
        .node_id
        .as_deref()
        .ok_or_else(|| DriveError::InvalidArgument("需要提供节点 ID".to_string()))?;
    let node_id = parse_node_id(node_id)?;

    let permissions = body
        .permissions
        .map(|p| p.apply(SharePermissions::default()))
        .unwrap_or_default();

    let share = state
        .shares
        .create(
            &owner.0,
            NewShare {
                node_id,
                permissions,
                access_level: body.access_level.unwrap_or(AccessLevel::Unlisted),
                expires_at: body.expires_at,
                password: body.password.clone(),
            },
        )
        .await?;

    let url = share_url(&share.token);
    Ok(HttpResponse::Created().json(json!({ "share": share, "shareUrl": url })))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

/// GET /api/shares — 当前用户创建的分享
pub async fn list_shares(
    owner: AuthOwner,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let list_query = ListQuery::new(query.page, query.limit, None);
    let page = state.shares.list(&owner.0, list_query).await?;
    Ok(HttpResponse::Ok().json(page))
}

fn parse_share_id(raw: &str) -> Result<Uuid, DriveError> {
    Uuid::parse_str(raw).map_err(|_| DriveError::InvalidArgument("无效的分享 ID".to_string()))
}

/// GET /api/shares/{id}
pub async fn get_share(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_share_id(&path)?;
    let share = state.shares.get(&owner.0, id).await?;
    Ok(HttpResponse::Ok().json(share))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShareRequest {
    permissions: Option<PermissionsPatch>,
    access_level: Option<AccessLevel>,
    #[serde(default, deserialize_with = "double_option")]
    expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    password: Option<Option<String>>,
}

/// PUT /api/shares/{id}
pub async fn update_share(
    owner: AuthOwner,
    path: web::Path<String>,
    body: web::Json<UpdateShareRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_share_id(&path)?;
    let body = body.into_inner();
    let share = state
        .shares
        .update(
            &owner.0,
            id,
            ShareUpdate {
                permissions: body.permissions,
                access_level: body.access_level,
                expires_at: body.expires_at,
                password: body.password,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(share))
}

/// DELETE /api/shares/{id}
pub async fn delete_share(
    owner: AuthOwner,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, DriveError> {
    let id = parse_share_id(&path)?;
    state.shares.delete(&owner.0, id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
