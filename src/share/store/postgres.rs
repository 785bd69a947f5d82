use crate::fs::model::{DriveError, ListQuery, Page};
use crate::share::model::{AccessLevel, ShareLink, SharePermissions};
use crate::share::store::ShareStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SHARE_COLUMNS: &str = "id, node_id, token, can_view, can_edit, can_share, access_level, \
                             expires_at, password_hash, created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ShareLinkRow {
    id: Uuid,
    node_id: Uuid,
    token: String,
    can_view: bool,
    can_edit: bool,
    can_share: bool,
    access_level: String,
    expires_at: Option<DateTime<Utc>>,
    password_hash: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShareLinkRow {
    fn into_share(self) -> Result<ShareLink, DriveError> {
        Ok(ShareLink {
            id: self.id,
            node_id: self.node_id,
            token: self.token,
            permissions: SharePermissions {
                can_view: self.can_view,
                can_edit: self.can_edit,
                can_share: self.can_share,
            },
            access_level: AccessLevel::from_db(&self.access_level)?,
            expires_at: self.expires_at,
            password_hash: self.password_hash,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn map_db_err(context: &str, e: sqlx::Error) -> DriveError {
    DriveError::Storage(format!("{}: {}", context, e))
}

#[derive(Clone)]
pub struct PostgresShareStore {
    pool: PgPool,
}

impl PostgresShareStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for PostgresShareStore {
    async fn insert(&self, share: &ShareLink) -> Result<ShareLink, DriveError> {
        let sql = format!(
            "INSERT INTO share_links ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
            SHARE_COLUMNS, SHARE_COLUMNS
        );
        let row: ShareLinkRow = sqlx::query_as(&sql)
            .bind(share.id)
            .bind(share.node_id)
            .bind(&share.token)
            .bind(share.permissions.can_view)
            .bind(share.permissions.can_edit)
            .bind(share.permissions.can_share)
            .bind(share.access_level.as_str())
            .bind(share.expires_at)
            .bind(&share.password_hash)
            .bind(&share.created_by)
            .bind(share.created_at)
            .bind(share.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_err("创建分享失败", e))?;
        row.into_share()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, DriveError> {
        let sql = format!(
            "SELECT {} FROM share_links WHERE token = $1",
            SHARE_COLUMNS
        );
        let row: Option<ShareLinkRow> = sqlx::query_as(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("查询分享失败", e))?;
        row.map(ShareLinkRow::into_share).transpose()
    }

    async fn find_by_id(&self, creator: &str, id: Uuid) -> Result<Option<ShareLink>, DriveError> {
        let sql = format!(
            "SELECT {} FROM share_links WHERE id = $1 AND created_by = $2",
            SHARE_COLUMNS
        );
        let row: Option<ShareLinkRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(creator)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("查询分享失败", e))?;
        row.map(ShareLinkRow::into_share).transpose()
    }

    async fn list_by_creator(
        &self,
        creator: &str,
        query: &ListQuery,
    ) -> Result<Page<ShareLink>, DriveError> {
        let sql = format!(
            "SELECT {} FROM share_links WHERE created_by = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            SHARE_COLUMNS
        );
        let rows: Vec<ShareLinkRow> = sqlx::query_as(&sql)
            .bind(creator)
            .bind(query.limit)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("查询分享列表失败", e))?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM share_links WHERE created_by = $1")
                .bind(creator)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_db_err("统计分享失败", e))?;

        let items = rows
            .into_iter()
            .map(ShareLinkRow::into_share)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, query, total))
    }

    async fn update(&self, share: &ShareLink) -> Result<ShareLink, DriveError> {
        let sql = format!(
            "UPDATE share_links SET can_view = $2, can_edit = $3, can_share = $4, \
             access_level = $5, expires_at = $6, password_hash = $7, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            SHARE_COLUMNS
        );
        let row: Option<ShareLinkRow> = sqlx::query_as(&sql)
            .bind(share.id)
            .bind(share.permissions.can_view)
            .bind(share.permissions.can_edit)
            .bind(share.permissions.can_share)
            .bind(share.access_level.as_str())
            .bind(share.expires_at)
            .bind(&share.password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("更新分享失败", e))?;
        match row {
            Some(r) => r.into_share(),
            None => Err(DriveError::NotFound(format!("分享不存在: {}", share.id))),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<(), DriveError> {
        sqlx::query("DELETE FROM share_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("删除分享失败", e))?;
        Ok(())
    }
}
