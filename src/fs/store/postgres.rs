use crate::fs::model::{DriveError, FsNode, ListQuery, NodeId, NodeType, Page};
use crate::fs::store::NodeStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const NODE_COLUMNS: &str =
    "id, name, node_type, owner_id, parent_id, storage_key, size, mime_type, is_deleted, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct FsNodeRow {
    id: Uuid,
    name: String,
    node_type: String,
    owner_id: String,
    parent_id: Option<Uuid>,
    storage_key: Option<String>,
    size: i64,
    mime_type: Option<String>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FsNodeRow {
    fn into_node(self) -> Result<FsNode, DriveError> {
        Ok(FsNode {
            id: self.id,
            name: self.name,
            node_type: NodeType::from_db(&self.node_type)?,
            owner: self.owner_id,
            parent_id: self.parent_id,
            storage_key: self.storage_key,
            size: self.size,
            mime_type: self.mime_type,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// 唯一约束冲突（23505）映射为 Conflict，其余数据库错误一律包装为存储层错误
fn map_db_err(context: &str, e: sqlx::Error) -> DriveError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return DriveError::Conflict("同级目录下已存在同名条目".to_string());
        }
    }
    DriveError::Storage(format!("{}: {}", context, e))
}

#[derive(Clone)]
pub struct PostgresNodeStore {
    pool: PgPool,
}

impl PostgresNodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NodeStore for PostgresNodeStore {
    async fn insert(&self, node: &FsNode) -> Result<FsNode, DriveError> {
        let sql = format!(
            "INSERT INTO fs_nodes ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            NODE_COLUMNS, NODE_COLUMNS
        );
        let row: FsNodeRow = sqlx::query_as(&sql)
            .bind(node.id)
            .bind(&node.name)
            .bind(node.node_type.as_str())
            .bind(&node.owner)
            .bind(node.parent_id)
            .bind(&node.storage_key)
            .bind(node.size)
            .bind(&node.mime_type)
            .bind(node.is_deleted)
            .bind(node.created_at)
            .bind(node.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_err("插入节点失败", e))?;
        row.into_node()
    }

    async fn get_any(&self, id: NodeId) -> Result<Option<FsNode>, DriveError> {
        let sql = format!("SELECT {} FROM fs_nodes WHERE id = $1", NODE_COLUMNS);
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("查询节点失败", e))?;
        row.map(FsNodeRow::into_node).transpose()
    }

    async fn get_owned(&self, owner: &str, id: NodeId) -> Result<Option<FsNode>, DriveError> {
        let sql = format!(
            "SELECT {} FROM fs_nodes WHERE id = $1 AND owner_id = $2",
            NODE_COLUMNS
        );
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("查询节点失败", e))?;
        row.map(FsNodeRow::into_node).transpose()
    }

    async fn find_live_folder(
        &self,
        owner: &str,
        id: NodeId,
    ) -> Result<Option<FsNode>, DriveError> {
        let sql = format!(
            "SELECT {} FROM fs_nodes WHERE id = $1 AND owner_id = $2 AND node_type = 'folder' AND is_deleted = FALSE",
            NODE_COLUMNS
        );
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("查询文件夹失败", e))?;
        row.map(FsNodeRow::into_node).transpose()
    }

    async fn find_sibling(
        &self,
        owner: &str,
        parent_id: Option<NodeId>,
        node_type: NodeType,
        name: &str,
    ) -> Result<Option<FsNode>, DriveError> {
        let sql = format!(
            "SELECT {} FROM fs_nodes \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
             AND node_type = $3 AND name = $4 AND is_deleted = FALSE",
            NODE_COLUMNS
        );
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(owner)
            .bind(parent_id)
            .bind(node_type.as_str())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("查询同级节点失败", e))?;
        row.map(FsNodeRow::into_node).transpose()
    }

    async fn list_children(
        &self,
        owner: &str,
        parent_id: Option<NodeId>,
        query: &ListQuery,
    ) -> Result<Page<FsNode>, DriveError> {
        let pattern = query.search.as_ref().map(|s| format!("%{}%", s));

        let sql = format!(
            "SELECT {} FROM fs_nodes \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND is_deleted = FALSE \
             AND ($3::text IS NULL OR name ILIKE $3) \
             ORDER BY CASE WHEN node_type = 'folder' THEN 0 ELSE 1 END, name \
             LIMIT $4 OFFSET $5",
            NODE_COLUMNS
        );
        let rows: Vec<FsNodeRow> = sqlx::query_as(&sql)
            .bind(owner)
            .bind(parent_id)
            .bind(&pattern)
            .bind(query.limit)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("查询子节点失败", e))?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fs_nodes \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND is_deleted = FALSE \
             AND ($3::text IS NULL OR name ILIKE $3)",
        )
        .bind(owner)
        .bind(parent_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err("统计子节点失败", e))?;

        let items = rows
            .into_iter()
            .map(FsNodeRow::into_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, query, total))
    }

    async fn update_name<'a>(
        &self,
        id: NodeId,
        name: &str,
        storage_key: Option<&'a str>,
    ) -> Result<FsNode, DriveError> {
        let sql = format!(
            "UPDATE fs_nodes SET name = $2, storage_key = COALESCE($3, storage_key), updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            NODE_COLUMNS
        );
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(name)
            .bind(storage_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("重命名节点失败", e))?;
        match row {
            Some(r) => r.into_node(),
            None => Err(DriveError::NotFound(format!("节点不存在: {}", id))),
        }
    }

    async fn update_parent<'a>(
        &self,
        id: NodeId,
        parent_id: Option<NodeId>,
        storage_key: Option<&'a str>,
    ) -> Result<FsNode, DriveError> {
        let sql = format!(
            "UPDATE fs_nodes SET parent_id = $2, storage_key = COALESCE($3, storage_key), updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            NODE_COLUMNS
        );
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(parent_id)
            .bind(storage_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("移动节点失败", e))?;
        match row {
            Some(r) => r.into_node(),
            None => Err(DriveError::NotFound(format!("节点不存在: {}", id))),
        }
    }

    async fn set_deleted(&self, id: NodeId, deleted: bool) -> Result<FsNode, DriveError> {
        let sql = format!(
            "UPDATE fs_nodes SET is_deleted = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            NODE_COLUMNS
        );
        let row: Option<FsNodeRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(deleted)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_err("更新删除标记失败", e))?;
        match row {
            Some(r) => r.into_node(),
            None => Err(DriveError::NotFound(format!("节点不存在: {}", id))),
        }
    }

    async fn mark_children_deleted(
        &self,
        owner: &str,
        parent_id: NodeId,
        limit: i64,
    ) -> Result<Vec<FsNode>, DriveError> {
        let sql = format!(
            "UPDATE fs_nodes SET is_deleted = TRUE, updated_at = NOW() \
             WHERE id IN (SELECT id FROM fs_nodes \
                          WHERE owner_id = $1 AND parent_id = $2 AND is_deleted = FALSE \
                          LIMIT $3) \
             RETURNING {}",
            NODE_COLUMNS
        );
        let rows: Vec<FsNodeRow> = sqlx::query_as(&sql)
            .bind(owner)
            .bind(parent_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("级联删除子节点失败", e))?;
        rows.into_iter().map(FsNodeRow::into_node).collect()
    }

    async fn children(
        &self,
        owner: &str,
        parent_id: NodeId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FsNode>, DriveError> {
        let sql = format!(
            "SELECT {} FROM fs_nodes WHERE owner_id = $1 AND parent_id = $2 \
             ORDER BY id LIMIT $3 OFFSET $4",
            NODE_COLUMNS
        );
        let rows: Vec<FsNodeRow> = sqlx::query_as(&sql)
            .bind(owner)
            .bind(parent_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_err("遍历子节点失败", e))?;
        rows.into_iter().map(FsNodeRow::into_node).collect()
    }

    async fn has_deleted_children(
        &self,
        owner: &str,
        parent_id: NodeId,
    ) -> Result<bool, DriveError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM fs_nodes \
             WHERE owner_id = $1 AND parent_id = $2 AND is_deleted = TRUE)",
        )
        .bind(owner)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err("查询已删除子节点失败", e))?;
        Ok(exists)
    }

    async fn remove(&self, id: NodeId) -> Result<(), DriveError> {
        sqlx::query("DELETE FROM fs_nodes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err("删除节点记录失败", e))?;
        Ok(())
    }

    async fn remove_if_empty(&self, id: NodeId) -> Result<bool, DriveError> {
        let result = sqlx::query(
            "DELETE FROM fs_nodes WHERE id = $1 \
             AND NOT EXISTS (SELECT 1 FROM fs_nodes WHERE parent_id = $1)",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err("删除文件夹记录失败", e))?;
        Ok(result.rows_affected() > 0)
    }
}
