use crate::fs::model::DriveError;
use log::{error, info};
use sqlx::PgPool;

pub struct DbInitializer {
    pool: PgPool,
}

impl DbInitializer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化节点表
    pub async fn init_node_tables(&self) -> Result<(), DriveError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fs_nodes (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL CHECK (name <> '' AND position('/' in name) = 0),
                node_type VARCHAR NOT NULL CHECK (node_type IN ('file', 'folder')),
                owner_id VARCHAR NOT NULL,
                parent_id UUID REFERENCES fs_nodes(id),
                storage_key TEXT UNIQUE,
                size BIGINT NOT NULL DEFAULT 0,
                mime_type VARCHAR,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DriveError::Storage(format!("创建节点表失败: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_fs_nodes_owner_parent
            ON fs_nodes(owner_id, parent_id, is_deleted)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DriveError::Storage(format!("创建节点索引失败: {}", e)))?;

        // 同级同名同类型在未删除行上的唯一约束，并发创建/改名的最终裁决者。
        // parent_id 为 NULL 的根层级行用零 UUID 参与比较。
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS uq_fs_nodes_sibling
            ON fs_nodes (
                owner_id,
                COALESCE(parent_id, '00000000-0000-0000-0000-000000000000'::uuid),
                node_type,
                name
            )
            WHERE is_deleted = FALSE
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DriveError::Storage(format!("创建同级唯一索引失败: {}", e)))?;

        Ok(())
    }

    /// 初始化分享表
    pub async fn init_share_tables(&self) -> Result<(), DriveError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS share_links (
                id UUID PRIMARY KEY,
                node_id UUID NOT NULL REFERENCES fs_nodes(id) ON DELETE CASCADE,
                token VARCHAR UNIQUE NOT NULL,
                can_view BOOLEAN NOT NULL DEFAULT TRUE,
                can_edit BOOLEAN NOT NULL DEFAULT FALSE,
                can_share BOOLEAN NOT NULL DEFAULT FALSE,
                access_level VARCHAR NOT NULL DEFAULT 'unlisted'
                    CHECK (access_level IN ('public', 'unlisted', 'private')),
                expires_at TIMESTAMPTZ,
                password_hash VARCHAR,
                created_by VARCHAR NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DriveError::Storage(format!("创建分享表失败: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_share_links_created_by ON share_links(created_by)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DriveError::Storage(format!("创建分享索引失败: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_share_links_expires_at ON share_links(expires_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DriveError::Storage(format!("创建过期索引失败: {}", e)))?;

        Ok(())
    }
}

/// 初始化所有数据库表
pub async fn initialize_db(pool: PgPool) -> Result<(), DriveError> {
    info!("开始初始化数据库...");
    let initializer = DbInitializer::new(pool);

    initializer.init_node_tables().await.map_err(|e| {
        error!("节点表初始化失败: {:?}", e);
        e
    })?;

    initializer.init_share_tables().await.map_err(|e| {
        error!("分享表初始化失败: {:?}", e);
        e
    })?;

    info!("数据库初始化完成");
    Ok(())
}
