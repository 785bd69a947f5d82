use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type NodeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Folder => "folder",
        }
    }

    pub fn from_db(value: &str) -> Result<Self, DriveError> {
        match value {
            "file" => Ok(NodeType::File),
            "folder" => Ok(NodeType::Folder),
            other => Err(DriveError::Storage(format!("未知的节点类型: {}", other))),
        }
    }

    /// 面向用户提示语的类型名
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::File => "文件",
            NodeType::Folder => "文件夹",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FsNode {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub owner: String,
    pub parent_id: Option<NodeId>,
    pub storage_key: Option<String>,
    pub size: i64,
    pub mime_type: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FsNode {
    /// 新建文件夹节点（文件夹没有存储键和 MIME 类型）
    pub fn new_folder(name: &str, owner: &str, parent_id: Option<NodeId>) -> Self {
        let now = Utc::now();
        FsNode {
            id: Uuid::new_v4(),
            name: name.to_string(),
            node_type: NodeType::Folder,
            owner: owner.to_string(),
            parent_id,
            storage_key: None,
            size: 0,
            mime_type: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// 新建文件节点，存储键由调用方推导
    pub fn new_file(
        name: &str,
        owner: &str,
        parent_id: Option<NodeId>,
        storage_key: String,
        size: i64,
        mime_type: String,
    ) -> Self {
        let now = Utc::now();
        FsNode {
            id: Uuid::new_v4(),
            name: name.to_string(),
            node_type: NodeType::File,
            owner: owner.to_string(),
            parent_id,
            storage_key: Some(storage_key),
            size,
            mime_type: Some(mime_type),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 校验节点名称：非空且不含路径分隔符
pub fn validate_name(name: &str) -> Result<(), DriveError> {
    if name.is_empty() {
        return Err(DriveError::InvalidArgument("名称不能为空".to_string()));
    }
    if name.contains('/') {
        return Err(DriveError::InvalidArgument(
            "名称不能包含 \"/\"".to_string(),
        ));
    }
    Ok(())
}

/// 分页查询参数
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn new(page: Option<i64>, limit: Option<i64>, search: Option<String>) -> Self {
        ListQuery {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            search: search.filter(|s| !s.is_empty()),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery::new(None, None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, query: &ListQuery, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + query.limit - 1) / query.limit
        };
        Page {
            items,
            current_page: query.page,
            total_pages,
            total_items,
        }
    }
}

/// restore 的结果：节点本身，以及是否还有未恢复的已删除子项
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreOutcome {
    pub node: FsNode,
    pub has_deleted_children: bool,
}

/// purge 过程中单个条目的失败记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeFailure {
    pub id: NodeId,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("参数错误: {0}")]
    InvalidArgument(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("名称冲突: {0}")]
    Conflict(String),

    #[error("没有权限: {0}")]
    Forbidden(String),

    #[error("未提供有效的身份凭证")]
    Unauthenticated,

    #[error("需要访问密码")]
    PasswordRequired,

    #[error("访问密码错误")]
    InvalidPassword,

    #[error("存储层错误: {0}")]
    Storage(String),

    #[error("彻底删除未完成，{} 个条目失败", .0.len())]
    PurgeIncomplete(Vec<PurgeFailure>),
}

// 路径反查时父链的最大深度，超过即判定父链损坏并拒绝操作
pub const MAX_PATH_DEPTH: usize = 128;

// 级联操作每批处理的子节点数量
pub const CASCADE_BATCH: i64 = 256;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
