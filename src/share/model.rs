use crate::fs::model::{DriveError, FsNode, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 分发意图的标注。Private 搭配密码才是强制保密的情形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Unlisted,
    Private,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Unlisted => "unlisted",
            AccessLevel::Private => "private",
        }
    }

    pub fn from_db(value: &str) -> Result<Self, DriveError> {
        match value {
            "public" => Ok(AccessLevel::Public),
            "unlisted" => Ok(AccessLevel::Unlisted),
            "private" => Ok(AccessLevel::Private),
            other => Err(DriveError::Storage(format!("未知的访问级别: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePermissions {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_share: bool,
}

impl Default for SharePermissions {
    /// 默认只读
    fn default() -> Self {
        SharePermissions {
            can_view: true,
            can_edit: false,
            can_share: false,
        }
    }
}

/// 权限的部分更新，未提供的位保持原值
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsPatch {
    pub can_view: Option<bool>,
    pub can_edit: Option<bool>,
    pub can_share: Option<bool>,
}

impl PermissionsPatch {
    pub fn apply(&self, base: SharePermissions) -> SharePermissions {
        SharePermissions {
            can_view: self.can_view.unwrap_or(base.can_view),
            can_edit: self.can_edit.unwrap_or(base.can_edit),
            can_share: self.can_share.unwrap_or(base.can_share),
        }
    }
}

/// 绑定到单个节点的分享令牌。对外只暴露 token，从不暴露内部节点 id 之外的信息。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub id: Uuid,
    pub node_id: NodeId,
    pub token: String,
    pub permissions: SharePermissions,
    pub access_level: AccessLevel,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn new(
        node_id: NodeId,
        created_by: &str,
        permissions: SharePermissions,
        access_level: AccessLevel,
        expires_at: Option<DateTime<Utc>>,
        password_hash: Option<String>,
    ) -> Self {
        let now = Utc::now();
        ShareLink {
            id: Uuid::new_v4(),
            node_id,
            token: Uuid::new_v4().to_string(),
            permissions,
            access_level,
            expires_at,
            password_hash,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// 创建分享的入参
#[derive(Debug, Clone)]
pub struct NewShare {
    pub node_id: NodeId,
    pub permissions: SharePermissions,
    pub access_level: AccessLevel,
    pub expires_at: Option<DateTime<Utc>>,
    pub password: Option<String>,
}

/// 更新分享的入参。外层 None 表示不改动，内层 None 表示清除。
#[derive(Debug, Clone, Default)]
pub struct ShareUpdate {
    pub permissions: Option<PermissionsPatch>,
    pub access_level: Option<AccessLevel>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub password: Option<Option<String>>,
}

/// 分享及其绑定节点（读取时显式按 id 取出，不依赖隐式关联）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareWithNode {
    #[serde(flatten)]
    pub share: ShareLink,
    pub node: Option<FsNode>,
}
