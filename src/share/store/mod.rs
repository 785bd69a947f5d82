use crate::fs::model::{DriveError, ListQuery, Page};
use crate::share::model::ShareLink;
use async_trait::async_trait;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

/// 分享记录的持久化层，全部按创建者或 token 定位
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn insert(&self, share: &ShareLink) -> Result<ShareLink, DriveError>;

    /// 按外部 token 查找
    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, DriveError>;

    /// 按创建者 + id 查找
    async fn find_by_id(&self, creator: &str, id: Uuid) -> Result<Option<ShareLink>, DriveError>;

    /// 创建者的分享列表，新建在前
    async fn list_by_creator(
        &self,
        creator: &str,
        query: &ListQuery,
    ) -> Result<Page<ShareLink>, DriveError>;

    async fn update(&self, share: &ShareLink) -> Result<ShareLink, DriveError>;

    async fn remove(&self, id: Uuid) -> Result<(), DriveError>;
}

pub mod postgres;
