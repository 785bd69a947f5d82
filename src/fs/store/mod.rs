use crate::fs::model::{DriveError, FsNode, ListQuery, NodeId, NodeType, Page};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// 节点树的持久化层。所有查询都显式携带 owner，禁止任何全局状态。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// 插入节点；同级同名同类型的唯一约束冲突映射为 Conflict
    async fn insert(&self, node: &FsNode) -> Result<FsNode, DriveError>;

    /// 按 id 查询，不限 owner、含已删除（父链反查与分享解引用使用）
    async fn get_any(&self, id: NodeId) -> Result<Option<FsNode>, DriveError>;

    /// 按 owner + id 查询，含已删除
    async fn get_owned(&self, owner: &str, id: NodeId) -> Result<Option<FsNode>, DriveError>;

    /// 查询属于 owner 的未删除文件夹
    async fn find_live_folder(
        &self,
        owner: &str,
        id: NodeId,
    ) -> Result<Option<FsNode>, DriveError>;

    /// 查询同级下同名同类型的未删除节点
    async fn find_sibling(
        &self,
        owner: &str,
        parent_id: Option<NodeId>,
        node_type: NodeType,
        name: &str,
    ) -> Result<Option<FsNode>, DriveError>;

    /// 列出未删除子节点：文件夹在前、名称升序，支持名称过滤与分页
    async fn list_children(
        &self,
        owner: &str,
        parent_id: Option<NodeId>,
        query: &ListQuery,
    ) -> Result<Page<FsNode>, DriveError>;

    /// 更新名称，文件同时更新存储键
    async fn update_name<'a>(
        &self,
        id: NodeId,
        name: &str,
        storage_key: Option<&'a str>,
    ) -> Result<FsNode, DriveError>;

    /// 更新父节点，文件同时更新存储键
    async fn update_parent<'a>(
        &self,
        id: NodeId,
        parent_id: Option<NodeId>,
        storage_key: Option<&'a str>,
    ) -> Result<FsNode, DriveError>;

    /// 设置软删除标记
    async fn set_deleted(&self, id: NodeId, deleted: bool) -> Result<FsNode, DriveError>;

    /// 将一批未删除的直接子节点标记为已删除，返回被标记的节点
    async fn mark_children_deleted(
        &self,
        owner: &str,
        parent_id: NodeId,
        limit: i64,
    ) -> Result<Vec<FsNode>, DriveError>;

    /// 分页列出直接子节点（含已删除），purge 遍历使用
    async fn children(
        &self,
        owner: &str,
        parent_id: NodeId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FsNode>, DriveError>;

    /// 是否存在已删除的直接子节点
    async fn has_deleted_children(
        &self,
        owner: &str,
        parent_id: NodeId,
    ) -> Result<bool, DriveError>;

    /// 物理删除单个节点记录
    async fn remove(&self, id: NodeId) -> Result<(), DriveError>;

    /// 仅当没有任何子记录时物理删除文件夹记录，返回是否删除
    async fn remove_if_empty(&self, id: NodeId) -> Result<bool, DriveError>;
}

pub mod postgres;
