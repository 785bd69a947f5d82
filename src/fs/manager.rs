use crate::fs::model::{
    validate_name, DriveError, FsNode, ListQuery, NodeId, NodeType, Page, PurgeFailure,
    RestoreOutcome, CASCADE_BATCH, MAX_PATH_DEPTH,
};
use crate::fs::path;
use crate::fs::store::NodeStore;
use crate::storage::key::{derive_key, unique_variant};
use crate::storage::ObjectStorage;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;

// 创建文件时冲突避让的最大重试次数
const CREATE_RETRIES: usize = 3;

pub struct FsManager<B: NodeStore> {
    backend: B,
    storage: Arc<dyn ObjectStorage>,
}

impl<B: NodeStore> FsManager<B> {
    pub fn new(backend: B, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { backend, storage }
    }

    /// 取属于 owner 的节点，含已删除；不存在即 NotFound
    async fn require_owned(&self, owner: &str, id: NodeId) -> Result<FsNode, DriveError> {
        self.backend
            .get_owned(owner, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("文件或文件夹不存在".to_string()))
    }

    /// 取属于 owner 的未删除节点
    async fn require_live(&self, owner: &str, id: NodeId) -> Result<FsNode, DriveError> {
        let node = self.require_owned(owner, id).await?;
        if node.is_deleted {
            return Err(DriveError::NotFound("文件或文件夹不存在".to_string()));
        }
        Ok(node)
    }

    /// 校验父目录：必须是 owner 的未删除文件夹
    async fn require_parent(
        &self,
        owner: &str,
        parent_id: Option<NodeId>,
    ) -> Result<Option<FsNode>, DriveError> {
        match parent_id {
            None => Ok(None),
            Some(id) => match self.backend.find_live_folder(owner, id).await? {
                Some(folder) => Ok(Some(folder)),
                None => Err(DriveError::NotFound("父文件夹不存在".to_string())),
            },
        }
    }

    /// 列出目录内容
    pub async fn list(
        &self,
        owner: &str,
        parent_id: Option<NodeId>,
        query: ListQuery,
    ) -> Result<Page<FsNode>, DriveError> {
        debug!("列出目录内容: owner={}, parent={:?}", owner, parent_id);
        self.backend.list_children(owner, parent_id, &query).await
    }

    /// 查询单个节点
    pub async fn get(&self, owner: &str, id: NodeId) -> Result<FsNode, DriveError> {
        self.require_live(owner, id).await
    }

    /// 创建文件夹；同级同名文件夹冲突
    pub async fn create_folder(
        &self,
        owner: &str,
        name: &str,
        parent_id: Option<NodeId>,
    ) -> Result<FsNode, DriveError> {
        let name = name.trim();
        validate_name(name)?;
        info!("创建文件夹: {} (owner={})", name, owner);

        self.require_parent(owner, parent_id).await?;

        // 先查一次给出友好错误，真正的兜底是存储层的唯一约束
        if self
            .backend
            .find_sibling(owner, parent_id, NodeType::Folder, name)
            .await?
            .is_some()
        {
            return Err(DriveError::Conflict("同名文件夹已存在".to_string()));
        }

        let node = FsNode::new_folder(name, owner, parent_id);
        let created = self.backend.insert(&node).await?;
        info!("文件夹创建成功: {} ({})", created.name, created.id);
        Ok(created)
    }

    /// 创建文件节点。同名冲突时自动换名而不是报错，保证上传不被阻断。
    pub async fn create_file(
        &self,
        owner: &str,
        filename: &str,
        mime_type: Option<String>,
        size: i64,
        parent_id: Option<NodeId>,
    ) -> Result<FsNode, DriveError> {
        let filename = filename.trim();
        validate_name(filename)?;
        if size < 0 {
            return Err(DriveError::InvalidArgument("文件大小无效".to_string()));
        }
        info!("创建文件: {} (owner={}, size={})", filename, owner, size);

        self.require_parent(owner, parent_id).await?;

        // 客户端没报 MIME 类型时按文件名推断
        let mime = mime_type.filter(|m| !m.is_empty()).unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string()
        });

        let parent_path = path::parent_path(&self.backend, parent_id).await?;

        let mut final_name = if self
            .backend
            .find_sibling(owner, parent_id, NodeType::File, filename)
            .await?
            .is_some()
        {
            let variant = unique_variant(filename);
            debug!("文件名冲突，自动换名: {} -> {}", filename, variant);
            variant
        } else {
            filename.to_string()
        };

        // 并发创建撞上唯一约束时重新生成后缀再试
        for attempt in 1..=CREATE_RETRIES {
            let storage_key = derive_key(owner, &final_name, &parent_path);
            let node = FsNode::new_file(
                &final_name,
                owner,
                parent_id,
                storage_key,
                size,
                mime.clone(),
            );
            match self.backend.insert(&node).await {
                Ok(created) => {
                    info!("文件创建成功: {} ({})", created.name, created.id);
                    return Ok(created);
                }
                Err(DriveError::Conflict(_)) if attempt < CREATE_RETRIES => {
                    final_name = unique_variant(filename);
                    debug!("插入冲突，重试换名: {}", final_name);
                }
                Err(e) => return Err(e),
            }
        }
        Err(DriveError::Conflict("无法生成不冲突的文件名".to_string()))
    }

    /// 重命名；文件同时按新名字重算存储键（对象本身不搬移）
    pub async fn rename(
        &self,
        owner: &str,
        id: NodeId,
        new_name: &str,
    ) -> Result<FsNode, DriveError> {
        let new_name = new_name.trim();
        validate_name(new_name)?;
        let node = self.require_live(owner, id).await?;
        info!("重命名: {} -> {} ({})", node.name, new_name, id);

        if let Some(sibling) = self
            .backend
            .find_sibling(owner, node.parent_id, node.node_type, new_name)
            .await?
        {
            if sibling.id != node.id {
                return Err(DriveError::Conflict(format!(
                    "该位置已存在同名{}",
                    node.node_type.label()
                )));
            }
        }

        let storage_key = match node.node_type {
            NodeType::File => {
                let parent_path = path::parent_path(&self.backend, node.parent_id).await?;
                Some(derive_key(owner, new_name, &parent_path))
            }
            NodeType::Folder => None,
        };

        self.backend
            .update_name(id, new_name, storage_key.as_deref())
            .await
    }

    /// 移动到目标文件夹（None 为根层级）
    pub async fn move_node(
        &self,
        owner: &str,
        id: NodeId,
        dest_parent_id: Option<NodeId>,
    ) -> Result<FsNode, DriveError> {
        let node = self.require_live(owner, id).await?;

        // 目标与当前父相同时直接返回
        if node.parent_id == dest_parent_id {
            debug!("移动目标与当前位置相同，忽略: {}", id);
            return Ok(node);
        }
        info!("移动节点: {} -> {:?}", id, dest_parent_id);

        if let Some(dest_id) = dest_parent_id {
            if dest_id == node.id {
                return Err(DriveError::Forbidden(
                    "不能把节点移动到它自身".to_string(),
                ));
            }
            let dest = self
                .backend
                .find_live_folder(owner, dest_id)
                .await?
                .ok_or_else(|| DriveError::NotFound("目标文件夹不存在".to_string()))?;

            // 沿目标的祖先链向上找被移动节点，命中即成环
            if node.node_type == NodeType::Folder {
                let mut current = dest.parent_id;
                let mut depth = 0usize;
                while let Some(ancestor_id) = current {
                    if ancestor_id == node.id {
                        return Err(DriveError::Forbidden(
                            "不能把文件夹移动到它自己的子目录".to_string(),
                        ));
                    }
                    depth += 1;
                    if depth > MAX_PATH_DEPTH {
                        return Err(DriveError::Storage(format!(
                            "父链深度超过 {}，目标文件夹的父链可能已损坏",
                            MAX_PATH_DEPTH
                        )));
                    }
                    current = match self.backend.get_any(ancestor_id).await? {
                        Some(ancestor) => ancestor.parent_id,
                        None => None,
                    };
                }
            }
        }

        if self
            .backend
            .find_sibling(owner, dest_parent_id, node.node_type, &node.name)
            .await?
            .is_some()
        {
            return Err(DriveError::Conflict(format!(
                "目标位置已存在同名{}",
                node.node_type.label()
            )));
        }

        // 只更新元数据里的存储键，字节不搬移
        let storage_key = match node.node_type {
            NodeType::File => {
                let parent_path = path::parent_path(&self.backend, dest_parent_id).await?;
                Some(derive_key(owner, &node.name, &parent_path))
            }
            NodeType::Folder => None,
        };

        self.backend
            .update_parent(id, dest_parent_id, storage_key.as_deref())
            .await
    }

    /// 软删除；文件夹按工作队列逐批下沉到所有后代
    pub async fn soft_delete(&self, owner: &str, id: NodeId) -> Result<FsNode, DriveError> {
        let node = self.require_owned(owner, id).await?;
        info!("软删除: {} ({})", node.name, id);

        let deleted = self.backend.set_deleted(id, true).await?;

        if node.node_type == NodeType::Folder {
            let mut queue = VecDeque::from([id]);
            while let Some(folder_id) = queue.pop_front() {
                loop {
                    let batch = self
                        .backend
                        .mark_children_deleted(owner, folder_id, CASCADE_BATCH)
                        .await?;
                    let count = batch.len() as i64;
                    for child in batch {
                        if child.node_type == NodeType::Folder {
                            queue.push_back(child.id);
                        }
                    }
                    if count < CASCADE_BATCH {
                        break;
                    }
                }
            }
        }

        Ok(deleted)
    }

    /// 恢复软删除的节点。不会级联恢复后代，只报告是否还有已删除后代。
    pub async fn restore(&self, owner: &str, id: NodeId) -> Result<RestoreOutcome, DriveError> {
        let node = self.require_owned(owner, id).await?;
        if !node.is_deleted {
            return Err(DriveError::InvalidArgument(
                "文件或文件夹未被删除".to_string(),
            ));
        }

        // 父目录还在回收站里时不允许恢复
        if let Some(parent_id) = node.parent_id {
            if let Some(parent) = self.backend.get_any(parent_id).await? {
                if parent.is_deleted {
                    return Err(DriveError::InvalidArgument(
                        "父文件夹已被删除，无法恢复".to_string(),
                    ));
                }
            }
        }

        info!("恢复节点: {} ({})", node.name, id);
        let restored = self.backend.set_deleted(id, false).await?;

        let has_deleted_children = match node.node_type {
            NodeType::Folder => self.backend.has_deleted_children(owner, id).await?,
            NodeType::File => false,
        };

        Ok(RestoreOutcome {
            node: restored,
            has_deleted_children,
        })
    }

    /// 彻底删除：先删存储对象、后删元数据。单条失败不中断其余条目，
    /// 失败条目的元数据保留原样，汇总上报后可重试。
    pub async fn purge(&self, owner: &str, id: NodeId) -> Result<(), DriveError> {
        let node = self.require_owned(owner, id).await?;
        info!("彻底删除: {} ({})", node.name, id);

        // 先按广度优先收集整棵子树，再逆序处理保证先子后父
        let mut subtree: Vec<FsNode> = Vec::new();
        let mut queue = VecDeque::new();
        if node.node_type == NodeType::Folder {
            queue.push_back(id);
        }
        while let Some(folder_id) = queue.pop_front() {
            let mut offset = 0i64;
            loop {
                let batch = self
                    .backend
                    .children(owner, folder_id, CASCADE_BATCH, offset)
                    .await?;
                let count = batch.len() as i64;
                offset += count;
                for child in &batch {
                    if child.node_type == NodeType::Folder {
                        queue.push_back(child.id);
                    }
                }
                subtree.extend(batch);
                if count < CASCADE_BATCH {
                    break;
                }
            }
        }

        let mut failures = Vec::new();
        for child in subtree.iter().rev() {
            self.purge_one(child, &mut failures).await;
        }
        self.purge_one(&node, &mut failures).await;

        if failures.is_empty() {
            info!("彻底删除完成: {}", id);
            Ok(())
        } else {
            warn!("彻底删除部分失败: {} ({} 个条目)", id, failures.len());
            Err(DriveError::PurgeIncomplete(failures))
        }
    }

    async fn purge_one(&self, node: &FsNode, failures: &mut Vec<PurgeFailure>) {
        match node.node_type {
            NodeType::File => {
                if let Some(key) = &node.storage_key {
                    if let Err(e) = self.storage.delete(key).await {
                        warn!("删除存储对象失败: {} ({})", key, e);
                        failures.push(PurgeFailure {
                            id: node.id,
                            name: node.name.clone(),
                            reason: e.to_string(),
                        });
                        return;
                    }
                }
                if let Err(e) = self.backend.remove(node.id).await {
                    failures.push(PurgeFailure {
                        id: node.id,
                        name: node.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            NodeType::Folder => match self.backend.remove_if_empty(node.id).await {
                Ok(true) => {}
                Ok(false) => failures.push(PurgeFailure {
                    id: node.id,
                    name: node.name.clone(),
                    reason: "文件夹尚有残留条目".to_string(),
                }),
                Err(e) => failures.push(PurgeFailure {
                    id: node.id,
                    name: node.name.clone(),
                    reason: e.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::store::MockNodeStore;
    use crate::storage::object_store::MockObjectStorage;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use uuid::Uuid;

    const OWNER: &str = "u1";

    fn folder(name: &str, parent_id: Option<NodeId>) -> FsNode {
        FsNode::new_folder(name, OWNER, parent_id)
    }

    fn file(name: &str, parent_id: Option<NodeId>, key: &str) -> FsNode {
        FsNode::new_file(name, OWNER, parent_id, key.to_string(), 10, "text/plain".to_string())
    }

    fn manager(store: MockNodeStore, storage: MockObjectStorage) -> FsManager<MockNodeStore> {
        FsManager::new(store, Arc::new(storage))
    }

    #[tokio::test]
    async fn create_folder_rejects_duplicate_name() {
        let mut store = MockNodeStore::new();
        let existing = folder("Docs", None);
        store
            .expect_find_sibling()
            .returning(move |_, _, _, _| Ok(Some(existing.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.create_folder(OWNER, "Docs", None).await;
        assert!(matches!(result, Err(DriveError::Conflict(_))));
    }

    #[tokio::test]
    async fn create_folder_rejects_missing_parent() {
        let mut store = MockNodeStore::new();
        store.expect_find_live_folder().returning(|_, _| Ok(None));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.create_folder(OWNER, "Docs", Some(Uuid::new_v4())).await;
        assert!(matches!(result, Err(DriveError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_folder_rejects_bad_names() {
        let mgr = manager(MockNodeStore::new(), MockObjectStorage::new());
        assert!(matches!(
            mgr.create_folder(OWNER, "  ", None).await,
            Err(DriveError::InvalidArgument(_))
        ));
        assert!(matches!(
            mgr.create_folder(OWNER, "a/b", None).await,
            Err(DriveError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn create_file_derives_key_under_parent_path() {
        let docs = folder("Docs", None);
        let docs_id = docs.id;

        let mut store = MockNodeStore::new();
        {
            let docs = docs.clone();
            store
                .expect_find_live_folder()
                .with(eq(OWNER), eq(docs_id))
                .returning(move |_, _| Ok(Some(docs.clone())));
        }
        store
            .expect_get_any()
            .with(eq(docs_id))
            .returning(move |_| Ok(Some(docs.clone())));
        store.expect_find_sibling().returning(|_, _, _, _| Ok(None));
        store.expect_insert().returning(|n| Ok(n.clone()));

        let mgr = manager(store, MockObjectStorage::new());
        let created = mgr
            .create_file(OWNER, "a.txt", Some("text/plain".to_string()), 10, Some(docs_id))
            .await
            .unwrap();
        assert_eq!(created.name, "a.txt");
        assert_eq!(created.storage_key.as_deref(), Some("u1/Docs/a.txt"));
        assert_eq!(created.size, 10);
    }

    #[tokio::test]
    async fn create_file_renames_on_collision_instead_of_failing() {
        let existing = file("a.txt", None, "u1/a.txt");

        let mut store = MockNodeStore::new();
        store
            .expect_find_sibling()
            .returning(move |_, _, _, _| Ok(Some(existing.clone())));
        store.expect_insert().returning(|n| Ok(n.clone()));

        let mgr = manager(store, MockObjectStorage::new());
        let created = mgr
            .create_file(OWNER, "a.txt", Some("text/plain".to_string()), 10, None)
            .await
            .unwrap();
        // 第二个同名文件静默换名，而不是返回冲突
        assert_ne!(created.name, "a.txt");
        assert!(created.name.starts_with("a-"));
        assert!(created.name.ends_with(".txt"));
        assert_eq!(
            created.storage_key.as_deref(),
            Some(format!("u1/{}", created.name).as_str())
        );
    }

    #[tokio::test]
    async fn create_file_guesses_mime_from_name() {
        let mut store = MockNodeStore::new();
        store.expect_find_sibling().returning(|_, _, _, _| Ok(None));
        store.expect_insert().returning(|n| Ok(n.clone()));

        let mgr = manager(store, MockObjectStorage::new());
        let created = mgr
            .create_file(OWNER, "photo.png", None, 10, None)
            .await
            .unwrap();
        assert_eq!(created.mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn rename_rejects_sibling_collision() {
        let node = folder("Docs", None);
        let node_id = node.id;
        let other = folder("Archive", None);

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));
        store
            .expect_find_sibling()
            .returning(move |_, _, _, _| Ok(Some(other.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.rename(OWNER, node_id, "Archive").await;
        assert!(matches!(result, Err(DriveError::Conflict(_))));
    }

    #[tokio::test]
    async fn rename_file_recomputes_storage_key() {
        let docs = folder("Docs", None);
        let docs_id = docs.id;
        let node = file("a.txt", Some(docs_id), "u1/Docs/a.txt");
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));
        store.expect_find_sibling().returning(|_, _, _, _| Ok(None));
        store
            .expect_get_any()
            .with(eq(docs_id))
            .returning(move |_| Ok(Some(docs.clone())));
        store
            .expect_update_name()
            .withf(move |id, name, key| {
                *id == node_id && name == "b.txt" && *key == Some("u1/Docs/b.txt")
            })
            .returning(|id, name, key| {
                let mut n = file(name, None, key.unwrap());
                n.id = id;
                Ok(n)
            });

        let mgr = manager(store, MockObjectStorage::new());
        let renamed = mgr.rename(OWNER, node_id, "b.txt").await.unwrap();
        assert_eq!(renamed.storage_key.as_deref(), Some("u1/Docs/b.txt"));
    }

    #[tokio::test]
    async fn move_to_current_parent_is_noop() {
        let docs_id = Uuid::new_v4();
        let node = file("a.txt", Some(docs_id), "u1/Docs/a.txt");
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let moved = mgr.move_node(OWNER, node_id, Some(docs_id)).await.unwrap();
        assert_eq!(moved.parent_id, Some(docs_id));
    }

    #[tokio::test]
    async fn move_into_self_is_forbidden() {
        let node = folder("Docs", None);
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.move_node(OWNER, node_id, Some(node_id)).await;
        assert!(matches!(result, Err(DriveError::Forbidden(_))));
    }

    #[tokio::test]
    async fn move_into_descendant_is_forbidden() {
        // A/B/C，尝试把 A 移入 C
        let a = folder("A", None);
        let a_id = a.id;
        let b = folder("B", Some(a_id));
        let b_id = b.id;
        let c = folder("C", Some(b_id));
        let c_id = c.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(a.clone())));
        {
            let c = c.clone();
            store
                .expect_find_live_folder()
                .with(eq(OWNER), eq(c_id))
                .returning(move |_, _| Ok(Some(c.clone())));
        }
        store
            .expect_get_any()
            .with(eq(b_id))
            .returning(move |_| Ok(Some(b.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.move_node(OWNER, a_id, Some(c_id)).await;
        assert!(matches!(result, Err(DriveError::Forbidden(_))));
    }

    #[tokio::test]
    async fn move_file_to_root_recomputes_storage_key() {
        let docs_id = Uuid::new_v4();
        let node = file("a.txt", Some(docs_id), "u1/Docs/a.txt");
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));
        store.expect_find_sibling().returning(|_, _, _, _| Ok(None));
        store
            .expect_update_parent()
            .withf(move |id, parent, key| {
                *id == node_id && parent.is_none() && *key == Some("u1/a.txt")
            })
            .returning(|id, parent, key| {
                let mut n = file("a.txt", parent, key.unwrap());
                n.id = id;
                Ok(n)
            });

        let mgr = manager(store, MockObjectStorage::new());
        let moved = mgr.move_node(OWNER, node_id, None).await.unwrap();
        assert_eq!(moved.storage_key.as_deref(), Some("u1/a.txt"));
        assert_eq!(moved.parent_id, None);
    }

    #[tokio::test]
    async fn soft_delete_cascades_to_all_descendants() {
        // F 下有文件 f1 和子文件夹 G，G 下有文件 f2
        let f = folder("F", None);
        let f_id = f.id;
        let f1 = {
            let mut n = file("f1.txt", Some(f_id), "u1/F/f1.txt");
            n.is_deleted = true;
            n
        };
        let g = {
            let mut n = folder("G", Some(f_id));
            n.is_deleted = true;
            n
        };
        let g_id = g.id;
        let f2 = {
            let mut n = file("f2.txt", Some(g_id), "u1/F/G/f2.txt");
            n.is_deleted = true;
            n
        };

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(f.clone())));
        store.expect_set_deleted().returning(|id, deleted| {
            let mut n = folder("F", None);
            n.id = id;
            n.is_deleted = deleted;
            Ok(n)
        });
        store
            .expect_mark_children_deleted()
            .with(eq(OWNER), eq(f_id), eq(CASCADE_BATCH))
            .times(1)
            .returning(move |_, _, _| Ok(vec![f1.clone(), g.clone()]));
        store
            .expect_mark_children_deleted()
            .with(eq(OWNER), eq(g_id), eq(CASCADE_BATCH))
            .times(1)
            .returning(move |_, _, _| Ok(vec![f2.clone()]));

        let mgr = manager(store, MockObjectStorage::new());
        let deleted = mgr.soft_delete(OWNER, f_id).await.unwrap();
        assert!(deleted.is_deleted);
    }

    #[tokio::test]
    async fn restore_rejects_live_node() {
        let node = folder("Docs", None);
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.restore(OWNER, node_id).await;
        assert!(matches!(result, Err(DriveError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn restore_rejects_deleted_parent() {
        let parent = {
            let mut n = folder("P", None);
            n.is_deleted = true;
            n
        };
        let parent_id = parent.id;
        let node = {
            let mut n = folder("Docs", Some(parent_id));
            n.is_deleted = true;
            n
        };
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));
        store
            .expect_get_any()
            .with(eq(parent_id))
            .returning(move |_| Ok(Some(parent.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.restore(OWNER, node_id).await;
        assert!(matches!(result, Err(DriveError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn restore_reports_deleted_children_without_restoring_them() {
        let node = {
            let mut n = folder("Docs", None);
            n.is_deleted = true;
            n
        };
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));
        store.expect_set_deleted().returning(|id, deleted| {
            let mut n = folder("Docs", None);
            n.id = id;
            n.is_deleted = deleted;
            Ok(n)
        });
        store
            .expect_has_deleted_children()
            .returning(|_, _| Ok(true));

        let mgr = manager(store, MockObjectStorage::new());
        let outcome = mgr.restore(OWNER, node_id).await.unwrap();
        assert!(!outcome.node.is_deleted);
        assert!(outcome.has_deleted_children);
    }

    #[tokio::test]
    async fn purge_deletes_storage_object_before_metadata() {
        let node = file("a.txt", None, "u1/a.txt");
        let node_id = node.id;

        let mut seq = Sequence::new();
        let mut storage = MockObjectStorage::new();
        storage
            .expect_delete()
            .with(eq("u1/a.txt"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));
        store
            .expect_remove()
            .with(eq(node_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mgr = manager(store, storage);
        mgr.purge(OWNER, node_id).await.unwrap();
    }

    #[tokio::test]
    async fn purge_continues_past_failures_and_aggregates() {
        // F 下有 f1、f2；f1 的存储删除失败，其余条目仍要继续处理
        let f = folder("F", None);
        let f_id = f.id;
        let f1 = file("f1.txt", Some(f_id), "u1/F/f1.txt");
        let f1_id = f1.id;
        let f2 = file("f2.txt", Some(f_id), "u1/F/f2.txt");
        let f2_id = f2.id;

        let mut storage = MockObjectStorage::new();
        storage
            .expect_delete()
            .with(eq("u1/F/f1.txt"))
            .returning(|_| Err(DriveError::Storage("连接超时".to_string())));
        storage
            .expect_delete()
            .with(eq("u1/F/f2.txt"))
            .returning(|_| Ok(()));

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(f.clone())));
        store
            .expect_children()
            .with(eq(OWNER), eq(f_id), eq(CASCADE_BATCH), eq(0))
            .returning(move |_, _, _, _| Ok(vec![f1.clone(), f2.clone()]));
        // f1 的元数据必须保留：remove 只允许对 f2 调用
        store
            .expect_remove()
            .with(eq(f2_id))
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_remove_if_empty()
            .with(eq(f_id))
            .returning(|_| Ok(false));

        let mgr = manager(store, storage);
        let result = mgr.purge(OWNER, f_id).await;
        match result {
            Err(DriveError::PurgeIncomplete(failures)) => {
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().any(|f| f.id == f1_id));
                assert!(failures.iter().any(|f| f.id == f_id));
            }
            other => panic!("期望 PurgeIncomplete，实际: {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_hides_soft_deleted_nodes() {
        let node = {
            let mut n = file("a.txt", None, "u1/a.txt");
            n.is_deleted = true;
            n
        };
        let node_id = node.id;

        let mut store = MockNodeStore::new();
        store
            .expect_get_owned()
            .returning(move |_, _| Ok(Some(node.clone())));

        let mgr = manager(store, MockObjectStorage::new());
        let result = mgr.get(OWNER, node_id).await;
        assert!(matches!(result, Err(DriveError::NotFound(_))));
    }
}
