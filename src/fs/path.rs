use crate::fs::model::{DriveError, FsNode, NodeId, MAX_PATH_DEPTH};
use crate::fs::store::NodeStore;

/// 自下而上回溯父链，产出从根到节点的名称序列。
///
/// 路径永远不落库：树的其他位置一旦重命名或移动，落库的路径就会失效。
/// 父引用悬挂时在断点处终止；父链深度超过上限（损坏或成环）时拒绝操作。
pub async fn resolve_path<B: NodeStore>(
    backend: &B,
    node: &FsNode,
) -> Result<Vec<String>, DriveError> {
    let mut names = vec![node.name.clone()];
    let mut current = node.parent_id;
    let mut depth = 0usize;

    while let Some(parent_id) = current {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return Err(DriveError::Storage(format!(
                "父链深度超过 {}，节点 {} 的父链可能已损坏",
                MAX_PATH_DEPTH, node.id
            )));
        }
        match backend.get_any(parent_id).await? {
            Some(parent) => {
                names.push(parent.name.clone());
                current = parent.parent_id;
            }
            // 悬挂的父引用：在断点处终止，而不是失败
            None => break,
        }
    }

    names.reverse();
    Ok(names)
}

/// 求 parent_id 指向的文件夹的完整路径（"a/b/c"），根层级为空串。
/// 存储键推导使用。
pub async fn parent_path<B: NodeStore>(
    backend: &B,
    parent_id: Option<NodeId>,
) -> Result<String, DriveError> {
    match parent_id {
        None => Ok(String::new()),
        Some(id) => match backend.get_any(id).await? {
            Some(parent) => Ok(resolve_path(backend, &parent).await?.join("/")),
            None => Ok(String::new()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::store::MockNodeStore;
    use uuid::Uuid;

    fn folder(id: NodeId, name: &str, parent_id: Option<NodeId>) -> FsNode {
        let mut node = FsNode::new_folder(name, "u1", parent_id);
        node.id = id;
        node
    }

    #[tokio::test]
    async fn resolve_path_walks_to_root() {
        let root_id = Uuid::new_v4();
        let mid_id = Uuid::new_v4();
        let root = folder(root_id, "Docs", None);
        let mid = folder(mid_id, "2024", Some(root_id));
        let leaf = folder(Uuid::new_v4(), "reports", Some(mid_id));

        let mut store = MockNodeStore::new();
        let mid_clone = mid.clone();
        let root_clone = root.clone();
        store.expect_get_any().returning(move |id| {
            if id == mid_clone.id {
                Ok(Some(mid_clone.clone()))
            } else if id == root_clone.id {
                Ok(Some(root_clone.clone()))
            } else {
                Ok(None)
            }
        });

        let path = resolve_path(&store, &leaf).await.unwrap();
        assert_eq!(path, vec!["Docs", "2024", "reports"]);
    }

    #[tokio::test]
    async fn resolve_path_stops_at_dangling_parent() {
        let leaf = folder(Uuid::new_v4(), "orphan", Some(Uuid::new_v4()));

        let mut store = MockNodeStore::new();
        store.expect_get_any().returning(|_| Ok(None));

        let path = resolve_path(&store, &leaf).await.unwrap();
        assert_eq!(path, vec!["orphan"]);
    }

    #[tokio::test]
    async fn resolve_path_fails_closed_on_cycle() {
        // a 的父是 b，b 的父是 a：回溯必须在深度上限处终止而不是死循环
        let a_id = Uuid::new_v4();
        let b_id = Uuid::new_v4();
        let a = folder(a_id, "a", Some(b_id));
        let b = folder(b_id, "b", Some(a_id));

        let mut store = MockNodeStore::new();
        let a_clone = a.clone();
        store.expect_get_any().returning(move |id| {
            if id == a_clone.id {
                Ok(Some(a_clone.clone()))
            } else {
                Ok(Some(b.clone()))
            }
        });

        let result = resolve_path(&store, &a).await;
        assert!(matches!(result, Err(DriveError::Storage(_))));
    }

    #[tokio::test]
    async fn parent_path_is_empty_at_root() {
        let store = MockNodeStore::new();
        assert_eq!(parent_path(&store, None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn parent_path_joins_ancestor_names() {
        let root_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let root = folder(root_id, "Docs", None);
        let child = folder(child_id, "inner", Some(root_id));

        let mut store = MockNodeStore::new();
        store.expect_get_any().returning(move |id| {
            if id == root_id {
                Ok(Some(root.clone()))
            } else if id == child_id {
                Ok(Some(child.clone()))
            } else {
                Ok(None)
            }
        });

        assert_eq!(
            parent_path(&store, Some(child_id)).await.unwrap(),
            "Docs/inner"
        );
    }
}
