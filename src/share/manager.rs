use crate::fs::model::{DriveError, FsNode, ListQuery, Page};
use crate::fs::store::NodeStore;
use crate::share::model::{NewShare, ShareLink, ShareUpdate, ShareWithNode};
use crate::share::store::ShareStore;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

pub struct ShareManager<S: ShareStore, N: NodeStore> {
    shares: S,
    nodes: N,
}

impl<S: ShareStore, N: NodeStore> ShareManager<S, N> {
    pub fn new(shares: S, nodes: N) -> Self {
        Self { shares, nodes }
    }

    fn hash_password(password: &str) -> Result<String, DriveError> {
        hash(password, DEFAULT_COST).map_err(|e| DriveError::Storage(format!("密码加密失败: {}", e)))
    }

    /// 创建分享链接；节点必须属于创建者且未删除
    pub async fn create(&self, creator: &str, new_share: NewShare) -> Result<ShareLink, DriveError> {
        let node = self
            .nodes
            .get_owned(creator, new_share.node_id)
            .await?
            .filter(|n| !n.is_deleted)
            .ok_or_else(|| DriveError::NotFound("文件或文件夹不存在".to_string()))?;

        let password_hash = match &new_share.password {
            Some(pw) if !pw.is_empty() => Some(Self::hash_password(pw)?),
            _ => None,
        };

        let share = ShareLink::new(
            node.id,
            creator,
            new_share.permissions,
            new_share.access_level,
            new_share.expires_at,
            password_hash,
        );
        let created = self.shares.insert(&share).await?;
        info!("创建分享: {} -> 节点 {} (创建者 {})", created.token, node.id, creator);
        Ok(created)
    }

    /// 创建者的分享列表，逐条取出绑定节点
    pub async fn list(
        &self,
        creator: &str,
        query: ListQuery,
    ) -> Result<Page<ShareWithNode>, DriveError> {
        let page = self.shares.list_by_creator(creator, &query).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for share in page.items {
            let node = self.nodes.get_any(share.node_id).await?;
            items.push(ShareWithNode { share, node });
        }
        Ok(Page {
            items,
            current_page: page.current_page,
            total_pages: page.total_pages,
            total_items: page.total_items,
        })
    }

    pub async fn get(&self, creator: &str, id: Uuid) -> Result<ShareWithNode, DriveError> {
        let share = self
            .shares
            .find_by_id(creator, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("分享不存在".to_string()))?;
        let node = self.nodes.get_any(share.node_id).await?;
        Ok(ShareWithNode { share, node })
    }

    /// 更新分享；expires_at/password 外层 None 不动，内层 None 清除
    pub async fn update(
        &self,
        creator: &str,
        id: Uuid,
        update: ShareUpdate,
    ) -> Result<ShareLink, DriveError> {
        let mut share = self
            .shares
            .find_by_id(creator, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("分享不存在".to_string()))?;

        if let Some(patch) = update.permissions {
            share.permissions = patch.apply(share.permissions);
        }
        if let Some(level) = update.access_level {
            share.access_level = level;
        }
        if let Some(expires_at) = update.expires_at {
            share.expires_at = expires_at;
        }
        if let Some(password) = update.password {
            share.password_hash = match password {
                Some(pw) if !pw.is_empty() => Some(Self::hash_password(&pw)?),
                _ => None,
            };
        }

        let updated = self.shares.update(&share).await?;
        info!("更新分享: {} (创建者 {})", id, creator);
        Ok(updated)
    }

    pub async fn delete(&self, creator: &str, id: Uuid) -> Result<(), DriveError> {
        let share = self
            .shares
            .find_by_id(creator, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("分享不存在".to_string()))?;
        self.shares.remove(share.id).await?;
        info!("删除分享: {} (创建者 {})", id, creator);
        Ok(())
    }

    /// 校验分享令牌，成功时返回分享及其绑定节点。
    ///
    /// 判定顺序：令牌未知 -> NotFound；已过期 -> Forbidden；节点消失或已删除
    /// -> NotFound；设了密码而未提供 -> PasswordRequired；密码不符 ->
    /// InvalidPassword。过期不会自愈，只有创建者删除重建才会改变。
    pub async fn validate_token(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> Result<(ShareLink, FsNode), DriveError> {
        debug!("校验分享令牌: {}", token);

        let share = self
            .shares
            .find_by_token(token)
            .await?
            .ok_or_else(|| DriveError::NotFound("分享不存在".to_string()))?;

        if let Some(expires_at) = share.expires_at {
            if expires_at < Utc::now() {
                warn!("分享已过期: {}", token);
                return Err(DriveError::Forbidden("分享链接已过期".to_string()));
            }
        }

        let node = self
            .nodes
            .get_any(share.node_id)
            .await?
            .filter(|n| !n.is_deleted)
            .ok_or_else(|| DriveError::NotFound("共享的资源不存在".to_string()))?;

        if let Some(password_hash) = &share.password_hash {
            let supplied = password.ok_or(DriveError::PasswordRequired)?;
            let matched = verify(supplied, password_hash)
                .map_err(|e| DriveError::Storage(format!("密码校验失败: {}", e)))?;
            if !matched {
                warn!("分享密码错误: {}", token);
                return Err(DriveError::InvalidPassword);
            }
        }

        Ok((share, node))
    }
}

/// 编辑权限门槛；必须在令牌校验通过之后调用
pub fn require_edit(share: &ShareLink) -> Result<(), DriveError> {
    if !share.permissions.can_edit {
        return Err(DriveError::Forbidden("没有编辑该分享资源的权限".to_string()));
    }
    Ok(())
}
