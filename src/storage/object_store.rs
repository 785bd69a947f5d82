use crate::fs::model::DriveError;
use async_trait::async_trait;
use http::Method;
use log::{debug, warn};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::ObjectStore;
use std::env;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

// 预签名 URL 的有效期
const PRESIGN_TTL: Duration = Duration::from_secs(3600);

/// 字节存储协作方暴露的能力：按键签发限时上传/下载 URL，以及幂等删除。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// 签发限时上传 URL
    async fn put_presigned(&self, key: &str, content_type: &str) -> Result<String, DriveError>;

    /// 签发限时下载 URL
    async fn get_presigned(&self, key: &str, download_filename: &str)
        -> Result<String, DriveError>;

    /// 删除对象；对象不存在不算错误
    async fn delete(&self, key: &str) -> Result<(), DriveError>;
}

/// S3/MinIO 连接配置
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub allow_http: bool,
}

impl S3Config {
    pub fn from_env() -> Result<Self, DriveError> {
        let required = |key: &str| {
            env::var(key).map_err(|_| DriveError::Storage(format!("环境变量 {} 未配置", key)))
        };
        Ok(S3Config {
            endpoint: required("S3_ENDPOINT")?,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            bucket: required("S3_BUCKET")?,
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            allow_http: env::var("S3_ALLOW_HTTP").map(|v| v == "1").unwrap_or(false),
        })
    }
}

/// 基于 S3 兼容对象存储的实现
pub struct S3ObjectStorage {
    store: AmazonS3,
}

impl S3ObjectStorage {
    pub fn new(config: S3Config) -> Result<Self, DriveError> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| DriveError::Storage(format!("对象存储配置错误: {}", e)))?;

        Ok(Self { store })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_presigned(&self, key: &str, content_type: &str) -> Result<String, DriveError> {
        let path = ObjectPath::from(key);
        let url = self
            .store
            .signed_url(Method::PUT, &path, PRESIGN_TTL)
            .await
            .map_err(|e| DriveError::Storage(format!("签发上传 URL 失败: {}", e)))?;
        debug!("签发上传 URL: {} ({})", key, content_type);
        Ok(url.to_string())
    }

    async fn get_presigned(
        &self,
        key: &str,
        download_filename: &str,
    ) -> Result<String, DriveError> {
        let path = ObjectPath::from(key);
        let url = self
            .store
            .signed_url(Method::GET, &path, PRESIGN_TTL)
            .await
            .map_err(|e| DriveError::Storage(format!("签发下载 URL 失败: {}", e)))?;
        // 签名 URL 不携带 Content-Disposition，下载文件名由客户端设置
        debug!("签发下载 URL: {} (文件名: {})", key, download_filename);
        Ok(url.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), DriveError> {
        let path = ObjectPath::from(key);
        match self.store.delete(&path).await {
            Ok(()) => {
                debug!("删除对象: {}", key);
                Ok(())
            }
            // 幂等：对象已不存在视为删除成功
            Err(object_store::Error::NotFound { .. }) => {
                warn!("删除对象时对象已不存在: {}", key);
                Ok(())
            }
            Err(e) => Err(DriveError::Storage(format!("删除对象失败: {}", e))),
        }
    }
}
