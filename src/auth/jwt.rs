use crate::auth::types::Claims;
use crate::fs::model::DriveError;
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::{debug, warn};
use std::env;

/// 验证身份令牌，返回其中经过验证的用户 id 载荷。
/// 令牌由外部身份服务签发，这里只做验签。
pub fn validate_token(token: &str) -> Result<Claims, DriveError> {
    debug!("验证身份令牌");
    let secret = env::var("JWT_SECRET")
        .map_err(|_| DriveError::Storage("环境变量 JWT_SECRET 未配置".to_string()))?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!("令牌验证失败: {}", e);
        DriveError::Unauthenticated
    })
}
