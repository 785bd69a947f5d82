use serde::{Deserialize, Serialize};

/// 外部身份服务签发的令牌载荷，sub 即经过验证的用户 id
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
