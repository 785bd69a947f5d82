use crate::auth::jwt::validate_token;
use crate::fs::model::DriveError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::warn;

/// 已验证的请求方身份，所有属主接口的第一个参数。
/// 从 Authorization 头取出 Bearer 令牌并验签，失败即 401。
pub struct AuthOwner(pub String);

impl FromRequest for AuthOwner {
    type Error = DriveError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .unwrap_or("");

        if token.is_empty() {
            warn!("请求未携带身份令牌");
            return ready(Err(DriveError::Unauthenticated));
        }

        ready(validate_token(token).map(|claims| AuthOwner(claims.sub)))
    }
}
