//! # 身份与会话
//!
//! `IdentityProvider` 向持久化层回答三个问题：当前是否有登录身份、
//! 可用的（必要时已刷新的）会话是什么、以及强制刷新一次会话。
//!
//! - `Anonymous` - 永远没有身份（离线安装或未配置 Supabase）
//! - `SupabaseAuth` - GoTrue 客户端：密码登录、登出、refresh token 刷新，
//!   会话持久化在本地存储的 `supabase-auth` 键下，重启后自动恢复

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::services::file_store::{AUTH_SESSION_KEY, FileStore};

/// 距离过期不足该秒数时视为需要刷新
const REFRESH_MARGIN_SECS: i64 = 30;

/// 已登录的用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// 远程表中 `user_id` 列的值
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// 登录会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// 过期时间（Unix 秒）
    pub expires_at: i64,

    pub user: Identity,
}

impl Session {
    /// 是否已过期或即将在 30 秒内过期
    pub fn needs_refresh(&self, now: i64) -> bool {
        self.expires_at - now <= REFRESH_MARGIN_SECS
    }
}

/// 身份提供者
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 当前登录身份（不检查会话是否过期）
    async fn current_identity(&self) -> Option<Identity>;

    /// 可用的会话；即将过期时先刷新，刷新失败返回 `None`
    async fn session(&self) -> Option<Session>;

    /// 强制刷新会话
    async fn refresh_session(&self) -> Option<Session>;
}

/// 匿名身份：所有操作走本地存储
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl IdentityProvider for Anonymous {
    async fn current_identity(&self) -> Option<Identity> {
        None
    }

    async fn session(&self) -> Option<Session> {
        None
    }

    async fn refresh_session(&self) -> Option<Session> {
        None
    }
}

/// GoTrue token 接口的响应
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Supabase GoTrue 认证客户端
#[derive(Debug)]
pub struct SupabaseAuth {
    http: Client,
    /// `{supabase_url}/auth/v1`
    auth_url: String,
    anon_key: String,
    store: FileStore,
    session: Mutex<Option<Session>>,
}

impl SupabaseAuth {
    /// 创建客户端，并从本地存储恢复上次的会话
    pub fn new(http: Client, supabase_url: &str, anon_key: &str, store: FileStore) -> Self {
        let session = store.read_blocking::<Session>(AUTH_SESSION_KEY);
        if let Some(session) = &session {
            log::info!("已恢复登录会话: {}", session.user.id);
        }
        Self {
            http,
            auth_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
            store,
            session: Mutex::new(session),
        }
    }

    /// 邮箱密码登录
    ///
    /// # 错误
    /// 凭据错误（GoTrue 返回 400）、网络错误或本地持久化失败
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, StorageError> {
        let session = self
            .request_token("password", json!({ "email": email, "password": password }))
            .await?;
        self.store.write(AUTH_SESSION_KEY, &session).await?;
        *self.session.lock().await = Some(session.clone());
        log::info!("登录成功: {}", session.user.id);
        Ok(session)
    }

    /// 登出：通知服务端（尽力而为），然后清除本地会话
    pub async fn sign_out(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            let result = self
                .http
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = result {
                log::warn!("通知服务端登出失败: {}", e);
            }
        }
        if let Err(e) = self.store.remove(AUTH_SESSION_KEY).await {
            log::error!("删除本地会话失败: {}", e);
        }
    }

    async fn request_token(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, StorageError> {
        let response = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::from_response(status.as_u16(), &text));
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        Ok(token.into_session(now_secs()))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn current_identity(&self) -> Option<Identity> {
        self.session.lock().await.as_ref().map(|s| s.user.clone())
    }

    async fn session(&self) -> Option<Session> {
        let current = self.session.lock().await.clone()?;
        if current.needs_refresh(now_secs()) {
            return self.refresh_session().await;
        }
        Some(current)
    }

    async fn refresh_session(&self) -> Option<Session> {
        let mut guard = self.session.lock().await;
        let refresh_token = guard.as_ref()?.refresh_token.clone()?;

        match self
            .request_token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(session) => {
                if let Err(e) = self.store.write(AUTH_SESSION_KEY, &session).await {
                    log::error!("保存刷新后的会话失败: {}", e);
                }
                *guard = Some(session.clone());
                Some(session)
            }
            Err(StorageError::Unauthorized) | Err(StorageError::Remote { status: 400, .. }) => {
                // refresh token 已失效：保留身份但会话不可用，直到重新登录
                log::warn!("刷新会话被拒绝，需要重新登录");
                None
            }
            Err(e) => {
                log::warn!("刷新会话失败: {}", e);
                None
            }
        }
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body(access_token: &str, expires_in: i64) -> serde_json::Value {
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": expires_in,
            "refresh_token": "refresh-1",
            "user": { "id": "user-1", "email": "a@example.com" }
        })
    }

    #[test]
    fn test_needs_refresh_margin() {
        let session = Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: 1_000,
            user: Identity { id: "u".into(), email: None },
        };
        assert!(!session.needs_refresh(969));
        assert!(session.needs_refresh(970));
        assert!(session.needs_refresh(2_000));
    }

    #[tokio::test]
    async fn test_anonymous_has_no_identity() {
        assert_eq!(Anonymous.current_identity().await, None);
        assert_eq!(Anonymous.session().await, None);
    }

    #[tokio::test]
    async fn test_sign_in_persists_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let auth = SupabaseAuth::new(Client::new(), &server.uri(), "anon", FileStore::new(dir.path()));
        let session = auth.sign_in_with_password("a@example.com", "pw").await.unwrap();
        assert_eq!(session.user.id, "user-1");
        assert_eq!(auth.session().await.map(|s| s.access_token).as_deref(), Some("access-1"));

        let restored = SupabaseAuth::new(Client::new(), &server.uri(), "anon", FileStore::new(dir.path()));
        assert_eq!(restored.current_identity().await.map(|i| i.id).as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_bad_credentials_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let auth = SupabaseAuth::new(Client::new(), &server.uri(), "anon", FileStore::new(dir.path()));
        let err = auth.sign_in_with_password("a@example.com", "bad").await.unwrap_err();
        assert!(err.to_string().contains("Invalid login credentials"), "{err}");
        assert_eq!(auth.current_identity().await, None);
    }

    #[tokio::test]
    async fn test_expiring_session_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("stale", 10)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_partial_json(json!({ "refresh_token": "refresh-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let auth = SupabaseAuth::new(Client::new(), &server.uri(), "anon", FileStore::new(dir.path()));
        auth.sign_in_with_password("a@example.com", "pw").await.unwrap();

        let session = auth.session().await.unwrap();
        assert_eq!(session.access_token, "fresh");
    }

    #[tokio::test]
    async fn test_rejected_refresh_yields_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("stale", 0)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let auth = SupabaseAuth::new(Client::new(), &server.uri(), "anon", FileStore::new(dir.path()));
        auth.sign_in_with_password("a@example.com", "pw").await.unwrap();

        assert!(auth.current_identity().await.is_some());
        assert_eq!(auth.session().await, None);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", 3600)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        let auth = SupabaseAuth::new(Client::new(), &server.uri(), "anon", store.clone());
        auth.sign_in_with_password("a@example.com", "pw").await.unwrap();
        auth.sign_out().await;

        assert_eq!(auth.current_identity().await, None);
        assert_eq!(store.read_blocking::<Session>(AUTH_SESSION_KEY), None);
    }
}
