//! # 远程存储后端（Supabase PostgREST）
//!
//! 每次调用都携带当前会话的 access token，所有查询都以 `user_id = eq.<身份>` 过滤。
//!
//! | 操作 | 请求 |
//! |------|------|
//! | 读取设置 | `GET /rest/v1/user_settings?user_id=eq.<uid>` |
//! | 保存设置 | `POST /rest/v1/user_settings?on_conflict=user_id`（merge-duplicates） |
//! | 列表 | `GET /rest/v1/mind_maps?user_id=eq.<uid>&order=created_at.desc` |
//! | 读取 | `GET /rest/v1/mind_maps?id=eq.<id>&user_id=eq.<uid>` |
//! | 创建 | `POST /rest/v1/mind_maps` |
//! | 更新 | `PATCH /rest/v1/mind_maps?id=eq.<id>&user_id=eq.<uid>` |
//! | 删除 | `DELETE /rest/v1/mind_maps?id=eq.<id>&user_id=eq.<uid>` |
//!
//! 表的列名为 snake_case，与应用内部的 camelCase 模型在这里互相转换。
//! 设置中的 API 密钥写入前加密，读取后解密。

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::models::artifact::{
    ArtifactUpdate, FileType, IconColor, Mode, NewArtifact, StoredArtifact, deserialize_id,
};
use crate::models::mindmap::{ProcessStep, Section};
use crate::models::settings::{IconColorPreference, OutputLanguage, UserSettings};
use crate::services::crypto::Cipher;
use crate::services::storage::StorageBackend;

const SETTINGS_TABLE: &str = "user_settings";
const ARTIFACTS_TABLE: &str = "mind_maps";

/// 远程存储的连接参数（与会话无关，应用内共享）
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub http: Client,
    /// `{supabase_url}/rest/v1`
    pub rest_url: String,
    pub anon_key: String,
}

impl RemoteConfig {
    pub fn new(http: Client, supabase_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }
}

/// 绑定到某个会话的远程后端
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    config: RemoteConfig,
    access_token: String,
    user_id: String,
    cipher: Cipher,
}

/// `user_settings` 表的一行
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    paper_reading_model_name: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    pdf_system_prompt: Option<String>,
    #[serde(default)]
    paper_reading_prompt: Option<String>,
    #[serde(default)]
    output_language: Option<String>,
    #[serde(default)]
    icon_color_preference: Option<String>,
}

impl SettingsRow {
    fn from_settings(user_id: &str, settings: &UserSettings, cipher: &Cipher) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            api_key: Some(cipher.encrypt(&settings.api_key)),
            base_url: Some(settings.base_url.clone()),
            model_name: Some(settings.model_name.clone()),
            paper_reading_model_name: Some(settings.paper_reading_model_name.clone()),
            system_prompt: Some(settings.system_prompt.clone()),
            pdf_system_prompt: Some(settings.pdf_system_prompt.clone()),
            paper_reading_prompt: Some(settings.paper_reading_prompt.clone()),
            output_language: Some(settings.output_language.as_str().to_string()),
            icon_color_preference: Some(settings.icon_color_preference.into()),
        }
    }

    /// 转换为应用设置：解密密钥，空白字段用默认值补齐
    fn into_settings(self, cipher: &Cipher) -> UserSettings {
        UserSettings {
            api_key: cipher.decrypt(self.api_key.as_deref().unwrap_or_default()),
            base_url: self.base_url.unwrap_or_default(),
            model_name: self.model_name.unwrap_or_default(),
            paper_reading_model_name: self.paper_reading_model_name.unwrap_or_default(),
            system_prompt: self.system_prompt.unwrap_or_default(),
            pdf_system_prompt: self.pdf_system_prompt.unwrap_or_default(),
            paper_reading_prompt: self.paper_reading_prompt.unwrap_or_default(),
            output_language: OutputLanguage::from(self.output_language),
            icon_color_preference: IconColorPreference::from(self.icon_color_preference),
        }
        .fill_blanks()
    }
}

/// `mind_maps` 表的一行
#[derive(Debug, Deserialize)]
struct ArtifactRow {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    mode: Option<Mode>,
    #[serde(default)]
    model_name: Option<String>,
    #[serde(default)]
    file_type: Option<FileType>,
    #[serde(default)]
    data: Option<Vec<Section>>,
    #[serde(default)]
    process_steps: Option<Vec<ProcessStep>>,
    #[serde(default)]
    paper_notes: Option<String>,
    #[serde(default)]
    icon_color: IconColor,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<ArtifactRow> for StoredArtifact {
    fn from(row: ArtifactRow) -> Self {
        StoredArtifact {
            id: row.id,
            title: row.title.unwrap_or_default(),
            original_filename: row.original_filename,
            mode: row.mode.unwrap_or_default(),
            model_name: row.model_name,
            file_type: row.file_type.unwrap_or_default(),
            data: row.data,
            process_steps: row.process_steps,
            paper_notes: row.paper_notes,
            icon_color: row.icon_color,
            created_at: row.created_at.unwrap_or_default(),
            updated_at: row.updated_at,
        }
    }
}

/// 插入 `mind_maps` 的载荷
#[derive(Serialize)]
struct NewArtifactRow<'a> {
    user_id: &'a str,
    title: &'a str,
    original_filename: Option<&'a str>,
    data: Option<&'a [Section]>,
    process_steps: Option<&'a [ProcessStep]>,
    paper_notes: Option<&'a str>,
    mode: Mode,
    model_name: Option<&'a str>,
    file_type: FileType,
    icon_color: IconColor,
}

/// 局部更新载荷：只序列化给出的字段
#[derive(Serialize)]
struct ArtifactPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a [Section]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_steps: Option<&'a [ProcessStep]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paper_notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<Mode>,
    updated_at: String,
}

impl RemoteBackend {
    pub fn new(config: RemoteConfig, access_token: &str, user_id: &str, cipher: Cipher) -> Self {
        Self {
            config,
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
            cipher,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.config
            .http
            .request(method, format!("{}/{}", self.config.rest_url, table))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.access_token)
    }

    fn owner_filter(&self) -> (&'static str, String) {
        ("user_id", format!("eq.{}", self.user_id))
    }

    /// 发送请求并解析 JSON 响应
    ///
    /// # 错误
    /// 401 → `Unauthorized`；其他非 2xx → `Remote`
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StorageError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::from_response(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load_settings(&self) -> Result<Option<UserSettings>, StorageError> {
        let rows: Vec<SettingsRow> = self
            .send(
                self.request(Method::GET, SETTINGS_TABLE)
                    .query(&[("select", "*".to_string()), self.owner_filter()]),
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.into_settings(&self.cipher)))
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        let row = SettingsRow::from_settings(&self.user_id, settings, &self.cipher);
        let _: Vec<SettingsRow> = self
            .send(
                self.request(Method::POST, SETTINGS_TABLE)
                    .query(&[("on_conflict", "user_id")])
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .json(&row),
            )
            .await?;
        Ok(())
    }

    async fn list_artifacts(&self) -> Result<Vec<StoredArtifact>, StorageError> {
        let rows: Vec<ArtifactRow> = self
            .send(self.request(Method::GET, ARTIFACTS_TABLE).query(&[
                ("select", "*".to_string()),
                self.owner_filter(),
                ("order", "created_at.desc".to_string()),
            ]))
            .await?;
        Ok(rows.into_iter().map(StoredArtifact::from).collect())
    }

    async fn get_artifact(&self, id: &str) -> Result<Option<StoredArtifact>, StorageError> {
        let rows: Vec<ArtifactRow> = self
            .send(self.request(Method::GET, ARTIFACTS_TABLE).query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", id)),
                self.owner_filter(),
            ]))
            .await?;
        Ok(rows.into_iter().next().map(StoredArtifact::from))
    }

    async fn create_artifact(
        &self,
        artifact: NewArtifact,
        icon_color: IconColor,
    ) -> Result<StoredArtifact, StorageError> {
        let row = NewArtifactRow {
            user_id: &self.user_id,
            title: &artifact.title,
            original_filename: artifact.original_filename.as_deref(),
            data: artifact.data.as_deref(),
            process_steps: artifact.process_steps.as_deref(),
            paper_notes: artifact.paper_notes.as_deref(),
            mode: artifact.mode,
            model_name: artifact.model_name.as_deref(),
            file_type: artifact.file_type,
            icon_color,
        };
        let rows: Vec<ArtifactRow> = self
            .send(
                self.request(Method::POST, ARTIFACTS_TABLE)
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await?;
        rows.into_iter()
            .next()
            .map(StoredArtifact::from)
            .ok_or_else(|| StorageError::Remote {
                status: 200,
                message: "插入成功但未返回记录".to_string(),
            })
    }

    async fn update_artifact(
        &self,
        id: &str,
        update: &ArtifactUpdate,
    ) -> Result<Option<StoredArtifact>, StorageError> {
        let patch = ArtifactPatch {
            title: update.title.as_deref(),
            data: update.data.as_deref(),
            process_steps: update.process_steps.as_deref(),
            paper_notes: update.paper_notes.as_deref(),
            mode: update.mode,
            updated_at: Utc::now().to_rfc3339(),
        };
        let rows: Vec<ArtifactRow> = self
            .send(
                self.request(Method::PATCH, ARTIFACTS_TABLE)
                    .query(&[("id", format!("eq.{}", id)), self.owner_filter()])
                    .header("Prefer", "return=representation")
                    .json(&patch),
            )
            .await?;
        Ok(rows.into_iter().next().map(StoredArtifact::from))
    }

    async fn delete_artifact(&self, id: &str) -> Result<bool, StorageError> {
        let rows: Vec<serde_json::Value> = self
            .send(
                self.request(Method::DELETE, ARTIFACTS_TABLE)
                    .query(&[("id", format!("eq.{}", id)), self.owner_filter()])
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::crypto::CIPHERTEXT_MARKER;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> RemoteBackend {
        RemoteBackend::new(
            RemoteConfig::new(Client::new(), &server.uri(), "anon-key"),
            "access-1",
            "user-1",
            Cipher::new("secret"),
        )
    }

    fn row(id: Value, title: &str) -> Value {
        json!({
            "id": id,
            "user_id": "user-1",
            "title": title,
            "original_filename": "notes.pdf",
            "data": [{ "theme": "pink", "title": "S", "items": [] }],
            "process_steps": null,
            "paper_notes": "# Notes",
            "mode": "both",
            "model_name": "gpt-4o",
            "file_type": "pdf",
            "icon_color": "purple",
            "created_at": "2026-02-01T10:00:00+00:00",
            "updated_at": null
        })
    }

    #[tokio::test]
    async fn test_list_maps_rows_and_filters_by_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/mind_maps"))
            .and(query_param("user_id", "eq.user-1"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(json!(7), "Remote")])))
            .expect(1)
            .mount(&server)
            .await;

        let artifacts = backend(&server).list_artifacts().await.unwrap();
        assert_eq!(artifacts.len(), 1);
        let artifact = &artifacts[0];
        assert_eq!(artifact.id, "7");
        assert_eq!(artifact.title, "Remote");
        assert_eq!(artifact.mode, Mode::Both);
        assert_eq!(artifact.file_type, FileType::Pdf);
        assert_eq!(artifact.icon_color, IconColor::Purple);
        assert_eq!(artifact.process_steps, None);
    }

    #[tokio::test]
    async fn test_unauthorized_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })))
            .mount(&server)
            .await;

        let err = backend(&server).list_artifacts().await.unwrap_err();
        assert!(matches!(err, StorageError::Unauthorized));
    }

    #[tokio::test]
    async fn test_settings_api_key_is_encrypted_on_save_and_decrypted_on_load() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_settings"))
            .and(query_param("on_conflict", "user_id"))
            .and(body_partial_json(json!({ "user_id": "user-1", "model_name": "gpt-4o" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let remote = backend(&server);
        let settings = UserSettings {
            api_key: "sk-secret".to_string(),
            ..UserSettings::default()
        };
        remote.save_settings(&settings).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let prefer = received[0].headers.get("prefer").and_then(|v| v.to_str().ok());
        assert_eq!(prefer, Some("resolution=merge-duplicates,return=representation"));
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        let stored_key = body["api_key"].as_str().unwrap().to_string();
        assert!(stored_key.starts_with(CIPHERTEXT_MARKER));

        Mock::given(method("GET"))
            .and(path("/rest/v1/user_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "user_id": "user-1",
                "api_key": stored_key,
                "base_url": "",
                "output_language": "en",
                "icon_color_preference": "indigo"
            }])))
            .mount(&server)
            .await;

        let loaded = remote.load_settings().await.unwrap().unwrap();
        assert_eq!(loaded.api_key, "sk-secret");
        assert_eq!(loaded.base_url, UserSettings::default().base_url);
        assert_eq!(loaded.output_language, OutputLanguage::En);
        assert_eq!(loaded.icon_color_preference, IconColorPreference::Fixed(IconColor::Indigo));
    }

    #[tokio::test]
    async fn test_missing_settings_row_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        assert_eq!(backend(&server).load_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_sends_only_present_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/mind_maps"))
            .and(query_param("id", "eq.7"))
            .and(query_param("user_id", "eq.user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(json!(7), "Renamed")])))
            .expect(1)
            .mount(&server)
            .await;

        let update = ArtifactUpdate {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let updated = backend(&server).update_artifact("7", &update).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");

        let received = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2, "{body}");
        assert_eq!(body["title"], json!("Renamed"));
        assert!(body.get("updated_at").is_some());
    }

    #[tokio::test]
    async fn test_create_then_delete_then_get() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/mind_maps"))
            .and(body_partial_json(json!({ "user_id": "user-1", "icon_color": "orange" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([row(json!("abc"), "New")])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(query_param("id", "eq.abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(json!("abc"), "New")])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("id", "eq.abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let remote = backend(&server);
        let created = remote
            .create_artifact(
                NewArtifact {
                    title: "New".to_string(),
                    ..Default::default()
                },
                IconColor::Orange,
            )
            .await
            .unwrap();
        assert_eq!(created.id, "abc");
        assert!(remote.delete_artifact(&created.id).await.unwrap());
        assert_eq!(remote.get_artifact(&created.id).await.unwrap(), None);
    }
}
