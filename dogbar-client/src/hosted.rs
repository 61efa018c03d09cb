//! Hosted backend implementation over REST
//!
//! Auth lives under `/auth/v1`, tables under `/rest/v1`, objects under
//! `/storage/v1`. Every response is decoded through a `Raw*` record and
//! checked before it leaves this module.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use shared::models::{AuditEntry, AuthUser, PermissionRow, Role, Session};

use crate::backend::{AuthBackend, BlobStore, ListOptions, StorageObject, TableStore};
use crate::store::KeyValueStore;
use crate::{ClientConfig, ClientError, ClientResult, HttpClient};

/// Store key holding the serialized session
pub const SESSION_KEY: &str = "supabase.auth.token";

// ========== Raw records ==========

#[derive(Debug, Deserialize)]
struct RawUser {
    id: Option<String>,
    email: Option<String>,
}

impl TryFrom<RawUser> for AuthUser {
    type Error = ClientError;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::decode("user without id"))?;
        let email = raw
            .email
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::decode("user without email"))?;
        Ok(AuthUser { id, email })
    }
}

#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<RawUser>,
}

impl RawTokenResponse {
    fn into_session(self, now_secs: i64) -> ClientResult<Session> {
        let access_token = self
            .access_token
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::decode("token response without access_token"))?;
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => at,
            (None, Some(secs)) => now_secs + secs,
            (None, None) => return Err(ClientError::decode("token response without expiry")),
        };
        let user = self
            .user
            .ok_or_else(|| ClientError::decode("token response without user"))?
            .try_into()?;

        Ok(Session {
            access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawAdminRole {
    role: Option<String>,
}

impl TryFrom<RawAdminRole> for Role {
    type Error = ClientError;

    fn try_from(raw: RawAdminRole) -> Result<Self, Self::Error> {
        match raw.role.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(Role::parse(name)),
            _ => Err(ClientError::decode("admin user row without role")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPermissionRow {
    role: Option<String>,
    action_key: Option<String>,
    allowed: Option<bool>,
}

impl TryFrom<RawPermissionRow> for PermissionRow {
    type Error = ClientError;

    fn try_from(raw: RawPermissionRow) -> Result<Self, Self::Error> {
        let role = raw
            .role
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ClientError::decode("permission row without role"))?;
        let action_key = raw
            .action_key
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ClientError::decode("permission row without action_key"))?;
        // A null grant is a denial
        Ok(PermissionRow::new(role, action_key, raw.allowed.unwrap_or(false)))
    }
}

#[derive(Debug, Deserialize)]
struct RawObjectMetadata {
    size: Option<u64>,
    mimetype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStorageObject {
    name: Option<String>,
    /// Folder placeholders come back with a null id
    id: Option<String>,
    created_at: Option<String>,
    metadata: Option<RawObjectMetadata>,
}

impl RawStorageObject {
    fn is_folder(&self) -> bool {
        self.id.is_none()
    }
}

impl TryFrom<RawStorageObject> for StorageObject {
    type Error = ClientError;

    fn try_from(raw: RawStorageObject) -> Result<Self, Self::Error> {
        let name = raw
            .name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::decode("storage object without name"))?;
        let created_at = raw
            .created_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| ClientError::decode(format!("{name}: bad created_at {s:?}: {e}")))
            })
            .transpose()?;
        let (size, mime_type) = match raw.metadata {
            Some(meta) => (meta.size.unwrap_or(0), meta.mimetype),
            None => (0, None),
        };

        Ok(StorageObject {
            name,
            created_at,
            size,
            mime_type,
        })
    }
}

/// Decode a listing item by item; a malformed object is skipped, not fatal
fn decode_objects(raw: Vec<RawStorageObject>) -> Vec<StorageObject> {
    raw.into_iter()
        .filter(|o| !o.is_folder())
        .filter_map(|o| {
            let name = o.name.clone().unwrap_or_default();
            match StorageObject::try_from(o) {
                Ok(object) => Some(object),
                Err(e) => {
                    tracing::warn!(object = %name, error = %e, "Skipping unreadable storage object");
                    None
                }
            }
        })
        .collect()
}

fn decode_bool(value: serde_json::Value) -> ClientResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| ClientError::decode(format!("expected boolean, got {value}")))
}

// ========== Backend ==========

/// All three remote surfaces against one hosted project
pub struct HostedBackend {
    http: HttpClient,
    bucket: String,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for HostedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedBackend")
            .field("base_url", &self.http.base_url().as_str())
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl HostedBackend {
    pub fn new(config: &ClientConfig, store: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            bucket: config.bucket.clone(),
            store,
        })
    }

    /// Read the persisted session; a malformed record is a decode error
    fn stored_session(&self) -> ClientResult<Option<Session>> {
        match self.store.get(SESSION_KEY) {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| ClientError::decode(format!("stored session: {e}"))),
        }
    }

    fn persist_session(&self, session: &Session) -> ClientResult<()> {
        let json = serde_json::to_string(session)?;
        self.store.set(SESSION_KEY, &json);
        Ok(())
    }

    /// Bearer token for the current session, if one is stored and readable
    fn access_token(&self) -> Option<String> {
        self.stored_session().ok().flatten().map(|s| s.access_token)
    }
}

#[async_trait]
impl AuthBackend for HostedBackend {
    async fn get_session(&self) -> ClientResult<Option<Session>> {
        self.stored_session()
    }

    async fn get_user(&self) -> ClientResult<Option<AuthUser>> {
        let Some(token) = self.access_token() else {
            return Ok(None);
        };

        let url = self.http.endpoint(&["auth", "v1", "user"]);
        let request = self.http.request(Method::GET, url, Some(&token));
        match self.http.execute::<RawUser>(request).await {
            Ok(raw) => raw.try_into().map(Some),
            Err(ClientError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let mut url = self.http.endpoint(&["auth", "v1", "token"]);
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = serde_json::json!({ "email": email, "password": password });
        let request = self.http.request(Method::POST, url, None).json(&body);
        let raw: RawTokenResponse = self.http.execute(request).await?;

        let session = raw.into_session(shared::util::now_secs())?;
        self.persist_session(&session)?;
        tracing::info!(email = %session.user.email, "Signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        let token = self.access_token();
        self.store.remove(SESSION_KEY);

        let Some(token) = token else {
            return Ok(());
        };
        let url = self.http.endpoint(&["auth", "v1", "logout"]);
        let request = self.http.request(Method::POST, url, Some(&token));
        self.http.execute_empty(request).await
    }

    async fn is_admin_user(&self) -> ClientResult<bool> {
        let token = self.access_token().ok_or(ClientError::Unauthorized)?;
        let url = self.http.endpoint(&["rest", "v1", "rpc", "is_admin_user"]);
        let request = self
            .http
            .request(Method::POST, url, Some(&token))
            .json(&serde_json::json!({}));
        let value: serde_json::Value = self.http.execute(request).await?;
        decode_bool(value)
    }
}

#[async_trait]
impl TableStore for HostedBackend {
    async fn admin_role(&self, email: &str) -> ClientResult<Option<Role>> {
        let mut url = self.http.endpoint(&["rest", "v1", "admin_users"]);
        url.query_pairs_mut()
            .append_pair("select", "role")
            .append_pair("email", &format!("eq.{email}"))
            .append_pair("limit", "1");

        let token = self.access_token();
        let request = self.http.request(Method::GET, url, token.as_deref());
        let rows: Vec<RawAdminRole> = self.http.execute(request).await?;
        rows.into_iter().next().map(Role::try_from).transpose()
    }

    async fn role_permissions(&self) -> ClientResult<Vec<PermissionRow>> {
        let mut url = self.http.endpoint(&["rest", "v1", "role_permissions"]);
        url.query_pairs_mut()
            .append_pair("select", "role,action_key,allowed");

        let token = self.access_token();
        let request = self.http.request(Method::GET, url, token.as_deref());
        let rows: Vec<RawPermissionRow> = self.http.execute(request).await?;
        rows.into_iter().map(PermissionRow::try_from).collect()
    }

    async fn insert_audit_logs(&self, entries: &[AuditEntry]) -> ClientResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let url = self.http.endpoint(&["rest", "v1", "audit_logs"]);
        let token = self.access_token();
        let request = self
            .http
            .request(Method::POST, url, token.as_deref())
            .header("Prefer", "return=minimal")
            .json(entries);
        self.http.execute_empty(request).await
    }

    async fn delete_audit_logs_before(&self, cutoff: DateTime<Utc>) -> ClientResult<()> {
        let mut url = self.http.endpoint(&["rest", "v1", "audit_logs"]);
        url.query_pairs_mut().append_pair(
            "occurred_at",
            &format!("lt.{}", cutoff.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        let token = self.access_token();
        let request = self.http.request(Method::DELETE, url, token.as_deref());
        self.http.execute_empty(request).await
    }
}

#[async_trait]
impl BlobStore for HostedBackend {
    async fn list(&self, options: &ListOptions) -> ClientResult<Vec<StorageObject>> {
        let url = self
            .http
            .endpoint(&["storage", "v1", "object", "list", &self.bucket]);
        let body = serde_json::json!({
            "prefix": options.prefix,
            "limit": options.limit,
            "offset": options.offset,
            "sortBy": { "column": options.sort_column, "order": options.order },
        });
        let token = self.access_token();
        let request = self
            .http
            .request(Method::POST, url, token.as_deref())
            .json(&body);
        let raw: Vec<RawStorageObject> = self.http.execute(request).await?;
        Ok(decode_objects(raw))
    }

    fn public_url(&self, name: &str) -> String {
        self.http
            .endpoint(&["storage", "v1", "object", "public", &self.bucket, name])
            .to_string()
    }

    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> ClientResult<()> {
        let url = self
            .http
            .endpoint(&["storage", "v1", "object", &self.bucket, name]);
        let token = self.access_token();
        let request = self
            .http
            .request(Method::POST, url, token.as_deref())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);
        self.http.execute_empty(request).await
    }

    async fn remove(&self, names: &[String]) -> ClientResult<()> {
        let url = self
            .http
            .endpoint(&["storage", "v1", "object", &self.bucket]);
        let token = self.access_token();
        let request = self
            .http
            .request(Method::DELETE, url, token.as_deref())
            .json(&serde_json::json!({ "prefixes": names }));
        self.http.execute_empty(request).await
    }
}
