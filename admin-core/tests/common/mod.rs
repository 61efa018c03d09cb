//! In-memory backends for driving the admin services in tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use admin_core::media::{DeleteProgress, MediaPermissions};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dogbar_client::{
    AuthBackend, BlobStore, ClientError, ClientResult, ListOptions, StorageObject, TableStore,
};
use parking_lot::Mutex;
use shared::models::{AuditEntry, AuthUser, PermissionRow, Role, Session};
use tokio::sync::{Notify, watch};

pub const ADMIN_EMAIL: &str = "manager@dogbar.test";
pub const PASSWORD: &str = "correct horse";

pub fn session_for(email: &str, expires_in_secs: i64) -> Session {
    Session {
        access_token: format!("token-{email}"),
        refresh_token: None,
        expires_at: shared::util::now_secs() + expires_in_secs,
        user: AuthUser {
            id: format!("id-{email}"),
            email: email.to_string(),
        },
    }
}

fn unavailable() -> ClientError {
    ClientError::Api {
        status: 503,
        message: "unavailable".into(),
    }
}

// ========== Auth ==========

pub struct FakeAuth {
    pub session: Mutex<Option<Session>>,
    /// `None` makes the admin check error out
    pub admin: Mutex<Option<bool>>,
    pub sign_out_fails: AtomicBool,
    pub sign_out_calls: AtomicUsize,
}

impl FakeAuth {
    /// Signed in as `email` with a one-hour session
    pub fn signed_in(email: &str) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(Some(session_for(email, 3600))),
            admin: Mutex::new(Some(true)),
            sign_out_fails: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
        })
    }

    pub fn signed_out() -> Arc<Self> {
        let auth = Self::signed_in(ADMIN_EMAIL);
        *auth.session.lock() = None;
        auth
    }

    pub fn set_admin(&self, admin: Option<bool>) {
        *self.admin.lock() = admin;
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn get_session(&self) -> ClientResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    async fn get_user(&self) -> ClientResult<Option<AuthUser>> {
        Ok(self.session.lock().as_ref().map(|s| s.user.clone()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        if password != PASSWORD {
            return Err(ClientError::Validation("Invalid login credentials".into()));
        }
        let session = session_for(email, 3600);
        *self.session.lock() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock() = None;
        if self.sign_out_fails.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn is_admin_user(&self) -> ClientResult<bool> {
        let admin = *self.admin.lock();
        admin.ok_or_else(unavailable)
    }
}

// ========== Tables ==========

#[derive(Default)]
pub struct FakeTables {
    pub roles: Mutex<HashMap<String, Role>>,
    pub rows: Mutex<Vec<PermissionRow>>,
    pub permissions_fail: AtomicBool,
    pub permission_fetches: AtomicUsize,

    pub batches: Mutex<Vec<Vec<AuditEntry>>>,
    pub inserts_fail: AtomicBool,
    pub insert_calls: AtomicUsize,
    /// Signalled when an insert starts
    pub insert_entered: Notify,
    /// When set, inserts wait for it before answering
    pub insert_gate: Mutex<Option<Arc<Notify>>>,

    pub trims: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeTables {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_role(self: Arc<Self>, email: &str, role: Role) -> Arc<Self> {
        self.roles.lock().insert(email.to_string(), role);
        self
    }

    pub fn grant(self: Arc<Self>, role: &str, action_key: &str, allowed: bool) -> Arc<Self> {
        self.rows
            .lock()
            .push(PermissionRow::new(role, action_key, allowed));
        self
    }

    pub fn fetches(&self) -> usize {
        self.permission_fetches.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }

    pub fn written(&self) -> Vec<AuditEntry> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl TableStore for FakeTables {
    async fn admin_role(&self, email: &str) -> ClientResult<Option<Role>> {
        Ok(self.roles.lock().get(email).cloned())
    }

    async fn role_permissions(&self) -> ClientResult<Vec<PermissionRow>> {
        self.permission_fetches.fetch_add(1, Ordering::SeqCst);
        if self.permissions_fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.rows.lock().clone())
    }

    async fn insert_audit_logs(&self, entries: &[AuditEntry]) -> ClientResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.insert_entered.notify_one();

        let gate = self.insert_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.inserts_fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.batches.lock().push(entries.to_vec());
        Ok(())
    }

    async fn delete_audit_logs_before(&self, cutoff: DateTime<Utc>) -> ClientResult<()> {
        self.trims.lock().push(cutoff);
        Ok(())
    }
}

// ========== Blobs ==========

#[derive(Default)]
pub struct FakeBlobs {
    pub objects: Mutex<Vec<StorageObject>>,
    pub list_fails: AtomicBool,
    pub list_calls: AtomicUsize,
    /// Uploads and removes of these names fail
    pub failing: Mutex<HashSet<String>>,
    pub uploads: Mutex<Vec<(String, String)>>,
    pub removes: Mutex<Vec<Vec<String>>>,
    /// Progress observed at the start of each remove
    pub progress_watch: Mutex<Option<watch::Receiver<Option<DeleteProgress>>>>,
    pub progress_seen: Mutex<Vec<Option<DeleteProgress>>>,
}

impl FakeBlobs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Objects named `names`, the first one newest, 100 bytes each
    pub fn with_objects(names: &[&str]) -> Arc<Self> {
        let blobs = Self::new();
        let now = Utc::now();
        {
            let mut objects = blobs.objects.lock();
            for (i, name) in names.iter().enumerate() {
                objects.push(StorageObject {
                    name: name.to_string(),
                    created_at: Some(now - ChronoDuration::minutes(i as i64)),
                    size: 100,
                    mime_type: None,
                });
            }
        }
        blobs
    }

    pub fn fail_on(&self, name: &str) {
        self.failing.lock().insert(name.to_string());
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn removed_names(&self) -> Vec<String> {
        self.removes.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn list(&self, options: &ListOptions) -> ClientResult<Vec<StorageObject>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut objects = self.objects.lock().clone();
        objects.sort_by_key(|o| std::cmp::Reverse(o.created_at));
        Ok(objects.into_iter().take(options.limit as usize).collect())
    }

    fn public_url(&self, name: &str) -> String {
        format!("https://cdn.test/media/{name}")
    }

    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> ClientResult<()> {
        assert!(upsert, "uploads overwrite");
        self.uploads
            .lock()
            .push((name.to_string(), content_type.to_string()));
        if self.failing.lock().contains(name) {
            return Err(unavailable());
        }

        let mut objects = self.objects.lock();
        objects.retain(|o| o.name != name);
        objects.push(StorageObject {
            name: name.to_string(),
            created_at: Some(Utc::now()),
            size: bytes.len() as u64,
            mime_type: Some(content_type.to_string()),
        });
        Ok(())
    }

    async fn remove(&self, names: &[String]) -> ClientResult<()> {
        if let Some(progress) = self.progress_watch.lock().as_ref() {
            self.progress_seen.lock().push(*progress.borrow());
        }
        self.removes.lock().push(names.to_vec());

        let failing = self.failing.lock();
        if names.iter().any(|n| failing.contains(n)) {
            return Err(unavailable());
        }
        drop(failing);
        self.objects.lock().retain(|o| !names.contains(&o.name));
        Ok(())
    }
}

// ========== Permissions ==========

pub struct DenyAll;

#[async_trait]
impl MediaPermissions for DenyAll {
    async fn allows(&self, _action_key: &str) -> bool {
        false
    }
}
