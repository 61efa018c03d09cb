use std::sync::Arc;

use dogbar_client::{
    AuthBackend, BlobStore, FileStore, HostedBackend, KeyValueStore, MemoryStore, TableStore,
};

use crate::audit::{AuditConfig, AuditLogger};
use crate::auth::AccessControl;
use crate::core::Config;
use crate::media::{MediaLibrary, MediaOptions};
use crate::utils::AppError;

/// Session store file under the work dir
const SESSION_FILE: &str = "session.json";

/// Service container for the admin console
///
/// Built once at startup and passed to whatever needs a service. Cloning is
/// cheap; every service is behind an `Arc`.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | immutable configuration |
/// | persistent | session store that survives restarts |
/// | transient | per-run store (return URL) |
/// | auth / tables / blobs | backend surfaces |
/// | access | access control evaluator |
/// | audit | audit logger |
#[derive(Clone)]
pub struct AdminState {
    pub config: Config,
    pub persistent: Arc<dyn KeyValueStore>,
    pub transient: Arc<dyn KeyValueStore>,
    pub auth: Arc<dyn AuthBackend>,
    pub tables: Arc<dyn TableStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub access: Arc<AccessControl>,
    pub audit: AuditLogger,
}

impl std::fmt::Debug for AdminState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminState")
            .field("config", &self.config)
            .field("access", &self.access)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl AdminState {
    /// Wire the hosted backend and file-backed session store from config
    pub fn initialize(config: &Config) -> Result<Self, AppError> {
        let work_dir = config.work_path();
        std::fs::create_dir_all(&work_dir).map_err(|e| {
            AppError::config(format!("work dir {} unavailable: {e}", work_dir.display()))
        })?;

        let persistent: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(work_dir, SESSION_FILE));
        let transient: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let backend = Arc::new(HostedBackend::new(&config.client_config(), persistent.clone())?);
        tracing::info!(backend = ?backend, "Backend configured");

        Ok(Self::from_parts(
            config.clone(),
            persistent,
            transient,
            backend.clone(),
            backend.clone(),
            backend,
        ))
    }

    /// Build from explicit parts
    pub fn from_parts(
        config: Config,
        persistent: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
        auth: Arc<dyn AuthBackend>,
        tables: Arc<dyn TableStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let audit = AuditLogger::new(auth.clone(), tables.clone(), AuditConfig::from(&config));
        let access = AccessControl::new(
            auth.clone(),
            tables.clone(),
            persistent.clone(),
            transient.clone(),
        )
        .with_cache_ttl(config.permission_cache_ttl())
        .with_ready_timeout(config.role_ready_timeout())
        .with_audit(audit.clone());

        Self {
            config,
            persistent,
            transient,
            auth,
            tables,
            blobs,
            access: Arc::new(access),
            audit,
        }
    }

    /// A media library gated by the access control evaluator
    pub fn media_library(&self) -> MediaLibrary {
        MediaLibrary::new(
            self.blobs.clone(),
            self.access.clone(),
            MediaOptions::from(&self.config),
        )
        .with_audit(self.audit.clone())
    }

    /// Final audit flush; returns how many entries could not be written
    pub async fn shutdown(&self) -> usize {
        tracing::info!("Shutting down admin services");
        self.audit.shutdown().await
    }
}
