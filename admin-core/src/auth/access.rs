use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dogbar_client::{AuthBackend, KeyValueStore, TableStore};
use parking_lot::RwLock;
use serde_json::json;
use shared::models::{
    Actor, AuditAction, PermissionMatrix, Role, RoleOption, Session, summarize_role_capabilities,
};
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;

use super::AccessError;
use crate::audit::AuditLogger;
use crate::media::MediaPermissions;
use crate::utils::validation::{sanitize_email, validate_email};

pub const LOGIN_PAGE: &str = "login.html";
const LOGIN_PAGE_EXPIRED: &str = "login.html?expired=true";
const RETURN_URL_KEY: &str = "returnUrl";

/// Persistent keys wiped when a session is found invalid
const SESSION_KEY_PREFIXES: &[&str] = &["supabase.auth.token", "sb-", "admin_", "login_"];
/// Transient keys wiped alongside
const TRANSIENT_SESSION_KEYS: &[&str] = &["admin_session", "admin_user"];
/// Persistent keys wiped on a clean logout
const LOGOUT_PREFIX: &str = "supabase.";

/// Role resolution progress, published once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleResolution {
    Pending,
    Resolved(Role),
    Failed,
}

/// Coarse editing sections and the action each maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditSection {
    Events,
    Users,
    Media,
    Settings,
    FoodTrucks,
}

impl EditSection {
    pub fn action_key(&self) -> &'static str {
        match self {
            EditSection::Events => "events.edit",
            EditSection::Users => "users.edit",
            EditSection::Media => "media.upload",
            EditSection::Settings => "site_settings.edit",
            EditSection::FoodTrucks => "food_trucks.edit",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "events" => Some(EditSection::Events),
            "users" => Some(EditSection::Users),
            "media" => Some(EditSection::Media),
            "settings" | "site_settings" => Some(EditSection::Settings),
            "food_trucks" | "foodtrucks" => Some(EditSection::FoodTrucks),
            _ => None,
        }
    }
}

#[derive(Default)]
struct MatrixCache {
    matrix: Option<Arc<PermissionMatrix>>,
    fetched_at: Option<Instant>,
}

/// Access control evaluator
///
/// One instance per signed-in console. Identity and role are resolved once by
/// [`initialize`](Self::initialize); the permission matrix is cached for the
/// configured TTL and degrades to the last good copy when a refresh fails.
pub struct AccessControl {
    auth: Arc<dyn AuthBackend>,
    tables: Arc<dyn TableStore>,
    persistent: Arc<dyn KeyValueStore>,
    transient: Arc<dyn KeyValueStore>,
    cache_ttl: Duration,
    ready_timeout: Duration,
    actor: RwLock<Option<Actor>>,
    cache: Mutex<MatrixCache>,
    resolution: watch::Sender<RoleResolution>,
    audit: Option<AuditLogger>,
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field("actor", &*self.actor.read())
            .field("resolution", &*self.resolution.borrow())
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl AccessControl {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        tables: Arc<dyn TableStore>,
        persistent: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (resolution, _) = watch::channel(RoleResolution::Pending);
        Self {
            auth,
            tables,
            persistent,
            transient,
            cache_ttl: Duration::from_secs(60),
            ready_timeout: Duration::from_secs(5),
            actor: RwLock::new(None),
            cache: Mutex::new(MatrixCache::default()),
            resolution,
            audit: None,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    // ========== Session ==========

    /// Check that a stored, unexpired session exists
    ///
    /// On failure every local session artifact is cleared and, unless
    /// `current_path` is the login page, the path is kept as the return URL.
    pub async fn resolve_session(&self, current_path: &str) -> Result<Session, AccessError> {
        let failure = match self.auth.get_session().await {
            Ok(Some(session)) if !session.is_expired() => {
                tracing::debug!(email = %session.user.email, "Session valid");
                return Ok(session);
            }
            Ok(Some(_)) => AccessError::SessionExpired,
            Ok(None) => AccessError::NoSession,
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable session");
                AccessError::NoSession
            }
        };

        tracing::info!(reason = %failure, "Session invalid, clearing local state");
        self.clear_session(current_path);
        Err(failure)
    }

    fn clear_session(&self, current_path: &str) {
        for prefix in SESSION_KEY_PREFIXES {
            self.persistent.remove_prefixed(prefix);
        }
        if !current_path.contains(LOGIN_PAGE) {
            self.transient.set(RETURN_URL_KEY, current_path);
        }
        for key in TRANSIENT_SESSION_KEYS {
            self.transient.remove(key);
        }
        self.reset_role();
    }

    /// Where a fatal error should send the user
    pub fn login_target(&self, err: &AccessError) -> &'static str {
        let expired = matches!(err, AccessError::SessionExpired)
            || self.transient.get(RETURN_URL_KEY).is_some();
        if expired { LOGIN_PAGE_EXPIRED } else { LOGIN_PAGE }
    }

    /// Return URL recorded when the previous session was dropped
    pub fn take_return_url(&self) -> Option<String> {
        let url = self.transient.get(RETURN_URL_KEY)?;
        self.transient.remove(RETURN_URL_KEY);
        Some(url)
    }

    /// Page bootstrap: session check followed by role resolution
    pub async fn bootstrap(&self, current_path: &str) -> Result<Actor, AccessError> {
        self.resolve_session(current_path).await?;
        self.initialize().await
    }

    // ========== Role resolution ==========

    /// Resolve identity, admin eligibility and role for the current session
    ///
    /// Fails closed. On success the permission matrix is force-refreshed
    /// before readiness is published.
    pub async fn initialize(&self) -> Result<Actor, AccessError> {
        match self.resolve_actor().await {
            Ok(actor) => {
                *self.actor.write() = Some(actor.clone());
                self.load_matrix(true).await;
                self.resolution
                    .send_replace(RoleResolution::Resolved(actor.role.clone()));
                tracing::info!(email = %actor.email, role = %actor.role, "Admin authenticated");
                Ok(actor)
            }
            Err(e) => {
                *self.actor.write() = None;
                self.resolution.send_replace(RoleResolution::Failed);
                tracing::error!(error = %e, "Permission initialization failed");
                Err(e)
            }
        }
    }

    async fn resolve_actor(&self) -> Result<Actor, AccessError> {
        let user = match self.auth.get_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AccessError::NotAuthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "Identity fetch failed");
                return Err(AccessError::NotAuthenticated);
            }
        };

        match self.auth.is_admin_user().await {
            Ok(true) => {}
            Ok(false) => return Err(AccessError::NotAdmin),
            Err(e) => {
                tracing::warn!(error = %e, "Admin check failed");
                return Err(AccessError::NotAdmin);
            }
        }

        let role = match self.tables.admin_role(&user.email).await {
            Ok(Some(role)) => role,
            Ok(None) => return Err(AccessError::RoleNotFound),
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch user role");
                return Err(AccessError::RoleNotFound);
            }
        };

        Ok(Actor {
            id: user.id,
            email: user.email,
            role,
        })
    }

    /// Sign in with credentials, then resolve the role
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Actor, AccessError> {
        let email = sanitize_email(email);
        if !validate_email(&email) {
            return Err(AccessError::InvalidEmail(email));
        }

        self.auth
            .sign_in(&email, password)
            .await
            .map_err(AccessError::SignIn)?;
        let actor = self.initialize().await?;

        if let Some(audit) = &self.audit {
            audit
                .log(AuditAction::Login, json!({ "email": actor.email, "role": actor.role }))
                .await;
        }
        Ok(actor)
    }

    /// Re-check identity and admin eligibility; signs out on a negative result
    pub async fn verify_admin(&self) -> Result<(), AccessError> {
        match self.auth.get_user().await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(AccessError::NotAuthenticated),
            Err(e) => {
                tracing::warn!(error = %e, "Auth check error");
                return Err(AccessError::NotAuthenticated);
            }
        }

        match self.auth.is_admin_user().await {
            Ok(true) => Ok(()),
            outcome => {
                if let Err(e) = outcome {
                    tracing::error!(error = %e, "Admin check failed");
                }
                if let Err(e) = self.auth.sign_out().await {
                    tracing::warn!(error = %e, "Sign-out after failed admin check");
                }
                self.reset_role();
                Err(AccessError::NotAdmin)
            }
        }
    }

    fn reset_role(&self) {
        *self.actor.write() = None;
        self.resolution.send_replace(RoleResolution::Pending);
    }

    /// Wait for role resolution to finish, up to `timeout`
    ///
    /// Returns `Pending` when the wait gave up.
    pub async fn wait_until_ready(&self, timeout: Duration) -> RoleResolution {
        let mut rx = self.resolution.subscribe();
        let settled = async {
            loop {
                {
                    let current = rx.borrow_and_update();
                    if !matches!(*current, RoleResolution::Pending) {
                        return current.clone();
                    }
                }
                if rx.changed().await.is_err() {
                    return RoleResolution::Pending;
                }
            }
        };

        match tokio::time::timeout(timeout, settled).await {
            Ok(resolution) => resolution,
            Err(_) => {
                tracing::warn!(?timeout, "Role resolution not ready, continuing without it");
                RoleResolution::Pending
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RoleResolution> {
        self.resolution.subscribe()
    }

    // ========== Accessors ==========

    pub fn resolution(&self) -> RoleResolution {
        self.resolution.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.resolution.borrow(), RoleResolution::Resolved(_))
    }

    /// The resolved role; `None` until initialization succeeds
    pub fn role(&self) -> Option<Role> {
        match &*self.resolution.borrow() {
            RoleResolution::Resolved(role) => Some(role.clone()),
            _ => None,
        }
    }

    pub fn actor(&self) -> Option<Actor> {
        self.actor.read().clone()
    }

    pub fn is_super_admin(&self) -> bool {
        self.role() == Some(Role::SuperAdmin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role(), Some(Role::Admin | Role::SuperAdmin))
    }

    // ========== Permissions ==========

    /// Cached matrix, refetched when stale or forced
    ///
    /// Never fails: a fetch error keeps the previous matrix, or yields an
    /// empty one if nothing was cached yet.
    pub async fn load_matrix(&self, force: bool) -> Arc<PermissionMatrix> {
        let mut cache = self.cache.lock().await;

        if !force
            && let (Some(matrix), Some(fetched_at)) = (&cache.matrix, cache.fetched_at)
            && fetched_at.elapsed() < self.cache_ttl
        {
            return matrix.clone();
        }

        match self.tables.role_permissions().await {
            Ok(rows) => {
                let matrix = Arc::new(PermissionMatrix::from_rows(rows));
                cache.matrix = Some(matrix.clone());
                cache.fetched_at = Some(Instant::now());
                tracing::debug!(force, "Permission matrix refreshed");
                matrix
            }
            Err(e) => {
                tracing::warn!(error = %e, "Permission matrix fetch failed, using cached copy");
                cache
                    .matrix
                    .clone()
                    .unwrap_or_else(|| Arc::new(PermissionMatrix::empty()))
            }
        }
    }

    /// Whether the actor may perform `action_key`
    pub async fn can(&self, action_key: &str) -> bool {
        let Some(role) = self.role() else {
            tracing::warn!(action_key, "Permissions not yet loaded");
            return false;
        };
        if role.is_top_rank() {
            return true;
        }
        self.load_matrix(false).await.allows(&role, action_key)
    }

    pub async fn can_edit(&self, section: EditSection) -> bool {
        self.can(section.action_key()).await
    }

    /// `can_edit` by section name; unknown sections are denied
    pub async fn can_edit_named(&self, section: &str) -> bool {
        match EditSection::parse(section) {
            Some(section) => self.can_edit(section).await,
            None => false,
        }
    }

    /// Disable every option that outranks the actor
    pub fn restrict_role_options(&self, options: &mut [RoleOption]) {
        let rank = self.role().map(|r| r.rank()).unwrap_or(0);
        for option in options.iter_mut() {
            option.disabled = option.role.rank() > rank;
        }
    }

    /// All known roles, restricted for the current actor
    pub fn assignable_roles(&self) -> Vec<RoleOption> {
        let mut options: Vec<RoleOption> = Role::known().into_iter().map(RoleOption::new).collect();
        self.restrict_role_options(&mut options);
        options
    }

    /// Readable list of what the actor's role grants
    pub async fn capabilities_summary(&self) -> Option<String> {
        let role = self.role()?;
        let matrix = self.load_matrix(false).await;
        Some(summarize_role_capabilities(&role, &matrix))
    }

    // ========== Logout ==========

    /// Revoke the session remotely (best effort) and clear all local state
    pub async fn logout(&self) -> &'static str {
        if let Some(audit) = &self.audit {
            let email = self.actor().map(|a| a.email);
            audit.log(AuditAction::Logout, json!({ "email": email })).await;
        }

        let remote = self.auth.sign_out().await;

        self.reset_role();
        *self.cache.lock().await = MatrixCache::default();

        match remote {
            Ok(()) => {
                self.persistent.remove_prefixed(LOGOUT_PREFIX);
                self.transient.clear();
                tracing::info!("Logged out");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote sign-out failed, forcing local logout");
                self.persistent.clear();
                self.transient.clear();
            }
        }
        LOGIN_PAGE
    }
}

#[async_trait]
impl MediaPermissions for AccessControl {
    async fn allows(&self, action_key: &str) -> bool {
        self.wait_until_ready(self.ready_timeout).await;
        self.can(action_key).await
    }
}
