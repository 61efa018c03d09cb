//! Admin Core - services behind the back-office console
//!
//! # Modules
//!
//! ```text
//! admin-core/src/
//! ├── core/    # configuration, service container
//! ├── auth/    # access control: session, role, permission matrix
//! ├── media/   # media library: filters, pagination, upload, delete
//! ├── audit/   # batched audit logger
//! └── utils/   # logging, input sanitizers
//! ```

pub mod audit;
pub mod auth;
pub mod core;
pub mod media;
pub mod utils;

pub use audit::AuditLogger;
pub use auth::{AccessControl, AccessError, EditSection, RoleResolution};
pub use core::{AdminState, Config};
pub use media::{MediaError, MediaLibrary, MediaPermissions};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, read the configuration, prepare the work dir and install logging
pub fn setup_environment() -> Result<Config, AppError> {
    // Missing .env is fine
    let _ = dotenv::dotenv();

    let (config, fallbacks) = Config::load_env();
    std::fs::create_dir_all(&config.work_dir)
        .map_err(|e| AppError::config(format!("work dir {}: {e}", config.work_dir)))?;

    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    for fallback in &fallbacks {
        tracing::warn!(
            key = fallback.key,
            value = %fallback.value,
            fallback = %fallback.fallback,
            "Unsupported configuration value, using default"
        );
    }
    tracing::info!(backend = %config.backend_url, bucket = %config.media_bucket, "Environment ready");
    Ok(config)
}
