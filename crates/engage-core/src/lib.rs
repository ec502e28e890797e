//! Shared domain types for the engagement polling workspace.
//!
//! Holds the tenant and engagement model, the numeric post-id ordering used
//! for cursors, environment configuration, and the storage traits that the
//! Postgres and in-memory backends implement.

pub mod app_config;
pub mod config;
pub mod engagement;
pub mod post_id;
pub mod store;
pub mod tenant;
pub mod tenants_file;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use engagement::{
    synthetic_user_email, AccessTier, DispatchOutcome, Engagement, EngagementType, RewardEvent,
    RewardMetadata,
};
pub use post_id::{ParsePostIdError, PostId};
pub use store::{
    CursorStore, EngagementStore, IdempotencyStore, MemoryStore, StoreError, TenantDirectory,
    UserIdCache,
};
pub use tenant::{normalize_handle, Tenant};
pub use tenants_file::{load_tenants, TenantConfig, TenantsFile};

/// How long a processed marker gates re-dispatch of the same engagement.
pub const PROCESSED_RETENTION_DAYS: i64 = 30;

/// How long a per-post actor set is kept for liker/retweeter reconstruction.
pub const ACTOR_CACHE_RETENTION_DAYS: i64 = 90;

/// How long a resolved handle → user-id mapping is trusted.
pub const USER_ID_CACHE_TTL_DAYS: i64 = 7;

/// Maximum engagements processed on the first poll of a (tenant, type) pair.
pub const FIRST_RUN_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tenants file {path}: {source}")]
    TenantsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tenants file: {0}")]
    TenantsFileParse(#[from] serde_yaml::Error),

    #[error("tenants file validation failed: {0}")]
    Validation(String),
}
