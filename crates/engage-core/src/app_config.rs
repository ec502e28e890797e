use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub tenants_path: PathBuf,
    /// Base64 X25519 private key used to open encrypted tenant credentials.
    pub vault_private_key: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub upstream_base_url: String,
    pub upstream_timeout_secs: u64,
    pub upstream_page_size: u32,
    pub recent_post_limit: usize,
    pub reward_internal_url: Option<String>,
    pub reward_public_url: String,
    pub reward_api_key: Option<String>,
    pub dispatch_timeout_secs: u64,
    pub synthetic_email_domain: String,
    pub tenant_deadline_secs: u64,
    pub max_concurrent_tenants: usize,
    pub poll_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("tenants_path", &self.tenants_path)
            .field("database_url", &"[redacted]")
            .field(
                "vault_private_key",
                &self.vault_private_key.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("upstream_page_size", &self.upstream_page_size)
            .field("recent_post_limit", &self.recent_post_limit)
            .field("reward_internal_url", &self.reward_internal_url)
            .field("reward_public_url", &self.reward_public_url)
            .field(
                "reward_api_key",
                &self.reward_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("dispatch_timeout_secs", &self.dispatch_timeout_secs)
            .field("synthetic_email_domain", &self.synthetic_email_domain)
            .field("tenant_deadline_secs", &self.tenant_deadline_secs)
            .field("max_concurrent_tenants", &self.max_concurrent_tenants)
            .field("poll_cron", &self.poll_cron)
            .finish()
    }
}
