use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engagement::AccessTier;
use crate::tenant::normalize_handle;
use crate::ConfigError;

fn default_active() -> bool {
    true
}

fn default_tier() -> AccessTier {
    AccessTier::Basic
}

/// A tenant entry in the provisioning YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub slug: String,
    pub brand_id: String,
    pub handle: String,
    /// `enc:v1:` blob produced by the vault's `seal`.
    pub credential: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_tier")]
    pub access_tier: AccessTier,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TenantsFile {
    pub tenants: Vec<TenantConfig>,
}

/// Load and validate the tenants configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tenants(path: &Path) -> Result<TenantsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TenantsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_tenants(&content)
}

fn parse_tenants(content: &str) -> Result<TenantsFile, ConfigError> {
    let mut file: TenantsFile = serde_yaml::from_str(content)?;
    for tenant in &mut file.tenants {
        tenant.handle = normalize_handle(&tenant.handle);
        tenant.hashtags = tenant
            .hashtags
            .iter()
            .map(|h| h.trim().trim_start_matches('#').to_string())
            .filter(|h| !h.is_empty())
            .collect();
    }
    validate_tenants(&file)?;
    Ok(file)
}

fn validate_tenants(file: &TenantsFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for tenant in &file.tenants {
        let slug_ok = !tenant.slug.is_empty()
            && tenant
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !slug_ok {
            return Err(ConfigError::Validation(format!(
                "tenant slug '{}' must be non-empty lowercase alphanumerics and '-'",
                tenant.slug
            )));
        }

        if !seen_slugs.insert(tenant.slug.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate tenant slug: '{}'",
                tenant.slug
            )));
        }

        if tenant.brand_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "tenant '{}' has an empty brand_id",
                tenant.slug
            )));
        }

        if tenant.handle.is_empty() {
            return Err(ConfigError::Validation(format!(
                "tenant '{}' has an empty handle",
                tenant.slug
            )));
        }

        if tenant.credential.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "tenant '{}' has no credential",
                tenant.slug
            )));
        }
    }

    Ok(())
}
