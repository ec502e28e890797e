use engage_core::{AppConfig, TenantConfig};
use engage_vault::{is_sealed, seal, CredentialVault};
use sqlx::PgPool;

use crate::runtime;

/// Loads the tenants file and upserts it. Plaintext credentials are sealed
/// to the deployment key first when one is configured.
pub(crate) async fn seed_from_file(config: &AppConfig, pool: &PgPool) -> anyhow::Result<usize> {
    let file = engage_core::load_tenants(&config.tenants_path)?;
    let vault = runtime::load_vault(config)?;
    let tenants = seal_credentials(file.tenants, vault.as_deref())?;
    Ok(engage_db::seed_tenants(pool, &tenants).await?)
}

pub(crate) fn seal_credentials(
    tenants: Vec<TenantConfig>,
    vault: Option<&CredentialVault>,
) -> anyhow::Result<Vec<TenantConfig>> {
    tenants
        .into_iter()
        .map(|mut tenant| -> anyhow::Result<TenantConfig> {
            if !is_sealed(&tenant.credential) {
                match vault {
                    Some(vault) => {
                        tenant.credential = seal(&vault.public_key(), tenant.credential.trim())?;
                    }
                    None => tracing::warn!(
                        tenant = %tenant.slug,
                        "storing plaintext credential; set ENGAGE_VAULT_PRIVATE_KEY to encrypt it"
                    ),
                }
            }
            Ok(tenant)
        })
        .collect()
}
