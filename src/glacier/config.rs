use anyhow::{Result, bail};
use aws_sdk_glacier::Client;
use aws_sdk_glacier::config::Region;

/// Account id meaning "the account that owns the credentials"
pub const DEFAULT_ACCOUNT_ID: &str = "-";

/// Configuration for creating a Glacier client
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Optional custom endpoint URL (LocalStack and other emulators)
    pub endpoint_url: Option<String>,
    /// Optional region override; otherwise the default provider chain decides
    pub default_region: Option<String>,
    /// Whether to skip credentials (only useful against emulators)
    pub anonymous: bool,
}

/// Vault addressed by every request the service makes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    pub vault_name: String,
    pub account_id: String,
}

impl VaultConfig {
    pub fn new(vault_name: impl Into<String>, account_id: Option<String>) -> Result<Self> {
        let vault_name = vault_name.into();
        if vault_name.trim().is_empty() {
            bail!("Vault name must not be empty");
        }

        let account_id = account_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string());

        Ok(Self {
            vault_name,
            account_id,
        })
    }
}

/// Factory function to create a Glacier SDK client from provider configuration
/// Returns (client, region)
pub async fn create_glacier_client(config: ProviderConfig) -> Result<(Client, String)> {
    let mut sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region) = config.default_region.clone() {
        sdk_config = sdk_config.region(Region::new(region));
    }

    if config.anonymous {
        sdk_config = sdk_config.no_credentials();
    }

    let base_config = sdk_config.load().await;

    let region = base_config
        .region()
        .map(|r| r.as_ref().to_string())
        .unwrap_or_else(|| "us-east-1".to_string());

    let mut glacier_config_builder = aws_sdk_glacier::config::Builder::from(&base_config);

    if base_config.region().is_none() {
        glacier_config_builder = glacier_config_builder.region(Region::new(region.clone()));
    }

    if let Some(endpoint) = config.endpoint_url {
        glacier_config_builder = glacier_config_builder.endpoint_url(endpoint);
    }

    let client = Client::from_conf(glacier_config_builder.build());

    Ok((client, region))
}
