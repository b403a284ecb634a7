//! Provider configuration and per-operation timeouts

use serde::Deserialize;
use std::time::Duration;
use tfplug::{Diagnostic, DynamicValue};

/// Values from the `provider "azurestack"` block
#[derive(Debug, Default, Deserialize)]
struct ProviderBlock {
    arm_endpoint: Option<String>,
    subscription_id: Option<String>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    insecure: Option<bool>,
}

/// Fully resolved provider settings
#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    pub arm_endpoint: String,
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub insecure: bool,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("arm_endpoint", &self.arm_endpoint)
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl ProviderSettings {
    /// Read the provider block, falling back to `ARM_*` environment variables
    pub fn from_config(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let block: ProviderBlock = if config.is_null() {
            ProviderBlock::default()
        } else {
            config
                .decode()
                .map_err(|e| vec![Diagnostic::error("Invalid provider configuration", e.to_string())])?
        };

        let mut diagnostics = Vec::new();
        let mut required = |value: Option<String>, attribute: &str, var: &str| {
            let value = value.filter(|v| !v.is_empty()).or_else(|| env(var));
            if value.is_none() {
                diagnostics.push(Diagnostic::error(
                    format!("{} is required", attribute),
                    format!("{} is required (set in provider config or {} env var)", attribute, var),
                ));
            }
            value.unwrap_or_default()
        };

        let arm_endpoint = required(block.arm_endpoint, "arm_endpoint", "ARM_ENDPOINT");
        let subscription_id = required(block.subscription_id, "subscription_id", "ARM_SUBSCRIPTION_ID");
        let tenant_id = required(block.tenant_id, "tenant_id", "ARM_TENANT_ID");
        let client_id = required(block.client_id, "client_id", "ARM_CLIENT_ID");
        let client_secret = required(block.client_secret, "client_secret", "ARM_CLIENT_SECRET");

        let insecure = block
            .insecure
            .or_else(|| env("ARM_INSECURE").and_then(|v| v.parse::<bool>().ok()))
            .unwrap_or(false);

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Ok(Self {
            arm_endpoint,
            subscription_id,
            tenant_id,
            client_id,
            client_secret,
            insecure,
        })
    }
}

/// Upper bounds for each CRUD operation of one resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

impl Timeouts {
    /// Virtual machines provision and tear down slowly
    pub fn virtual_machine() -> Self {
        Self {
            create: Duration::from_secs(60 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(60 * 60),
            ..Self::default()
        }
    }
}
