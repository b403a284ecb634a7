//! Provider data handed to every resource and data source

use crate::api::Client;
use crate::config::ProviderSettings;

#[derive(Clone)]
pub struct AzureStackProviderData {
    pub client: Client,
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
}

impl AzureStackProviderData {
    pub fn new(client: Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            subscription_id: settings.subscription_id.clone(),
            tenant_id: settings.tenant_id.clone(),
            client_id: settings.client_id.clone(),
        }
    }
}
