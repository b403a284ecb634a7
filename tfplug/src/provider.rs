//! Provider trait
//!
//! The provider owns configuration and acts as the factory for resources and
//! data sources. Factories hand each instance its dependencies directly.

use crate::context::Context;
use crate::data_source::DataSource;
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix shared by every resource and data source type name
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Fails with ProviderNotConfigured before a successful configure
    async fn create_resource(&self, name: &str) -> Result<Box<dyn Resource>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSource>>;

    /// Available before configure
    fn resource_schemas(&self) -> HashMap<String, Schema>;

    fn data_source_schemas(&self) -> HashMap<String, Schema>;
}

pub struct ConfigureProviderRequest {
    pub config: DynamicValue,
}

#[derive(Default)]
pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
}
