//! tfplug - Terraform Plugin Framework for Rust
//!
//! Schema, planning and lifecycle primitives for building Terraform providers
//! in Rust. Resources decode configuration into typed structs and return typed
//! state; the framework handles defaults, plan modifiers, replacement and
//! deadlines.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod lifecycle;
pub mod plan_modifier;
pub mod validator;

// Re-exports for convenience
pub use context::{Context, DeadlineExceeded};
pub use data_source::DataSource;
pub use error::{Result, TfplugError};
pub use import::{import_and_read, import_state_passthrough_id};
pub use lifecycle::{apply_resource_change, converge, plan_resource_change, ChangeAction};
pub use provider::Provider;
pub use resource::{Resource, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
