//! tfplug - Terraform Plugin Framework for Rust
//!
//! A small framework for building Terraform providers in Rust: typed access
//! to dynamic values, schemas with defaults, validators and plan modifiers,
//! the provider and resource traits, and an in-process host that drives the
//! resource lifecycle against an in-memory state store.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Host modules
pub mod config;
pub mod host;
pub mod logging;

// Re-exports for convenience
pub use config::{HostConfig, LogLevel};
pub use context::Context;
pub use error::{Result, TfplugError};
pub use host::{Plan, PlannedAction, ResourceHost, StoredState};
pub use import::import_state_passthrough_id;
pub use provider::{Provider, ResourceFactory};
pub use resource::Resource;
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Config, Diagnostic, Dynamic, DynamicValue, RawState, State};
