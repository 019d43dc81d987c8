//! Terraform provider generating diceware passphrases
//!
//! The only resource is `passphrase_password`. Run it under
//! [`tfplug::ResourceHost`] to drive the full lifecycle in-process.

pub mod diceware;
pub mod error;
pub mod resources;

pub use diceware::{Diceware, WordGenerator};
pub use error::PassphraseError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
};
use tfplug::{Provider, Resource, ResourceFactory, Schema, SchemaBuilder};

pub const PROVIDER_TYPE_NAME: &str = "passphrase";

pub struct PassphraseProvider {
    generator: Arc<dyn WordGenerator>,
}

impl Default for PassphraseProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseProvider {
    pub fn new() -> Self {
        Self::with_generator(Arc::new(Diceware::new()))
    }

    /// Provider whose resources draw words from `generator`
    pub fn with_generator(generator: Arc<dyn WordGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Provider for PassphraseProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        let mut resource_types: Vec<String> = self.resources().into_keys().collect();
        resource_types.sort();

        ProviderMetadataResponse {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            resource_types,
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        // The provider block takes no arguments
        static SCHEMA: OnceLock<Schema> = OnceLock::new();

        ProviderSchemaResponse {
            schema: SCHEMA
                .get_or_init(|| SchemaBuilder::new().version(0).build())
                .clone(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::debug!("Configuring passphrase provider");
        ConfigureProviderResponse {
            diagnostics: vec![],
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let generator = self.generator.clone();
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            resources::password::TYPE_NAME.to_string(),
            Box::new(move || -> Box<dyn Resource> {
                Box::new(resources::PasswordResource::with_generator(
                    generator.clone(),
                ))
            }),
        );
        factories
    }
}
