//! passphrase_password resource
//!
//! Generates a diceware passphrase once and keeps it in state. Every input
//! forces replacement, reads never touch the stored value and deleting only
//! drops it from state.

use crate::diceware::{Diceware, WordGenerator};
use crate::error::PassphraseError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    passthrough_upgrade, CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest,
    DeleteResourceResponse, ImportResourceStateRequest, ImportResourceStateResponse,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    UpdateResourceRequest, UpdateResourceResponse, UpgradeResourceStateRequest,
    UpgradeResourceStateResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, RawState};
use tfplug::validator::IntegerAtLeast;

pub const TYPE_NAME: &str = "passphrase_password";
pub const SCHEMA_VERSION: i64 = 1;

/// The resource has no external identity, so every instance uses this id
pub const RESOURCE_ID: &str = "none";

pub const DEFAULT_WORD_COUNT: i64 = 12;
pub const DEFAULT_SEPARATOR: &str = "-";

const ATTR_ID: &str = "id";
const ATTR_WORD_COUNT: &str = "word_count";
const ATTR_SEPARATOR: &str = "separator";
const ATTR_RESULT: &str = "result";

/// Typed view of the resource configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordConfig {
    pub word_count: i64,
    pub separator: String,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            word_count: DEFAULT_WORD_COUNT,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl PasswordConfig {
    /// Reads a known configuration or planned state; unset fields take defaults
    pub fn from_config(config: &DynamicValue) -> Result<Self, PassphraseError> {
        Ok(Self {
            word_count: word_count_from(config)?,
            separator: separator_from(config)?,
        })
    }
}

fn word_count_from(config: &DynamicValue) -> Result<i64, PassphraseError> {
    match config.get(&AttributePath::new(ATTR_WORD_COUNT)) {
        Dynamic::Null => Ok(DEFAULT_WORD_COUNT),
        Dynamic::Number(n) if n.fract() == 0.0 && n >= 1.0 && n <= i64::MAX as f64 => {
            Ok(n as i64)
        }
        Dynamic::Number(n) => Err(PassphraseError::InvalidConfiguration(format!(
            "word_count must be a whole number of at least 1, got {}",
            n
        ))),
        other => Err(PassphraseError::InvalidConfiguration(format!(
            "word_count must be a number, got {}",
            other.type_name()
        ))),
    }
}

fn separator_from(config: &DynamicValue) -> Result<String, PassphraseError> {
    match config.get(&AttributePath::new(ATTR_SEPARATOR)) {
        Dynamic::Null => Ok(DEFAULT_SEPARATOR.to_string()),
        Dynamic::String(s) => Ok(s),
        other => Err(PassphraseError::InvalidConfiguration(format!(
            "separator must be a string, got {}",
            other.type_name()
        ))),
    }
}

/// Everything stored for one passphrase
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordState {
    pub id: String,
    pub result: String,
    pub config: PasswordConfig,
}

impl From<PasswordState> for DynamicValue {
    fn from(state: PasswordState) -> Self {
        let mut values = HashMap::new();
        values.insert(ATTR_ID.to_string(), Dynamic::String(state.id));
        values.insert(ATTR_RESULT.to_string(), Dynamic::String(state.result));
        values.insert(
            ATTR_WORD_COUNT.to_string(),
            Dynamic::Number(state.config.word_count as f64),
        );
        values.insert(
            ATTR_SEPARATOR.to_string(),
            Dynamic::String(state.config.separator),
        );
        DynamicValue::new(Dynamic::Map(values))
    }
}

/// Upgrades state written under an older schema version
///
/// No earlier version has a migration, so every version reaching this is
/// rejected. State at the current version never gets here.
pub fn migrate_state(version: i64, _raw_state: RawState) -> Result<RawState, PassphraseError> {
    Err(PassphraseError::UnsupportedSchemaVersion(version))
}

pub struct PasswordResource {
    generator: Arc<dyn WordGenerator>,
}

impl Default for PasswordResource {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordResource {
    pub fn new() -> Self {
        Self::with_generator(Arc::new(Diceware::new()))
    }

    pub fn with_generator(generator: Arc<dyn WordGenerator>) -> Self {
        Self { generator }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(SCHEMA_VERSION)
            .description(
                "The resource `passphrase_password` generates a passphrase using the diceware algorithm.",
            )
            .attribute(
                AttributeBuilder::new(ATTR_ID, AttributeType::String)
                    .description("Always \"none\"; the passphrase has no external identity")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_WORD_COUNT, AttributeType::Number)
                    .description("Number of words in the result")
                    .optional()
                    .default(StaticDefault::number(DEFAULT_WORD_COUNT as f64))
                    .validator(IntegerAtLeast::create(1))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_SEPARATOR, AttributeType::String)
                    .description("Separator placed between words in the result")
                    .optional()
                    .default(StaticDefault::string(DEFAULT_SEPARATOR))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(ATTR_RESULT, AttributeType::String)
                    .description("The generated passphrase")
                    .computed()
                    .sensitive()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .build()
    }

    fn generate(&self, config: &PasswordConfig) -> Result<String, PassphraseError> {
        let words = self.generator.generate(config.word_count)?;
        if words.len() as i64 != config.word_count {
            return Err(PassphraseError::Generation(format!(
                "expected {} words, got {}",
                config.word_count,
                words.len()
            )));
        }
        Ok(words.join(&config.separator))
    }
}

#[async_trait]
impl Resource for PasswordResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        // Unknown values are validated again at apply time
        let word_count_path = AttributePath::new(ATTR_WORD_COUNT);
        if !request.config.get(&word_count_path).is_unknown() {
            if let Err(e) = word_count_from(&request.config) {
                diagnostics.push(Diagnostic::from(e).with_attribute(word_count_path));
            }
        }

        let separator_path = AttributePath::new(ATTR_SEPARATOR);
        if !request.config.get(&separator_path).is_unknown() {
            if let Err(e) = separator_from(&request.config) {
                diagnostics.push(Diagnostic::from(e).with_attribute(separator_path));
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        if ctx.is_cancelled() {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error(
                    "Operation cancelled",
                    "The passphrase was not generated",
                )],
            };
        }

        let config = match PasswordConfig::from_config(&request.planned_state) {
            Ok(config) => config,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![e.into()],
                }
            }
        };

        match self.generate(&config) {
            Ok(result) => {
                tracing::debug!(
                    word_count = config.word_count,
                    separator = %config.separator,
                    "Generated passphrase"
                );
                let state = PasswordState {
                    id: RESOURCE_ID.to_string(),
                    result,
                    config,
                };
                CreateResourceResponse {
                    new_state: state.into(),
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to generate passphrase");
                CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics: vec![e.into()],
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        // Nothing outside state to reconcile against
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.prior_state,
            diagnostics: vec![Diagnostic::error(
                "Resource Replacement Required",
                format!(
                    "{} cannot be updated in place; changing word_count or separator replaces the passphrase",
                    TYPE_NAME
                ),
            )],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        tracing::debug!("Removing passphrase from state");
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        if request.id.is_empty() {
            response.diagnostics.push(Diagnostic::error(
                "Missing import ID",
                "The import ID is used as the passphrase and must not be empty",
            ));
            return response;
        }

        // The import ID is the passphrase itself, not a lookup key
        let Some(index) = import_state_passthrough_id(
            &ctx,
            AttributePath::new(ATTR_RESULT),
            &request,
            &mut response,
        ) else {
            return response;
        };

        if let Some(imported) = response.imported_resources.get_mut(index) {
            let defaults = PasswordConfig::default();
            let filled = imported
                .state
                .set_string(&AttributePath::new(ATTR_ID), RESOURCE_ID.to_string())
                .and_then(|_| {
                    imported.state.set_number(
                        &AttributePath::new(ATTR_WORD_COUNT),
                        defaults.word_count as f64,
                    )
                })
                .and_then(|_| {
                    imported
                        .state
                        .set_string(&AttributePath::new(ATTR_SEPARATOR), defaults.separator)
                });

            if let Err(e) = filled {
                response
                    .diagnostics
                    .push(Diagnostic::error("Failed to import passphrase", e.to_string()));
                response.imported_resources.clear();
                return response;
            }
        }

        tracing::debug!("Imported passphrase");
        response
    }

    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        if request.version == SCHEMA_VERSION {
            return passthrough_upgrade(&request.raw_state);
        }

        match migrate_state(request.version, request.raw_state) {
            Ok(raw_state) => passthrough_upgrade(&raw_state),
            Err(e) => {
                tracing::error!(version = request.version, "Unsupported state version");
                UpgradeResourceStateResponse {
                    upgraded_state: DynamicValue::null(),
                    diagnostics: vec![e.into()],
                }
            }
        }
    }
}
