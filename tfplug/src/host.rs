//! In-process lifecycle host
//!
//! [`ResourceHost`] drives a provider the way Terraform core does: it plans
//! a configuration against the stored state, applies the plan through the
//! resource's create/update/delete methods, refreshes and imports, and keeps
//! the resulting states in an in-memory store keyed by resource address.
//!
//! Failed operations never write partial state: the store only changes after
//! a lifecycle call returned without error diagnostics.

use crate::config::HostConfig;
use crate::context::Context;
use crate::error::{Result, TfplugError};
use crate::logging::init_logging;
use crate::provider::{ConfigureProviderRequest, Provider, ResourceFactory};
use crate::resource::{
    CreateResourceRequest, DeleteResourceRequest, ImportResourceStateRequest, ReadResourceRequest,
    Resource, ResourceSchemaRequest, UpdateResourceRequest, UpgradeResourceStateRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::{PlanModifierRequest, Schema, ValidatorRequest};
use crate::types::{
    has_errors, AttributePath, Config, Diagnostic, Dynamic, DynamicValue, RawState, State,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// What applying a plan will do to the stored state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlannedAction {
    NoOp,
    Create,
    Update,
    /// Delete the existing object, then create a new one
    Replace,
}

/// Result of planning a configuration against the stored state
#[derive(Debug, Clone)]
pub struct Plan {
    pub address: String,
    pub type_name: String,
    pub action: PlannedAction,
    pub config: Config,
    pub prior_state: Option<State>,
    pub planned_state: State,
    pub requires_replace: Vec<AttributePath>,
    /// Warnings raised while planning
    pub diagnostics: Vec<Diagnostic>,
}

/// A state as persisted by the host
#[derive(Debug, Clone)]
pub struct StoredState {
    pub type_name: String,
    pub schema_version: i64,
    /// msgpack-encoded state
    pub encoded: Vec<u8>,
}

impl StoredState {
    fn encode(type_name: &str, schema_version: i64, state: &State) -> Result<Self> {
        Ok(Self {
            type_name: type_name.to_string(),
            schema_version,
            encoded: state.encode_msgpack()?,
        })
    }

    pub fn decode(&self) -> Result<State> {
        DynamicValue::decode_msgpack(&self.encoded)
    }
}

pub struct ResourceHost<P: Provider> {
    provider: P,
    factories: HashMap<String, ResourceFactory>,
    config: HostConfig,
    store: RwLock<HashMap<String, StoredState>>,
}

impl<P: Provider> ResourceHost<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, HostConfig::default())
    }

    /// Builds a host and installs logging according to `config`
    pub fn with_config(provider: P, config: HostConfig) -> Self {
        init_logging(&config);
        let factories = provider.resources();

        tracing::debug!(
            provider = provider.type_name(),
            resources = factories.len(),
            "Resource host created"
        );

        Self {
            provider,
            factories,
            config,
            store: RwLock::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn context(&self) -> Context {
        Context::with_timeout(self.config.operation_timeout)
    }

    fn resource(&self, type_name: &str) -> Result<Box<dyn Resource>> {
        self.factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))
    }

    async fn resource_schema(&self, ctx: &Context, resource: &dyn Resource) -> Result<Schema> {
        let response = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
        fail_on_errors(response.diagnostics)?;
        Ok(response.schema)
    }

    pub async fn configure(&mut self, config: Config) -> Result<()> {
        let ctx = self.context();
        ctx.check("configure provider")?;

        let response = self
            .provider
            .configure(ctx, ConfigureProviderRequest { config })
            .await;
        fail_on_errors(response.diagnostics)?;

        tracing::info!(provider = self.provider.type_name(), "Provider configured");
        Ok(())
    }

    /// Current state at `address`, if any
    pub async fn state(&self, address: &str) -> Result<Option<State>> {
        let store = self.store.read().await;
        store.get(address).map(StoredState::decode).transpose()
    }

    pub async fn stored(&self, address: &str) -> Option<StoredState> {
        self.store.read().await.get(address).cloned()
    }

    async fn put_state(
        &self,
        address: &str,
        type_name: &str,
        schema_version: i64,
        state: &State,
    ) -> Result<()> {
        if contains_unknown(&state.value) {
            return Err(TfplugError::InvalidState(format!(
                "{} returned a state with unknown values for {}",
                type_name, address
            )));
        }

        let stored = StoredState::encode(type_name, schema_version, state)?;
        self.store.write().await.insert(address.to_string(), stored);
        Ok(())
    }

    /// Decodes a stored state, upgrading it when it was written under another version
    async fn load_current(&self, stored: &StoredState, schema_version: i64) -> Result<State> {
        if stored.schema_version == schema_version {
            return stored.decode();
        }

        let raw = RawState {
            json: Some(stored.decode()?.encode_json()?),
        };
        self.upgrade(&stored.type_name, stored.schema_version, raw)
            .await
    }

    async fn remove_state(&self, address: &str) {
        self.store.write().await.remove(address);
    }

    /// Plans `config` for `address`, comparing it with the stored state
    pub async fn plan(&self, address: &str, type_name: &str, config: Config) -> Result<Plan> {
        let ctx = self.context();
        ctx.check("plan")?;

        let resource = self.resource(type_name)?;
        let schema = self.resource_schema(&ctx, resource.as_ref()).await?;

        let prior_state = match self.stored(address).await {
            Some(stored) if stored.type_name != type_name => {
                return Err(TfplugError::InvalidState(format!(
                    "{} is managed as {}, not {}",
                    address, stored.type_name, type_name
                )));
            }
            Some(stored) => Some(self.load_current(&stored, schema.version).await?),
            None => None,
        };

        // Schema-level problems are reported before the resource sees the config
        let mut diagnostics = fail_on_errors(validate_against_schema(&schema, &config))?;
        let response = resource
            .validate(
                ctx.clone(),
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config: config.clone(),
                },
            )
            .await;
        diagnostics.extend(fail_on_errors(response.diagnostics)?);

        let mut planned_state = config.clone();
        if planned_state.is_null() {
            planned_state = DynamicValue::object();
        }
        schema.apply_defaults(&mut planned_state)?;
        mark_computed_unknown(&schema, &config, &mut planned_state)?;

        let mut requires_replace = Vec::new();
        let mut modifier_diagnostics = Vec::new();
        if let Some(prior) = &prior_state {
            for attr in &schema.block.attributes {
                let path = AttributePath::new(&attr.name);
                let mut plan_value = DynamicValue::new(planned_state.get(&path));

                for modifier in &attr.plan_modifiers {
                    let response = modifier.modify(PlanModifierRequest {
                        config_value: DynamicValue::new(config.get(&path)),
                        state_value: DynamicValue::new(prior.get(&path)),
                        plan_value,
                        path: path.clone(),
                    });
                    plan_value = response.plan_value;
                    modifier_diagnostics.extend(response.diagnostics);
                    if response.requires_replace && !requires_replace.contains(&path) {
                        requires_replace.push(path.clone());
                    }
                }

                planned_state.set_value(&path, plan_value.value)?;
            }
        }
        diagnostics.extend(fail_on_errors(modifier_diagnostics)?);

        let action = match &prior_state {
            None => PlannedAction::Create,
            Some(_) if !requires_replace.is_empty() => {
                // Values kept from the old object don't survive replacement
                mark_computed_unknown(&schema, &config, &mut planned_state)?;
                PlannedAction::Replace
            }
            Some(prior) if prior.value.semantically_equal(&planned_state.value) => {
                PlannedAction::NoOp
            }
            Some(_) => PlannedAction::Update,
        };

        tracing::debug!(
            address,
            type_name,
            action = ?action,
            replace_paths = requires_replace.len(),
            "Planned resource change"
        );

        Ok(Plan {
            address: address.to_string(),
            type_name: type_name.to_string(),
            action,
            config,
            prior_state,
            planned_state,
            requires_replace,
            diagnostics,
        })
    }

    /// Applies a plan and returns the resulting state (None once deleted)
    pub async fn apply(&self, plan: Plan) -> Result<Option<State>> {
        let ctx = self.context();
        ctx.check("apply")?;

        let resource = self.resource(&plan.type_name)?;
        let schema_version = self.resource_schema(&ctx, resource.as_ref()).await?.version;

        match plan.action {
            PlannedAction::NoOp => {
                // An upgraded prior state is written back at the current version
                let outdated = self
                    .stored(&plan.address)
                    .await
                    .is_some_and(|stored| stored.schema_version != schema_version);
                if let (true, Some(prior)) = (outdated, &plan.prior_state) {
                    self.put_state(&plan.address, &plan.type_name, schema_version, prior)
                        .await?;
                }
                Ok(plan.prior_state)
            }
            PlannedAction::Create => {
                let state = self
                    .create(&ctx, resource.as_ref(), &plan, schema_version)
                    .await?;
                Ok(Some(state))
            }
            PlannedAction::Replace => {
                let prior = plan
                    .prior_state
                    .clone()
                    .ok_or_else(|| TfplugError::InvalidState("replace without prior state".into()))?;
                self.delete(&ctx, resource.as_ref(), &plan.address, prior)
                    .await?;
                let state = self
                    .create(&ctx, resource.as_ref(), &plan, schema_version)
                    .await?;
                Ok(Some(state))
            }
            PlannedAction::Update => {
                let prior = plan
                    .prior_state
                    .clone()
                    .ok_or_else(|| TfplugError::InvalidState("update without prior state".into()))?;
                let response = resource
                    .update(
                        ctx.clone(),
                        UpdateResourceRequest {
                            type_name: plan.type_name.clone(),
                            prior_state: prior,
                            planned_state: plan.planned_state.clone(),
                            config: plan.config.clone(),
                        },
                    )
                    .await;
                fail_on_errors(response.diagnostics)?;
                self.put_state(
                    &plan.address,
                    &plan.type_name,
                    schema_version,
                    &response.new_state,
                )
                .await?;

                tracing::info!(address = %plan.address, "Resource updated");
                Ok(Some(response.new_state))
            }
        }
    }

    /// Plans and applies `config` in one step
    pub async fn apply_config(
        &self,
        address: &str,
        type_name: &str,
        config: Config,
    ) -> Result<Option<State>> {
        let plan = self.plan(address, type_name, config).await?;
        self.apply(plan).await
    }

    async fn create(
        &self,
        ctx: &Context,
        resource: &dyn Resource,
        plan: &Plan,
        schema_version: i64,
    ) -> Result<State> {
        ctx.check("create")?;

        let response = resource
            .create(
                ctx.clone(),
                CreateResourceRequest {
                    type_name: plan.type_name.clone(),
                    planned_state: plan.planned_state.clone(),
                    config: plan.config.clone(),
                },
            )
            .await;
        if let Err(e) = fail_on_errors(response.diagnostics) {
            tracing::warn!(address = %plan.address, "Create failed, no state stored");
            return Err(e);
        }

        self.put_state(
            &plan.address,
            &plan.type_name,
            schema_version,
            &response.new_state,
        )
        .await?;

        tracing::info!(address = %plan.address, "Resource created");
        Ok(response.new_state)
    }

    async fn delete(
        &self,
        ctx: &Context,
        resource: &dyn Resource,
        address: &str,
        prior_state: State,
    ) -> Result<()> {
        ctx.check("delete")?;

        let response = resource
            .delete(
                ctx.clone(),
                DeleteResourceRequest {
                    type_name: resource.type_name().to_string(),
                    prior_state,
                },
            )
            .await;
        fail_on_errors(response.diagnostics)?;

        self.remove_state(address).await;
        tracing::info!(address, "Resource deleted");
        Ok(())
    }

    /// Reads the stored state back through the resource
    /// Returns None if nothing is stored or the resource reports it gone
    pub async fn refresh(&self, address: &str) -> Result<Option<State>> {
        let ctx = self.context();
        ctx.check("refresh")?;

        let Some(stored) = self.stored(address).await else {
            return Ok(None);
        };
        let resource = self.resource(&stored.type_name)?;
        let schema_version = self.resource_schema(&ctx, resource.as_ref()).await?.version;

        let current_state = self.load_current(&stored, schema_version).await?;

        let response = resource
            .read(
                ctx.clone(),
                ReadResourceRequest {
                    type_name: stored.type_name.clone(),
                    current_state,
                },
            )
            .await;
        fail_on_errors(response.diagnostics)?;

        match response.new_state {
            Some(state) => {
                self.put_state(address, &stored.type_name, schema_version, &state)
                    .await?;
                Ok(Some(state))
            }
            None => {
                tracing::info!(address, "Resource no longer exists, removing from state");
                self.remove_state(address).await;
                Ok(None)
            }
        }
    }

    /// Deletes the resource at `address`; absent addresses are a no-op
    pub async fn destroy(&self, address: &str) -> Result<()> {
        let ctx = self.context();
        ctx.check("destroy")?;

        let Some(stored) = self.stored(address).await else {
            tracing::debug!(address, "Nothing to destroy");
            return Ok(());
        };
        let resource = self.resource(&stored.type_name)?;
        self.delete(&ctx, resource.as_ref(), address, stored.decode()?)
            .await
    }

    /// Imports an existing object into `address` using the resource's importer
    pub async fn import(&self, address: &str, type_name: &str, id: &str) -> Result<State> {
        let ctx = self.context();
        ctx.check("import")?;

        if self.stored(address).await.is_some() {
            return Err(TfplugError::ImportFailed(format!(
                "{} is already managed",
                address
            )));
        }

        let resource = self.resource(type_name)?;
        let schema_version = self.resource_schema(&ctx, resource.as_ref()).await?.version;

        let response = resource
            .import_state(
                ctx.clone(),
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                },
            )
            .await;
        fail_on_errors(response.diagnostics)?;

        let imported = response
            .imported_resources
            .into_iter()
            .find(|r| r.type_name == type_name)
            .ok_or_else(|| {
                TfplugError::ImportFailed(format!("{} returned no {} state", address, type_name))
            })?;

        self.put_state(address, type_name, schema_version, &imported.state)
            .await?;
        tracing::info!(address, type_name, "Resource imported");
        Ok(imported.state)
    }

    /// Upgrades raw state written under `version` to the current schema
    pub async fn upgrade(&self, type_name: &str, version: i64, raw_state: RawState) -> Result<State> {
        let ctx = self.context();
        ctx.check("upgrade state")?;

        let resource = self.resource(type_name)?;
        let response = resource
            .upgrade_state(
                ctx,
                UpgradeResourceStateRequest {
                    type_name: type_name.to_string(),
                    version,
                    raw_state,
                },
            )
            .await;
        fail_on_errors(response.diagnostics)?;

        tracing::debug!(type_name, from_version = version, "Resource state upgraded");
        Ok(response.upgraded_state)
    }

    /// Stores legacy JSON state for `address` as it was written under `version`
    ///
    /// The state is upgraded lazily by the next plan or refresh.
    pub async fn adopt_raw_state(
        &self,
        address: &str,
        type_name: &str,
        version: i64,
        json: &[u8],
    ) -> Result<()> {
        let state = DynamicValue::decode_json(json)?;
        let stored = StoredState::encode(type_name, version, &state)?;
        self.store.write().await.insert(address.to_string(), stored);
        Ok(())
    }
}

/// Splits error diagnostics out as an error, passing warnings through
fn fail_on_errors(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>> {
    if has_errors(&diagnostics) {
        for diag in diagnostics.iter().filter(|d| d.is_error()) {
            tracing::error!(summary = %diag.summary, detail = %diag.detail, "Lifecycle call failed");
        }
        let errors = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
        return Err(TfplugError::Diagnostics(errors));
    }
    for diag in &diagnostics {
        tracing::warn!(summary = %diag.summary, detail = %diag.detail, "Lifecycle warning");
    }
    Ok(diagnostics)
}

/// Type checks and runs attribute validators on a configuration
fn validate_against_schema(schema: &Schema, config: &Config) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    if let Dynamic::Map(values) = &config.value {
        for (name, value) in values {
            if value.is_null() {
                continue;
            }
            match schema.attribute(name) {
                None => diagnostics.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here", name),
                    )
                    .with_attribute(AttributePath::new(name)),
                ),
                Some(attr) if attr.computed && !attr.optional && !attr.required => {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid configuration for read-only attribute",
                            format!("\"{}\" is computed and cannot be set", name),
                        )
                        .with_attribute(AttributePath::new(name)),
                    )
                }
                Some(attr) if !attr.r#type.accepts(value) => diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!("\"{}\" does not accept a {}", name, value.type_name()),
                    )
                    .with_attribute(AttributePath::new(name)),
                ),
                Some(_) => {}
            }
        }
    }

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let value = config.get(&path);

        if attr.required && value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument \"{}\" is required", attr.name),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }

        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(value.clone()),
                path: path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    diagnostics
}

/// Computed attributes the configuration leaves unset become unknown,
/// unless a default supplies them
fn mark_computed_unknown(schema: &Schema, config: &Config, planned: &mut State) -> Result<()> {
    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        if attr.computed && attr.default.is_none() && config.get(&path).is_null() {
            planned.mark_unknown(&path)?;
        }
    }
    Ok(())
}

fn contains_unknown(value: &Dynamic) -> bool {
    match value {
        Dynamic::Unknown => true,
        Dynamic::List(items) => items.iter().any(contains_unknown),
        Dynamic::Map(items) => items.values().any(contains_unknown),
        _ => false,
    }
}
