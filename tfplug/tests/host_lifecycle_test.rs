//! Lifecycle tests for ResourceHost against a minimal in-memory resource

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
};
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ReadResourceRequest, ReadResourceResponse, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::types::RawState;
use tfplug::validator::IntegerAtLeast;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Dynamic, DynamicValue, HostConfig,
    PlannedAction, Provider, Resource, ResourceFactory, ResourceHost, SchemaBuilder, TfplugError,
};

#[derive(Default)]
struct Calls {
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

struct TestProvider {
    calls: Arc<Calls>,
}

#[async_trait]
impl Provider for TestProvider {
    fn type_name(&self) -> &str {
        "test"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "test".to_string(),
            resource_types: vec!["test_label".to_string()],
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let calls = self.calls.clone();
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "test_label".to_string(),
            Box::new(move || -> Box<dyn Resource> {
                Box::new(LabelResource {
                    calls: calls.clone(),
                })
            }),
        );
        resources
    }
}

struct LabelResource {
    calls: Arc<Calls>,
}

#[async_trait]
impl Resource for LabelResource {
    fn type_name(&self) -> &str {
        "test_label"
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
        let schema = SchemaBuilder::new()
            .version(2)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("note", AttributeType::String)
                    .optional()
                    .default(StaticDefault::string(""))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .optional()
                    .default(StaticDefault::number(1.0))
                    .validator(IntegerAtLeast::create(1))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if let Ok(name) = request.config.get_string(&AttributePath::new("name")) {
            if name.is_empty() {
                diagnostics.push(tfplug::Diagnostic::error("Empty name", "name must be set"));
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let n = self.calls.creates.fetch_add(1, Ordering::SeqCst);
        let mut state = request.planned_state;
        state
            .set_string(&AttributePath::new("id"), format!("label-{}", n))
            .unwrap();
        CreateResourceResponse {
            new_state: state,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let gone = request
            .current_state
            .get_string(&AttributePath::new("note"))
            .is_ok_and(|note| note == "gone");
        ReadResourceResponse {
            new_state: if gone { None } else { Some(request.current_state) },
            diagnostics: vec![],
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        self.calls.updates.fetch_add(1, Ordering::SeqCst);
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        _request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

fn host() -> (ResourceHost<TestProvider>, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let provider = TestProvider {
        calls: calls.clone(),
    };
    (
        ResourceHost::with_config(provider, HostConfig::new().without_logging()),
        calls,
    )
}

fn config(pairs: &[(&str, Dynamic)]) -> DynamicValue {
    let values = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    DynamicValue::new(Dynamic::Map(values))
}

fn name(value: &str) -> (&'static str, Dynamic) {
    ("name", Dynamic::String(value.to_string()))
}

#[tokio::test]
async fn create_applies_defaults_and_stores_state() {
    let (host, calls) = host();

    let plan = host
        .plan("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap();
    assert_eq!(plan.action, PlannedAction::Create);
    assert!(plan.planned_state.get(&AttributePath::new("id")).is_unknown());
    assert_eq!(
        plan.planned_state.get(&AttributePath::new("size")),
        Dynamic::Number(1.0)
    );

    let state = host.apply(plan).await.unwrap().unwrap();
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "label-0");
    assert_eq!(calls.creates.load(Ordering::SeqCst), 1);

    let stored = host.stored("test_label.a").await.unwrap();
    assert_eq!(stored.schema_version, 2);
    assert_eq!(stored.decode().unwrap(), state);
}

#[tokio::test]
async fn unchanged_config_plans_no_op() {
    let (host, calls) = host();
    let created = host
        .apply_config("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap();

    let plan = host
        .plan("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap();
    assert_eq!(plan.action, PlannedAction::NoOp);
    assert!(plan.requires_replace.is_empty());

    let state = host.apply(plan).await.unwrap();
    assert_eq!(state, created);
    assert_eq!(calls.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn in_place_change_plans_update() {
    let (host, calls) = host();
    host.apply_config("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap();

    let plan = host
        .plan(
            "test_label.a",
            "test_label",
            config(&[name("alpha"), ("note", Dynamic::String("hello".to_string()))]),
        )
        .await
        .unwrap();
    assert_eq!(plan.action, PlannedAction::Update);

    let state = host.apply(plan).await.unwrap().unwrap();
    assert_eq!(state.get_string(&AttributePath::new("note")).unwrap(), "hello");
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "label-0");
    assert_eq!(calls.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn force_new_change_plans_replace() {
    let (host, calls) = host();
    host.apply_config("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap();

    let plan = host
        .plan("test_label.a", "test_label", config(&[name("beta")]))
        .await
        .unwrap();
    assert_eq!(plan.action, PlannedAction::Replace);
    assert_eq!(plan.requires_replace, vec![AttributePath::new("name")]);
    assert!(plan.planned_state.get(&AttributePath::new("id")).is_unknown());

    let state = host.apply(plan).await.unwrap().unwrap();
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "label-1");
    assert_eq!(calls.deletes.load(Ordering::SeqCst), 1);
    assert_eq!(calls.creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn destroy_removes_state() {
    let (host, calls) = host();
    host.apply_config("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap();

    host.destroy("test_label.a").await.unwrap();
    assert!(host.state("test_label.a").await.unwrap().is_none());
    assert!(host.refresh("test_label.a").await.unwrap().is_none());
    assert_eq!(calls.deletes.load(Ordering::SeqCst), 1);

    // destroying again is a no-op
    host.destroy("test_label.a").await.unwrap();
    assert_eq!(calls.deletes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_drops_resources_reported_gone() {
    let (host, _) = host();
    host.apply_config(
        "test_label.a",
        "test_label",
        config(&[name("alpha"), ("note", Dynamic::String("gone".to_string()))]),
    )
    .await
    .unwrap();

    assert!(host.refresh("test_label.a").await.unwrap().is_none());
    assert!(host.stored("test_label.a").await.is_none());
}

#[tokio::test]
async fn schema_errors_abort_before_create() {
    let (host, calls) = host();

    let missing = host
        .plan("test_label.a", "test_label", config(&[]))
        .await
        .unwrap_err();
    assert_eq!(missing.diagnostics()[0].summary, "Missing required argument");

    let unsupported = host
        .plan(
            "test_label.a",
            "test_label",
            config(&[name("alpha"), ("colour", Dynamic::String("red".to_string()))]),
        )
        .await
        .unwrap_err();
    assert_eq!(unsupported.diagnostics()[0].summary, "Unsupported argument");

    let too_small = host
        .plan(
            "test_label.a",
            "test_label",
            config(&[name("alpha"), ("size", Dynamic::Number(0.0))]),
        )
        .await
        .unwrap_err();
    assert_eq!(too_small.diagnostics()[0].summary, "size must be at least 1");

    let wrong_type = host
        .plan(
            "test_label.a",
            "test_label",
            config(&[name("alpha"), ("size", Dynamic::String("big".to_string()))]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        wrong_type.diagnostics()[0].summary,
        "Incorrect attribute value type"
    );

    let computed = host
        .plan(
            "test_label.a",
            "test_label",
            config(&[name("alpha"), ("id", Dynamic::String("mine".to_string()))]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        computed.diagnostics()[0].summary,
        "Invalid configuration for read-only attribute"
    );

    let empty = host
        .plan("test_label.a", "test_label", config(&[name("")]))
        .await
        .unwrap_err();
    assert_eq!(empty.diagnostics()[0].summary, "Empty name");

    assert_eq!(calls.creates.load(Ordering::SeqCst), 0);
    assert!(host.stored("test_label.a").await.is_none());
}

#[tokio::test]
async fn unknown_resource_type_is_rejected() {
    let (host, _) = host();
    let err = host
        .plan("test_other.a", "test_other", config(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, TfplugError::ResourceNotFound(ref t) if t == "test_other"));
}

#[tokio::test]
async fn default_import_is_not_implemented() {
    let (host, _) = host();
    let err = host
        .import("test_label.a", "test_label", "label-9")
        .await
        .unwrap_err();
    assert_eq!(
        err.diagnostics()[0].summary,
        "Resource Import Not Implemented"
    );
    assert!(host.stored("test_label.a").await.is_none());
}

#[tokio::test]
async fn default_upgrade_passes_current_version_and_rejects_others() {
    let (host, _) = host();
    let raw = RawState {
        json: Some(br#"{"id":"label-3","name":"alpha","note":"","size":1}"#.to_vec()),
    };

    let state = host.upgrade("test_label", 2, raw.clone()).await.unwrap();
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "label-3");

    let err = host.upgrade("test_label", 1, raw).await.unwrap_err();
    assert!(err.to_string().contains("from version 1 to 2"));
}

#[tokio::test]
async fn plan_upgrades_outdated_state_first() {
    let (host, calls) = host();
    host.adopt_raw_state(
        "test_label.a",
        "test_label",
        1,
        br#"{"id":"label-3","name":"alpha","note":"","size":1}"#,
    )
    .await
    .unwrap();

    let err = host
        .plan("test_label.a", "test_label", config(&[name("beta")]))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("from version 1 to 2"));
    assert_eq!(calls.deletes.load(Ordering::SeqCst), 0);
    assert_eq!(calls.creates.load(Ordering::SeqCst), 0);
    assert_eq!(host.stored("test_label.a").await.unwrap().schema_version, 1);
}

#[tokio::test]
async fn marker_like_strings_survive_the_store() {
    let (host, _) = host();
    host.apply_config("test_label.a", "test_label", config(&[name("__unknown__")]))
        .await
        .unwrap();

    let state = host.refresh("test_label.a").await.unwrap().unwrap();
    assert_eq!(
        state.get_string(&AttributePath::new("name")).unwrap(),
        "__unknown__"
    );

    let plan = host
        .plan("test_label.a", "test_label", config(&[name("__unknown__")]))
        .await
        .unwrap();
    assert_eq!(plan.action, PlannedAction::NoOp);
}

#[tokio::test]
async fn elapsed_timeout_cancels_operations() {
    let calls = Arc::new(Calls::default());
    let host = ResourceHost::with_config(
        TestProvider {
            calls: calls.clone(),
        },
        HostConfig::new()
            .without_logging()
            .with_operation_timeout(Duration::ZERO),
    );

    let err = host
        .apply_config("test_label.a", "test_label", config(&[name("alpha")]))
        .await
        .unwrap_err();
    assert!(matches!(err, TfplugError::Cancelled(_)));
    assert_eq!(calls.creates.load(Ordering::SeqCst), 0);
}

#[test]
fn configure_accepts_empty_provider_block() {
    let (mut host, _) = host();
    tokio_test::block_on(host.configure(DynamicValue::object())).unwrap();
    assert_eq!(host.provider().type_name(), "test");
}
