//! Controller scenarios against the in-memory remote

use converge_core::diff::diff;
use converge_core::canonical::{canonicalize_plan, canonicalize_state};
use converge_core::pipeline;
use converge_core::{
    ConfigurationObject, Error, LifecycleState, ObjectId, Operation, PassState, ReadOutcome,
    ReconcileOptions, Reconciler, RemoteFailure, RemoteObject, ValidationKind,
};
use converge_schema::{
    AttributeMap, AttributeSpec, Discriminant, ProductVersion, ResourceSchema, SchemaRegistry,
    SemanticType, Value,
};
use converge_test_utils::fixtures::{self, CURRENT_VERSION};
use converge_test_utils::{CallKind, InMemoryRemote, RemoteCall};
use pretty_assertions::assert_eq;

fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> AttributeMap {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn found(outcome: ReadOutcome) -> ConfigurationObject {
    match outcome {
        ReadOutcome::Found(object) => object,
        ReadOutcome::Gone => panic!("expected the object to exist"),
    }
}

fn kinds(calls: &[RemoteCall]) -> Vec<CallKind> {
    calls.iter().map(RemoteCall::kind).collect()
}

// ============================================================================
// Scenario A: create an owned object, then nothing left to do
// ============================================================================

#[test]
fn test_create_then_read_has_no_diff() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::simple_criteria("writes", &["add", "delete"]);

    let report = reconciler.create(&plan).unwrap();
    assert_eq!(report.state, LifecycleState::Reconciled);
    assert_eq!(
        report.transitions,
        vec![
            LifecycleState::Absent,
            LifecycleState::Creating,
            LifecycleState::Reconciled
        ]
    );

    let calls = remote.calls();
    assert_eq!(kinds(&calls), vec![CallKind::Add, CallKind::Get]);
    let RemoteCall::Add { request, .. } = &calls[0] else {
        panic!("first call should be Add");
    };
    assert_eq!(request.discriminant.as_deref(), Some("simple"));
    assert_eq!(request.attributes["operation_type"], Value::set(["add", "delete"]));

    let current = found(reconciler.read("request_criteria", &plan.id).unwrap());
    let schema = SchemaRegistry::global().require("request_criteria").unwrap();
    let prepared = pipeline::prepare(&plan, schema, &CURRENT_VERSION).unwrap();
    assert!(pipeline::operations_for(&prepared, &current, schema).unwrap().is_empty());

    remote.clear_calls();
    let again = reconciler.update(&plan, &current).unwrap();
    assert!(!again.has_changes());
    assert!(remote.mutations().is_empty());
}

// ============================================================================
// Scenario B: one element added to an aggregate
// ============================================================================

#[test]
fn test_aggregate_gains_one_reference() {
    let schema = SchemaRegistry::global().require("request_criteria").unwrap();
    let plan = canonicalize_plan(
        &attrs([("all_included_request_criteria", Value::set(["c1", "c2"]))]),
        schema,
    )
    .unwrap();
    let state = canonicalize_state(
        &attrs([("all_included_request_criteria", Value::set(["c1"]))]),
        schema,
    );

    assert_eq!(
        diff(&plan, &state, schema, Some("aggregate")),
        vec![Operation::add_values(
            "all_included_request_criteria",
            ["c2".to_string()]
        )]
    );
}

#[test]
fn test_aggregate_update_sends_single_operation() {
    let remote = InMemoryRemote::new();
    remote.seed_object(
        "request_criteria",
        RemoteObject {
            id: ObjectId::new("both"),
            discriminant: Some("aggregate".to_string()),
            attributes: attrs([("all_included_request_criteria", Value::set(["c1"]))]),
        },
    );
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::aggregate_criteria("both", &["c1", "c2"]);
    let prior = ConfigurationObject::new("request_criteria", ObjectId::new("both"))
        .with_discriminant("aggregate");

    let report = reconciler.reconcile(&PassState::new(plan, Some(prior))).unwrap();

    assert_eq!(report.state, LifecycleState::Reconciled);
    let mutations = remote.mutations();
    assert_eq!(mutations.len(), 1);
    let RemoteCall::Update { operations, .. } = &mutations[0] else {
        panic!("expected an update");
    };
    assert_eq!(
        operations,
        &vec![Operation::add_values(
            "all_included_request_criteria",
            ["c2".to_string()]
        )]
    );
    assert_eq!(
        remote
            .object("request_criteria", &ObjectId::new("both"))
            .unwrap()
            .attributes["all_included_request_criteria"],
        Value::set(["c1", "c2"])
    );
}

// ============================================================================
// Scenario C: edit-only objects must exist
// ============================================================================

#[test]
fn test_edit_only_missing_is_hard_error() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let id = ObjectId::singleton();

    let err = reconciler.read("global_configuration", &id).unwrap_err();
    assert!(matches!(err, Error::NotFound { edit_only: true, .. }));

    let prior = fixtures::global_configuration();
    let err = reconciler
        .reconcile(&PassState::new(fixtures::global_configuration(), Some(prior)))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { edit_only: true, .. }));

    let err = reconciler.create(&fixtures::global_configuration()).unwrap_err();
    assert!(matches!(err, Error::NotFound { edit_only: true, .. }));

    assert!(remote.mutations().is_empty());
}

#[test]
fn test_edit_only_create_adopts() {
    let remote = InMemoryRemote::new();
    remote.seed(
        "global_configuration",
        ObjectId::singleton(),
        attrs([
            ("size_limit", Value::Int(1000)),
            ("time_limit", Value::from("60 s")),
            ("writability_mode", Value::from("enabled")),
            ("check_schema", Value::Bool(true)),
            ("instance_name", Value::from("ds1")),
        ]),
    );
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::global_configuration().with_attribute("writability_mode", "DISABLED");

    let report = reconciler.create(&plan).unwrap();

    assert!(!report.transitions.contains(&LifecycleState::Creating));
    assert_eq!(report.state, LifecycleState::Reconciled);
    assert_eq!(
        kinds(&remote.calls()),
        vec![CallKind::Get, CallKind::Update, CallKind::Get]
    );
    assert_eq!(
        report.applied,
        vec![Operation::replace("writability_mode", ["disabled".to_string()])]
    );
    let object = report.object.unwrap();
    assert_eq!(object.attributes["writability_mode"], Value::from("disabled"));
    assert_eq!(object.attributes["instance_name"], Value::from("ds1"));
}

#[test]
fn test_edit_only_delete_detaches() {
    let remote = InMemoryRemote::new();
    remote.seed("global_configuration", ObjectId::singleton(), AttributeMap::new());
    let reconciler = fixtures::reconciler(&remote);

    let report = reconciler.delete(&fixtures::global_configuration()).unwrap();

    assert_eq!(report.state, LifecycleState::Detached);
    assert!(remote.calls().is_empty());
    assert!(
        remote
            .object("global_configuration", &ObjectId::singleton())
            .is_some()
    );
}

// ============================================================================
// Create: second pass
// ============================================================================

#[test]
fn test_second_pass_applies_fields_ignored_by_add() {
    let remote = InMemoryRemote::new();
    remote.ignore_on_add("included_application_name");
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::simple_criteria("apps", &["search"])
        .with_attribute("included_application_name", Value::set(["portal"]));

    let report = reconciler.create(&plan).unwrap();

    assert_eq!(
        kinds(&remote.calls()),
        vec![CallKind::Add, CallKind::Get, CallKind::Update, CallKind::Get]
    );
    assert_eq!(
        report.applied,
        vec![Operation::add_values(
            "included_application_name",
            ["portal".to_string()]
        )]
    );
    assert_eq!(report.state, LifecycleState::Reconciled);
    assert_eq!(
        report.object.unwrap().attributes["included_application_name"],
        Value::set(["portal"])
    );
}

#[test]
fn test_second_pass_can_be_disabled() {
    let remote = InMemoryRemote::new();
    remote.ignore_on_add("included_application_name");
    let options = ReconcileOptions {
        second_pass: false,
        ..ReconcileOptions::default()
    };
    let reconciler = fixtures::reconciler_with(&remote, CURRENT_VERSION, options);
    let plan = fixtures::simple_criteria("apps", &["search"])
        .with_attribute("included_application_name", Value::set(["portal"]));

    let report = reconciler.create(&plan).unwrap();

    assert_eq!(kinds(&remote.calls()), vec![CallKind::Add, CallKind::Get]);
    assert!(
        !report
            .object
            .unwrap()
            .attributes
            .contains_key("included_application_name")
    );
}

// ============================================================================
// Read / reconcile
// ============================================================================

#[test]
fn test_owned_object_gone_on_read() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);

    let outcome = reconciler.read("request_criteria", &ObjectId::new("missing")).unwrap();
    assert_eq!(outcome, ReadOutcome::Gone);
}

#[test]
fn test_reconcile_recreates_vanished_owned_object() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::simple_criteria("writes", &["add"]);
    reconciler.create(&plan).unwrap();

    remote.forget("request_criteria", &plan.id);
    remote.clear_calls();

    let report = reconciler
        .reconcile(&PassState::new(plan.clone(), Some(plan.clone())))
        .unwrap();

    assert_eq!(
        kinds(&remote.calls()),
        vec![CallKind::Get, CallKind::Add, CallKind::Get]
    );
    assert_eq!(report.state, LifecycleState::Reconciled);
    assert_eq!(report.transitions[0], LifecycleState::Absent);
}

#[test]
fn test_reconcile_without_prior_creates() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);

    let report = reconciler
        .reconcile(&PassState::new(fixtures::db_index("userRoot", "uid", &["equality"]), None))
        .unwrap();

    assert_eq!(report.state, LifecycleState::Reconciled);
    assert!(
        remote
            .object("local_db_index", &ObjectId::nested(["userRoot"], "uid"))
            .is_some()
    );
}

// ============================================================================
// Update
// ============================================================================

#[test]
fn test_update_without_changes_makes_no_call() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::db_index("userRoot", "uid", &["equality"]);
    let created = reconciler.create(&plan).unwrap().object.unwrap();
    remote.clear_calls();

    let report = reconciler.update(&plan, &created).unwrap();

    assert!(remote.calls().is_empty());
    assert!(report.applied.is_empty());
    assert_eq!(report.transitions, vec![LifecycleState::Reconciled]);
}

#[test]
fn test_update_refreshes_state() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::db_index("userRoot", "uid", &["equality"]);
    let created = reconciler.create(&plan).unwrap().object.unwrap();
    remote.clear_calls();

    let wider = fixtures::db_index("userRoot", "uid", &["equality", "presence"]);
    let report = reconciler.update(&wider, &created).unwrap();

    assert_eq!(kinds(&remote.calls()), vec![CallKind::Update, CallKind::Get]);
    assert_eq!(
        report.object.unwrap().attributes["index_type"],
        Value::set(["equality", "presence"])
    );
    assert_eq!(
        report.transitions,
        vec![
            LifecycleState::Reconciled,
            LifecycleState::Updating,
            LifecycleState::Reconciled
        ]
    );
}

#[test]
fn test_immutable_change_replaces_owned_object() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::db_index("userRoot", "uid", &["equality"])
        .with_attribute("cache_mode", "cache-keys-only");
    let created = reconciler.create(&plan).unwrap().object.unwrap();
    remote.clear_calls();

    let changed = plan.clone().with_attribute("cache_mode", "no-caching");
    let report = reconciler.update(&changed, &created).unwrap();

    assert_eq!(
        kinds(&remote.mutations()),
        vec![CallKind::Delete, CallKind::Add]
    );
    assert!(report.transitions.contains(&LifecycleState::Deleted));
    assert!(report.transitions.contains(&LifecycleState::Creating));
    assert_eq!(report.state, LifecycleState::Reconciled);
    assert!(report.actions.iter().any(|a| a.contains("cache_mode is immutable")));
}

#[test]
fn test_replacement_rejected_before_delete() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::db_index("userRoot", "uid", &["equality"])
        .with_attribute("cache_mode", "cache-keys-only");
    let created = reconciler.create(&plan).unwrap().object.unwrap();
    remote.clear_calls();

    let changed = plan
        .clone()
        .with_attribute("cache_mode", "no-caching")
        .with_attribute("index_type", Value::set(["teleport"]));
    let err = reconciler.update(&changed, &created).unwrap_err();

    assert!(matches!(err, Error::Conflict { ref attribute, .. } if attribute == "index_type"));
    assert!(err.is_pre_flight());
    assert!(remote.mutations().is_empty());
    assert!(remote.object("local_db_index", &plan.id).is_some());
}

#[test]
fn test_variant_change_through_type_attribute_recreates() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let original = fixtures::simple_criteria("c1", &["add"]);
    reconciler.create(&original).unwrap();
    remote.clear_calls();

    let plan = ConfigurationObject::new("request_criteria", ObjectId::new("c1"))
        .with_attribute("type", "aggregate")
        .with_attribute("all_included_request_criteria", Value::set(["c2"]));
    let report = reconciler
        .reconcile(&PassState::new(plan.clone(), Some(original.clone())))
        .unwrap();

    assert_eq!(
        kinds(&remote.mutations()),
        vec![CallKind::Delete, CallKind::Add]
    );
    assert!(report.actions.iter().any(|a| a.contains("type changed from simple to aggregate")));
    let stored = remote.object("request_criteria", &plan.id).unwrap();
    assert_eq!(stored.discriminant.as_deref(), Some("aggregate"));
    assert_eq!(
        stored.attributes,
        attrs([("all_included_request_criteria", Value::set(["c2"]))])
    );
}

#[test]
fn test_variant_change_through_default_recreates() {
    let mut registry = SchemaRegistry::new();
    let mut discriminant = Discriminant::new("policy", &["size", "time"]);
    discriminant.default = Some("size".to_string());
    registry
        .register(
            ResourceSchema::new("log_rotation")
                .with_discriminant(discriminant)
                .attribute(AttributeSpec::new("max_size", SemanticType::Int).for_variants(&["size"]))
                .attribute(
                    AttributeSpec::new("interval", SemanticType::Duration).for_variants(&["time"]),
                ),
        )
        .unwrap();
    let remote = InMemoryRemote::new();
    remote.seed_object(
        "log_rotation",
        RemoteObject {
            id: ObjectId::new("daily"),
            discriminant: Some("time".to_string()),
            attributes: attrs([("interval", Value::from("1 d"))]),
        },
    );
    let reconciler = Reconciler::new(Box::new(remote.clone()), &registry, CURRENT_VERSION);

    let prior = ConfigurationObject::new("log_rotation", ObjectId::new("daily"))
        .with_discriminant("time")
        .with_attribute("interval", "1 d");
    let plan = ConfigurationObject::new("log_rotation", ObjectId::new("daily"))
        .with_attribute("max_size", Value::Int(100));
    reconciler.update(&plan, &prior).unwrap();

    assert_eq!(
        kinds(&remote.mutations()),
        vec![CallKind::Delete, CallKind::Add]
    );
    let stored = remote.object("log_rotation", &plan.id).unwrap();
    assert_eq!(stored.discriminant.as_deref(), Some("size"));
}

#[test]
fn test_immutable_change_on_edit_only_is_rejected() {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            ResourceSchema::new("crypto_manager")
                .edit_only_singleton()
                .attribute(AttributeSpec::new("cipher", SemanticType::String).immutable()),
        )
        .unwrap();
    let remote = InMemoryRemote::new();
    remote.seed(
        "crypto_manager",
        ObjectId::singleton(),
        attrs([("cipher", Value::from("AES"))]),
    );
    let reconciler = Reconciler::new(Box::new(remote.clone()), &registry, CURRENT_VERSION);

    let prior = ConfigurationObject::new("crypto_manager", ObjectId::singleton())
        .with_attribute("cipher", "AES");
    let plan = ConfigurationObject::new("crypto_manager", ObjectId::singleton())
        .with_attribute("cipher", "ChaCha20");

    let err = reconciler.update(&plan, &prior).unwrap_err();
    assert_eq!(err.validation_errors()[0].kind, ValidationKind::Immutable);
    assert!(remote.calls().is_empty());
}

#[test]
fn test_remote_failure_is_surfaced() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::db_index("userRoot", "uid", &["equality"]);
    let created = reconciler.create(&plan).unwrap().object.unwrap();
    remote.clear_calls();
    remote.fail_next(
        CallKind::Update,
        RemoteFailure::Status {
            code: 500,
            message: "index rebuild in progress".to_string(),
        },
    );

    let wider = fixtures::db_index("userRoot", "uid", &["equality", "ordering"]);
    let err = reconciler.update(&wider, &created).unwrap_err();

    assert!(matches!(err, Error::Remote { operation: "update", .. }));
    assert!(err.to_string().contains("index rebuild in progress"));
    assert_eq!(kinds(&remote.calls()), vec![CallKind::Update]);
}

// ============================================================================
// Fail before you call
// ============================================================================

#[test]
fn test_version_gate_blocks_before_remote() {
    let remote = InMemoryRemote::new();
    let reconciler =
        fixtures::reconciler_with(&remote, ProductVersion::new(9, 1, 0, 0), ReconcileOptions::default());
    let plan = fixtures::simple_criteria("apps", &["search"])
        .with_attribute("included_application_name", Value::set(["portal"]));

    let err = reconciler.create(&plan).unwrap_err();

    assert!(err.is_pre_flight());
    assert_eq!(err.validation_errors().len(), 1);
    assert!(remote.calls().is_empty());
}

#[test]
fn test_unknown_enum_value_is_conflict() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::simple_criteria("odd", &["teleport"]);

    let err = reconciler.create(&plan).unwrap_err();

    assert!(matches!(err, Error::Conflict { .. }));
    assert!(remote.calls().is_empty());
}

#[test]
fn test_cross_variant_attribute_blocks_before_remote() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::simple_criteria("mixed", &["add"])
        .with_attribute("all_included_request_criteria", Value::set(["c1"]));

    let err = reconciler.create(&plan).unwrap_err();

    assert_eq!(err.validation_errors()[0].kind, ValidationKind::NotApplicable);
    assert!(remote.calls().is_empty());
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_owned_object() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);
    let plan = fixtures::simple_criteria("writes", &["add"]);
    reconciler.create(&plan).unwrap();

    let report = reconciler.delete(&plan).unwrap();

    assert_eq!(report.state, LifecycleState::Absent);
    assert!(report.transitions.contains(&LifecycleState::Deleted));
    assert!(remote.object("request_criteria", &plan.id).is_none());
}

#[test]
fn test_delete_treats_404_as_deleted() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);

    let report = reconciler
        .delete(&fixtures::simple_criteria("never-existed", &["add"]))
        .unwrap();

    assert_eq!(report.state, LifecycleState::Absent);
    assert_eq!(kinds(&remote.calls()), vec![CallKind::Delete]);
}

// ============================================================================
// Import / list
// ============================================================================

#[test]
fn test_import_then_read() {
    let remote = InMemoryRemote::new();
    remote.seed(
        "local_db_index",
        ObjectId::nested(["userRoot"], "uid"),
        attrs([("index_type", Value::set(["equality"]))]),
    );
    let reconciler = fixtures::reconciler(&remote);

    let seed = reconciler.import("local_db_index", "userRoot/uid").unwrap();
    assert!(seed.attributes.is_empty());

    let current = found(reconciler.read(&seed.resource, &seed.id).unwrap());
    assert_eq!(current.attributes["index_type"], Value::set(["equality"]));
}

#[test]
fn test_import_segment_mismatch() {
    let remote = InMemoryRemote::new();
    let reconciler = fixtures::reconciler(&remote);

    let err = reconciler.import("local_db_index", "uid").unwrap_err();

    assert!(matches!(err, Error::InvalidImportId { .. }));
    assert!(err.to_string().contains("[backend_name]/[name]"));
    assert!(remote.calls().is_empty());
}

#[test]
fn test_list_scoped_by_parent() {
    let remote = InMemoryRemote::new();
    for (backend, name) in [("userRoot", "uid"), ("userRoot", "cn"), ("changelog", "uid")] {
        remote.seed(
            "local_db_index",
            ObjectId::nested([backend], name),
            AttributeMap::new(),
        );
    }
    let reconciler = fixtures::reconciler(&remote);

    let listed = reconciler
        .list("local_db_index", &["userRoot".to_string()], None)
        .unwrap();
    let keys: Vec<&str> = listed.iter().map(|o| o.id.key.as_str()).collect();
    assert_eq!(keys, vec!["cn", "uid"]);

    let filtered = reconciler
        .list("local_db_index", &["userRoot".to_string()], Some("ui"))
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

// ============================================================================
// Dry run
// ============================================================================

#[test]
fn test_dry_run_mutates_nothing() {
    let remote = InMemoryRemote::new();
    let options = ReconcileOptions {
        dry_run: true,
        ..ReconcileOptions::default()
    };
    let reconciler = fixtures::reconciler_with(&remote, CURRENT_VERSION, options);

    let report = reconciler
        .create(&fixtures::simple_criteria("writes", &["add"]))
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.state, LifecycleState::Creating);
    assert!(report.actions[0].starts_with("[dry-run] Would add"));
    assert!(remote.calls().is_empty());
}

#[test]
fn test_dry_run_update_reports_operations() {
    let remote = InMemoryRemote::new();
    remote.seed(
        "local_db_index",
        ObjectId::nested(["userRoot"], "uid"),
        attrs([("index_type", Value::set(["equality"]))]),
    );
    let options = ReconcileOptions {
        dry_run: true,
        ..ReconcileOptions::default()
    };
    let reconciler = fixtures::reconciler_with(&remote, CURRENT_VERSION, options);
    let prior = found(
        reconciler
            .read("local_db_index", &ObjectId::nested(["userRoot"], "uid"))
            .unwrap(),
    );

    let report = reconciler
        .update(&fixtures::db_index("userRoot", "uid", &["substring"]), &prior)
        .unwrap();

    assert_eq!(report.state, LifecycleState::Updating);
    assert_eq!(report.applied.len(), 3);
    assert!(remote.mutations().is_empty());
}
