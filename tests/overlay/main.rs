//! Overlay merge integration tests
//!
//! Exercises clear/merge/init/copy end to end against the catalog schema:
//! priority rules, preservation of user content, idempotence and unlinking.

#[path = "../common/mod.rs"]
mod common;

use chrono::NaiveDate;
use common::*;
use proptest::prelude::*;

fn engine(schema: &AttributeSchema) -> Overlay<'_> {
    init_tracing();
    Overlay::new(schema, EngineConfig::default())
}

// ============================================================================
// Priority
// ============================================================================

#[test]
fn test_single_scalar_taken_from_highest_priority_source() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let high = tree_with(&[("title", "A".into())]);
    let low = tree_with(&[("title", "B".into())]);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &[high, low], &mut registry).unwrap();

    assert_eq!(text_at(&resource, "title").as_deref(), Some("A"));
    assert!(registry.is_derived("title", 0));
}

#[test]
fn test_lower_source_fills_gap_left_by_higher() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let high = tree_with(&[("title", "A".into())]);
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let low = tree_with(&[("title", "B".into()), ("issued", date.into())]);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &[high, low], &mut registry).unwrap();

    assert_eq!(text_at(&resource, "title").as_deref(), Some("A"));
    assert_eq!(resource.get(&path("issued")), Some(&Value::Date(date)));
}

#[test]
fn test_repeated_values_concatenate_lowest_priority_first() {
    let schema = catalog_schema();
    let overlay = engine(&schema);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    let summary = overlay
        .merge(
            &mut resource,
            &[keywords(&["a1", "a2"]), keywords(&["b1"])],
            &mut registry,
        )
        .unwrap();

    assert_eq!(texts(&resource, "keywords"), ["b1", "a1", "a2"]);
    assert_eq!(registry.indices("keywords"), &[0, 1, 2]);
    assert_eq!(summary.sources, 2);
    assert_eq!(summary.derived, 3);
}

// ============================================================================
// User content
// ============================================================================

#[test]
fn test_user_values_trail_template_block() {
    let schema = catalog_schema();
    let overlay = engine(&schema);

    let mut resource = keywords(&["u1", "u2"]);
    let mut registry = DerivedIndexRegistry::new();
    overlay
        .merge(&mut resource, &[keywords(&["t1", "t2"])], &mut registry)
        .unwrap();

    assert_eq!(texts(&resource, "keywords"), ["t1", "t2", "u1", "u2"]);
    assert_eq!(registry.indices("keywords"), &[0, 1]);
    assert!(!registry.is_derived("keywords", 2));
}

#[test]
fn test_clear_leaves_only_user_content() {
    let schema = catalog_schema();
    let overlay = engine(&schema);

    let mut resource = keywords(&["u1"]);
    resource.set(&path("fields[0].name"), "user-field".into()).unwrap();
    let mut template = keywords(&["t1"]);
    template.set(&path("fields[0].name"), "tpl-field".into()).unwrap();
    template.set(&path("title"), "T".into()).unwrap();

    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &[template], &mut registry).unwrap();
    assert_eq!(resource.size("fields"), 2);

    let removed = overlay.clear_derived(&mut resource, &mut registry).unwrap();

    assert_eq!(removed, 3);
    assert!(registry.is_empty());
    assert_eq!(texts(&resource, "keywords"), ["u1"]);
    assert_eq!(resource.size("fields"), 1);
    assert_eq!(text_at(&resource, "fields[0].name").as_deref(), Some("user-field"));
    assert!(resource.get(&path("title")).is_none());
}

#[test]
fn test_clear_deletes_highest_index_first() {
    let schema = catalog_schema();
    let overlay = engine(&schema);

    let mut resource = keywords(&["t0", "u", "t2", "u3"]);
    let mut registry = DerivedIndexRegistry::new();
    registry.mark_derived("keywords", [2, 0]);

    overlay.clear_derived(&mut resource, &mut registry).unwrap();

    assert_eq!(texts(&resource, "keywords"), ["u", "u3"]);
}

#[test]
fn test_user_edits_inside_template_element_are_retracted_with_it() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let template = tree_with(&[("distributions[0].url", "https://tpl".into())]);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &[template], &mut registry).unwrap();
    resource.set(&path("distributions[0].size"), Value::Number(12.0)).unwrap();

    overlay.clear_derived(&mut resource, &mut registry).unwrap();

    assert_eq!(resource.size("distributions"), 0);
}

// ============================================================================
// Re-merge and unlink
// ============================================================================

#[test]
fn test_remerge_is_idempotent() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let mut a = keywords(&["a1"]);
    a.set(&path("title"), "A".into()).unwrap();
    a.set(&path("distributions[0].url"), "https://a".into()).unwrap();
    let b = keywords(&["b1", "b2"]);
    let sources = [a, b];

    let mut resource = keywords(&["u1"]);
    resource.set(&path("distributions[0].url"), "https://mine".into()).unwrap();
    let mut registry = DerivedIndexRegistry::new();

    overlay.merge(&mut resource, &sources, &mut registry).unwrap();
    let first_tree = resource.clone();
    let first_registry = registry.clone();

    overlay.merge(&mut resource, &sources, &mut registry).unwrap();

    assert_eq!(resource, first_tree);
    assert_eq!(registry, first_registry);
}

#[test]
fn test_unlinking_a_template_restores_remaining_overlay() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let a = keywords(&["a1", "a2"]);
    let b = keywords(&["b1"]);
    let user = keywords(&["u1"]);

    let mut linked = user.clone();
    let mut registry = DerivedIndexRegistry::new();
    overlay
        .merge(&mut linked, &[a, b.clone()], &mut registry)
        .unwrap();
    overlay
        .merge(&mut linked, std::slice::from_ref(&b), &mut registry)
        .unwrap();

    let mut fresh = user;
    let mut fresh_registry = DerivedIndexRegistry::new();
    overlay
        .merge(&mut fresh, &[b], &mut fresh_registry)
        .unwrap();

    assert_eq!(linked, fresh);
    assert_eq!(registry, fresh_registry);
    assert_eq!(texts(&linked, "keywords"), ["b1", "u1"]);
}

#[test]
fn test_merge_with_no_sources_only_clears() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let mut resource = keywords(&["u1"]);
    let mut registry = DerivedIndexRegistry::new();
    overlay
        .merge(&mut resource, &[keywords(&["t1"])], &mut registry)
        .unwrap();

    let summary = overlay.merge(&mut resource, &[], &mut registry).unwrap();

    assert_eq!(summary.cleared, 1);
    assert_eq!(summary.derived, 0);
    assert_eq!(texts(&resource, "keywords"), ["u1"]);
}

// ============================================================================
// Complex attributes
// ============================================================================

#[test]
fn test_single_complex_replaced_as_a_whole() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let mut resource = tree_with(&[
        ("contact.email", "user@example.org".into()),
        ("contact.phone", "555".into()),
    ]);
    let template = tree_with(&[("contact.email", "tpl@example.org".into())]);

    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &[template], &mut registry).unwrap();

    assert_eq!(text_at(&resource, "contact.email").as_deref(), Some("tpl@example.org"));
    assert!(resource.get(&path("contact.phone")).is_none());
    assert_eq!(registry.indices("contact"), &[0]);
}

#[test]
fn test_template_elements_are_independent_copies() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let template = tree_with(&[
        ("distributions[0].url", "https://tpl".into()),
        ("distributions[0].format", Value::Choice("csv".to_string())),
    ]);

    let mut first = MetadataTree::new();
    let mut second = MetadataTree::new();
    let mut r1 = DerivedIndexRegistry::new();
    let mut r2 = DerivedIndexRegistry::new();
    overlay
        .merge(&mut first, std::slice::from_ref(&template), &mut r1)
        .unwrap();
    overlay.merge(&mut second, &[template], &mut r2).unwrap();

    first.set(&path("distributions[0].url"), "https://edited".into()).unwrap();

    assert_eq!(text_at(&second, "distributions[0].url").as_deref(), Some("https://tpl"));
    assert_eq!(text_at(&second, "distributions[0].format").as_deref(), Some("csv"));
}

#[test]
fn test_kind_mismatch_in_source_rejected() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let template = tree_with(&[("issued", "not a date".into())]);

    let err = overlay
        .merge(
            &mut MetadataTree::new(),
            &[template],
            &mut DerivedIndexRegistry::new(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::SchemaMismatch { ref key, .. } if key == "issued"));
}

#[test]
fn test_kind_mismatch_inside_template_element_rejected() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let template = tree_with(&[
        ("distributions[0].url", "https://tpl".into()),
        ("distributions[0].size", "huge".into()),
    ]);

    let err = overlay
        .merge(
            &mut MetadataTree::new(),
            &[template],
            &mut DerivedIndexRegistry::new(),
        )
        .unwrap_err();

    assert!(matches!(err, Error::SchemaMismatch { ref key, .. } if key == "size"));
}

// ============================================================================
// Persisted registry and schema
// ============================================================================

#[test]
fn test_persisted_registry_clears_highest_index_first() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let mut resource = keywords(&["t0", "u0", "t1", "u1"]);
    let mut registry: DerivedIndexRegistry =
        serde_json::from_value(serde_json::json!({"keywords": [2, 0]})).unwrap();

    overlay.clear_derived(&mut resource, &mut registry).unwrap();

    assert_eq!(texts(&resource, "keywords"), ["u0", "u1"]);
}

#[test]
fn test_registry_round_trip_then_remerge() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let sources = [keywords(&["a1", "a2"]), keywords(&["b1"])];
    let mut resource = keywords(&["u1"]);
    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &sources, &mut registry).unwrap();
    let expected = resource.clone();

    let stored = serde_json::to_string(&registry).unwrap();
    let mut restored: DerivedIndexRegistry = serde_json::from_str(&stored).unwrap();
    overlay.merge(&mut resource, &sources, &mut restored).unwrap();

    assert_eq!(resource, expected);
    assert_eq!(restored, registry);
}

#[test]
fn test_loaded_schema_with_duplicate_key_merges_once() {
    let schema: AttributeSchema = serde_json::from_value(serde_json::json!({
        "attributes": [
            {"key": "keywords", "kind": "scalar", "value": "text", "cardinality": "repeated"},
            {"key": "keywords", "kind": "scalar", "value": "text", "cardinality": "repeated"}
        ]
    }))
    .unwrap();
    let overlay = engine(&schema);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    overlay
        .merge(&mut resource, &[keywords(&["a"])], &mut registry)
        .unwrap();

    assert_eq!(texts(&resource, "keywords"), ["a"]);
    assert_eq!(registry.indices("keywords"), &[0]);
}

// ============================================================================
// Init and copy
// ============================================================================

#[test]
fn test_init_after_merge_fills_every_declared_path() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let template = tree_with(&[("fields[0].name", "id".into())]);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    overlay.merge(&mut resource, &[template], &mut registry).unwrap();
    overlay.init(&mut resource, None).unwrap();

    assert_eq!(resource.get(&path("title")), Some(&Value::Null));
    assert_eq!(resource.get(&path("issued")), Some(&Value::Null));
    assert_eq!(resource.get(&path("contact.phone")), Some(&Value::Null));
    assert_eq!(resource.get(&path("fields[0].domainValue")), Some(&Value::Null));
    assert_eq!(text_at(&resource, "fields[0].name").as_deref(), Some("id"));
    assert_eq!(resource.size("distributions"), 0);
}

#[test]
fn test_copy_restricted_to_type_attributes() {
    let schema = catalog_schema();
    let overlay = engine(&schema);
    let source = tree_with(&[
        ("url", "https://src".into()),
        ("size", Value::Number(42.0)),
        ("email", "not-a-distribution-attribute".into()),
    ]);

    let mut dest = MetadataTree::new();
    overlay.copy(&source, &mut dest, "Distribution").unwrap();

    assert_eq!(text_at(&dest, "url").as_deref(), Some("https://src"));
    assert_eq!(dest.get(&path("size")), Some(&Value::Number(42.0)));
    assert!(dest.get(&path("email")).is_none());
}

#[test]
fn test_config_from_toml_drives_policy() {
    let schema = AttributeSchema {
        attributes: metalayer::AttributeSet::from_defs([AttributeDef::complex("ghost", "Ghost")]),
        types: Default::default(),
    };
    let config = EngineConfig::from_toml_str("unknown_schema = \"lenient\"\nmax_depth = 4\n").unwrap();
    let overlay = Overlay::new(&schema, config);

    let mut resource = MetadataTree::new();
    let mut registry = DerivedIndexRegistry::new();
    registry.mark_derived("vanished", [0]);

    let summary = overlay.merge(&mut resource, &[], &mut registry).unwrap();
    assert_eq!(summary.cleared, 0);
    assert!(registry.is_empty());
    overlay.init(&mut resource, None).unwrap();
}

// ============================================================================
// Properties
// ============================================================================

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

proptest! {
    #[test]
    fn prop_clear_after_merge_restores_user_list(
        user in prop::collection::vec(word(), 0..5),
        templates in prop::collection::vec(prop::collection::vec(word(), 0..4), 0..4),
    ) {
        let schema = catalog_schema();
        let overlay = Overlay::new(&schema, EngineConfig::default());
        let user_refs: Vec<&str> = user.iter().map(String::as_str).collect();
        let sources: Vec<MetadataTree> = templates
            .iter()
            .map(|t| keywords(&t.iter().map(String::as_str).collect::<Vec<_>>()))
            .collect();

        let mut resource = keywords(&user_refs);
        let mut registry = DerivedIndexRegistry::new();
        overlay.merge(&mut resource, &sources, &mut registry).unwrap();

        let total: usize = templates.iter().map(Vec::len).sum();
        prop_assert_eq!(registry.indices("keywords").len(), total);
        prop_assert_eq!(resource.size("keywords"), total + user.len());

        overlay.clear_derived(&mut resource, &mut registry).unwrap();
        prop_assert_eq!(texts(&resource, "keywords"), user);
    }

    #[test]
    fn prop_merge_twice_equals_merge_once(
        user in prop::collection::vec(word(), 0..4),
        templates in prop::collection::vec(prop::collection::vec(word(), 0..3), 0..3),
    ) {
        let schema = catalog_schema();
        let overlay = Overlay::new(&schema, EngineConfig::default());
        let user_refs: Vec<&str> = user.iter().map(String::as_str).collect();
        let sources: Vec<MetadataTree> = templates
            .iter()
            .map(|t| keywords(&t.iter().map(String::as_str).collect::<Vec<_>>()))
            .collect();

        let mut resource = keywords(&user_refs);
        let mut registry = DerivedIndexRegistry::new();
        overlay.merge(&mut resource, &sources, &mut registry).unwrap();
        let once = resource.clone();

        overlay.merge(&mut resource, &sources, &mut registry).unwrap();
        prop_assert_eq!(resource, once);
    }
}
