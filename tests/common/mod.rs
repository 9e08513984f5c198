//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from any suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Once;

pub use metalayer::{
    AttributeDef, AttributeSchema, ComplexType, DerivedIndexRegistry, EngineConfig, Error,
    MetadataTree, Overlay, ScalarKind, TreePath, Value,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Schema fixture
// ============================================================================

/// Dataset-style schema used across suites.
///
/// Root attributes:
/// - `title`: single text
/// - `issued`: single date
/// - `keywords`: repeated text
/// - `contact`: single `Contact`
/// - `distributions`: repeated `Distribution`
/// - `fields`: repeated `Field`
pub fn catalog_schema() -> AttributeSchema {
    AttributeSchema::builder()
        .attribute(AttributeDef::scalar("title", ScalarKind::Text).with_label("Title"))
        .attribute(AttributeDef::scalar("issued", ScalarKind::Date))
        .attribute(AttributeDef::scalar("keywords", ScalarKind::Text).repeated())
        .attribute(AttributeDef::complex("contact", "Contact"))
        .attribute(AttributeDef::complex("distributions", "Distribution").repeated())
        .attribute(AttributeDef::complex("fields", "Field").repeated())
        .complex_type(ComplexType::new(
            "Contact",
            [
                AttributeDef::scalar("email", ScalarKind::Text),
                AttributeDef::scalar("phone", ScalarKind::Text),
            ],
        ))
        .complex_type(ComplexType::new(
            "Distribution",
            [
                AttributeDef::scalar("url", ScalarKind::Text),
                AttributeDef::scalar("format", ScalarKind::Choice),
                AttributeDef::scalar("size", ScalarKind::Number),
            ],
        ))
        .complex_type(ComplexType::new(
            "Field",
            [
                AttributeDef::scalar("name", ScalarKind::Text),
                AttributeDef::scalar("type", ScalarKind::Text),
                AttributeDef::scalar("alias", ScalarKind::Text),
                AttributeDef::scalar("domainValue", ScalarKind::Text),
            ],
        ))
        .build()
        .expect("catalog schema is valid")
}

// ============================================================================
// Tree helpers
// ============================================================================

/// Parse a path literal.
pub fn path(s: &str) -> TreePath {
    s.parse().expect("valid path literal")
}

/// Build a tree from `(path, value)` pairs, applied in order.
pub fn tree_with(entries: &[(&str, Value)]) -> MetadataTree {
    let mut tree = MetadataTree::new();
    for (p, value) in entries {
        tree.set(&path(p), value.clone()).expect("fixture path is settable");
    }
    tree
}

/// Tree holding only a `keywords` list.
pub fn keywords(values: &[&str]) -> MetadataTree {
    let mut tree = MetadataTree::new();
    tree.replace_values("keywords", values.iter().map(|v| Value::from(*v)).collect())
        .expect("keywords is a scalar list");
    tree
}

/// Text values under `key`, in order.
pub fn texts(tree: &MetadataTree, key: &str) -> Vec<String> {
    tree.values(key)
        .expect("scalar key")
        .iter()
        .map(|v| v.as_str().unwrap_or_default().to_string())
        .collect()
}

/// Text at `p`, if any.
pub fn text_at(tree: &MetadataTree, p: &str) -> Option<String> {
    tree.get(&path(p)).and_then(Value::as_str).map(str::to_string)
}
