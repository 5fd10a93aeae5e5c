use openapi_from_comments::{
    collector::{collect, CollectError},
    config::Config,
    schema_generator::{Schema, SchemaKind},
};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let file_path = root.join(path);
        std::fs::create_dir_all(file_path.parent().unwrap()).unwrap();
        std::fs::write(&file_path, content).unwrap();
    }
}

fn properties(schema: &Schema) -> Vec<(&str, &SchemaKind)> {
    schema
        .properties()
        .unwrap()
        .iter()
        .map(|(name, s)| (name.as_str(), &s.kind))
        .collect()
}

#[test]
fn test_types_from_another_crate() {
    let temp_dir = TempDir::new().unwrap();
    let shared = temp_dir.path().join("shared");
    let orders = temp_dir.path().join("orders");

    write_files(
        &shared,
        &[
            ("src/lib.rs", "pub mod money;\n"),
            (
                "src/money.rs",
                r#"
pub struct Money {
    pub cents: i64,
    pub currency: Currency,
}

pub enum Currency {
    Eur,
    Usd,
}

/// Uniquely identifies an order
pub struct OrderId(pub u64);

pub type Tags = Vec<String>;
"#,
            ),
        ],
    );
    write_files(
        &orders,
        &[(
            "src/lib.rs",
            r#"
use shared::money::{Money, OrderId};

/// An order.
pub struct Order {
    pub id: OrderId,
    pub total: Money,
    pub tags: shared::money::Tags,
    pub lines: Vec<Line>,
}

pub struct Line {
    pub sku: String,
    pub order: Option<Box<Order>>,
}

/// GET /orders/:id orders
/// Fetch an order.
///
/// Response: $ref: Order
pub fn get_order() {}
"#,
        )],
    );

    let program = collect(&[orders, shared], &Config::default()).unwrap();
    assert_eq!(program.endpoints.len(), 1);

    let keys: Vec<&str> = program.references.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["money.Money", "orders.Line", "orders.Order"]);

    let order = program.reference("orders.Order").unwrap();
    assert_eq!(order.package, "orders");
    assert_eq!(order.info, "An order.");
    let schema = order.schema.as_ref().unwrap();
    let props = schema.properties().unwrap();

    assert_eq!(props["id"].kind, SchemaKind::Primitive("integer".to_string()));
    assert_eq!(props["id"].format.as_deref(), Some("int64"));
    assert_eq!(props["total"].kind, SchemaKind::Reference("money.Money".to_string()));
    assert_eq!(
        props["tags"].kind,
        SchemaKind::Array(Box::new(Schema::primitive("string", None)))
    );
    assert_eq!(
        props["lines"].kind,
        SchemaKind::Array(Box::new(Schema::reference("orders.Line")))
    );

    let line = program.reference("orders.Line").unwrap().schema.as_ref().unwrap();
    assert_eq!(
        properties(line),
        vec![
            ("order", &SchemaKind::Reference("orders.Order".to_string())),
            ("sku", &SchemaKind::Primitive("string".to_string())),
        ]
    );

    let money = program.reference("money.Money").unwrap();
    assert_eq!(money.package, "shared::money");
    let currency = &money.schema.as_ref().unwrap().properties().unwrap()["currency"];
    assert_eq!(currency.enum_values, vec!["Eur", "Usd"]);
}

#[test]
fn test_mutually_recursive_structs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("cyclic");
    write_files(
        &root,
        &[(
            "src/lib.rs",
            r#"
pub struct Foo {
    pub bar: OtherStruct,
}

pub struct OtherStruct {
    pub foo: Foo,
}

/// GET /foo
///
/// Response:
///   $ref: Foo
pub fn foo() {}
"#,
        )],
    );

    let program = collect(&[root], &Config::default()).unwrap();
    let keys: Vec<&str> = program.references.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cyclic.Foo", "cyclic.OtherStruct"]);
    assert!(program.references.values().all(|r| r.is_complete()));

    let foo = program.reference("cyclic.Foo").unwrap().schema.as_ref().unwrap();
    assert_eq!(
        properties(foo),
        vec![("bar", &SchemaKind::Reference("cyclic.OtherStruct".to_string()))]
    );
    let other = program.reference("cyclic.OtherStruct").unwrap().schema.as_ref().unwrap();
    assert_eq!(
        properties(other),
        vec![("foo", &SchemaKind::Reference("cyclic.Foo".to_string()))]
    );
}

#[test]
fn test_resolution_errors_are_collected() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("bad");
    write_files(
        &root,
        &[(
            "src/lib.rs",
            r#"
pub enum Event {
    Created { id: u64 },
    Deleted(u64),
}

pub struct Blob {
    pub data: serde_json::Value,
}

/// GET /events
///
/// Response: $ref: Event
pub fn events() {}

/// GET /blobs
///
/// Response: $ref: Blob
pub fn blobs() {}

/// GET /missing
///
/// Response: $ref: nowhere.Thing
pub fn missing() {}
"#,
        )],
    );

    let err = collect(&[PathBuf::from(&root)], &Config::default()).unwrap_err();
    let CollectError::Blocks(list) = &err else {
        panic!("expected block errors, got {:?}", err);
    };
    let messages: Vec<String> = list.iter().map(|e| e.error.to_string()).collect();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].contains("is not a struct"), "{}", messages[0]);
    assert!(messages[1].contains("unsupported type"), "{}", messages[1]);
    assert!(messages[2].contains("cannot resolve package"), "{}", messages[2]);
    assert!(err.to_string().ends_with("3 errors"));
}
