use std::sync::Arc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use schema_notation::{
    parse, parse_with, Allocation, BaseKind, Catalog, Config, Error, Parsed, Parser, Path, Type, TypeKind, TypeRef,
};

fn root(v: Value) -> Arc<Type> {
    parse(&v).unwrap().root_type().cloned().unwrap()
}

fn shared() -> Config {
    Config { allocation: Allocation::SharedInstance, ..Config::default() }
}

fn parse_config(v: Value, config: Config) -> Parsed {
    Parser::new(Catalog::global()).with_config(config).parse(&v).unwrap()
}

fn fields(t: &Type) -> &schema_notation::ObjectShape {
    match &t.kind {
        TypeKind::Object(shape) => shape,
        other => panic!("object expected, got {other:?}"),
    }
}

#[test]
fn every_spelling_is_the_same_catalog_node() {
    let catalog = Catalog::global();
    for kind in BaseKind::ALL {
        let node = catalog.get(kind);
        for spelling in kind.spellings() {
            let doc = parse_config(json!(spelling), shared());
            let TypeRef::Type(t) = &doc.root else { panic!("inline root expected") };
            assert!(Arc::ptr_eq(t, node), "{spelling}");
        }
    }
}

#[test]
fn fresh_copies_are_distinct_but_equal() {
    let doc = parse(&json!(["s", "str"])).unwrap();
    let t = doc.root_type().unwrap();
    let TypeKind::Array { items } = &t.kind else { panic!("array expected") };
    let (a, b) = (items[0].as_type().unwrap(), items[1].as_type().unwrap());
    assert_eq!(a, b);
    assert!(!Arc::ptr_eq(a, b));
    assert!(!Arc::ptr_eq(a, Catalog::global().get(BaseKind::String)));
}

#[test]
fn generic_shapes_are_equivalent() {
    assert_eq!(root(json!({})), root(json!({ "*": "*" })));
    assert_eq!(root(json!({})), root(json!({ "$base": "obj" })));
    assert_eq!(root(json!([])), root(json!(["*"])));
    assert_eq!(root(json!([])), root(json!({ "$array": [] })));
    assert!(root(json!({ "*": "*" })).is_generic());
}

#[test]
fn single_alternative_multis_collapse() {
    assert_eq!(root(json!({ "$multi": ["int"] })), root(json!("int")));
    assert_eq!(root(json!({ "$multi": [{ "$multi": ["s"] }] })), root(json!("string")));
    assert_eq!(root(json!({ "$base": "mul" })), Catalog::global().get(BaseKind::Multi).clone());

    assert_eq!(root(json!([{ "$multi": ["i"] }])), root(json!(["int"])));
    assert_eq!(root(json!({ "f": { "$multi": ["i"] } })), root(json!({ "f": "int" })));
    assert_eq!(
        root(json!({ "f": { "$multi": [{ "$multi": ["i"] }, "s"] } })),
        root(json!({ "f": { "$multi": ["int", "s"] } })),
    );

    let t = root(json!({ "$multi": [["int"]], "$desc": "ids" }));
    assert_eq!(t.base(), BaseKind::Array);
    assert_eq!(t.meta.description.as_deref(), Some("ids"));
}

#[test]
fn named_types_live_in_the_registry() {
    let doc = parse(&json!({ "$name": "t1", "a": "int", "b": { "$name": "t2", "c": "xt" } })).unwrap();
    assert_eq!(doc.root, TypeRef::Name("t1".into()));
    assert_eq!(doc.registry.names().collect::<Vec<_>>(), vec!["t2", "t1"]);
    assert_eq!(doc.unresolved.iter().collect::<Vec<_>>(), vec!["xt"]);

    let t1 = doc.root_type().unwrap();
    assert_eq!(fields(t1).fields["b"], TypeRef::Name("t2".into()));
    let t2 = doc.registry.get("t2").unwrap();
    assert_eq!(fields(t2).fields["c"], TypeRef::Name("xt".into()));
}

#[test]
fn forward_and_recursive_references() {
    let doc = parse(&json!({
        "first": "later",
        "later": { "$name": "later", "$tn": "L", "next": "L", "value": "int" }
    }))
    .unwrap();
    assert!(doc.unresolved.is_empty());
    let t = doc.root_type().unwrap();
    assert_eq!(fields(t).fields["first"], TypeRef::Name("later".into()));
    let later = doc.registry.get("L").unwrap();
    assert_eq!(fields(later).fields["next"], TypeRef::Name("later".into()));
}

#[test]
fn type_value_wrapper_is_its_payload() {
    assert_eq!(root(json!({ "$type": "t", "$value": { "x": "int" } })), root(json!({ "x": "int" })));
    assert_eq!(root(json!({ "$t": "type", "$v": "s" })), root(json!("s")));
}

#[test]
fn plain_fields_named_like_properties() {
    let t = root(json!({ "base": "obj", "id": "n" }));
    let shape = fields(&t);
    assert_eq!(shape.fields.keys().collect::<Vec<_>>(), vec!["base", "id"]);
    assert!(shape.match_all.is_none());
}

#[test]
fn pattern_fields_and_match_all() {
    let t = root(json!({ "id": "int", "x_*": "s", "lit^*": "b", "*": "f" }));
    let shape = fields(&t);
    assert_eq!(shape.fields.keys().collect::<Vec<_>>(), vec!["id", "lit^*"]);
    assert_eq!(shape.pattern_fields.keys().collect::<Vec<_>>(), vec!["x_*"]);
    assert!(shape.field_for("x_1").unwrap().is_bare(BaseKind::String));
    assert!(shape.field_for("lit^*").unwrap().is_bare(BaseKind::Boolean));
    assert!(shape.field_for("zzz").unwrap().is_bare(BaseKind::Float));
}

#[test]
fn stipulations_are_opaque() {
    let stip = json!({ "$name": "not-a-type", "min": [1, 2] });
    let doc = parse(&json!({ "$base": "int", "$stip": stip.clone() })).unwrap();
    assert!(doc.registry.is_empty());
    assert_eq!(doc.root_type().unwrap().meta.stipulation, Some(stip));
}

#[test]
fn custom_properties() {
    let mut config = Config::default();
    config.custom_properties.insert("u".into(), "unit".into());
    let doc = parse_config(json!({ "$base": "int", "$u": "ms" }), config.clone());
    assert_eq!(doc.root_type().unwrap().meta.custom["unit"], json!("ms"));

    let doc = parse_config(json!({ "$base": "int", "$unit": "ms" }), config);
    assert_eq!(doc.root_type().unwrap().meta.custom["unit"], json!("ms"));
}

#[test]
fn resolver_precedes_catalog() {
    let mut money = Type::new(TypeKind::Scalar(BaseKind::Decimal));
    money.meta.name = Some("money".into());
    let money = Arc::new(money);
    let resolver = |n: &str| -> Option<Arc<Type>> {
        match n {
            "money" | "d" => Some(money.clone()),
            _ => None,
        }
    };
    let doc = parse_with(&json!({ "a": "money", "b": "d", "c": "dec" }), &resolver).unwrap();
    assert!(doc.unresolved.is_empty());
    let t = doc.root_type().unwrap();
    assert_eq!(fields(t).fields["a"].as_name(), Some("money"));
    assert_eq!(fields(t).fields["b"].as_name(), Some("money"));
    assert!(fields(t).fields["c"].is_bare(BaseKind::Decimal));
}

#[test]
fn resolved_named_types_join_the_registry() {
    let mut money = Type::new(TypeKind::Scalar(BaseKind::Decimal));
    money.meta.name = Some("money".into());
    let money = Arc::new(money);
    let resolver = |n: &str| (n == "m$").then(|| money.clone());

    let doc = parse_with(&json!({ "a": "m$", "b": "m$" }), &resolver).unwrap();
    assert!(doc.unresolved.is_empty());
    assert_eq!(doc.registry.names().collect::<Vec<_>>(), vec!["money"]);
    let t = doc.root_type().unwrap();
    let a = fields(t).fields["a"].resolve(&doc.registry).unwrap();
    assert_eq!(a.base(), BaseKind::Decimal);

    let emitted = doc.to_value(&Config::default()).unwrap();
    assert_eq!(emitted, json!({ "a": { "$base": "dec", "$name": "money" }, "b": "money" }));
    assert_eq!(parse_with(&emitted, &resolver).unwrap(), doc);

    let bare = parse_with(&json!("m$"), &resolver).unwrap();
    assert_eq!(bare.root_type().map(|t| t.base()), Some(BaseKind::Decimal));
}

#[test]
fn document_names_shadow_resolved_names() {
    let mut money = Type::new(TypeKind::Scalar(BaseKind::Decimal));
    money.meta.name = Some("money".into());
    let money = Arc::new(money);
    let resolver = |n: &str| (n == "m$").then(|| money.clone());

    let doc = parse_with(&json!({ "a": "m$", "b": { "$name": "money", "$base": "int" } }), &resolver).unwrap();
    assert_eq!(doc.registry.len(), 1);
    assert_eq!(doc.registry.get("money").unwrap().base(), BaseKind::Integer);
}

#[test]
fn settle_resolves_pending_names() {
    let mut doc = parse(&json!({ "a": "ext", "b": "other" })).unwrap();
    let resolver = |n: &str| (n == "ext").then(|| Catalog::global().get(BaseKind::Integer).clone());
    doc.settle(&resolver).unwrap();
    assert_eq!(doc.unresolved.iter().collect::<Vec<_>>(), vec!["other"]);
    let ext = doc.registry.get("ext").unwrap();
    assert_eq!(ext.base(), BaseKind::Integer);
    assert_eq!(ext.name(), Some("ext"));
}

#[test]
fn merge_combines_documents() {
    let mut a = parse(&json!({ "$name": "a", "next": "b" })).unwrap();
    let b = parse(&json!({ "$name": "b", "x": "int" })).unwrap();
    a.merge(b).unwrap();
    assert!(a.unresolved.is_empty());
    assert_eq!(a.registry.names().collect::<Vec<_>>(), vec!["a", "b"]);

    let again = parse(&json!({ "$name": "b" })).unwrap();
    assert!(a.merge(again).is_err());
}

#[test]
fn failed_merge_leaves_the_document_unchanged() {
    let mut doc = parse(&json!({ "$name": "aa", "x": "cc", "y": "bb" })).unwrap();
    let before = doc.clone();
    let other = parse(&json!({ "$name": "aa", "c": { "$name": "cc" } })).unwrap();
    assert_eq!(other.registry.names().collect::<Vec<_>>(), vec!["cc", "aa"]);

    let err = doc.merge(other).unwrap_err();
    assert!(matches!(err, Error::NameCollision { ref name, .. } if name == "aa"));
    assert_eq!(doc, before);
}

#[test]
fn failed_settle_leaves_the_document_unchanged() {
    let mut doc = parse(&json!({ "$name": "aa", "p": "x", "q": "y" })).unwrap();
    let before = doc.clone();
    let resolver = |n: &str| -> Option<Arc<Type>> {
        match n {
            "x" => Some(Catalog::global().get(BaseKind::Integer).clone()),
            "y" => {
                let mut y = Type::new(TypeKind::Scalar(BaseKind::String));
                y.meta.name = Some("y".into());
                y.meta.tiny_name = Some("aa".into());
                Some(Arc::new(y))
            }
            _ => None,
        }
    };
    let err = doc.settle(&resolver).unwrap_err();
    assert!(matches!(err, Error::NameCollision { ref name, .. } if name == "aa"));
    assert_eq!(doc, before);
    assert_eq!(doc.unresolved.iter().collect::<Vec<_>>(), vec!["x", "y"]);
}

#[test]
fn shared_instance_reuses_leaves() {
    let doc = parse_config(json!(["s", { "$base": "int", "$desc": "n" }, { "$base": "int", "$desc": "n" }]), shared());
    let t = doc.root_type().unwrap();
    let TypeKind::Array { items } = &t.kind else { panic!("array expected") };
    let item = |i: usize| items[i].as_type().unwrap().clone();
    assert!(Arc::ptr_eq(&item(0), Catalog::global().get(BaseKind::String)));
    assert!(Arc::ptr_eq(&item(1), &item(2)));
}

#[test]
fn parent_links() {
    let config = Config { link_parents: true, ..Config::default() };
    let doc = parse_config(json!({ "a": { "b": "int" } }), config);
    let t = doc.root_type().unwrap();
    assert_eq!(t.parent, None);
    let a = fields(t).fields["a"].as_type().unwrap();
    assert_eq!(a.parent, Some(Path::root()));
    let b = fields(a).fields["b"].as_type().unwrap();
    assert_eq!(b.parent, Some(Path::root().child("a")));
}
