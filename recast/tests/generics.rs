//! Generic models, parameter packs, recursion and forward references.

use std::sync::Arc;

use recast::{
    BuildError, CodegenOptions, Data, DecodeOptions, Dialect, Discriminator, EncodeOptions, Engine, Field, Model,
    ModelConfig, Record, TypeExpr, TypeParam, Value, value,
};
use recast_testhelpers::test;

fn wrapper() -> Model {
    Model::new("Wrapper")
        .param(TypeParam::new("T"))
        .field(Field::new("value", TypeExpr::param("T")))
}

fn decode_with(engine: &Engine, model: &str, args: Vec<TypeExpr>, input: Value) -> Record {
    engine
        .decode(model, &input, &DecodeOptions::new().type_args(args))
        .unwrap()
}

// ============================================================================
// Type parameters
// ============================================================================

#[test]
fn type_arguments_select_the_conversion() {
    let engine = Engine::new();
    engine.declare(wrapper()).unwrap();

    let typed = decode_with(&engine, "Wrapper", vec![TypeExpr::int()], value!({"value": "5"}));
    assert_eq!(typed.get("value"), Some(&Data::Int(5)));

    // unbound parameters pass values through
    let untyped = decode_with(&engine, "Wrapper", vec![], value!({"value": "5"}));
    assert_eq!(untyped.get("value"), Some(&Data::from("5")));

    let with_int = engine.encoder("Wrapper", &[TypeExpr::int()], None).unwrap();
    let with_str = engine.encoder("Wrapper", &[TypeExpr::str()], None).unwrap();
    assert!(!Arc::ptr_eq(&with_int, &with_str));
}

#[test]
fn generic_fields_and_bases_bind_arguments() {
    let engine = Engine::new();
    engine
        .declare_all([
            wrapper(),
            Model::new("IntBox").extends("Wrapper", [TypeExpr::int()]),
            Model::new("Page").field(Field::new(
                "items",
                TypeExpr::list(TypeExpr::generic("Wrapper", [TypeExpr::float()])),
            )),
        ])
        .unwrap();

    let boxed = decode_with(&engine, "IntBox", vec![], value!({"value": "3"}));
    assert_eq!(boxed, Record::new("IntBox").with("value", 3));

    let page = decode_with(&engine, "Page", vec![], value!({"items": [{"value": "1.5"}]}));
    assert_eq!(
        page.get("items"),
        Some(&Data::list([Record::new("Wrapper").with("value", 1.5)]))
    );
}

#[test]
fn subtypes_inherit_the_declared_type_arguments() {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Base")
                .abstract_model()
                .param(TypeParam::new("T"))
                .field(Field::new("x", TypeExpr::param("T")))
                .config(ModelConfig::new().discriminator(Discriminator::by_field("kind").subtypes())),
            Model::new("Sub")
                .extends("Base", [])
                .field(Field::new("kind", TypeExpr::str()).default("sub")),
            Model::new("Holder").field(Field::new("item", TypeExpr::generic("Base", [TypeExpr::bytes()]))),
        ])
        .unwrap();
    let sub = Record::new("Sub").with("x", Data::Bytes(b"hi".to_vec())).with("kind", "sub");
    let holder = Record::new("Holder").with("item", sub);

    let encoded = engine.encode(&holder, &EncodeOptions::new()).unwrap();
    assert_eq!(encoded, value!({"item": {"x": "aGk=", "kind": "sub"}}));

    // the tag picks `Sub`, which still reads `x` as bytes
    let decoded = engine.decode("Holder", &encoded, &DecodeOptions::new()).unwrap();
    assert_eq!(decoded, holder);
}

#[test]
fn unbound_parameters_write_bytes_like_the_dialect() {
    let engine = Engine::new();
    engine
        .declare(wrapper().config(ModelConfig::new().options(CodegenOptions::DIALECT_SUPPORT)))
        .unwrap();
    let r = Record::new("Wrapper").with("value", Data::Bytes(b"hi".to_vec()));

    assert_eq!(engine.encode(&r, &EncodeOptions::new()).unwrap(), value!({"value": "aGk="}));
    let native = Dialect::new("native").native_bytes(true);
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new().dialect(native)).unwrap(),
        value!({"value": (Value::Bytes(b"hi".to_vec()))})
    );
}

#[test]
fn unbound_parameters_fall_back_to_bounds_and_constraints() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Measure")
                .param(TypeParam::new("N").bound(TypeExpr::int()))
                .param(TypeParam::new("U").constraints([TypeExpr::bool(), TypeExpr::str()]))
                .field(Field::new("n", TypeExpr::param("N")))
                .field(Field::new("unit", TypeExpr::param("U"))),
        )
        .unwrap();

    let m = decode_with(&engine, "Measure", vec![], value!({"n": "4", "unit": "cm"}));
    assert_eq!(m, Record::new("Measure").with("n", 4).with("unit", "cm"));
}

#[test]
fn too_many_type_arguments_are_rejected() {
    let engine = Engine::new();
    engine.declare(wrapper()).unwrap();

    let err = engine
        .encoder("Wrapper", &[TypeExpr::int(), TypeExpr::str()], None)
        .unwrap_err();
    assert!(matches!(err, BuildError::TypeArguments { ref model, .. } if model == "Wrapper"));
}

// ============================================================================
// Parameter packs
// ============================================================================

fn row() -> Model {
    Model::new("Row")
        .param(TypeParam::pack("Ts"))
        .field(Field::new("cells", TypeExpr::tuple([TypeExpr::unpack(TypeExpr::param("Ts"))])))
}

#[test]
fn packs_expand_into_tuples() {
    let engine = Engine::new();
    engine.declare(row()).unwrap();

    let r = decode_with(
        &engine,
        "Row",
        vec![TypeExpr::int(), TypeExpr::bool()],
        value!({"cells": ["1", "true"]}),
    );
    assert_eq!(r.get("cells"), Some(&Data::Tuple(vec![Data::Int(1), Data::Bool(true)])));

    let encoded = engine
        .encode(&r, &EncodeOptions::new().type_args([TypeExpr::int(), TypeExpr::bool()]))
        .unwrap();
    assert_eq!(encoded, value!({"cells": [1, true]}));
}

#[test]
fn unbounded_pack_arguments_make_variadic_tuples() {
    let engine = Engine::new();
    engine.declare(row()).unwrap();

    let args = vec![TypeExpr::int(), TypeExpr::unpack(TypeExpr::var_tuple(TypeExpr::str()))];
    let r = decode_with(&engine, "Row", args, value!({"cells": ["1", 2, 3]}));
    assert_eq!(
        r.get("cells"),
        Some(&Data::Tuple(vec![Data::Int(1), Data::from("2"), Data::from("3")]))
    );

    // without arguments every cell passes through
    let r = decode_with(&engine, "Row", vec![], value!({"cells": [1, "a"]}));
    assert_eq!(r.get("cells"), Some(&Data::Tuple(vec![Data::Int(1), Data::from("a")])));
}

// ============================================================================
// Recursion
// ============================================================================

#[test]
fn self_referential_models_are_synthesized_once() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Node")
                .field(Field::new("value", TypeExpr::int()))
                .field(Field::new("children", TypeExpr::list(TypeExpr::SelfType))),
        )
        .unwrap();

    let input = value!({"value": 1, "children": [{"value": 2, "children": [{"value": 3, "children": []}]}]});
    let tree = engine.decode("Node", &input, &DecodeOptions::new()).unwrap();
    assert_eq!(engine.stats().syntheses, 1);

    let leaf = Record::new("Node").with("value", 3).with("children", Data::list(Vec::<Data>::new()));
    let middle = Record::new("Node").with("value", 2).with("children", Data::list([leaf]));
    assert_eq!(tree, Record::new("Node").with("value", 1).with("children", Data::list([middle])));

    assert_eq!(engine.encode(&tree, &EncodeOptions::new()).unwrap(), input);
    assert_eq!(engine.stats().syntheses, 2);
}

#[test]
fn mutually_recursive_models() {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Person")
                .field(Field::new("name", TypeExpr::str()))
                .field(Field::new("employer", TypeExpr::optional(TypeExpr::named("Company"))).default(Data::None)),
            Model::new("Company")
                .field(Field::new("name", TypeExpr::str()))
                .field(Field::new("owner", TypeExpr::optional(TypeExpr::named("Person"))).default(Data::None)),
        ])
        .unwrap();

    let input = value!({"name": "ada", "employer": {"name": "acme", "owner": {"name": "bob", "employer": null}}});
    let person = engine.decode("Person", &input, &DecodeOptions::new()).unwrap();
    let owner = person
        .get("employer")
        .and_then(Data::as_record)
        .and_then(|c| c.get("owner"))
        .and_then(Data::as_record)
        .unwrap();
    assert_eq!(owner.get("name"), Some(&Data::from("bob")));
    assert_eq!(engine.encode(&person, &EncodeOptions::new()).unwrap(), input);
}

// ============================================================================
// Forward references
// ============================================================================

fn parent(config: ModelConfig) -> Model {
    Model::new("Parent")
        .field(Field::new("child", TypeExpr::named("Child")))
        .config(config)
}

#[test]
fn eager_registration_needs_every_name() {
    let engine = Engine::new();
    engine.declare(parent(ModelConfig::new())).unwrap();

    let err = engine.register("Parent").unwrap_err();
    assert!(matches!(err, BuildError::UnresolvedForwardRef { ref name, .. } if name == "Child"));
}

#[test]
fn lazy_registration_waits_for_first_use() {
    let engine = Engine::new();
    engine.declare(parent(ModelConfig::new().lazy_compilation(true))).unwrap();
    engine.register("Parent").unwrap();

    engine
        .declare(Model::new("Child").field(Field::new("age", TypeExpr::int())))
        .unwrap();
    let r = Record::new("Parent").with("child", Record::new("Child").with("age", 4));
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new()).unwrap(),
        value!({"child": {"age": 4}})
    );
}

#[test]
fn registration_fills_the_cache() {
    let engine = Engine::new();
    engine
        .declare(Model::new("Child").field(Field::new("age", TypeExpr::int())))
        .unwrap();
    engine.register("Child").unwrap();
    let before = engine.stats();
    assert_eq!(before.syntheses, 2);

    engine
        .decode("Child", &value!({"age": 1}), &DecodeOptions::new())
        .unwrap();
    let after = engine.stats();
    assert_eq!(after.syntheses, before.syntheses);
    assert_eq!(after.hits, before.hits + 1);
}
