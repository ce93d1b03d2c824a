//! Encoding and decoding plain records: aliases, omission, defaults and errors.

use recast::{
    BuildError, CodegenOptions, ConvertErrorKind, Data, DecodeOptions, EncodeOptions, Engine, Field, Model,
    ModelConfig, PathSegment, Record, TypeExpr, value,
};
use recast_testhelpers::test;

fn point() -> Model {
    Model::new("Point")
        .field(Field::new("x", TypeExpr::int()))
        .field(Field::new("y", TypeExpr::int()))
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn point_round_trips_with_coercion() {
    let engine = Engine::new();
    engine.declare(point()).unwrap();

    let p = Record::new("Point").with("x", 1).with("y", 2);
    assert_eq!(engine.encode(&p, &EncodeOptions::new()).unwrap(), value!({"x": 1, "y": 2}));

    let decoded = engine
        .decode("Point", &value!({"x": "1", "y": "2"}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded, p);
}

#[test]
fn nested_records_use_their_own_procedures() {
    let engine = Engine::new();
    engine
        .declare_all([
            point(),
            Model::new("Line")
                .field(Field::new("start", TypeExpr::named("Point")))
                .field(Field::new("end", TypeExpr::named("Point"))),
        ])
        .unwrap();

    let line = Record::new("Line")
        .with("start", Record::new("Point").with("x", 0).with("y", 0))
        .with("end", Record::new("Point").with("x", 3).with("y", 4));
    let encoded = engine.encode(&line, &EncodeOptions::new()).unwrap();
    assert_eq!(encoded, value!({"start": {"x": 0, "y": 0}, "end": {"x": 3, "y": 4}}));
    assert_eq!(engine.decode("Line", &encoded, &DecodeOptions::new()).unwrap(), line);
}

#[test]
fn inherited_fields_come_first() {
    let engine = Engine::new();
    engine
        .declare_all([
            point(),
            Model::new("Point3").extends("Point", []).field(Field::new("z", TypeExpr::int())),
        ])
        .unwrap();

    let p = Record::new("Point3").with("x", 1).with("y", 2).with("z", 3);
    let encoded = engine.encode(&p, &EncodeOptions::new()).unwrap();
    let keys: Vec<&str> = match &encoded {
        recast::Value::Object(obj) => obj.keys().collect(),
        other => panic!("expected an object, got {other:?}"),
    };
    assert_eq!(keys, ["x", "y", "z"]);
}

// ============================================================================
// Aliases
// ============================================================================

fn boxed(config: ModelConfig) -> Model {
    Model::new("Box")
        .field(Field::new("items", TypeExpr::list(TypeExpr::int())))
        .config(config.alias("items", "Items"))
}

#[test]
fn aliases_are_used_both_ways() {
    let engine = Engine::new();
    engine.declare(boxed(ModelConfig::new())).unwrap();

    let b = Record::new("Box").with("items", vec![1, 2]);
    assert_eq!(engine.encode(&b, &EncodeOptions::new()).unwrap(), value!({"Items": [1, 2]}));

    let decoded = engine
        .decode("Box", &value!({"Items": [1, 2]}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded, b);

    let err = engine
        .decode("Box", &value!({"items": [1, 2]}), &DecodeOptions::new())
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ConvertErrorKind::MissingField { ref model, ref field } if model == "Box" && field == "items"
    ));
}

#[test]
fn permissive_decoding_also_reads_field_names() {
    let engine = Engine::new();
    engine
        .declare(boxed(ModelConfig::new().allow_deserialization_not_by_alias(true)))
        .unwrap();

    for input in [value!({"items": [1, 2]}), value!({"Items": [1, 2]})] {
        let decoded = engine.decode("Box", &input, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded.get("items"), Some(&Data::list([1, 2])));
    }
}

#[test]
fn field_alias_beats_config_alias() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Tagged")
                .field(Field::new("label", TypeExpr::str()).alias("Label"))
                .config(ModelConfig::new().alias("label", "LABEL")),
        )
        .unwrap();

    let r = Record::new("Tagged").with("label", "hi");
    assert_eq!(engine.encode(&r, &EncodeOptions::new()).unwrap(), value!({"Label": "hi"}));
    assert_eq!(
        engine.decode("Tagged", &value!({"Label": "hi"}), &DecodeOptions::new()).unwrap(),
        r
    );
}

#[test]
fn serialize_by_alias_can_be_turned_off() {
    let engine = Engine::new();
    engine
        .declare(boxed(ModelConfig::new().serialize_by_alias(false)))
        .unwrap();

    let b = Record::new("Box").with("items", vec![7]);
    assert_eq!(engine.encode(&b, &EncodeOptions::new()).unwrap(), value!({"items": [7]}));
    // decoding still reads the alias
    assert!(engine.decode("Box", &value!({"Items": [7]}), &DecodeOptions::new()).is_ok());
}

#[test]
fn per_call_by_alias_needs_its_flag() {
    let engine = Engine::new();
    engine
        .declare_all([
            boxed(ModelConfig::new()),
            Model::new("Crate")
                .field(Field::new("items", TypeExpr::list(TypeExpr::int())))
                .config(
                    ModelConfig::new()
                        .alias("items", "Items")
                        .options(CodegenOptions::BY_ALIAS_FLAG),
                ),
        ])
        .unwrap();

    let b = Record::new("Box").with("items", vec![1]);
    let err = engine.encode(&b, &EncodeOptions::new().by_alias(false)).unwrap_err();
    assert!(matches!(
        err.kind,
        ConvertErrorKind::Build(BuildError::OptionNotEnabled { option: "by_alias", .. })
    ));

    let c = Record::new("Crate").with("items", vec![1]);
    let opts = EncodeOptions::new().by_alias(false);
    assert_eq!(engine.encode(&c, &opts).unwrap(), value!({"items": [1]}));
    assert_eq!(engine.encode(&c, &EncodeOptions::new()).unwrap(), value!({"Items": [1]}));
}

// ============================================================================
// Omission
// ============================================================================

fn profile(config: ModelConfig) -> Model {
    Model::new("Profile")
        .field(Field::new("name", TypeExpr::str()))
        .field(Field::new("nickname", TypeExpr::optional(TypeExpr::str())).default(Data::None))
        .field(Field::new("visits", TypeExpr::int()).default(0))
        .config(config)
}

#[test]
fn nothing_is_omitted_by_default() {
    let engine = Engine::new();
    engine.declare(profile(ModelConfig::new())).unwrap();

    let r = Record::new("Profile").with("name", "ana").with("nickname", Data::None).with("visits", 0);
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new()).unwrap(),
        value!({"name": "ana", "nickname": null, "visits": 0})
    );
}

#[test]
fn configured_omission() {
    let engine = Engine::new();
    engine
        .declare(profile(ModelConfig::new().omit_none(true).omit_default(true)))
        .unwrap();

    let r = Record::new("Profile").with("name", "ana").with("nickname", Data::None).with("visits", 0);
    assert_eq!(engine.encode(&r, &EncodeOptions::new()).unwrap(), value!({"name": "ana"}));

    let r = r.with("visits", 3);
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new()).unwrap(),
        value!({"name": "ana", "visits": 3})
    );
}

#[test]
fn per_call_omit_none_toggles_when_enabled() {
    let engine = Engine::new();
    engine
        .declare(profile(ModelConfig::new().options(CodegenOptions::OMIT_NONE_FLAG)))
        .unwrap();

    let r = Record::new("Profile").with("name", "ana").with("nickname", Data::None).with("visits", 1);
    let on = engine.encode(&r, &EncodeOptions::new().omit_none(true)).unwrap();
    assert_eq!(on, value!({"name": "ana", "visits": 1}));
    let off = engine.encode(&r, &EncodeOptions::new()).unwrap();
    assert_eq!(off, value!({"name": "ana", "nickname": null, "visits": 1}));

    let err = engine.encode(&r, &EncodeOptions::new().omit_default(true)).unwrap_err();
    assert!(matches!(
        err.kind,
        ConvertErrorKind::Build(BuildError::OptionNotEnabled { option: "omit_default", .. })
    ));
}

#[test]
fn omitted_fields_are_never_written() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Secret")
                .field(Field::new("user", TypeExpr::str()))
                .field(Field::new("password", TypeExpr::str()).omit()),
        )
        .unwrap();

    let r = Record::new("Secret").with("user", "u").with("password", "hunter2");
    assert_eq!(engine.encode(&r, &EncodeOptions::new()).unwrap(), value!({"user": "u"}));
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn missing_inputs_take_defaults() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Settings")
                .field(Field::new("retries", TypeExpr::int()).default(3))
                .field(Field::new("tags", TypeExpr::list(TypeExpr::str())).default_factory(|| Data::list(["x"]))),
        )
        .unwrap();

    let decoded = engine.decode("Settings", &value!({}), &DecodeOptions::new()).unwrap();
    assert_eq!(decoded, Record::new("Settings").with("retries", 3).with("tags", Data::list(["x"])));
}

#[test]
fn fields_outside_init_ignore_input() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Counter")
                .field(Field::new("start", TypeExpr::int()))
                .field(Field::new("ticks", TypeExpr::int()).default(0).no_init()),
        )
        .unwrap();

    let decoded = engine
        .decode("Counter", &value!({"start": 5, "ticks": 9}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded.get("ticks"), Some(&Data::Int(0)));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn missing_required_field() {
    let engine = Engine::new();
    engine.declare(point()).unwrap();

    let err = engine
        .decode("Point", &value!({"x": 1}), &DecodeOptions::new())
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ConvertErrorKind::MissingField { ref model, ref field } if model == "Point" && field == "y"
    ));

    let err = engine
        .encode(&Record::new("Point").with("x", 1), &EncodeOptions::new())
        .unwrap_err();
    assert!(matches!(err.kind, ConvertErrorKind::MissingField { ref field, .. } if field == "y"));
}

#[test]
fn invalid_values_name_the_field() {
    let engine = Engine::new();
    engine.declare(point()).unwrap();

    let err = engine
        .decode("Point", &value!({"x": "abc", "y": 1}), &DecodeOptions::new())
        .unwrap_err();
    match &err.kind {
        ConvertErrorKind::InvalidFieldValue {
            model,
            field,
            shape,
            value,
            ..
        } => {
            assert_eq!(model, "Point");
            assert_eq!(field, "x");
            assert_eq!(shape, "int");
            assert_eq!(value, &value!("abc"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.path, [PathSegment::Field("x".into())]);
}

#[test]
fn nested_failures_carry_the_full_path() {
    let engine = Engine::new();
    engine
        .declare_all([
            point(),
            Model::new("Polygon").field(Field::new("corners", TypeExpr::list(TypeExpr::named("Point")))),
        ])
        .unwrap();

    let input = value!({"corners": [{"x": 0, "y": 0}, {"x": 1, "y": "up"}]});
    let err = engine.decode("Polygon", &input, &DecodeOptions::new()).unwrap_err();
    assert!(matches!(err.kind, ConvertErrorKind::InvalidFieldValue { ref field, .. } if field == "y"));
    assert_eq!(err.path_string(), ".corners[1].y");
}

#[test]
fn non_object_input_is_a_type_mismatch() {
    let engine = Engine::new();
    engine.declare(point()).unwrap();

    let err = engine
        .decode("Point", &value!([1, 2]), &DecodeOptions::new())
        .unwrap_err();
    assert!(matches!(err.kind, ConvertErrorKind::TypeMismatch { .. }));
}

#[test]
fn extra_keys_are_rejected_when_forbidden() {
    let engine = Engine::new();
    engine
        .declare(point().config(ModelConfig::new().forbid_extra_keys(true)))
        .unwrap();

    let err = engine
        .decode("Point", &value!({"x": 1, "y": 2, "z": 3}), &DecodeOptions::new())
        .unwrap_err();
    match err.kind {
        ConvertErrorKind::ExtraKeys { model, keys } => {
            assert_eq!(model, "Point");
            assert_eq!(keys, ["z"]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_models_fail_at_build_time() {
    let engine = Engine::new();
    let err = engine.encoder("Nope", &[], None).unwrap_err();
    assert_eq!(err, BuildError::UnknownModel { name: "Nope".into() });
}

#[test]
fn duplicate_declarations_are_rejected() {
    let engine = Engine::new();
    engine.declare(point()).unwrap();
    let err = engine.declare(point()).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateDeclaration { ref name, .. } if name == "Point"));
}
