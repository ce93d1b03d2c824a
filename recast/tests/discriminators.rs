//! Picking concrete models while decoding.

use recast::{
    Annotation, BuildError, ConvertErrorKind, Data, DecodeOptions, Discriminator, EncodeOptions, Engine, EnumDecl,
    EnumValue, Field, Model, ModelConfig, ProcedureKind, Record, TypeExpr, value,
};
use recast_testhelpers::test;

fn zoo(disc: Discriminator) -> Engine {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Animal")
                .abstract_model()
                .field(Field::new("name", TypeExpr::str()))
                .config(ModelConfig::new().discriminator(disc)),
            Model::new("Cat")
                .extends("Animal", [])
                .field(Field::new("kind", TypeExpr::str()).default("cat"))
                .field(Field::new("lives", TypeExpr::int()).default(9)),
            Model::new("Dog")
                .extends("Animal", [])
                .field(Field::new("kind", TypeExpr::str()).default("dog"))
                .field(Field::new("good", TypeExpr::bool()).default(true)),
            Model::new("Zoo").field(Field::new("star", TypeExpr::named("Animal"))),
        ])
        .unwrap();
    engine
}

fn tagged() -> Discriminator {
    Discriminator::by_field("kind").subtypes()
}

// ============================================================================
// Tag field
// ============================================================================

#[test]
fn tag_selects_the_subtype() {
    let engine = zoo(tagged());
    let decoded = engine
        .decode("Animal", &value!({"kind": "dog", "name": "rex"}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(
        decoded,
        Record::new("Dog").with("name", "rex").with("kind", "dog").with("good", true)
    );
}

#[test]
fn selection_is_deterministic() {
    let input = value!({"kind": "cat", "name": "tom", "lives": 3});
    let expected = Record::new("Cat").with("name", "tom").with("kind", "cat").with("lives", 3);
    for _ in 0..3 {
        let engine = zoo(tagged());
        for _ in 0..5 {
            let decoded = engine.decode("Animal", &input, &DecodeOptions::new()).unwrap();
            assert_eq!(decoded, expected);
        }
    }
}

#[test]
fn unknown_and_missing_tags_name_the_tag_field() {
    let engine = zoo(tagged());

    let err = engine
        .decode("Animal", &value!({"kind": "bird", "name": "tweety"}), &DecodeOptions::new())
        .unwrap_err();
    match &err.kind {
        ConvertErrorKind::InvalidFieldValue { field, value, .. } => {
            assert_eq!(field, "kind");
            assert_eq!(value, &value!("bird"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let err = engine
        .decode("Animal", &value!({"name": "tweety"}), &DecodeOptions::new())
        .unwrap_err();
    match &err.kind {
        ConvertErrorKind::InvalidFieldValue { field, value, .. } => {
            assert_eq!(field, "kind");
            assert!(value.is_null());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn fields_typed_as_the_base_dispatch_and_encode_the_subtype() {
    let engine = zoo(tagged());
    let input = value!({"star": {"kind": "cat", "name": "tom"}});
    let decoded = engine.decode("Zoo", &input, &DecodeOptions::new()).unwrap();
    let star = decoded.get("star").and_then(Data::as_record).unwrap();
    assert_eq!(star.model(), "Cat");

    let encoded = engine.encode(&decoded, &EncodeOptions::new()).unwrap();
    assert_eq!(
        encoded,
        value!({"star": {"name": "tom", "kind": "cat", "lives": 9}})
    );
}

#[test]
fn the_base_decoder_is_a_dispatcher() {
    let engine = zoo(tagged());
    let procedure = engine.decoder("Animal", &[], None).unwrap();
    assert_eq!(procedure.kind(), ProcedureKind::Dispatch);
    assert!(procedure.source().contains(r#"by_tag("kind", Cat, Dog)"#));

    // subtypes do not inherit the discriminator
    let procedure = engine.decoder("Cat", &[], None).unwrap();
    assert_eq!(procedure.kind(), ProcedureKind::Decode);
}

#[test]
fn taggers_replace_tag_defaults() {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Shape").abstract_model().config(
                ModelConfig::new().discriminator(
                    Discriminator::by_field("type")
                        .subtypes()
                        .tagger(|name| vec![name.to_lowercase()]),
                ),
            ),
            Model::new("Circle")
                .extends("Shape", [])
                .field(Field::new("r", TypeExpr::float())),
            Model::new("Square")
                .extends("Shape", [])
                .field(Field::new("side", TypeExpr::float())),
        ])
        .unwrap();

    let decoded = engine
        .decode("Shape", &value!({"type": "square", "side": 2}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded, Record::new("Square").with("side", 2.0));
}

#[test]
fn supertypes_are_candidates_after_subtypes() {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Msg").field(Field::new("kind", TypeExpr::str()).default("msg")),
            Model::new("Ping")
                .extends("Msg", [])
                .field(Field::new("kind", TypeExpr::str()).default("ping"))
                .config(ModelConfig::new().discriminator(Discriminator::by_field("kind").subtypes().supertypes())),
            Model::new("LongPing")
                .extends("Ping", [])
                .field(Field::new("kind", TypeExpr::str()).default("long"))
                .field(Field::new("millis", TypeExpr::int())),
        ])
        .unwrap();

    let procedure = engine.decoder("Ping", &[], None).unwrap();
    assert!(procedure.source().contains("LongPing, Ping, Msg"));

    for (tag, model) in [("long", "LongPing"), ("ping", "Ping"), ("msg", "Msg")] {
        let decoded = engine
            .decode("Ping", &value!({"kind": tag, "millis": 5}), &DecodeOptions::new())
            .unwrap();
        assert_eq!(decoded.model(), model);
    }
}

#[test]
fn shared_tags_fall_back_to_trial() {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Job")
                .abstract_model()
                .config(ModelConfig::new().discriminator(Discriminator::by_field("kind").subtypes())),
            Model::new("Build")
                .extends("Job", [])
                .field(Field::new("kind", TypeExpr::str()).default("task"))
                .field(Field::new("target", TypeExpr::str())),
            Model::new("Deploy")
                .extends("Job", [])
                .field(Field::new("kind", TypeExpr::str()).default("task"))
                .field(Field::new("env", TypeExpr::str())),
        ])
        .unwrap();

    let decoded = engine
        .decode("Job", &value!({"kind": "task", "env": "prod"}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded.model(), "Deploy");
}

#[test]
fn enum_tags_use_member_values() {
    let engine = Engine::new();
    engine
        .declare(EnumDecl::new("Level").member("Low", "lo").member("High", "hi"))
        .unwrap();
    engine
        .declare_all([
            Model::new("Alert")
                .abstract_model()
                .config(ModelConfig::new().discriminator(Discriminator::by_field("level").subtypes())),
            Model::new("Notice")
                .extends("Alert", [])
                .field(Field::new("level", TypeExpr::named("Level")).default(EnumValue::new("Level", "Low"))),
            Model::new("Page")
                .extends("Alert", [])
                .field(Field::new("level", TypeExpr::named("Level")).default(EnumValue::new("Level", "High"))),
        ])
        .unwrap();

    let decoded = engine
        .decode("Alert", &value!({"level": "hi"}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded, Record::new("Page").with("level", EnumValue::new("Level", "High")));
}

// ============================================================================
// Annotated unions
// ============================================================================

fn drawing_engine(disc: Discriminator) -> Engine {
    let engine = Engine::new();
    let member = TypeExpr::union([TypeExpr::named("Circle"), TypeExpr::named("Square")])
        .annotated([Annotation::Discriminator(disc)]);
    engine
        .declare_all([
            Model::new("Circle")
                .field(Field::new("kind", TypeExpr::literal(["circle"])))
                .field(Field::new("r", TypeExpr::float())),
            Model::new("Square")
                .field(Field::new("kind", TypeExpr::literal(["square"])))
                .field(Field::new("side", TypeExpr::float())),
            Model::new("Drawing").field(Field::new("shapes", TypeExpr::list(member))),
        ])
        .unwrap();
    engine
}

#[test]
fn literal_tags_pick_union_members() {
    let engine = drawing_engine(Discriminator::by_field("kind"));
    let input = value!({"shapes": [{"kind": "square", "side": 2}, {"kind": "circle", "r": 1}]});
    let decoded = engine.decode("Drawing", &input, &DecodeOptions::new()).unwrap();
    assert_eq!(
        decoded,
        Record::new("Drawing").with(
            "shapes",
            Data::list([
                Record::new("Square").with("kind", "square").with("side", 2.0),
                Record::new("Circle").with("kind", "circle").with("r", 1.0),
            ])
        )
    );

    let encoded = engine.encode(&decoded, &EncodeOptions::new()).unwrap();
    assert_eq!(engine.decode("Drawing", &encoded, &DecodeOptions::new()).unwrap(), decoded);
}

fn pair_engine(disc: Discriminator) -> Engine {
    let engine = Engine::new();
    let either = TypeExpr::union([TypeExpr::named("A"), TypeExpr::named("B")])
        .annotated([Annotation::Discriminator(disc)]);
    engine
        .declare_all([
            Model::new("A").field(Field::new("x", TypeExpr::int())),
            Model::new("B").field(Field::new("y", TypeExpr::str())),
            Model::new("Holder").field(Field::new("value", either)),
        ])
        .unwrap();
    engine
}

#[test]
fn trial_decoding_takes_the_first_success() {
    let engine = pair_engine(Discriminator::by_trial());

    let decoded = engine
        .decode("Holder", &value!({"value": {"y": "s"}}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded.get("value").and_then(Data::as_record).map(Record::model), Some("B"));

    let decoded = engine
        .decode("Holder", &value!({"value": {"x": 1, "y": "s"}}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded.get("value").and_then(Data::as_record).map(Record::model), Some("A"));
}

#[test]
fn unique_trial_decoding_reports_ambiguity() {
    let engine = pair_engine(Discriminator::by_trial().unique());

    let err = engine
        .decode("Holder", &value!({"value": {"x": 1, "y": "s"}}), &DecodeOptions::new())
        .unwrap_err();
    match &err.kind {
        ConvertErrorKind::Ambiguous { candidates, .. } => assert_eq!(candidates, &["A", "B"]),
        other => panic!("unexpected {other:?}"),
    }

    assert!(
        engine
            .decode("Holder", &value!({"value": {"y": "s"}}), &DecodeOptions::new())
            .is_ok()
    );
}

#[test]
fn exhausted_trials_keep_every_attempt() {
    let engine = pair_engine(Discriminator::by_trial());
    let err = engine
        .decode("Holder", &value!({"value": {}}), &DecodeOptions::new())
        .unwrap_err();
    let ConvertErrorKind::InvalidFieldValue { source, .. } = &err.kind else {
        panic!("unexpected {:?}", err.kind);
    };
    match &source.kind {
        ConvertErrorKind::UnionExhausted { attempts, .. } => assert_eq!(attempts.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn model_discriminators_need_a_candidate_set() {
    let engine = zoo(Discriminator::by_field("kind"));
    let err = engine.decoder("Animal", &[], None).unwrap_err();
    assert!(matches!(err, BuildError::InvalidDiscriminator { ref target, .. } if target == "Animal"));
}

#[test]
fn discriminated_unions_must_hold_models() {
    let engine = Engine::new();
    let bad = TypeExpr::union([TypeExpr::int(), TypeExpr::str()])
        .annotated([Annotation::Discriminator(Discriminator::by_trial())]);
    engine
        .declare(Model::new("Bad").field(Field::new("v", bad)))
        .unwrap();
    assert!(matches!(
        engine.decoder("Bad", &[], None).unwrap_err(),
        BuildError::InvalidDiscriminator { .. }
    ));
}
