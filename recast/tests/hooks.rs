//! Pre/post hooks and the per-call context.

use recast::{
    BoxError, BuildError, CodegenOptions, ConvertErrorKind, Data, DecodeOptions, EncodeOptions, Engine, Field, Hooks, Model,
    ModelConfig, Record, TypeExpr, Value, value,
};
use recast_testhelpers::test;

fn rename(
    from: &'static str,
    to: &'static str,
) -> impl Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static {
    move |v, _| match v {
        Value::Object(mut obj) => {
            if let Some(moved) = obj.remove(from) {
                obj.insert(to, moved);
            }
            Ok(Value::Object(obj))
        }
        other => Ok(other),
    }
}

#[test]
fn hooks_run_around_conversion() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("User")
                .field(Field::new("name", TypeExpr::str()))
                .field(Field::new("email", TypeExpr::str()))
                .hooks(
                    Hooks::new()
                        .pre_deserialize(rename("mail", "email"))
                        .post_deserialize(|mut r, _| {
                            if let Some(Data::Str(email)) = r.get_mut("email") {
                                *email = email.to_lowercase();
                            }
                            Ok(r)
                        })
                        .pre_serialize(|r, _| {
                            let name = r.get("name").and_then(Data::as_str).unwrap_or_default().trim().to_owned();
                            Ok(r.with("name", name))
                        })
                        .post_serialize(|v, _| match v {
                            Value::Object(mut obj) => {
                                obj.insert("version", 2);
                                Ok(Value::Object(obj))
                            }
                            other => Ok(other),
                        }),
                ),
        )
        .unwrap();

    let decoded = engine
        .decode("User", &value!({"name": "ana", "mail": "ANA@EXAMPLE.COM"}), &DecodeOptions::new())
        .unwrap();
    assert_eq!(decoded, Record::new("User").with("name", "ana").with("email", "ana@example.com"));

    let r = Record::new("User").with("name", "  bo ").with("email", "bo@example.com");
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new()).unwrap(),
        value!({"name": "bo", "email": "bo@example.com", "version": 2})
    );
}

#[test]
fn hook_failures_are_reported_as_such() {
    let engine = Engine::new();
    engine
        .declare(
            Model::new("Guarded")
                .field(Field::new("n", TypeExpr::int()))
                .hooks(Hooks::new().post_deserialize(|r, _| match r.get("n") {
                    Some(Data::Int(n)) if *n < 0 => Err("negative".into()),
                    _ => Ok(r),
                })),
        )
        .unwrap();

    assert!(engine.decode("Guarded", &value!({"n": 1}), &DecodeOptions::new()).is_ok());
    let err = engine
        .decode("Guarded", &value!({"n": "-1"}), &DecodeOptions::new())
        .unwrap_err();
    assert!(matches!(err.kind, ConvertErrorKind::Hook(ref e) if e.to_string() == "negative"));
}

#[test]
fn subtypes_inherit_hooks() {
    let engine = Engine::new();
    engine
        .declare_all([
            Model::new("Versioned").hooks(Hooks::new().post_serialize(|v, _| match v {
                Value::Object(mut obj) => {
                    obj.insert("v", 1);
                    Ok(Value::Object(obj))
                }
                other => Ok(other),
            })),
            Model::new("Doc")
                .extends("Versioned", [])
                .field(Field::new("title", TypeExpr::str())),
        ])
        .unwrap();

    let r = Record::new("Doc").with("title", "t");
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new()).unwrap(),
        value!({"title": "t", "v": 1})
    );
}

// ============================================================================
// Context
// ============================================================================

fn stamped(options: CodegenOptions) -> Model {
    Model::new("Stamped")
        .field(Field::new("n", TypeExpr::int()))
        .config(ModelConfig::new().options(options))
        .hooks(Hooks::new().post_serialize(|v, ctx| match v {
            Value::Object(mut obj) => {
                obj.insert("by", ctx.clone());
                Ok(Value::Object(obj))
            }
            other => Ok(other),
        }))
}

#[test]
fn context_reaches_hooks_when_enabled() {
    let engine = Engine::new();
    engine.declare(stamped(CodegenOptions::CONTEXT)).unwrap();

    let r = Record::new("Stamped").with("n", 1);
    let opts = EncodeOptions::new().context(value!({"user": "alice"}));
    assert_eq!(
        engine.encode(&r, &opts).unwrap(),
        value!({"n": 1, "by": {"user": "alice"}})
    );
    assert_eq!(
        engine.encode(&r, &EncodeOptions::new()).unwrap(),
        value!({"n": 1, "by": null})
    );
}

#[test]
fn context_without_its_flag_is_rejected() {
    let engine = Engine::new();
    engine.declare(stamped(CodegenOptions::empty())).unwrap();

    let r = Record::new("Stamped").with("n", 1);
    let err = engine
        .encode(&r, &EncodeOptions::new().context(value!("alice")))
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ConvertErrorKind::Build(BuildError::OptionNotEnabled { option: "context", .. })
    ));
}
