//! Byte-level formats and the Rust type bridges.

use recast::{
    CodegenOptions, ConvertError, ConvertErrorKind, Data, DecodeOptions, Dialect, EncodeOptions, Engine, Error,
    Field, Format, FromRecord, Model, ModelConfig, Record, Strategy, ToRecord, TypeExpr, value,
};
use recast_testhelpers::test;

fn hex() -> Strategy {
    Strategy::new()
        .named("hex")
        .serialize(|d| match d {
            Data::Int(i) => Ok(Data::Str(format!("{i:x}"))),
            other => Err(format!("not an int: {other:?}").into()),
        })
        .deserialize(|d| match d {
            Data::Str(s) => i64::from_str_radix(&s, 16).map(Data::Int).map_err(Into::into),
            other => Err(format!("not hex: {other:?}").into()),
        })
}

fn reading(options: CodegenOptions) -> Model {
    Model::new("Reading")
        .field(Field::new("sensor", TypeExpr::str()))
        .field(Field::new("value", TypeExpr::int()))
        .field(Field::new("note", TypeExpr::optional(TypeExpr::str())).default(Data::None))
        .config(ModelConfig::new().options(options))
}

#[test]
fn json_round_trip() {
    let engine = Engine::new();
    engine.declare(reading(CodegenOptions::empty())).unwrap();
    let json = Format::json();

    let r = Record::new("Reading")
        .with("sensor", "t1")
        .with("value", 21)
        .with("note", Data::None);
    let bytes = engine.encode_to(&json, &r, &EncodeOptions::new()).unwrap();
    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        r#"{"sensor":"t1","value":21,"note":null}"#
    );
    assert_eq!(
        engine
            .decode_from(&json, "Reading", &bytes, &DecodeOptions::new())
            .unwrap(),
        r
    );
}

#[test]
fn json_renders_native_bytes_as_arrays() {
    let engine = Engine::new();
    engine
        .declare(Model::new("Packet").field(Field::new("body", TypeExpr::bytes())))
        .unwrap();
    let r = Record::new("Packet").with("body", Data::Bytes(vec![1, 2]));

    let text = engine.encode_to(&Format::json(), &r, &EncodeOptions::new()).unwrap();
    assert_eq!(text, br#"{"body":"AQI="}"#);

    let native = Format::json().with_dialect(Dialect::new("native").native_bytes(true));
    let bytes = engine.encode_to(&native, &r, &EncodeOptions::new()).unwrap();
    assert_eq!(bytes, br#"{"body":[1,2]}"#);
}

#[test]
fn format_dialect_sits_under_the_call_dialect() {
    let engine = Engine::new();
    engine.declare(reading(CodegenOptions::DIALECT_SUPPORT)).unwrap();
    let format = Format::json().with_dialect(Dialect::new("hex-json").strategy(TypeExpr::int(), hex()));
    let r = Record::new("Reading")
        .with("sensor", "t1")
        .with("value", 255)
        .with("note", Data::None);

    let bytes = engine.encode_to(&format, &r, &EncodeOptions::new()).unwrap();
    assert_eq!(bytes, br#"{"sensor":"t1","value":"ff","note":null}"#);

    let sparse = EncodeOptions::new().dialect(Dialect::new("sparse").omit_none(true));
    let bytes = engine.encode_to(&format, &r, &sparse).unwrap();
    assert_eq!(bytes, br#"{"sensor":"t1","value":"ff"}"#);

    // repeated merges reuse the cached procedure
    let before = engine.stats();
    engine.encode_to(&format, &r, &sparse).unwrap();
    assert_eq!(engine.stats().syntheses, before.syntheses);

    assert_eq!(
        engine
            .decode_from(&format, "Reading", br#"{"sensor":"t1","value":"ff"}"#, &DecodeOptions::new())
            .unwrap(),
        r
    );
}

#[test]
fn parse_and_conversion_failures_are_distinguished() {
    let engine = Engine::new();
    engine.declare(reading(CodegenOptions::empty())).unwrap();
    let json = Format::json();

    let err = engine
        .decode_from(&json, "Reading", b"{not json", &DecodeOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Format(ref e) if e.format == "json"), "{err}");

    let err = engine
        .decode_from(&json, "Reading", br#"{"sensor":"t1"}"#, &DecodeOptions::new())
        .unwrap_err();
    assert!(
        matches!(err, Error::Convert(ref e) if matches!(e.kind, ConvertErrorKind::MissingField { .. })),
        "{err}"
    );
}

// ============================================================================
// Rust type bridges
// ============================================================================

#[derive(Debug, PartialEq)]
struct Reading {
    sensor: String,
    value: i64,
    note: Option<String>,
}

impl ToRecord for Reading {
    fn to_record(&self) -> Record {
        Record::new("Reading")
            .with("sensor", self.sensor.as_str())
            .with("value", self.value)
            .with("note", self.note.clone())
    }
}

impl FromRecord for Reading {
    const MODEL: &'static str = "Reading";

    fn from_record(record: Record) -> Result<Self, ConvertError> {
        let text = |name: &str| record.get(name).and_then(Data::as_str).map(str::to_owned);
        Ok(Reading {
            sensor: text("sensor").unwrap_or_default(),
            value: match record.get("value") {
                Some(Data::Int(i)) => *i,
                _ => 0,
            },
            note: text("note"),
        })
    }
}

#[test]
fn rust_types_convert_through_their_model() {
    let engine = Engine::new();
    engine.declare(reading(CodegenOptions::empty())).unwrap();

    let reading = Reading {
        sensor: "t2".to_owned(),
        value: 7,
        note: Some("calibrated".to_owned()),
    };
    let v = reading.to_value(&engine, &EncodeOptions::new()).unwrap();
    assert_eq!(v, value!({"sensor": "t2", "value": 7, "note": "calibrated"}));

    let input = value!({"sensor": "t2", "value": "7", "note": "calibrated"});
    let back = Reading::from_value(&engine, &input, &DecodeOptions::new()).unwrap();
    assert_eq!(back, reading);
}
