//! # Text and Stream Helpers
//!
//! Top-level containers, stream IO and configuration-driven schemas through
//! the text entry points.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::OnceLock;

use jdto_bind::{
    from_json, from_reader, from_value, impl_dto_codable, to_json, to_json_pretty, to_writer, Dto,
    Schema,
};
use jdto_core::{BindOptions, DefaultWritePolicy, ErrorKind, JdtoError, NodeKind};
use serde_json::json;

#[derive(Debug, Default, Clone, PartialEq)]
struct Sensor {
    name: String,
    offset: f64,
    unit: Option<String>,
}

impl Dto for Sensor {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Sensor>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let options = BindOptions::from_yaml_str("default_write_policy: \"null\"\nmax_depth: 8\n")
                .expect("sensor options");
            Schema::builder("Sensor")
                .with_options(options)
                .mandatory("name", |s: &Sensor| &s.name, |s: &mut Sensor, v| s.name = v)
                .optional("offset", |s: &Sensor| &s.offset, |s: &mut Sensor, v| s.offset = v, 0.0)
                .optional_null("unit", |s: &Sensor| &s.unit, |s: &mut Sensor, v| s.unit = v)
                .build()
                .expect("Sensor schema")
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Relay {
    enabled: bool,
    hops: u8,
    next: Option<Box<Relay>>,
}

impl Dto for Relay {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<Relay>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let options = BindOptions::from_yaml_str("max_depth: 4\n").expect("relay options");
            Schema::builder("Relay")
                .with_options(options)
                .mandatory("enabled", |r: &Relay| &r.enabled, |r: &mut Relay, v| r.enabled = v)
                .mandatory("hops", |r: &Relay| &r.hops, |r: &mut Relay, v| r.hops = v)
                .optional_null("next", |r: &Relay| &r.next, |r: &mut Relay, v| r.next = v)
                .build()
                .expect("Relay schema")
        })
    }
}

impl_dto_codable!(Sensor, Relay);

fn relay_chain(levels: usize) -> serde_json::Value {
    let mut doc = json!({"enabled": true, "hops": 0});
    for hops in 1..levels {
        doc = json!({"enabled": false, "hops": hops, "next": doc});
    }
    doc
}

#[test]
fn schema_options_from_yaml() {
    let schema = Sensor::schema();
    assert_eq!(schema.options().default_write_policy, DefaultWritePolicy::Null);
    assert_eq!(schema.options().max_depth, 8);
    let text = to_json(&Sensor {
        name: "t1".to_string(),
        ..Sensor::default()
    })
    .unwrap();
    assert_eq!(text, r#"{"name":"t1","offset":null,"unit":null}"#);
}

#[test]
fn top_level_vec_of_dtos() {
    let sensors: Vec<Sensor> =
        from_json(r#"[{"name": "a", "offset": 1.5}, {"name": "b", "unit": "C"}]"#).unwrap();
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].offset, 1.5);
    assert_eq!(sensors[1].unit.as_deref(), Some("C"));
}

#[test]
fn top_level_vec_errors_indexed() {
    match from_json::<Vec<Sensor>>(r#"[{"name": "a"}, {"offset": 2}, 3]"#) {
        Err(JdtoError::Read(err)) => assert_eq!(err.paths(), vec!["[1].name", "[2]"]),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn top_level_map_sorted_on_write() {
    let mut readings = HashMap::new();
    readings.insert("zulu".to_string(), 3i64);
    readings.insert("alpha".to_string(), 1i64);
    assert_eq!(to_json(&readings).unwrap(), r#"{"alpha":1,"zulu":3}"#);
}

#[test]
fn reader_and_writer_roundtrip() {
    let sensor = Sensor {
        name: "thermo".to_string(),
        offset: -0.25,
        unit: Some("K".to_string()),
    };
    let mut buf = Vec::new();
    to_writer(&mut buf, &sensor).unwrap();
    let back: Sensor = from_reader(Cursor::new(buf)).unwrap();
    assert_eq!(back, sensor);
}

#[test]
fn pretty_output_is_valid_json() {
    let text = to_json_pretty(&Sensor {
        name: "p".to_string(),
        offset: 2.0,
        unit: None,
    })
    .unwrap();
    assert!(text.contains('\n'));
    let back: Sensor = from_json(&text).unwrap();
    assert_eq!(back.offset, 2.0);
}

#[test]
fn invalid_text_is_parse_error() {
    assert!(matches!(from_json::<Sensor>("{"), Err(JdtoError::Parse(_))));
}

#[test]
fn schema_depth_limit_applies_to_text_reads() {
    let shallow = relay_chain(3);
    let relay: Relay = from_json(&shallow.to_string()).unwrap();
    assert_eq!(relay.hops, 2);
    assert_eq!(relay.next.as_ref().map(|r| r.hops), Some(1));

    let deep = relay_chain(10);
    assert!(Relay::schema().read(&deep).is_err());
    match from_json::<Relay>(&deep.to_string()) {
        Err(JdtoError::Read(err)) => {
            assert_eq!(err.len(), 1);
            assert_eq!(err.errors()[0].kind.code(), "malformed_structure");
        }
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn depth_limit_carries_through_containers() {
    let batch = json!([relay_chain(2), relay_chain(10)]);
    let err = match from_value::<Vec<Relay>>(&batch) {
        Err(err) => err,
        Ok(_) => panic!("deep element accepted"),
    };
    assert_eq!(err.len(), 1);
    assert!(err.paths()[0].starts_with("[1].next"));
}

#[test]
fn scalar_fields_checked_through_schema() {
    match from_json::<Relay>(r#"{"enabled": "yes", "hops": 256}"#) {
        Err(JdtoError::Read(err)) => {
            assert_eq!(err.paths(), vec![".enabled", ".hops"]);
            assert_eq!(
                err.errors()[0].kind,
                ErrorKind::type_mismatch("bool", NodeKind::String)
            );
            assert_eq!(err.errors()[1].kind.code(), "out_of_range");
        }
        other => panic!("expected read error, got {other:?}"),
    }
    let relay: Relay = from_json(r#"{"enabled": true, "hops": 255}"#).unwrap();
    assert!(relay.enabled);
    assert_eq!(relay.hops, 255);
}
