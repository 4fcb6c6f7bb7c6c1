//! Tokens rebuilt outside the registry compare by value.

use std::collections::HashSet;

use bevy_token::*;
use indexmap::IndexMap;

fn registry() -> (Registry, TokenClass) {
    let mut reg = Registry::new();
    let state = reg.declare("Queue.State").unwrap();
    reg.make_root(&state, RootOptions::new(true, true)).unwrap();
    (reg, state)
}

#[test]
fn json_round_trip_compares_equal() {
    let (mut reg, state) = registry();

    let mut limits = IndexMap::new();
    limits.insert("max".to_string(), Value::from(64));
    let exhausted = reg
        .construct(
            &state,
            ValueBundle::named("EXHAUSTED")
                .with_int(1)
                .with_map(limits)
                .with_list([Value::from("retry"), Value::Null]),
        )
        .unwrap();

    let json = serde_json::to_string(&exhausted).unwrap();
    let rebuilt: Token = serde_json::from_str(&json).unwrap();

    assert_eq!(rebuilt, exhausted);
    assert_eq!(rebuilt.class(), exhausted.class());
    assert_eq!(rebuilt.value(), exhausted.value());
    assert_eq!(reg.canonical(&rebuilt), Some(&exhausted));

    let mut set = HashSet::new();
    set.insert(exhausted.clone());
    assert!(set.contains(&rebuilt));
}

#[test]
fn serialized_shape_is_flat() {
    let (mut reg, state) = registry();
    let empty = reg.construct(&state, ("EMPTY", 0)).unwrap();

    let json = serde_json::to_value(&empty).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "class": "Queue.State",
            "string_value": "EMPTY",
            "int_value": 0
        })
    );
}

#[test]
fn rebuilt_token_keeps_classification() {
    let (mut reg, state) = registry();
    let primed = reg.construct(&state, "PRIMED").unwrap();

    let rebuilt: Token = serde_json::from_str(r#"{"class":"Queue.State","string_value":"PRIMED"}"#).unwrap();
    let queue = TokenClass::new("Queue").unwrap();

    assert!(queue.includes(&rebuilt));
    assert!(rebuilt.isof(&state));
    assert_eq!(rebuilt, primed);
}

#[test]
fn different_int_breaks_equality() {
    let (mut reg, state) = registry();
    let empty = reg.construct(&state, ("EMPTY", 0)).unwrap();

    let rebuilt: Token =
        serde_json::from_str(r#"{"class":"Queue.State","string_value":"EMPTY","int_value":5}"#).unwrap();
    assert_ne!(rebuilt, empty);
    assert_eq!(reg.canonical(&rebuilt), None);
}

#[test]
fn rejects_token_without_name() {
    let result: Result<Token, _> = serde_json::from_str(r#"{"class":"Queue.State","int_value":1}"#);
    let err = result.unwrap_err().to_string();
    assert!(err.contains("must have a string value"), "{err}");
}

#[test]
fn rejects_invalid_class_path() {
    let result: Result<Token, _> = serde_json::from_str(r#"{"class":"Queue..State","string_value":"X"}"#);
    assert!(result.is_err());
}
