//! End-to-end behavior of DynamicMap encode/decode, including template decoding

use jmap_codec::{DecodeOptions, DynamicMap, ErrorKind, JmapError, Limits, Policy, Value};
use serde_json::{json, Value as JsonValue};

const GREETING: &str = "greeting";
const HELLO: &str = "hello";
const HOWDY: &str = "howdy";
const NESTED: &str = "nested";
const LOCATION: &str = "location";
const SEASON: &str = "season";

const INPUT: &str = r#"{"greeting":"hello","nested":{"location":"us","season":"fall"}}"#;

fn parsed(text: &str) -> JsonValue {
    serde_json::from_str(text).expect("valid json")
}

fn nested_map() -> DynamicMap {
    let nested = DynamicMap::new();
    nested.set(LOCATION, "us");
    nested.set(SEASON, "fall");
    nested
}

#[test]
fn marshal_with_nested_map() {
    let map = DynamicMap::new();
    map.set(GREETING, HELLO);
    map.set(NESTED, nested_map());

    let text = map.to_json_string().unwrap();
    assert_eq!(parsed(&text), parsed(INPUT));
}

#[test]
fn marshal_omit_nested() {
    let map = DynamicMap::new();
    map.set(GREETING, HELLO);
    map.set_with(NESTED, nested_map(), Policy::Omit);

    assert_eq!(map.to_json_string().unwrap(), r#"{"greeting":"hello"}"#);
}

#[test]
fn marshal_null_greeting() {
    let map = DynamicMap::new();
    map.set_with(GREETING, HELLO, Policy::Null);

    assert_eq!(map.to_json_string().unwrap(), r#"{"greeting":null}"#);
}

#[test]
fn unmarshal_over_preset_fields() {
    let map = DynamicMap::new();
    map.set(GREETING, HOWDY);
    assert_eq!(map.get(GREETING).unwrap(), HOWDY);

    map.decode_str(INPUT).unwrap();

    assert_eq!(map.get(GREETING).unwrap(), HELLO);
    let nested = map.get(NESTED).unwrap();
    let nested = nested.as_map().expect("nested object becomes a map");
    assert_eq!(nested.get(LOCATION).unwrap(), "us");
    assert_eq!(nested.get(SEASON).unwrap(), "fall");
}

#[test]
fn unmarshal_omit_keeps_template_map() {
    let some_map = DynamicMap::new();
    some_map.set("kept", true);

    let map = DynamicMap::new();
    map.set(GREETING, HOWDY);
    map.set_with(NESTED, &some_map, Policy::Omit);

    map.decode_str(INPUT).unwrap();

    assert_eq!(map.get(GREETING).unwrap(), HELLO);
    assert_eq!(map.get(NESTED), Some(Value::Map(some_map.clone())));
    assert!(!some_map.contains_key(LOCATION));
}

#[test]
fn unmarshal_null_clears_empty_template_map() {
    let empty = DynamicMap::new();

    let map = DynamicMap::new();
    map.set(GREETING, HOWDY);
    map.set_with(NESTED, &empty, Policy::Null);

    map.decode_str(INPUT).unwrap();

    assert_eq!(map.get(GREETING).unwrap(), HELLO);
    assert_eq!(map.get(NESTED), Some(Value::Null));
}

#[test]
fn template_round_trip_resets_policies() {
    let template = DynamicMap::new();
    template.set_with("password", Value::Null, Policy::Omit);
    template.set_with("token", "server-side", Policy::Null);
    template.set_with("nickname", Value::Null, Policy::OmitEmpty);

    template
        .decode_str(r#"{"user":"ada","password":"pw","token":"client","nickname":null}"#)
        .unwrap();

    // password was nil under Omit so the input was ignored
    assert_eq!(template.get("password"), Some(Value::Null));
    assert_eq!(template.policy("password"), Some(Policy::Omit));
    assert_eq!(template.get("token").unwrap(), "server-side");
    for key in ["user", "token", "nickname"] {
        assert_eq!(template.policy(key), Some(Policy::Default));
    }

    assert_eq!(
        template.to_json_value().unwrap(),
        json!({"user": "ada", "token": "server-side", "nickname": null})
    );
}

#[test]
fn nested_decode_recurses_through_levels() {
    let map = DynamicMap::from_json_str(r#"{"a":{"b":{"c":{"d":"deep"}}}}"#).unwrap();

    let mut current = map;
    for key in ["a", "b", "c"] {
        let next = current.get(key).unwrap();
        current = next.as_map().unwrap().clone();
    }
    assert_eq!(current.get("d").unwrap(), "deep");
}

#[test]
fn decode_error_leaves_partial_state() {
    let map = DynamicMap::new();
    map.set("keep", 1);
    let err = map.decode_str("not json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(map.len(), 1);
}

#[test]
fn decode_error_keeps_keys_merged_before_it() {
    let opts = DecodeOptions::limited(Limits {
        max_array_len: 2,
        ..Limits::default()
    });

    let map = DynamicMap::new();
    map.set("a", "old");
    let err = map.decode_str_with(r#"{"a":1,"z":[1,2,3]}"#, &opts).unwrap_err();

    assert!(matches!(err, JmapError::ArrayTooLong { length: 3, .. }));
    assert_eq!(map.get("a").unwrap(), 1i64);
    assert!(!map.contains_key("z"));
}

#[test]
fn encode_failure_produces_no_output() {
    let map = DynamicMap::new();
    map.set(GREETING, HELLO);
    map.set("socket", Value::opaque(std::net::Ipv4Addr::LOCALHOST));

    let err = map.to_json_vec().unwrap_err();
    assert!(matches!(err, JmapError::UnsupportedValue { .. }));
    assert_eq!(err.kind(), ErrorKind::Encode);
}

#[test]
fn numbers_keep_integer_precision() {
    let input = r#"{"big":18446744073709551615,"neg":-9007199254740993,"f":0.5}"#;
    let map = DynamicMap::from_json_str(input).unwrap();
    assert_eq!(map.get("big").unwrap().as_u64(), Some(u64::MAX));
    assert_eq!(map.get("neg").unwrap().as_i64(), Some(-9_007_199_254_740_993));
    assert_eq!(map.get("f").unwrap().as_f64(), Some(0.5));

    let text = map.to_json_string().unwrap();
    assert!(text.contains("18446744073709551615"));
    assert!(text.contains("-9007199254740993"));
}

#[test]
fn caller_mutation_of_nested_map_is_visible() {
    let parent = DynamicMap::new();
    let child = DynamicMap::new();
    parent.set(NESTED, &child);
    assert_eq!(parent.to_json_string().unwrap(), r#"{"nested":{}}"#);

    child.set(SEASON, "fall");
    assert_eq!(
        parent.to_json_string().unwrap(),
        r#"{"nested":{"season":"fall"}}"#
    );
}
