//! Field kinds and their coercion rules.
//!
//! Every kind maps an arbitrary incoming [`Value`] onto its own
//! representation. Coercion is deterministic: coercing an already coerced
//! value returns it unchanged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use provis_types::{now_timestamp, TypeError, Value};

/// The semantic type of a field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
    DateTime,
    /// Fractional seconds since the UNIX epoch.
    Time,
    /// A string restricted to a fixed set of values.
    Choice(Vec<String>),
    /// A string naming a file the process can read.
    LocalFile,
    /// A string naming an item of the given type.
    ItemRef(String),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Map => "map",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Choice(_) => "choice",
            Self::LocalFile => "local_file",
            Self::ItemRef(_) => "item_ref",
        }
    }

    /// The default a field of this kind gets when none is declared.
    pub fn natural_default(&self) -> Value {
        match self {
            Self::Str | Self::Choice(_) | Self::LocalFile | Self::ItemRef(_) => {
                Value::Str(String::new())
            }
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::List => Value::List(Vec::new()),
            Self::Map => Value::Map(BTreeMap::new()),
            Self::DateTime => Value::DateTime(Utc::now()),
            Self::Time => Value::Float(now_timestamp()),
        }
    }

    /// Returns `true` if `value` already has this kind's representation.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Str | Self::Choice(_) | Self::LocalFile | Self::ItemRef(_) => {
                matches!(value, Value::Str(_))
            }
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float | Self::Time => matches!(value, Value::Float(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::List => matches!(value, Value::List(_)),
            Self::Map => matches!(value, Value::Map(_)),
            Self::DateTime => matches!(value, Value::DateTime(_)),
        }
    }

    /// Convert `value` to this kind's representation.
    pub fn coerce(&self, value: Value) -> Result<Value, TypeError> {
        match self {
            Self::Str | Self::Choice(_) | Self::LocalFile | Self::ItemRef(_) => Ok(to_str(value)),
            Self::Int => to_int(value),
            Self::Float | Self::Time => to_float(value),
            Self::Bool => to_bool(value),
            Self::List => to_list(value),
            Self::Map => to_map(value),
            Self::DateTime => Ok(to_datetime(value)),
        }
    }
}

fn to_str(value: Value) -> Value {
    match value {
        Value::Str(s) => Value::Str(s),
        other => Value::Str(other.to_string()),
    }
}

fn to_int(value: Value) -> Result<Value, TypeError> {
    match value {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(x) => {
            let truncated = x.trunc();
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(TypeError::coercion("int", &Value::Float(x), "out of range"))
            }
        }
        Value::Str(ref s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| TypeError::coercion("int", &value, e.to_string())),
        other => Err(TypeError::coercion("int", &other, "not a number")),
    }
}

/// Only finite results are accepted; JSON has no NaN or infinity.
fn to_float(value: Value) -> Result<Value, TypeError> {
    let x = match value {
        Value::Float(x) => x,
        Value::Int(i) => i as f64,
        Value::Bool(b) => f64::from(u8::from(b)),
        Value::Str(ref s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| TypeError::coercion("float", &value, e.to_string()))?,
        other => return Err(TypeError::coercion("float", &other, "not a number")),
    };
    if !x.is_finite() {
        return Err(TypeError::coercion("float", &Value::Float(x), "not finite"));
    }
    Ok(Value::Float(x))
}

fn to_bool(value: Value) -> Result<Value, TypeError> {
    let b = match &value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::List(l) => !l.is_empty(),
        Value::Map(m) => !m.is_empty(),
        Value::DateTime(_) => true,
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" | "1" => true,
            "false" | "no" | "n" | "off" | "0" | "" => false,
            _ => return Err(TypeError::coercion("bool", &value, "unrecognised boolean")),
        },
    };
    Ok(Value::Bool(b))
}

/// Strings split on whitespace, so `"sam dave"` becomes `["sam", "dave"]`.
fn to_list(value: Value) -> Result<Value, TypeError> {
    match value {
        Value::List(l) => Ok(Value::List(l)),
        Value::Null => Ok(Value::List(Vec::new())),
        Value::Str(s) => Ok(Value::List(
            s.split_whitespace().map(Value::from).collect(),
        )),
        Value::Map(m) => Ok(Value::List(m.into_keys().map(Value::Str).collect())),
        other => Err(TypeError::coercion("list", &other, "not a sequence")),
    }
}

/// Strings parse as space separated `key=value` tokens; a token without `=`
/// maps to null. Lists must hold `[key, value]` pairs.
fn to_map(value: Value) -> Result<Value, TypeError> {
    match value {
        Value::Map(m) => Ok(Value::Map(m)),
        Value::Null => Ok(Value::Map(BTreeMap::new())),
        Value::Str(s) => {
            let map = s
                .split_whitespace()
                .map(|token| match token.split_once('=') {
                    Some((k, v)) => (k.to_string(), Value::from(v)),
                    None => (token.to_string(), Value::Null),
                })
                .collect();
            Ok(Value::Map(map))
        }
        Value::List(items) => {
            let mut map = BTreeMap::new();
            for item in &items {
                match item.as_list() {
                    Some([key, val]) => {
                        map.insert(key.to_string(), val.clone());
                    }
                    _ => {
                        return Err(TypeError::coercion(
                            "map",
                            &Value::List(items.clone()),
                            "list entries must be [key, value] pairs",
                        ))
                    }
                }
            }
            Ok(Value::Map(map))
        }
        other => Err(TypeError::coercion("map", &other, "not a mapping")),
    }
}

/// RFC 3339 strings are parsed; anything else passes through and is
/// rejected at validation time.
fn to_datetime(value: Value) -> Value {
    match value {
        Value::Str(s) => match DateTime::parse_from_rfc3339(&s) {
            Ok(dt) => Value::DateTime(dt.with_timezone(&Utc)),
            Err(_) => Value::Str(s),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map_of(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn str_coerces_anything() {
        let kind = FieldKind::Str;
        assert_eq!(kind.coerce(Value::from("foo")).unwrap(), Value::from("foo"));
        assert_eq!(kind.coerce(Value::from(134.7)).unwrap(), Value::from("134.7"));
        assert_eq!(kind.coerce(Value::from(12)).unwrap(), Value::from("12"));
        assert_eq!(kind.coerce(Value::Null).unwrap(), Value::from(""));
    }

    #[test]
    fn int_truncates_floats_and_parses_strings() {
        let kind = FieldKind::Int;
        assert_eq!(kind.coerce(Value::from(189.2)).unwrap(), Value::Int(189));
        assert_eq!(kind.coerce(Value::from("103")).unwrap(), Value::Int(103));
        assert_eq!(kind.coerce(Value::from(true)).unwrap(), Value::Int(1));
    }

    #[test]
    fn int_rejects_non_numeric() {
        let kind = FieldKind::Int;
        assert!(matches!(
            kind.coerce(Value::from("foo")),
            Err(TypeError::Coercion { target: "int", .. })
        ));
        assert!(kind.coerce(Value::from("1.2")).is_err());
        assert!(kind.coerce(Value::Null).is_err());
        assert!(kind.coerce(Value::List(vec![])).is_err());
        assert!(kind.coerce(Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn float_coercion() {
        let kind = FieldKind::Float;
        assert_eq!(kind.coerce(Value::from(2)).unwrap(), Value::Float(2.0));
        assert_eq!(kind.coerce(Value::from(" 2.5 ")).unwrap(), Value::Float(2.5));
        assert!(kind.coerce(Value::from("two")).is_err());
        assert_eq!(FieldKind::Time.coerce(Value::from(7)).unwrap(), Value::Float(7.0));
    }

    #[test]
    fn float_rejects_non_finite() {
        for text in ["NaN", "nan", "inf", "-inf", "infinity", "1e400"] {
            assert!(FieldKind::Float.coerce(Value::from(text)).is_err(), "{text}");
            assert!(FieldKind::Time.coerce(Value::from(text)).is_err(), "{text}");
        }
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(FieldKind::Float.coerce(Value::Float(x)).is_err());
        }
    }

    #[test]
    fn bool_coercion() {
        let kind = FieldKind::Bool;
        assert_eq!(kind.coerce(Value::from(0)).unwrap(), Value::Bool(false));
        assert_eq!(kind.coerce(Value::from(2)).unwrap(), Value::Bool(true));
        assert_eq!(kind.coerce(Value::from("Yes")).unwrap(), Value::Bool(true));
        assert_eq!(kind.coerce(Value::from("off")).unwrap(), Value::Bool(false));
        assert_eq!(kind.coerce(Value::Null).unwrap(), Value::Bool(false));
        assert!(kind.coerce(Value::from("maybe")).is_err());
    }

    #[test]
    fn list_coercion() {
        let kind = FieldKind::List;
        assert_eq!(
            kind.coerce(Value::from("sam dave")).unwrap(),
            Value::List(vec![Value::from("sam"), Value::from("dave")])
        );
        assert_eq!(kind.coerce(Value::Null).unwrap(), Value::List(vec![]));
        assert_eq!(
            kind.coerce(map_of(&[("b", Value::Null), ("a", Value::Null)])).unwrap(),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert!(kind.coerce(Value::from(3)).is_err());
    }

    #[test]
    fn map_parses_key_value_strings() {
        let kind = FieldKind::Map;
        assert_eq!(
            kind.coerce(Value::from("dog=fido cat=fluffy quiet")).unwrap(),
            map_of(&[
                ("cat", Value::from("fluffy")),
                ("dog", Value::from("fido")),
                ("quiet", Value::Null),
            ])
        );
    }

    #[test]
    fn map_from_pairs() {
        let kind = FieldKind::Map;
        let pairs = Value::List(vec![Value::List(vec![Value::from("k"), Value::from(1)])]);
        assert_eq!(kind.coerce(pairs).unwrap(), map_of(&[("k", Value::from(1))]));

        let bad = Value::List(vec![Value::from("k")]);
        assert!(kind.coerce(bad).is_err());
    }

    #[test]
    fn datetime_parses_rfc3339_and_passes_through_the_rest() {
        let kind = FieldKind::DateTime;
        let parsed = kind.coerce(Value::from("2024-05-01T12:00:00Z")).unwrap();
        assert!(kind.accepts(&parsed));

        let junk = kind.coerce(Value::from(5)).unwrap();
        assert_eq!(junk, Value::from(5));
        assert!(!kind.accepts(&junk));
    }

    #[test]
    fn natural_defaults_are_accepted() {
        let kinds = [
            FieldKind::Str,
            FieldKind::Int,
            FieldKind::Float,
            FieldKind::Bool,
            FieldKind::List,
            FieldKind::Map,
            FieldKind::DateTime,
            FieldKind::Time,
            FieldKind::Choice(vec!["a".into()]),
            FieldKind::LocalFile,
            FieldKind::ItemRef("Distro".into()),
        ];
        for kind in kinds {
            assert!(kind.accepts(&kind.natural_default()), "{}", kind.name());
        }
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e9f64..1.0e9).prop_map(Value::Float),
            "[a-z0-9=. ]{0,16}".prop_map(Value::Str),
        ]
    }

    fn any_kind() -> impl Strategy<Value = FieldKind> {
        prop_oneof![
            Just(FieldKind::Str),
            Just(FieldKind::Int),
            Just(FieldKind::Float),
            Just(FieldKind::Bool),
            Just(FieldKind::List),
            Just(FieldKind::Map),
            Just(FieldKind::DateTime),
            Just(FieldKind::Time),
            Just(FieldKind::LocalFile),
        ]
    }

    proptest! {
        #[test]
        fn coercion_is_idempotent(kind in any_kind(), input in scalar()) {
            if let Ok(once) = kind.coerce(input.clone()) {
                let twice = kind.coerce(once.clone()).unwrap();
                prop_assert_eq!(&twice, &once);
                let again = kind.coerce(input).unwrap();
                prop_assert_eq!(again, once);
            }
        }

        #[test]
        fn coerced_floats_survive_json(x in any::<f64>()) {
            match FieldKind::Float.coerce(Value::Float(x)) {
                Ok(value) => {
                    let json = serde_json::to_string(&value).unwrap();
                    let back: Value = serde_json::from_str(&json).unwrap();
                    prop_assert_eq!(back, value);
                }
                Err(_) => prop_assert!(!x.is_finite()),
            }
        }
    }
}
