//! The record wire shape.
//!
//! A record is a flat mapping from field name to a `(value, state)` pair:
//!
//! ```text
//! {"_type": ["Distro", 0], "_uid": ["1700000000.123456::0048213377", 1], "name": ["f39", 1]}
//! ```
//!
//! The state is `0` for a field still at its default, `1` for an explicitly
//! set field and `2` for a field whose value was filled in by inheritance
//! during render. Slots are always written as pairs. On input a bare scalar
//! or mapping is also accepted and treated as explicitly set; a bare list is
//! not, since `["a", 1]` would be indistinguishable from a pair.

use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Reserved key holding the item type name.
pub const TYPE_FIELD: &str = "_type";
/// Reserved key holding the unique item id.
pub const UID_FIELD: &str = "_uid";
/// Reserved key holding the creation timestamp.
pub const CTIME_FIELD: &str = "_ctime";
/// Reserved key holding the last modification timestamp.
pub const MTIME_FIELD: &str = "_mtime";

/// How a slot's value came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// The field was never set; the value is its default.
    Unset,
    /// The field was explicitly set.
    Set,
    /// The value was resolved from an ancestor during render.
    Inherited,
}

impl SlotState {
    pub fn code(self) -> u8 {
        match self {
            Self::Unset => 0,
            Self::Set => 1,
            Self::Inherited => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unset),
            1 => Some(Self::Set),
            2 => Some(Self::Inherited),
            _ => None,
        }
    }
}

impl Serialize for SlotState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for SlotState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("invalid slot state {code}")))
    }
}

/// One field's value together with its [`SlotState`].
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub value: Value,
    pub state: SlotState,
}

impl Slot {
    pub fn new(value: Value, state: SlotState) -> Self {
        Self { value, state }
    }

    /// An explicitly set slot.
    pub fn set(value: impl Into<Value>) -> Self {
        Self::new(value.into(), SlotState::Set)
    }

    /// A slot holding a default value.
    pub fn unset(value: impl Into<Value>) -> Self {
        Self::new(value.into(), SlotState::Unset)
    }

    /// A slot filled in by inheritance.
    pub fn inherited(value: impl Into<Value>) -> Self {
        Self::new(value.into(), SlotState::Inherited)
    }

    pub fn is_set(&self) -> bool {
        self.state == SlotState::Set
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.value)?;
        tuple.serialize_element(&self.state)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::List(mut pair) => {
                let state = match pair.as_slice() {
                    [_, state] => state
                        .as_i64()
                        .and_then(|code| u8::try_from(code).ok())
                        .and_then(SlotState::from_code),
                    _ => None,
                };
                let state = state.ok_or_else(|| {
                    de::Error::custom("a list slot must be a [value, state] pair")
                })?;
                pair.truncate(1);
                let value = pair.pop().unwrap_or(Value::Null);
                Ok(Slot::new(value, state))
            }
            bare => Ok(Slot::set(bare)),
        }
    }
}

/// The deflated, plain-data form of an item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    slots: BTreeMap<String, Slot>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, slot: Slot) -> Option<Slot> {
        self.slots.insert(name.into(), slot)
    }

    pub fn remove(&mut self, name: &str) -> Option<Slot> {
        self.slots.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots.get_mut(name)
    }

    /// The value stored under `name`, regardless of its state.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).map(|slot| &slot.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// The item type name, if the record carries one.
    pub fn type_name(&self) -> Option<&str> {
        self.value(TYPE_FIELD).and_then(Value::as_str)
    }

    /// The unique item id, if the record carries one.
    pub fn uid(&self) -> Option<&str> {
        self.value(UID_FIELD).and_then(Value::as_str)
    }

    /// The `name` field, which item references resolve against.
    pub fn name(&self) -> Option<&str> {
        self.value("name").and_then(Value::as_str)
    }

    /// Returns `true` if every criterion equals the record's value for that key.
    ///
    /// A key the record does not carry never matches.
    pub fn matches(&self, criteria: &BTreeMap<String, Value>) -> bool {
        criteria
            .iter()
            .all(|(key, wanted)| self.value(key) == Some(wanted))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Slot> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Slot> {
        self.slots.iter_mut()
    }

    /// Serialize to a JSON document.
    pub fn to_json(&self) -> Result<String, crate::TypeError> {
        serde_json::to_string(self).map_err(|e| crate::TypeError::Serialization(e.to_string()))
    }

    /// Parse a JSON document produced by [`Record::to_json`] (or a compatible
    /// bare-value mapping).
    pub fn from_json(text: &str) -> Result<Self, crate::TypeError> {
        serde_json::from_str(text).map_err(|e| crate::TypeError::Serialization(e.to_string()))
    }
}

impl FromIterator<(String, Slot)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Slot)>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Slot);
    type IntoIter = btree_map::IntoIter<String, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Slot);
    type IntoIter = btree_map::Iter<'a, String, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Record {
        let mut record = Record::new();
        record.insert(TYPE_FIELD, Slot::unset("Distro"));
        record.insert(UID_FIELD, Slot::set("1700000000.000001::0000000042"));
        record.insert("name", Slot::set("f39"));
        record.insert("red_hat_management_key", Slot::unset(Value::inherit()));
        record
    }

    #[test]
    fn slot_wire_shape_is_a_pair() {
        let json = serde_json::to_string(&Slot::set("x")).unwrap();
        assert_eq!(json, r#"["x",1]"#);
        let json = serde_json::to_string(&Slot::inherited(4)).unwrap();
        assert_eq!(json, "[4,2]");
    }

    #[test]
    fn bare_value_reads_as_set() {
        let record = Record::from_json(r#"{"name": "f39", "depth": 3}"#).unwrap();
        assert_eq!(record.get("name"), Some(&Slot::set("f39")));
        assert_eq!(record.get("depth"), Some(&Slot::set(3)));
    }

    #[test]
    fn bare_lists_are_rejected() {
        for json in [
            r#"{"owners": ["a", 7]}"#,
            r#"{"owners": ["a", "b", "c"]}"#,
            r#"{"owners": []}"#,
            r#"{"owners": ["a", -1]}"#,
        ] {
            assert!(Record::from_json(json).is_err(), "{json}");
        }
        let record = Record::from_json(r#"{"owners": [["a", 1], 1]}"#).unwrap();
        assert_eq!(
            record.get("owners"),
            Some(&Slot::set(Value::List(vec![Value::from("a"), Value::from(1)])))
        );
    }

    #[test]
    fn list_values_that_look_like_pairs_survive_json() {
        for state in [SlotState::Unset, SlotState::Set, SlotState::Inherited] {
            let list = Value::List(vec![Value::from("x"), Value::from(i64::from(state.code()))]);
            let slot = Slot::new(list, state);
            let json = serde_json::to_string(&slot).unwrap();
            let back: Slot = serde_json::from_str(&json).unwrap();
            assert_eq!(back, slot);
        }
    }

    #[test]
    fn bare_mappings_read_as_set() {
        let record = Record::from_json(r#"{"ks_meta": {"tree": "http://x"}}"#).unwrap();
        let slot = record.get("ks_meta").unwrap();
        assert!(slot.is_set());
        assert_eq!(slot.value.as_map().map(|m| m.len()), Some(1));
    }

    #[test]
    fn accessors() {
        let record = sample();
        assert_eq!(record.type_name(), Some("Distro"));
        assert_eq!(record.uid(), Some("1700000000.000001::0000000042"));
        assert_eq!(record.name(), Some("f39"));
        assert_eq!(record.len(), 4);
        assert!(record.contains("name"));
        assert!(!record.contains("kernel"));
    }

    #[test]
    fn matches_requires_every_criterion() {
        let record = sample();
        let mut criteria = BTreeMap::new();
        criteria.insert("name".to_string(), Value::from("f39"));
        assert!(record.matches(&criteria));

        criteria.insert(TYPE_FIELD.to_string(), Value::from("Distro"));
        assert!(record.matches(&criteria));

        criteria.insert(TYPE_FIELD.to_string(), Value::from("Profile"));
        assert!(!record.matches(&criteria));
    }

    #[test]
    fn matches_is_false_for_missing_keys() {
        let record = sample();
        let mut criteria = BTreeMap::new();
        criteria.insert("kernel".to_string(), Value::Null);
        assert!(!record.matches(&criteria));
    }

    #[test]
    fn empty_criteria_match_everything() {
        assert!(sample().matches(&BTreeMap::new()));
    }

    #[test]
    fn sentinel_is_unchanged_on_the_wire() {
        let json = sample().to_json().unwrap();
        assert!(json.contains(r#""red_hat_management_key":["<<inherit>>",0]"#));
        let back = Record::from_json(&json).unwrap();
        assert!(back.value("red_hat_management_key").unwrap().is_inherit());
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e12f64..1.0e12).prop_map(Value::Float),
            ".*".prop_map(Value::Str),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4).prop_map(Value::Map),
            ]
        })
    }

    fn state() -> impl Strategy<Value = SlotState> {
        prop_oneof![
            Just(SlotState::Unset),
            Just(SlotState::Set),
            Just(SlotState::Inherited),
        ]
    }

    proptest! {
        #[test]
        fn records_survive_json(
            entries in prop::collection::btree_map("[a-z_]{1,12}", (value(), state()), 0..8)
        ) {
            let record: Record = entries
                .into_iter()
                .map(|(k, (v, s))| (k, Slot::new(v, s)))
                .collect();
            let json = record.to_json().unwrap();
            let back = Record::from_json(&json).unwrap();
            prop_assert_eq!(back, record);
        }
    }
}
