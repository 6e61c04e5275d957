//! Field declarations and per-item field state.
//!
//! A [`FieldSpec`] is what a schema author writes. Building a schema turns
//! each spec into an immutable, shared [`FieldDef`]. Every [`crate::Item`]
//! then owns one [`Field`] per definition, holding that item's value and
//! set-state; definitions are shared, field state never is.

use std::path::Path;
use std::sync::Arc;

use provis_types::{Slot, SlotState, TypeError, Value};
use serde::Serialize;

use crate::error::{SchemaError, ValidationError};
use crate::kind::FieldKind;

// ---------------------------------------------------------------------------
// FieldSpec
// ---------------------------------------------------------------------------

/// Declaration of one field on an item type.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    default: Option<Value>,
    required: bool,
    inherit: bool,
    editable: bool,
    visible: bool,
    comment: String,
    display_name: Option<String>,
    tags: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            required: false,
            inherit: false,
            editable: true,
            visible: true,
            comment: String::new(),
            display_name: None,
            tags: Vec::new(),
        }
    }

    pub fn str(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Str)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::List)
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Map)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Time)
    }

    pub fn choice<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            FieldKind::Choice(choices.into_iter().map(Into::into).collect()),
        )
    }

    pub fn local_file(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::LocalFile)
    }

    /// A reference to an item of type `item_type`, by that item's name.
    pub fn item_ref(name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self::new(name, FieldKind::ItemRef(item_type.into()))
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Enable inheritance and default the field to the inherit sentinel.
    ///
    /// Call [`FieldSpec::default`] afterwards to keep inheritance enabled
    /// with a concrete default.
    pub fn inherit(mut self) -> Self {
        self.inherit = true;
        self.default = Some(Value::inherit());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the declared options into a shareable definition.
    ///
    /// The default is coerced by the field's own kind, except that the
    /// inherit sentinel is kept verbatim on inheriting fields. A required
    /// field without a declared default defaults to null, so it only
    /// validates once set.
    pub fn build(self) -> Result<FieldDef, SchemaError> {
        let default = match self.default {
            Some(v) if self.inherit && v.is_inherit() => v,
            Some(v) => self
                .kind
                .coerce(v)
                .map_err(|source| SchemaError::InvalidDefault {
                    field: self.name.clone(),
                    source,
                })?,
            None if self.required => Value::Null,
            None => self.kind.natural_default(),
        };
        let display_name = self
            .display_name
            .unwrap_or_else(|| display_name_for(&self.name));
        Ok(FieldDef {
            name: self.name,
            kind: self.kind,
            default,
            required: self.required,
            inherit: self.inherit,
            editable: self.editable,
            visible: self.visible,
            comment: self.comment,
            display_name,
            tags: self.tags,
        })
    }
}

/// `"kernel_options_post"` becomes `"Kernel Options Post"`.
fn display_name_for(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// FieldDef
// ---------------------------------------------------------------------------

/// The resolved, immutable definition of a field, shared by all items of a type.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub default: Value,
    pub required: bool,
    pub inherit: bool,
    pub editable: bool,
    pub visible: bool,
    pub comment: String,
    pub display_name: String,
    pub tags: Vec<String>,
}

impl FieldDef {
    /// The target type if this is an item reference.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::ItemRef(target) => Some(target),
            _ => None,
        }
    }

    pub fn signature(&self) -> FieldSignature {
        let (choices, item_type) = match &self.kind {
            FieldKind::Choice(choices) => (Some(choices.clone()), None),
            FieldKind::ItemRef(target) => (None, Some(target.clone())),
            _ => (None, None),
        };
        FieldSignature {
            name: self.name.clone(),
            kind: self.kind.name(),
            default: self.default.clone(),
            display_name: self.display_name.clone(),
            comment: self.comment.clone(),
            visible: self.visible,
            inherit: self.inherit,
            required: self.required,
            editable: self.editable,
            tags: self.tags.clone(),
            choices,
            item_type,
        }
    }
}

/// Introspection view of a field declaration, for UIs and RPC clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldSignature {
    pub name: String,
    pub kind: &'static str,
    pub default: Value,
    pub display_name: String,
    pub comment: String,
    pub visible: bool,
    pub inherit: bool,
    pub required: bool,
    pub editable: bool,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// One item's state for one field.
#[derive(Clone, Debug)]
pub struct Field {
    def: Arc<FieldDef>,
    value: Option<Value>,
    set: bool,
}

impl Field {
    pub fn new(def: Arc<FieldDef>) -> Self {
        Self {
            def,
            value: None,
            set: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.def.kind
    }

    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    /// The explicit value if one was set, else the default.
    pub fn get(&self) -> &Value {
        self.value.as_ref().unwrap_or(&self.def.default)
    }

    /// Coerce and store `value`, marking the field as set.
    ///
    /// On an inheriting field the sentinel is stored verbatim. A coercion
    /// failure leaves the field untouched.
    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), TypeError> {
        let value = value.into();
        let value = if self.def.inherit && value.is_inherit() {
            value
        } else {
            self.def.kind.coerce(value)?
        };
        self.value = Some(value);
        self.set = true;
        Ok(())
    }

    /// Returns `true` once [`Field::set`] has succeeded, whatever the value.
    pub fn is_set(&self) -> bool {
        self.set
    }

    /// Forget any explicit value and fall back to the default.
    pub fn clear(&mut self) {
        self.value = None;
        self.set = false;
    }

    /// Returns `true` if the current value is the sentinel on an inheriting field.
    pub fn is_inheriting(&self) -> bool {
        self.def.inherit && self.get().is_inherit()
    }

    pub fn slot(&self) -> Slot {
        let state = if self.set {
            SlotState::Set
        } else {
            SlotState::Unset
        };
        Slot::new(self.get().clone(), state)
    }

    /// Check the current value against the field's kind without consulting
    /// any other item.
    ///
    /// Item references are checked for type only; [`crate::Item::validate`]
    /// additionally verifies that the referenced item exists.
    pub fn validate_value(&self) -> Result<(), ValidationError> {
        if self.is_inheriting() {
            return Ok(());
        }
        let value = self.get();
        if !self.def.kind.accepts(value) {
            return Err(if self.def.required && !self.set {
                ValidationError::Required {
                    field: self.def.name.clone(),
                    kind: self.def.kind.name(),
                }
            } else {
                ValidationError::Invalid {
                    field: self.def.name.clone(),
                    kind: self.def.kind.name(),
                    value: value.to_string(),
                }
            });
        }
        match &self.def.kind {
            FieldKind::Choice(choices) => {
                let text = value.as_str().unwrap_or_default();
                if !choices.iter().any(|c| c == text) {
                    return Err(ValidationError::InvalidChoice {
                        field: self.def.name.clone(),
                        value: text.to_string(),
                        choices: choices.clone(),
                    });
                }
            }
            FieldKind::LocalFile if self.set || self.def.required => {
                let path = value.as_str().unwrap_or_default();
                if path.is_empty() || !is_readable(Path::new(path)) {
                    return Err(ValidationError::FileNotFound {
                        field: self.def.name.clone(),
                        value: path.to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub fn signature(&self) -> FieldSignature {
        self.def.signature()
    }
}

fn is_readable(path: &Path) -> bool {
    std::fs::File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn field(spec: FieldSpec) -> Field {
        Field::new(Arc::new(spec.build().unwrap()))
    }

    #[test]
    fn str_field_defaults_and_sets() {
        let mut s = field(FieldSpec::str("comment"));
        assert_eq!(s.get(), &Value::from(""));
        assert!(!s.is_set());
        s.set("foo").unwrap();
        assert_eq!(s.get(), &Value::from("foo"));
        s.set(134.7).unwrap();
        assert_eq!(s.get(), &Value::from("134.7"));
        assert!(s.validate_value().is_ok());

        let mut s = field(FieldSpec::str("comment").default("boo"));
        assert_eq!(s.get(), &Value::from("boo"));
        assert!(s.validate_value().is_ok());
        s.set(Value::Null).unwrap();
        assert_eq!(s.get(), &Value::from(""));
        assert!(s.validate_value().is_ok());
    }

    #[test]
    fn int_field_failed_set_keeps_previous_value() {
        let mut i = field(FieldSpec::int("depth"));
        assert_eq!(i.get(), &Value::Int(0));
        assert!(i.validate_value().is_ok());

        i.set(189.2).unwrap();
        assert_eq!(i.get(), &Value::Int(189));

        assert!(i.set(Value::Null).is_err());
        assert!(i.set("foo").is_err());
        assert_eq!(i.get(), &Value::Int(189));
        assert!(i.validate_value().is_ok());
    }

    #[test]
    fn set_to_default_still_counts_as_set() {
        let mut f = field(FieldSpec::int("priority").default(99));
        f.set(99).unwrap();
        assert!(f.is_set());
        assert_eq!(f.slot(), Slot::set(99));
    }

    #[test]
    fn clear_restores_default() {
        let mut f = field(FieldSpec::str("hostname").default("localhost"));
        f.set("web01").unwrap();
        f.clear();
        assert!(!f.is_set());
        assert_eq!(f.get(), &Value::from("localhost"));
    }

    #[test]
    fn required_unset_field_reports_required() {
        let f = field(FieldSpec::str("name").required());
        assert_eq!(f.get(), &Value::Null);
        assert!(matches!(
            f.validate_value(),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn inherit_sentinel_is_stored_verbatim() {
        let mut f = field(FieldSpec::int("virt_ram").inherit());
        assert!(f.get().is_inherit());
        assert!(f.validate_value().is_ok());

        f.set(512).unwrap();
        assert_eq!(f.get(), &Value::Int(512));

        f.set("<<inherit>>").unwrap();
        assert!(f.get().is_inherit());
        assert!(f.is_set());
        assert!(f.validate_value().is_ok());
    }

    #[test]
    fn sentinel_on_non_inheriting_field_is_ordinary_data() {
        let mut f = field(FieldSpec::int("depth"));
        assert!(f.set("<<inherit>>").is_err());

        let mut s = field(FieldSpec::str("comment"));
        s.set("<<inherit>>").unwrap();
        assert!(!s.is_inheriting());
    }

    #[test]
    fn inherit_with_concrete_default() {
        let f = field(FieldSpec::str("virt_bridge").inherit().default("xenbr0"));
        assert!(f.def().inherit);
        assert_eq!(f.get(), &Value::from("xenbr0"));
    }

    #[test]
    fn choice_field_membership() {
        let mut f = field(FieldSpec::choice("breed", ["redhat", "debian"]).default("redhat"));
        assert!(f.validate_value().is_ok());
        f.set("suse").unwrap();
        assert!(matches!(
            f.validate_value(),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn local_file_requires_readable_path_once_set() {
        let mut f = field(FieldSpec::local_file("kickstart"));
        assert!(f.validate_value().is_ok());

        f.set("/nonexistent/provis/kickstart.cfg").unwrap();
        assert!(matches!(
            f.validate_value(),
            Err(ValidationError::FileNotFound { .. })
        ));

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "text").unwrap();
        f.set(tmp.path().to_string_lossy().into_owned()).unwrap();
        assert!(f.validate_value().is_ok());
    }

    #[test]
    fn datetime_field_rejects_non_dates() {
        let mut f = field(FieldSpec::datetime("installed_at"));
        assert!(f.validate_value().is_ok());
        f.set("yesterday").unwrap();
        assert!(matches!(
            f.validate_value(),
            Err(ValidationError::Invalid { kind: "datetime", .. })
        ));
    }

    #[test]
    fn invalid_default_is_a_schema_error() {
        let err = FieldSpec::int("depth").default("deep").build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name_for("kernel_options_post"), "Kernel Options Post");
        assert_eq!(display_name_for("name"), "Name");
        let def = FieldSpec::str("dhcp_tag").display_name("DHCP Tag").build().unwrap();
        assert_eq!(def.display_name, "DHCP Tag");
    }

    #[test]
    fn signature_describes_declaration() {
        let def = FieldSpec::item_ref("distro", "Distro")
            .required()
            .inherit()
            .build()
            .unwrap();
        let sig = def.signature();
        assert_eq!(sig.kind, "item_ref");
        assert_eq!(sig.item_type.as_deref(), Some("Distro"));
        assert!(sig.required && sig.inherit && sig.editable && sig.visible);
        assert!(sig.default.is_inherit());
    }
}
