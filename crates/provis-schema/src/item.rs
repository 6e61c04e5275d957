//! Item instances.
//!
//! An [`Item`] owns one [`Field`] per definition in its [`Schema`] and the
//! requirements bound to it at construction. Items are plain values: they
//! never hold a handle to a store. Operations that need other items
//! (reference checks and rendering) take an [`ItemResolver`].

use std::sync::Arc;

use provis_types::{now_timestamp, Record, Slot, Value, CTIME_FIELD, MTIME_FIELD, UID_FIELD};
use tracing::trace;

use crate::error::{FieldError, ValidationError};
use crate::field::Field;
use crate::requirement::Requirement;
use crate::resolver::ItemResolver;
use crate::schema::{Schema, SchemaSignature};

/// One record instance of a declared item type.
#[derive(Clone, Debug)]
pub struct Item {
    schema: Arc<Schema>,
    source: String,
    fields: Vec<Field>,
    requirements: Vec<Arc<Requirement>>,
    errors: Vec<(String, ValidationError)>,
}

impl Item {
    /// A blank item of `schema`'s type, bound to the backend named `source`.
    pub fn new(schema: Arc<Schema>, source: impl Into<String>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|def| Field::new(Arc::clone(def)))
            .collect();
        let mut item = Self {
            schema,
            source: source.into(),
            fields,
            requirements: Vec::new(),
            errors: Vec::new(),
        };
        let requirements = item
            .schema
            .requirements()
            .iter()
            .map(|spec| spec.bind(&item))
            .collect();
        item.requirements = requirements;
        item
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    /// Name of the backend this item was created in or loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The unique id, once one has been assigned.
    pub fn uid(&self) -> Option<&str> {
        self.get(UID_FIELD)
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        let i = self.schema.position(name)?;
        self.fields.get(i)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        let i = self.schema.position(name)?;
        self.fields.get_mut(i)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(Field::get)
    }

    /// Returns `true` if the field exists and has been explicitly set.
    pub fn is_set(&self, name: &str) -> bool {
        self.field(name).is_some_and(Field::is_set)
    }

    /// Coerce and assign `value` to the field `name`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        let item_type = self.type_name().to_string();
        let field = self
            .field_mut(name)
            .ok_or_else(|| FieldError::UnknownField {
                item_type,
                field: name.to_string(),
            })?;
        field.set(value).map_err(|source| FieldError::Coercion {
            field: name.to_string(),
            source,
        })
    }

    /// Like [`Item::set`], but refuses fields declared read-only.
    pub fn modify(&mut self, name: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        if let Some(field) = self.field(name) {
            if !field.def().editable {
                return Err(FieldError::ReadOnly {
                    item_type: self.type_name().to_string(),
                    field: name.to_string(),
                });
            }
        }
        self.set(name, value)
    }

    /// Assign the store-managed identity fields.
    pub fn assign_identity(&mut self, uid: &str, ctime: f64) -> Result<(), FieldError> {
        self.set(UID_FIELD, uid)?;
        self.set(CTIME_FIELD, ctime)?;
        self.set(MTIME_FIELD, ctime)
    }

    /// Refresh the modification time.
    pub fn touch(&mut self) -> Result<(), FieldError> {
        self.set(MTIME_FIELD, now_timestamp())
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Apply the explicitly set slots of `record`.
    ///
    /// Unset and inherited slots, null values and keys this type does not
    /// declare are skipped.
    pub fn inflate(&mut self, record: &Record) -> Result<(), FieldError> {
        for (name, slot) in record {
            if !slot.is_set() || slot.value.is_null() {
                continue;
            }
            if !self.schema.has_field(name) {
                trace!(item_type = %self.type_name(), key = %name, "ignoring undeclared key");
                continue;
            }
            self.set(name, slot.value.clone())?;
        }
        Ok(())
    }

    /// The plain record of every field's value and set-state.
    pub fn deflate(&self) -> Record {
        self.fields
            .iter()
            .map(|field| (field.name().to_string(), field.slot()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // References and rendering
    // -----------------------------------------------------------------------

    /// The item named by the reference field `field`, if it resolves.
    pub fn reference<R: ItemResolver + ?Sized>(&self, field: &str, resolver: &R) -> Option<Item> {
        let field = self.field(field)?;
        let target = field.def().reference_target()?;
        let name = field.get().as_str()?;
        if name.is_empty() || (field.def().inherit && field.get().is_inherit()) {
            return None;
        }
        resolver.resolve(target, name)
    }

    /// The deflated record with every inheriting field resolved from the
    /// nearest parent holding a concrete value.
    ///
    /// Parents are consulted in the schema's declared order. Resolved slots
    /// are marked [`provis_types::SlotState::Inherited`].
    pub fn render<R: ItemResolver + ?Sized>(&self, resolver: &R) -> Record {
        self.render_within(resolver, &mut Vec::new())
    }

    fn render_within<R: ItemResolver + ?Sized>(&self, resolver: &R, path: &mut Vec<String>) -> Record {
        let mut record = self.deflate();
        let uid = self.uid().map(str::to_string);
        if let Some(uid) = &uid {
            if path.contains(uid) {
                trace!(item_type = %self.type_name(), uid = %uid, "inheritance cycle");
                return record;
            }
            path.push(uid.clone());
        }

        let parents = self.schema.parents();
        let mut rendered: Vec<Option<Option<Record>>> = vec![None; parents.len()];

        // Parent references resolve first so later lookups follow them.
        let order = parents
            .iter()
            .filter_map(|p| self.schema.position(p))
            .chain(0..self.fields.len())
            .collect::<Vec<_>>();
        let mut done = vec![false; self.fields.len()];

        for i in order {
            if std::mem::replace(&mut done[i], true) {
                continue;
            }
            let field = &self.fields[i];
            let name = field.name();
            let pending = field.def().inherit
                && record.value(name).is_some_and(Value::is_inherit);
            if !pending {
                continue;
            }
            for (p, parent_field) in parents.iter().enumerate() {
                if parent_field == name {
                    continue;
                }
                if rendered[p].is_none() {
                    let parent = self.render_parent(parent_field, &record, resolver, path);
                    rendered[p] = Some(parent);
                }
                let inherited = rendered[p]
                    .as_ref()
                    .and_then(Option::as_ref)
                    .and_then(|parent| parent.value(name))
                    .filter(|value| !value.is_inherit())
                    .cloned();
                if let Some(value) = inherited {
                    record.insert(name, Slot::inherited(value));
                    break;
                }
            }
        }

        if uid.is_some() {
            path.pop();
        }
        record
    }

    fn render_parent<R: ItemResolver + ?Sized>(
        &self,
        parent_field: &str,
        record: &Record,
        resolver: &R,
        path: &mut Vec<String>,
    ) -> Option<Record> {
        let target = self.schema.field(parent_field)?.reference_target()?;
        let name = record.value(parent_field)?.as_str()?;
        if name.is_empty() || name == provis_types::INHERIT {
            return None;
        }
        let parent = resolver.resolve(target, name)?;
        Some(parent.render_within(resolver, path))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Every field and requirement failure, in declaration order.
    pub fn check<R: ItemResolver + ?Sized>(&self, resolver: &R) -> Vec<(String, ValidationError)> {
        let mut errors = Vec::new();
        for field in &self.fields {
            if let Err(e) = self.check_field(field, resolver) {
                errors.push((field.name().to_string(), e));
            }
        }
        for requirement in &self.requirements {
            if let Err(e) = requirement.validate(self) {
                errors.push((requirement.name().to_string(), e));
            }
        }
        errors
    }

    /// Run [`Item::check`] and keep the failures on the item.
    ///
    /// Returns `true` if nothing failed.
    pub fn validate<R: ItemResolver + ?Sized>(&mut self, resolver: &R) -> bool {
        self.errors = self.check(resolver);
        self.errors.is_empty()
    }

    /// Failures collected by the most recent [`Item::validate`].
    pub fn errors(&self) -> &[(String, ValidationError)] {
        &self.errors
    }

    fn check_field<R: ItemResolver + ?Sized>(&self, field: &Field, resolver: &R) -> Result<(), ValidationError> {
        field.validate_value()?;
        let def = field.def();
        let Some(target) = def.reference_target() else {
            return Ok(());
        };
        if !field.is_set() && !def.required {
            return Ok(());
        }
        let name = if field.is_inheriting() {
            if !def.required {
                return Ok(());
            }
            self.render(resolver)
                .value(&def.name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        } else {
            field.get().as_str().unwrap_or_default().to_string()
        };
        if name.is_empty() || name == provis_types::INHERIT || !resolver.exists(target, &name) {
            return Err(ValidationError::InvalidReference {
                field: def.name.clone(),
                item_type: target.to_string(),
                name,
            });
        }
        Ok(())
    }

    pub fn signature(&self) -> SchemaSignature {
        self.schema.signature()
    }
}
