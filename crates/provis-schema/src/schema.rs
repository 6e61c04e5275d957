//! Item schemas and their builder.
//!
//! A [`Schema`] is the immutable declaration of one item type: its ordered
//! field definitions, its requirements and the reference fields that name
//! its render parents. Schemas compose explicitly: [`SchemaBuilder::extends`]
//! copies a base schema's fields and requirements, and fields declared later
//! replace earlier fields of the same name in place.

use std::collections::HashMap;
use std::sync::Arc;

use provis_types::{CTIME_FIELD, MTIME_FIELD, TYPE_FIELD, UID_FIELD};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Result, SchemaError};
use crate::field::{FieldDef, FieldSignature, FieldSpec};
use crate::requirement::RequirementSpec;

/// Field names every item carries. User fields may not reuse them.
pub const IDENTITY_FIELDS: [&str; 4] = [TYPE_FIELD, UID_FIELD, CTIME_FIELD, MTIME_FIELD];

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The declaration of one item type.
#[derive(Clone, Debug)]
pub struct Schema {
    name: String,
    fields: Vec<Arc<FieldDef>>,
    index: HashMap<String, usize>,
    requirements: Vec<RequirementSpec>,
    parents: Vec<String>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All field definitions, identity fields first.
    pub fn fields(&self) -> &[Arc<FieldDef>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Arc<FieldDef>> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn requirements(&self) -> &[RequirementSpec] {
        &self.requirements
    }

    /// Reference fields naming this type's render parents, nearest first.
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn signature(&self) -> SchemaSignature {
        SchemaSignature {
            item_type: self.name.clone(),
            parents: self.parents.clone(),
            fields: self.fields.iter().map(|f| f.signature()).collect(),
        }
    }
}

/// Introspection view of a whole item type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaSignature {
    pub item_type: String,
    pub parents: Vec<String>,
    pub fields: Vec<FieldSignature>,
}

// ---------------------------------------------------------------------------
// SchemaBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Schema`].
pub struct SchemaBuilder {
    name: String,
    bases: Vec<Arc<Schema>>,
    fields: Vec<FieldSpec>,
    requirements: Vec<RequirementSpec>,
    parents: Option<Vec<String>>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            fields: Vec::new(),
            requirements: Vec::new(),
            parents: None,
        }
    }

    /// Inherit the fields, requirements and parents of `base`.
    ///
    /// May be called more than once; bases are applied in call order.
    pub fn extends(mut self, base: Arc<Schema>) -> Self {
        self.bases.push(base);
        self
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn fields(mut self, specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(specs);
        self
    }

    pub fn requirement(mut self, requirement: impl Into<RequirementSpec>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Declare the reference fields consulted when rendering, nearest first.
    pub fn parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = Some(parents.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut fields: Vec<Arc<FieldDef>> = identity_fields(&self.name)?;

        for base in &self.bases {
            for def in base.fields() {
                if IDENTITY_FIELDS.contains(&def.name.as_str()) {
                    continue;
                }
                bind(&mut fields, Arc::clone(def));
            }
        }

        for spec in self.fields {
            if IDENTITY_FIELDS.contains(&spec.name()) {
                return Err(SchemaError::ReservedField {
                    schema: self.name.clone(),
                    field: spec.name().to_string(),
                });
            }
            let def = spec.build()?;
            trace!(schema = %self.name, field = %def.name, kind = def.kind.name(), "field bound");
            bind(&mut fields, Arc::new(def));
        }

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect::<HashMap<_, _>>();

        let parents = match self.parents {
            Some(parents) => parents,
            None => {
                let mut inherited: Vec<String> = Vec::new();
                for base in &self.bases {
                    for parent in base.parents() {
                        if !inherited.contains(parent) {
                            inherited.push(parent.clone());
                        }
                    }
                }
                inherited
            }
        };
        for parent in &parents {
            match index.get(parent).map(|&i| &fields[i]) {
                None => {
                    return Err(SchemaError::UnknownParent {
                        schema: self.name.clone(),
                        field: parent.clone(),
                    })
                }
                Some(def) if def.reference_target().is_none() => {
                    return Err(SchemaError::ParentNotAReference {
                        schema: self.name.clone(),
                        field: parent.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        let mut requirements: Vec<RequirementSpec> = self
            .bases
            .iter()
            .flat_map(|base| base.requirements().iter().cloned())
            .collect();
        requirements.extend(self.requirements);

        debug!(
            schema = %self.name,
            fields = fields.len(),
            requirements = requirements.len(),
            parents = parents.len(),
            "schema built"
        );

        Ok(Schema {
            name: self.name,
            fields,
            index,
            requirements,
            parents,
        })
    }
}

/// Replace a field of the same name in place, or append.
fn bind(fields: &mut Vec<Arc<FieldDef>>, def: Arc<FieldDef>) {
    match fields.iter_mut().find(|f| f.name == def.name) {
        Some(slot) => *slot = def,
        None => fields.push(def),
    }
}

fn identity_fields(type_name: &str) -> Result<Vec<Arc<FieldDef>>> {
    [
        FieldSpec::str(TYPE_FIELD)
            .default(type_name)
            .read_only()
            .hidden()
            .display_name("Type"),
        FieldSpec::str(UID_FIELD)
            .required()
            .read_only()
            .hidden()
            .display_name("UID"),
        FieldSpec::time(CTIME_FIELD)
            .required()
            .read_only()
            .hidden()
            .display_name("Created"),
        FieldSpec::time(MTIME_FIELD)
            .required()
            .read_only()
            .hidden()
            .display_name("Modified"),
    ]
    .into_iter()
    .map(|spec| spec.build().map(Arc::new))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::FieldKind;
    use crate::requirement::require_one_of;
    use provis_types::Value;

    fn base() -> Arc<Schema> {
        Arc::new(
            SchemaBuilder::new("Base")
                .field(FieldSpec::str("name").required())
                .field(FieldSpec::int("depth").default(1))
                .field(FieldSpec::item_ref("parent", "Base"))
                .requirement(require_one_of(&["name", "depth"]))
                .parents(["parent"])
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn identity_fields_come_first() {
        let schema = base();
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(
            names,
            vec!["_type", "_uid", "_ctime", "_mtime", "name", "depth", "parent"]
        );
        assert_eq!(
            schema.field("_type").unwrap().default,
            Value::from("Base")
        );
        assert!(!schema.field("_uid").unwrap().editable);
        assert!(schema.field("_ctime").unwrap().required);
    }

    #[test]
    fn extends_replaces_fields_in_place() {
        let derived = SchemaBuilder::new("Derived")
            .extends(base())
            .field(FieldSpec::float("depth").default(2.5))
            .field(FieldSpec::str("comment"))
            .build()
            .unwrap();

        let names: Vec<&str> = derived.field_names().collect();
        assert_eq!(
            names,
            vec!["_type", "_uid", "_ctime", "_mtime", "name", "depth", "parent", "comment"]
        );
        assert_eq!(derived.field("depth").unwrap().kind, FieldKind::Float);
        assert_eq!(derived.field("_type").unwrap().default, Value::from("Derived"));
        assert_eq!(derived.requirements().len(), 1);
        assert_eq!(derived.parents(), ["parent".to_string()]);
    }

    #[test]
    fn multiple_bases_merge_in_order() {
        let other = Arc::new(
            SchemaBuilder::new("Other")
                .field(FieldSpec::str("depth"))
                .field(FieldSpec::bool("enabled"))
                .build()
                .unwrap(),
        );
        let merged = SchemaBuilder::new("Merged")
            .extends(base())
            .extends(other)
            .build()
            .unwrap();
        assert_eq!(merged.field("depth").unwrap().kind, FieldKind::Str);
        assert_eq!(merged.position("enabled"), Some(7));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let err = SchemaBuilder::new("Bad")
            .field(FieldSpec::str("_uid"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedField { .. }));
    }

    #[test]
    fn parents_must_be_references() {
        let err = SchemaBuilder::new("Bad")
            .field(FieldSpec::str("name"))
            .parents(["name"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ParentNotAReference { .. }));

        let err = SchemaBuilder::new("Bad")
            .parents(["missing"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParent { .. }));
    }

    #[test]
    fn signature_lists_every_field() {
        let sig = base().signature();
        assert_eq!(sig.item_type, "Base");
        assert_eq!(sig.fields.len(), 7);
        assert_eq!(sig.fields[4].name, "name");
        assert!(sig.fields[4].required);
    }
}
