//! Cross-field requirements.
//!
//! A [`Requirement`] counts how many of its conditions hold on an item and
//! compares the count against a [`Grouping`]. Schemas declare requirements
//! as a [`RequirementSpec`]: either a ready-made requirement or a factory
//! that is bound to each item once its fields exist.

use std::fmt;
use std::sync::Arc;

use crate::error::ValidationError;
use crate::item::Item;

/// A boolean check evaluated against an item.
pub type Condition = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// A factory producing a requirement bound to a freshly built item.
pub type RequirementFactory = Arc<dyn Fn(&Item) -> Requirement + Send + Sync>;

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// How many conditions must hold for a requirement to pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grouping {
    All,
    Any,
    Exactly(usize),
    AtLeast(usize),
}

impl Grouping {
    /// Returns `true` if `passed` of `total` conditions satisfy this grouping.
    pub fn admits(self, passed: usize, total: usize) -> bool {
        match self {
            Self::All => passed == total,
            Self::Any => passed >= 1,
            Self::Exactly(n) => passed == n,
            Self::AtLeast(n) => passed >= n,
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Any => f.write_str("any"),
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requirement
// ---------------------------------------------------------------------------

/// A named group of conditions.
#[derive(Clone)]
pub struct Requirement {
    name: String,
    grouping: Grouping,
    conditions: Vec<Condition>,
}

impl Requirement {
    pub fn new(name: impl Into<String>, grouping: Grouping) -> Self {
        Self {
            name: name.into(),
            grouping,
            conditions: Vec::new(),
        }
    }

    pub fn condition<F>(mut self, check: F) -> Self
    where
        F: Fn(&Item) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Arc::new(check));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of conditions currently holding on `item`.
    pub fn count(&self, item: &Item) -> usize {
        self.conditions.iter().filter(|check| check(item)).count()
    }

    pub fn validate(&self, item: &Item) -> Result<(), ValidationError> {
        let passed = self.count(item);
        if self.grouping.admits(passed, self.conditions.len()) {
            Ok(())
        } else {
            Err(ValidationError::Requirement {
                item_type: item.type_name().to_string(),
                requirement: self.name.clone(),
            })
        }
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("name", &self.name)
            .field("grouping", &self.grouping)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RequirementSpec
// ---------------------------------------------------------------------------

/// A requirement as declared on a schema.
#[derive(Clone)]
pub enum RequirementSpec {
    Ready(Arc<Requirement>),
    Factory(RequirementFactory),
}

impl RequirementSpec {
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Item) -> Requirement + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// Bind this declaration to `item`.
    pub fn bind(&self, item: &Item) -> Arc<Requirement> {
        match self {
            Self::Ready(requirement) => Arc::clone(requirement),
            Self::Factory(factory) => Arc::new(factory(item)),
        }
    }
}

impl From<Requirement> for RequirementSpec {
    fn from(requirement: Requirement) -> Self {
        Self::Ready(Arc::new(requirement))
    }
}

impl fmt::Debug for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(r) => f.debug_tuple("Ready").field(r).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn set_checks(label: &str, fields: &[&str], grouping: Grouping) -> Requirement {
    let name = format!("{label}{}", fields.join(", "));
    fields.iter().fold(Requirement::new(name, grouping), |req, field| {
        let field = field.to_string();
        req.condition(move |item: &Item| item.is_set(&field))
    })
}

/// Exactly one of `fields` must be set.
pub fn require_one_of(fields: &[&str]) -> Requirement {
    set_checks("Require One of: ", fields, Grouping::Exactly(1))
}

/// At least one of `fields` must be set. Labelled `Require Any of: ...`
/// to keep it distinct from [`require_one_of`].
pub fn require_any_of(fields: &[&str]) -> Requirement {
    set_checks("Require Any of: ", fields, Grouping::Any)
}

/// Exactly `n` of `fields` must be set.
pub fn require_n_of(n: usize, fields: &[&str]) -> Requirement {
    set_checks(&format!("Require {n} of: "), fields, Grouping::Exactly(n))
}

/// At least `n` of `fields` must be set.
pub fn require_at_least(n: usize, fields: &[&str]) -> Requirement {
    set_checks(
        &format!("Require at least {n} of: "),
        fields,
        Grouping::AtLeast(n),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::schema::SchemaBuilder;

    fn item() -> Item {
        let schema = SchemaBuilder::new("Widget")
            .field(FieldSpec::str("a"))
            .field(FieldSpec::str("b"))
            .field(FieldSpec::str("c"))
            .build()
            .unwrap();
        Item::new(Arc::new(schema), "base")
    }

    #[test]
    fn grouping_admits() {
        assert!(Grouping::All.admits(3, 3));
        assert!(!Grouping::All.admits(2, 3));
        assert!(Grouping::All.admits(0, 0));
        assert!(Grouping::Any.admits(1, 3));
        assert!(!Grouping::Any.admits(0, 3));
        assert!(Grouping::Exactly(2).admits(2, 3));
        assert!(!Grouping::Exactly(2).admits(3, 3));
        assert!(Grouping::AtLeast(2).admits(3, 3));
        assert!(!Grouping::AtLeast(2).admits(1, 3));
    }

    #[test]
    fn one_of_rejects_none_and_both() {
        let req = require_one_of(&["a", "b"]);
        assert_eq!(req.name(), "Require One of: a, b");

        let mut item = item();
        assert!(matches!(
            req.validate(&item),
            Err(ValidationError::Requirement { ref requirement, .. }) if requirement == "Require One of: a, b"
        ));

        item.set("a", "x").unwrap();
        assert!(req.validate(&item).is_ok());

        item.set("b", "y").unwrap();
        assert!(req.validate(&item).is_err());
    }

    #[test]
    fn any_of_and_at_least() {
        let any = require_any_of(&["a", "b", "c"]);
        let two = require_at_least(2, &["a", "b", "c"]);
        assert_eq!(any.name(), "Require Any of: a, b, c");
        assert_eq!(any.grouping(), Grouping::Any);
        assert_ne!(any.name(), require_one_of(&["a", "b", "c"]).name());
        let mut item = item();
        assert!(any.validate(&item).is_err());

        item.set("c", "1").unwrap();
        assert!(any.validate(&item).is_ok());
        assert!(two.validate(&item).is_err());

        item.set("a", "1").unwrap();
        item.set("b", "1").unwrap();
        assert!(two.validate(&item).is_ok());
        assert_eq!(two.count(&item), 3);
    }

    #[test]
    fn n_of_is_exact() {
        let req = require_n_of(2, &["a", "b", "c"]);
        assert_eq!(req.grouping(), Grouping::Exactly(2));
        let mut item = item();
        item.set("a", "1").unwrap();
        item.set("b", "1").unwrap();
        assert!(req.validate(&item).is_ok());
        item.set("c", "1").unwrap();
        assert!(req.validate(&item).is_err());
    }

    #[test]
    fn custom_conditions_see_values() {
        let req = Requirement::new("a equals b", Grouping::All)
            .condition(|item: &Item| item.get("a") == item.get("b"));
        let mut item = item();
        assert!(req.validate(&item).is_ok());
        item.set("a", "x").unwrap();
        assert!(req.validate(&item).is_err());
    }

    #[test]
    fn factory_binds_per_item() {
        let spec = RequirementSpec::factory(|item: &Item| {
            Requirement::new(format!("{} needs a", item.type_name()), Grouping::All)
                .condition(|item: &Item| item.is_set("a"))
        });
        let item = item();
        let bound = spec.bind(&item);
        assert_eq!(bound.name(), "Widget needs a");
        assert_eq!(bound.len(), 1);
    }
}
