//! Typed item schemas for the provis object store.
//!
//! This crate defines what an item *is*: its typed, coercible fields, the
//! cross-field requirements it must satisfy, and how it inherits unset
//! values from the items it references.
//!
//! # Modules
//!
//! - [`kind`] -- field kinds and their coercion rules
//! - [`field`] -- field declarations ([`FieldSpec`]) and per-item state ([`Field`])
//! - [`requirement`] -- cross-field [`Requirement`]s and their helpers
//! - [`schema`] -- [`Schema`] and its composing [`SchemaBuilder`]
//! - [`registry`] -- the [`Registry`] of known item types
//! - [`item`] -- [`Item`]: inflate, deflate, validate and render
//! - [`resolver`] -- the [`ItemResolver`] seam items use to find each other
//! - [`catalog`] -- the built-in Distro, Image, Profile, System and Repo types
//!
//! # Rendering
//!
//! A field declared with `inherit` may hold the [`provis_types::INHERIT`]
//! sentinel. [`Item::render`] replaces each such value with the nearest
//! concrete value found by following the schema's parent references, and
//! never loops on reference cycles.

pub mod catalog;
pub mod error;
pub mod field;
pub mod item;
pub mod kind;
pub mod registry;
pub mod requirement;
pub mod resolver;
pub mod schema;

pub use catalog::{standard_registry, CatalogSettings};
pub use error::{FieldError, Result, SchemaError, ValidationError};
pub use field::{Field, FieldDef, FieldSignature, FieldSpec};
pub use item::Item;
pub use kind::FieldKind;
pub use registry::Registry;
pub use requirement::{
    require_any_of, require_at_least, require_n_of, require_one_of, Condition, Grouping,
    Requirement, RequirementSpec,
};
pub use resolver::{Detached, ItemResolver};
pub use schema::{Schema, SchemaBuilder, SchemaSignature, IDENTITY_FIELDS};
