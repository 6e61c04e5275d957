//! Foundation types for the provis object store.
//!
//! This crate provides the value model, the record wire shape and the
//! identity helpers shared by every other provis crate.
//!
//! # Key Types
//!
//! - [`Value`] -- dynamically typed field value (string, number, list, ...)
//! - [`Slot`] -- a `(value, state)` pair as carried in records
//! - [`Record`] -- flat mapping from field name to [`Slot`], the deflated form
//!   of an item
//! - [`INHERIT`] -- the reserved sentinel that defers a field to its parent
//!
//! Reserved record keys are prefixed with an underscore so that they never
//! collide with declared field names: [`TYPE_FIELD`], [`UID_FIELD`],
//! [`CTIME_FIELD`] and [`MTIME_FIELD`].

pub mod error;
pub mod identity;
pub mod record;
pub mod value;

pub use error::TypeError;
pub use identity::{generate_uid, now_timestamp};
pub use record::{Record, Slot, SlotState, CTIME_FIELD, MTIME_FIELD, TYPE_FIELD, UID_FIELD};
pub use value::{Value, INHERIT};
