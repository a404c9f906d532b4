//! Tether Core Types
//!
//! This crate provides the foundational types shared by the relationship engine:
//! - Key and value types (Key, Value, Fields)
//! - Entity records and their attached relations (EntityRecord, Related)
//! - Client selection trees (SelectionNode)
//! - Common error types

mod entity;
mod error;
mod key;
mod selection;
mod value;

pub use entity::*;
pub use error::*;
pub use key::*;
pub use selection::*;
pub use value::*;
