//! Tether Engine
//!
//! The caller-facing surface of the relationship engine.
//!
//! Responsibilities:
//! - Resolve selection trees below root keys (read path)
//! - Execute nested mutation trees inside a transaction boundary (write path)
//! - Load engine configuration
//! - Classify failures for the transport layer

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorClass};

pub use tether_core::{EntityRecord, Fields, Key, Related, SelectionNode, Value};
pub use tether_mutation::{MutationInput, Operation, RelationInput};
pub use tether_transaction::CancelHandle;
