//! Tether Loader
//!
//! Read-path relation resolution without N+1 query storms.
//!
//! Responsibilities:
//! - Load one relation for a whole set of parents in one query (`BatchLoader`)
//! - Walk a selection tree level by level, sharing loads across branches
//!   (`EagerLoadPlanner`)
//! - Run independent sibling loads on a bounded thread pool

mod batch;
mod error;
mod planner;

pub use batch::{BatchLoader, LinkKey, LoadGroup};
pub use error::{LoaderError, LoaderResult};
pub use planner::{build_pool, EagerLoadPlanner};
