//! Operation implementations, one module per foreign-key owner.
//!
//! - `owned` - the node's own row stores the key (runs before the row is written)
//! - `children` - the related rows store the key
//! - `pivot` - a pivot table stores both keys

pub(crate) mod children;
pub(crate) mod owned;
pub(crate) mod pivot;
