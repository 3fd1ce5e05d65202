//! Supporting utilities.
//!
//! - `id_generator`: run identifiers.
//! - `testing`: nodes and graph fixtures shared by tests and examples.

pub mod id_generator;
pub mod testing;
