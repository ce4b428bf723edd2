//! # Editorial Core
//!
//! I/O-free logic for Editorial Import: piece and tree models, the stable
//! identifier allocator, content tree reconstruction, structural checks, and
//! the store abstraction.
//!
//! This crate contains no tokio, filesystem I/O, or other native-only
//! dependencies.

pub mod allocator;
pub mod error;
pub mod models;
pub mod store;
pub mod tree;
pub mod validate;
