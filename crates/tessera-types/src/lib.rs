//! Foundation types for Tessera.
//!
//! This crate provides the identity and tagging types shared by every other
//! Tessera crate: the content hash, the binary format tag that every hash
//! and serialization call is parameterised by, and the closed set of value
//! kinds.
//!
//! # Key Types
//!
//! - [`Hash`] -- Content address (BLAKE3, domain-separated by [`Format`])
//! - [`Format`] -- Binary format version tag
//! - [`Kind`] -- Value kind tag; also the cross-kind sort order

pub mod error;
pub mod format;
pub mod hash;
pub mod kind;

pub use error::TypeError;
pub use format::Format;
pub use hash::Hash;
pub use kind::Kind;
