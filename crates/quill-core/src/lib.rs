//! # Quill Core
//!
//! The domain layer of the Quill blog.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, slug derivation, field validation and the author/publication gate.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::DomainError;
