//! Domain model for classroom ML projects.
//!
//! # Responsibility
//! - Define the records shared by repositories and the project store.
//! - Own identifier generation and input validation rules.
//!
//! # Invariants
//! - Every project, field and training example has a system-generated id.
//! - A project's label list never contains duplicates or empty strings.

pub mod field;
pub mod ids;
pub mod label;
pub mod project;
pub mod training;
pub mod validation;
