//! Query/index layer over stored projects.
//!
//! # Responsibility
//! - Describe "projects by user" and "projects by class" lookups.
//! - Build enumeration and count SQL from one shared scope predicate.
//!
//! # Invariants
//! - A user scope never matches a project owned by another user.
//! - Count and enumeration for the same scope always agree.
//! - Both scopes are served by `idx_projects_class_user`, not a table scan.

pub mod scope;
