//! Opaque identifiers.
//!
//! Caller-supplied ids (`userid`, `classid`, `projectid`) are never parsed;
//! they only matter as lookup keys. Ids minted here are UUID v4 strings.

use uuid::Uuid;

pub type ProjectId = String;
pub type FieldId = String;
pub type TrainingId = String;

/// Mints a new unique identifier for a stored record.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Tenant-scoped address of one project.
///
/// Lookups through a key only match when all three parts agree, so a
/// project owned by someone else is indistinguishable from a missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectKey<'a> {
    pub userid: &'a str,
    pub classid: &'a str,
    pub projectid: &'a str,
}

impl<'a> ProjectKey<'a> {
    pub fn new(userid: &'a str, classid: &'a str, projectid: &'a str) -> Self {
        Self {
            userid,
            classid,
            projectid,
        }
    }
}
