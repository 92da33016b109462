//! Course permission types for access control.
//!
//! Each user holds at most one permission per course. `Admin` subsumes
//! `Staff`: any check that requires `Staff` is satisfied by `Admin` on the
//! same course, but not the other way around. Subsumption is expressed
//! through the derived total order, not string comparison.

use serde::{Deserialize, Serialize};

/// Permission level scoped to a single course.
///
/// The declaration order matters: the derived `Ord` makes
/// `Staff < Admin`, which is what [`CoursePermission::satisfies`] relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoursePermission {
    /// Course staff: can manage the course's queues.
    Staff,
    /// Course admin: everything staff can do, plus staff management.
    Admin,
}

impl CoursePermission {
    /// Returns true if this permission satisfies a check for `required`
    /// on the same course.
    #[must_use]
    pub fn satisfies(&self, required: CoursePermission) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for CoursePermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staff => write!(f, "STAFF"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_satisfies_staff() {
        assert!(CoursePermission::Admin.satisfies(CoursePermission::Staff));
        assert!(CoursePermission::Admin.satisfies(CoursePermission::Admin));
    }

    #[test]
    fn staff_does_not_satisfy_admin() {
        assert!(CoursePermission::Staff.satisfies(CoursePermission::Staff));
        assert!(!CoursePermission::Staff.satisfies(CoursePermission::Admin));
    }

    #[test]
    fn ordering_is_staff_below_admin() {
        assert!(CoursePermission::Staff < CoursePermission::Admin);
    }

    #[test]
    fn serialization_matches_wire_format() {
        let json = serde_json::to_string(&CoursePermission::Admin).expect("serialize");
        assert_eq!(json, "\"ADMIN\"");

        let json = serde_json::to_string(&CoursePermission::Staff).expect("serialize");
        assert_eq!(json, "\"STAFF\"");

        let parsed: CoursePermission = serde_json::from_str("\"STAFF\"").expect("deserialize");
        assert_eq!(parsed, CoursePermission::Staff);
    }
}
