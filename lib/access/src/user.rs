//! User domain type and profile handling.
//!
//! Users are provisioned on first successful sign-in, keyed by the
//! identity provider's subject claim. The internal `id` is used for all
//! platform operations; the subject never leaves the server.

use chrono::{DateTime, Utc};
use hours_core::{CourseId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValidationError;
use crate::role::CoursePermission;

/// Mutable profile attributes, owned exclusively by the user record and
/// updatable only through the authenticated self-update operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name shown across the platform.
    pub display_name: Option<String>,
    /// Preferred pronouns.
    pub pronouns: Option<String>,
    /// Video meeting link used when holding remote hours.
    pub meeting_link: Option<String>,
    /// Phone number digits, including the country dial code.
    pub phone_number: Option<String>,
    /// ISO country code for the phone number (e.g. "us").
    pub phone_country_code: Option<String>,
    /// Avatar URL sourced from the identity provider at sign-in.
    pub photo_url: Option<String>,
}

/// A validated self-update to the mutable profile fields.
///
/// Construct via [`ProfileUpdate::new`], which rejects malformed fields
/// with a [`ValidationError`] naming the offender. Fields left as `None`
/// are cleared; updates are last-writer-wins per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    display_name: String,
    pronouns: Option<String>,
    meeting_link: Option<String>,
    phone_number: Option<String>,
    phone_country_code: Option<String>,
}

impl ProfileUpdate {
    /// Validates raw profile input.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first malformed field:
    /// empty display name, non-http(s) meeting link, non-digit phone
    /// number, or a country code that is not two ASCII letters.
    pub fn new(
        display_name: String,
        pronouns: Option<String>,
        meeting_link: Option<String>,
        phone_number: Option<String>,
        phone_country_code: Option<String>,
    ) -> Result<Self, ValidationError> {
        if display_name.trim().is_empty() {
            return Err(ValidationError {
                field: "displayName",
                reason: "must not be empty".to_string(),
            });
        }

        let meeting_link = none_if_empty(meeting_link);
        if let Some(link) = &meeting_link {
            if !link.starts_with("https://") && !link.starts_with("http://") {
                return Err(ValidationError {
                    field: "meetingLink",
                    reason: "must be an http(s) URL".to_string(),
                });
            }
        }

        let phone_number = none_if_empty(phone_number);
        if let Some(phone) = &phone_number {
            let digits = phone.chars().all(|c| c.is_ascii_digit());
            if !digits || phone.len() < 4 || phone.len() > 15 {
                return Err(ValidationError {
                    field: "phoneNumber",
                    reason: "must be 4-15 digits including the dial code".to_string(),
                });
            }
        }

        let phone_country_code = none_if_empty(phone_country_code);
        if let Some(code) = &phone_country_code {
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ValidationError {
                    field: "phoneCountryCode",
                    reason: "must be a two-letter country code".to_string(),
                });
            }
        }

        Ok(Self {
            display_name,
            pronouns: none_if_empty(pronouns),
            meeting_link,
            phone_number,
            phone_country_code,
        })
    }
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Represents a user of the platform.
///
/// Created after a first successful federated sign-in. Exactly one `id`
/// and `email` per user; `course_permissions` may be empty (no elevated
/// role anywhere).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal platform user ID.
    id: UserId,
    /// Identity provider subject claim.
    subject: String,
    /// Verified email address, unique across users.
    email: String,
    /// Global elevated privilege flag.
    is_admin: bool,
    /// Mutable profile attributes.
    profile: Profile,
    /// Per-course permission grants.
    course_permissions: HashMap<CourseId, CoursePermission>,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user from a verified identity.
    ///
    /// Profile fields start empty and no course permissions are granted.
    #[must_use]
    pub fn new(subject: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            subject,
            email,
            is_admin: false,
            profile: Profile::default(),
            course_permissions: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a user from storage.
    #[must_use]
    pub fn from_parts(
        id: UserId,
        subject: String,
        email: String,
        is_admin: bool,
        profile: Profile,
        course_permissions: HashMap<CourseId, CoursePermission>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject,
            email,
            is_admin,
            profile,
            course_permissions,
            created_at,
            updated_at,
        }
    }

    /// Returns the user's internal platform ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the identity provider subject claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the verified email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns true if the user holds the global admin flag.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Returns the profile attributes.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns the per-course permission grants.
    #[must_use]
    pub fn course_permissions(&self) -> &HashMap<CourseId, CoursePermission> {
        &self.course_permissions
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the user has `required` or a subsuming permission
    /// on `course`. Global admins pass every check.
    #[must_use]
    pub fn has_course_role(&self, course: &CourseId, required: CoursePermission) -> bool {
        if self.is_admin {
            return true;
        }
        self.course_permissions
            .get(course)
            .is_some_and(|held| held.satisfies(required))
    }

    /// Updates the email address, e.g. when the provider claim changes.
    pub fn set_email(&mut self, email: String) {
        self.email = email;
        self.updated_at = Utc::now();
    }

    /// Sets or clears the global admin flag.
    pub fn set_admin(&mut self, is_admin: bool) {
        self.is_admin = is_admin;
        self.updated_at = Utc::now();
    }

    /// Updates the provider-sourced photo URL.
    pub fn set_photo_url(&mut self, photo_url: Option<String>) {
        self.profile.photo_url = photo_url;
        self.updated_at = Utc::now();
    }

    /// Applies a validated profile self-update.
    pub fn apply_profile_update(&mut self, update: ProfileUpdate) {
        self.profile.display_name = Some(update.display_name);
        self.profile.pronouns = update.pronouns;
        self.profile.meeting_link = update.meeting_link;
        self.profile.phone_number = update.phone_number;
        self.profile.phone_country_code = update.phone_country_code;
        self.updated_at = Utc::now();
    }

    /// Grants (or replaces) a permission on a course.
    pub fn grant_course_permission(&mut self, course: CourseId, permission: CoursePermission) {
        self.course_permissions.insert(course, permission);
        self.updated_at = Utc::now();
    }

    /// Removes any permission on a course. No-op when none was held.
    pub fn revoke_course_permission(&mut self, course: &CourseId) {
        self.course_permissions.remove(course);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new("sub_123".to_string(), "alice@brown.edu".to_string())
    }

    #[test]
    fn new_user_has_empty_profile_and_no_permissions() {
        let user = test_user();

        assert_eq!(user.subject(), "sub_123");
        assert_eq!(user.email(), "alice@brown.edu");
        assert!(!user.is_admin());
        assert_eq!(user.profile(), &Profile::default());
        assert!(user.course_permissions().is_empty());
        assert!(user.id().to_string().starts_with("usr_"));
    }

    #[test]
    fn staff_grant_confers_staff_only_on_that_course() {
        let mut user = test_user();
        user.grant_course_permission(CourseId::new("cs101"), CoursePermission::Staff);

        assert!(user.has_course_role(&CourseId::new("cs101"), CoursePermission::Staff));
        assert!(!user.has_course_role(&CourseId::new("cs201"), CoursePermission::Staff));
        assert!(!user.has_course_role(&CourseId::new("cs101"), CoursePermission::Admin));
    }

    #[test]
    fn admin_grant_subsumes_staff() {
        let mut user = test_user();
        user.grant_course_permission(CourseId::new("cs101"), CoursePermission::Admin);

        assert!(user.has_course_role(&CourseId::new("cs101"), CoursePermission::Staff));
        assert!(user.has_course_role(&CourseId::new("cs101"), CoursePermission::Admin));
    }

    #[test]
    fn global_admin_passes_every_check() {
        let mut user = test_user();
        user.set_admin(true);

        assert!(user.has_course_role(&CourseId::new("anything"), CoursePermission::Admin));
    }

    #[test]
    fn revoke_removes_the_grant() {
        let mut user = test_user();
        let course = CourseId::new("cs101");
        user.grant_course_permission(course.clone(), CoursePermission::Staff);
        user.revoke_course_permission(&course);

        assert!(!user.has_course_role(&course, CoursePermission::Staff));
    }

    #[test]
    fn regrant_replaces_the_permission() {
        let mut user = test_user();
        let course = CourseId::new("cs101");
        user.grant_course_permission(course.clone(), CoursePermission::Staff);
        user.grant_course_permission(course.clone(), CoursePermission::Admin);

        assert_eq!(user.course_permissions().len(), 1);
        assert!(user.has_course_role(&course, CoursePermission::Admin));
    }

    #[test]
    fn profile_update_applies_fields() {
        let mut user = test_user();
        let update = ProfileUpdate::new(
            "Alice".to_string(),
            Some("she/her".to_string()),
            Some("https://brown.zoom.us/j/123".to_string()),
            Some("14015551234".to_string()),
            Some("us".to_string()),
        )
        .expect("valid update");

        user.apply_profile_update(update);

        assert_eq!(user.profile().display_name.as_deref(), Some("Alice"));
        assert_eq!(user.profile().pronouns.as_deref(), Some("she/her"));
        assert_eq!(user.profile().phone_number.as_deref(), Some("14015551234"));
        assert_eq!(user.profile().phone_country_code.as_deref(), Some("us"));
    }

    #[test]
    fn profile_update_clears_omitted_fields() {
        let mut user = test_user();
        let full = ProfileUpdate::new(
            "Alice".to_string(),
            Some("she/her".to_string()),
            None,
            None,
            None,
        )
        .expect("valid update");
        user.apply_profile_update(full);

        let cleared =
            ProfileUpdate::new("Alice".to_string(), None, None, None, None).expect("valid update");
        user.apply_profile_update(cleared);

        assert!(user.profile().pronouns.is_none());
    }

    #[test]
    fn empty_display_name_rejected() {
        let err = ProfileUpdate::new("  ".to_string(), None, None, None, None)
            .expect_err("should reject");
        assert_eq!(err.field, "displayName");
    }

    #[test]
    fn bad_meeting_link_rejected() {
        let err = ProfileUpdate::new(
            "Alice".to_string(),
            None,
            Some("javascript:alert(1)".to_string()),
            None,
            None,
        )
        .expect_err("should reject");
        assert_eq!(err.field, "meetingLink");
    }

    #[test]
    fn bad_phone_number_rejected() {
        let err = ProfileUpdate::new(
            "Alice".to_string(),
            None,
            None,
            Some("401-555-1234".to_string()),
            None,
        )
        .expect_err("should reject");
        assert_eq!(err.field, "phoneNumber");
    }

    #[test]
    fn bad_country_code_rejected() {
        let err = ProfileUpdate::new(
            "Alice".to_string(),
            None,
            None,
            Some("14015551234".to_string()),
            Some("usa".to_string()),
        )
        .expect_err("should reject");
        assert_eq!(err.field, "phoneCountryCode");
    }

    #[test]
    fn empty_optional_fields_treated_as_absent() {
        let update = ProfileUpdate::new(
            "Alice".to_string(),
            Some(String::new()),
            Some(String::new()),
            Some(String::new()),
            Some(String::new()),
        )
        .expect("empty strings are cleared, not validated");

        let mut user = test_user();
        user.apply_profile_update(update);
        assert!(user.profile().pronouns.is_none());
        assert!(user.profile().meeting_link.is_none());
        assert!(user.profile().phone_number.is_none());
    }

    #[test]
    fn set_email_updates_timestamp() {
        let mut user = test_user();
        let original = user.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(1));
        user.set_email("alice2@brown.edu".to_string());

        assert_eq!(user.email(), "alice2@brown.edu");
        assert!(user.updated_at() > original);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut user = test_user();
        user.grant_course_permission(CourseId::new("cs0320"), CoursePermission::Admin);

        let json = serde_json::to_string(&user).expect("serialize");
        let parsed: User = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(user, parsed);
    }
}
