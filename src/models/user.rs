// src/models/user.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Free-form profile data kept next to the identity in `auth_users.user_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Represents the 'auth_users' table. Only the privileged client may list it.
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub user_metadata: Json<UserMetadata>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// Login lookup row; carries the password hash, never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct Credentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Option<String>,
}

/// A row of 'user_roles'.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub user_id: Uuid,
    pub role: String,
}

/// Minimal submission projection used to flag users who started the quiz.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionOwner {
    pub user_id: Uuid,
}

/// Denormalized user view for the admin back office.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub has_submission: bool,
}

/// One identity plus whatever the side lookups found for it.
#[derive(Debug, Clone)]
pub struct ProfileSources {
    pub identity: Identity,
    pub role: Option<RoleRow>,
    pub submission: Option<SubmissionOwner>,
}

impl ProfileSources {
    pub fn into_profile(self) -> UserProfile {
        let Json(meta) = self.identity.user_metadata;
        UserProfile {
            id: self.identity.id,
            email: self.identity.email,
            name: meta.name,
            phone: meta.phone,
            avatar_url: meta.avatar_url,
            created_at: self.identity.created_at,
            last_sign_in_at: self.identity.last_sign_in_at,
            is_admin: self.role.is_some_and(|r| r.role == "admin"),
            has_submission: self.submission.is_some(),
        }
    }
}

/// Joins identities with role and submission rows by user id.
///
/// Output order follows `identities`; every identity yields exactly one profile.
/// Side rows without a matching identity are ignored.
pub fn merge_profiles(
    identities: Vec<Identity>,
    roles: Vec<RoleRow>,
    submissions: Vec<SubmissionOwner>,
) -> Vec<UserProfile> {
    let mut roles: HashMap<Uuid, RoleRow> = roles.into_iter().map(|r| (r.user_id, r)).collect();
    let mut submissions: HashMap<Uuid, SubmissionOwner> = submissions
        .into_iter()
        .map(|s| (s.user_id, s))
        .collect();

    identities
        .into_iter()
        .map(|identity| {
            let id = identity.id;
            ProfileSources {
                identity,
                role: roles.remove(&id),
                submission: submissions.remove(&id),
            }
            .into_profile()
        })
        .collect()
}

/// Case-insensitive substring match on name or email. Blank search keeps everything.
pub fn filter_profiles(profiles: Vec<UserProfile>, search: Option<&str>) -> Vec<UserProfile> {
    let needle = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_lowercase(),
        None => return profiles,
    };

    profiles
        .into_iter()
        .filter(|p| {
            p.email.to_lowercase().contains(&needle)
                || p.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Query parameters for the admin user list.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
}

/// DTO for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email is required."))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
}

/// DTO for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for a user editing their own profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub avatar_url: Option<String>,
}

/// DTO for an admin editing any user. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub avatar_url: Option<String>,
    pub is_admin: Option<bool>,
}

/// One row of a bulk import.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImportUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    /// When absent a random password is generated; the user resets it later.
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportUsersRequest {
    pub users: Vec<ImportUser>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Notes a row that was not created. The rest of the batch goes on.
    pub fn record_failure(&mut self, email: &str, reason: impl std::fmt::Display) {
        self.errors.push(format!("{}: {}", email, reason));
    }
}

/// Normalises every email (trimmed, lower-cased) and drops rows whose email
/// already appeared earlier in the same batch.
pub fn dedupe_import(users: Vec<ImportUser>) -> (Vec<ImportUser>, usize) {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let unique = users
        .into_iter()
        .map(|mut u| {
            u.email = u.email.trim().to_lowercase();
            u
        })
        .filter(|u| {
            let fresh = seen.insert(u.email.clone());
            if !fresh {
                duplicates += 1;
            }
            fresh
        })
        .collect();
    (unique, duplicates)
}

fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str, name: Option<&str>) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            user_metadata: Json(UserMetadata {
                name: name.map(str::to_string),
                ..Default::default()
            }),
            created_at: Utc::now(),
            last_sign_in_at: None,
        }
    }

    #[test]
    fn merge_defaults_flags_when_side_rows_are_missing() {
        let ids = vec![identity("a@x.com", Some("Ana")), identity("b@x.com", None)];
        let profiles = merge_profiles(ids, vec![], vec![]);

        assert_eq!(profiles.len(), 2);
        assert!(profiles.iter().all(|p| !p.is_admin && !p.has_submission));
        assert_eq!(profiles[0].name.as_deref(), Some("Ana"));
    }

    #[test]
    fn merge_matches_by_id_and_keeps_every_identity() {
        let a = identity("a@x.com", None);
        let b = identity("b@x.com", None);
        let c = identity("c@x.com", None);
        let (a_id, b_id) = (a.id, b.id);

        let roles = vec![
            RoleRow { user_id: a_id, role: "admin".to_string() },
            RoleRow { user_id: b_id, role: "user".to_string() },
            RoleRow { user_id: Uuid::new_v4(), role: "admin".to_string() },
        ];
        let submissions = vec![SubmissionOwner { user_id: b_id }];

        let profiles = merge_profiles(vec![a, b, c], roles, submissions);

        assert_eq!(profiles.len(), 3);
        assert!(profiles[0].is_admin && !profiles[0].has_submission);
        assert!(!profiles[1].is_admin && profiles[1].has_submission);
        assert!(!profiles[2].is_admin && !profiles[2].has_submission);
    }

    #[test]
    fn filter_matches_name_or_email_case_insensitively() {
        let profiles = merge_profiles(
            vec![
                identity("maria@x.com", Some("Maria Silva")),
                identity("joao@x.com", Some("João")),
                identity("SILVA.team@x.com", None),
            ],
            vec![],
            vec![],
        );

        let hits = filter_profiles(profiles.clone(), Some("silva"));
        assert_eq!(hits.len(), 2);

        assert_eq!(filter_profiles(profiles.clone(), Some("  ")).len(), 3);
        assert_eq!(filter_profiles(profiles, None).len(), 3);
    }

    #[test]
    fn dedupe_import_keeps_first_occurrence() {
        let row = |email: &str| ImportUser {
            email: email.to_string(),
            name: None,
            phone: None,
            password: None,
            is_admin: false,
        };
        let (unique, dupes) = dedupe_import(vec![row("a@x.com"), row("A@x.com "), row("b@x.com")]);
        assert_eq!(unique.len(), 2);
        assert_eq!(dupes, 1);
    }

    #[test]
    fn padded_import_email_is_normalised_before_validation() {
        let (unique, _) = dedupe_import(vec![ImportUser {
            email: " Pad@X.com ".to_string(),
            name: None,
            phone: None,
            password: None,
            is_admin: false,
        }]);

        assert_eq!(unique[0].email, "pad@x.com");
        assert!(unique[0].validate().is_ok());
    }

    #[test]
    fn import_failures_are_collected_per_row() {
        let mut report = ImportReport::default();
        report.record_failure("a@x.com", "could not be created");
        report.record_failure("b@x.com", "email: invalid");

        assert_eq!(report.created, 0);
        assert_eq!(
            report.errors,
            vec![
                "a@x.com: could not be created".to_string(),
                "b@x.com: email: invalid".to_string()
            ]
        );
    }

    #[test]
    fn avatar_must_be_a_url() {
        let req = UpdateProfileRequest {
            name: None,
            phone: None,
            avatar_url: Some("not a url".to_string()),
        };
        assert!(req.validate().is_err());
    }
}
