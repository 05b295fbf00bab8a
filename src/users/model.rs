use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Two-level role discriminator. Stored as SMALLINT; no permission matrix
/// hangs off it, it only tags the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum Role {
    Admin = 1,
    Standard = 2,
}

/// User record in the directory.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    pub name: String,
    pub id_number: String,
    pub faculty: String,
    pub major: String,
    pub role: Role,
    pub photo_key: Option<String>, // at most one current object per user
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A book rental. Read-only from the identity core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rental {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub rented_at: OffsetDateTime,
    pub returned_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithRentals {
    #[serde(flatten)]
    pub user: User,
    pub rentals: Vec<Rental>,
}

/// Filter for directory lookups; populated fields are ANDed together.
/// An all-`None` param matches nothing meaningful and is a caller error.
#[derive(Debug, Clone, Default)]
pub struct UserParam {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserParam {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.email.is_none() && self.role.is_none()
    }
}

/// Partial update: only populated fields are written, `None` never
/// overwrites stored data. The photo workflow relies on this to touch
/// nothing but `photo_key`.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub id_number: Option<String>,
    pub faculty: Option<String>,
    pub major: Option<String>,
    pub photo_key: Option<String>,
}

impl UserPatch {
    pub fn photo(key: impl Into<String>) -> Self {
        Self {
            photo_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.id_number.is_none()
            && self.faculty.is_none()
            && self.major.is_none()
            && self.photo_key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_json_never_contains_password_hash() {
        let user = crate::testing::sample_user("a@x.com");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("a@x.com"));
    }

    #[test]
    fn empty_param_and_patch_are_detected() {
        assert!(UserParam::default().is_empty());
        assert!(!UserParam::by_email("a@x.com").is_empty());
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch::photo("users/x.jpg").is_empty());
    }
}
