use serde::{Deserialize, Serialize};

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Storage name of the user's profile picture, if any.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "profilePic"))]
    pub profile_pic: Option<String>,
}

impl User {
    /// The referenced storage name, ignoring empty values.
    pub fn profile_pic_ref(&self) -> Option<&str> {
        self.profile_pic
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Request body for creating a user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

impl NewUser {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Partial update of a user. Blank or missing fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

impl UserUpdate {
    pub fn profile_pic(storage_name: impl Into<String>) -> Self {
        Self {
            profile_pic: Some(storage_name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(&self.email)
    }

    pub fn profile_pic_value(&self) -> Option<&str> {
        non_blank(&self.profile_pic)
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name().is_none() && self.email().is_none() && self.profile_pic_value().is_none()
    }
}
