//! Staff users (lead assignees, notification recipients)

use serde::Deserialize;

use super::text::{optional_email, Email, Name, Slug};
use super::{Role, ValidationError};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Validated user insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<NewUser, ValidationError> {
        Ok(NewUser {
            username: Slug::new("username", self.username.trim())?.into_string(),
            full_name: Name::new("full_name", &self.full_name)?.into_string(),
            email: optional_email(self.email.as_deref())?,
            role: match self.role.as_deref() {
                Some(role) => Role::parse(role)?,
                None => Role::Manager,
            },
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// Validated partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<UserPatch, ValidationError> {
        Ok(UserPatch {
            full_name: self
                .full_name
                .as_deref()
                .map(|s| Name::new("full_name", s).map(Name::into_string))
                .transpose()?,
            email: self
                .email
                .as_deref()
                .map(|s| Email::new(s).map(Email::into_string))
                .transpose()?,
            role: self.role.as_deref().map(Role::parse).transpose()?,
            is_active: self.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_manager() {
        let req = CreateUserRequest {
            username: "olga".into(),
            full_name: " Olga Ivanova ".into(),
            email: None,
            role: None,
        };
        let user = req.validate().unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.full_name, "Olga Ivanova");
    }

    #[test]
    fn rejects_bad_username_and_role() {
        let req = CreateUserRequest {
            username: "Olga I".into(),
            full_name: "Olga".into(),
            email: None,
            role: None,
        };
        assert!(req.validate().is_err());

        let req = CreateUserRequest {
            username: "olga".into(),
            full_name: "Olga".into(),
            email: None,
            role: Some("owner".into()),
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidVariant { field: "role", .. })
        ));
    }

    #[test]
    fn patch_validates_present_fields_only() {
        let patch = UpdateUserRequest {
            is_active: Some(false),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert!(patch.full_name.is_none());
        assert_eq!(patch.is_active, Some(false));

        let err = UpdateUserRequest {
            email: Some("broken".into()),
            ..Default::default()
        }
        .validate();
        assert!(err.is_err());
    }
}
