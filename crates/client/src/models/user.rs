//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use gb_green_guide_core::UserId;

/// User identity record as returned by the authentication endpoints.
///
/// The API treats this as an opaque profile. Known fields are surfaced for
/// checkout prefill; everything else is kept in `extra` so it round-trips
/// through the persisted session unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    /// Full name for display and checkout prefill.
    ///
    /// Prefers `full_name`, then `first_name last_name`. Returns `None` when
    /// neither yields a non-blank value.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = non_blank(self.full_name.as_deref()) {
            return Some(full.to_string());
        }

        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .collect::<Vec<_>>()
            .join(" ");

        if joined.is_empty() { None } else { Some(joined) }
    }

    /// Best label for the user: name, then username, then email.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name()
            .or_else(|| non_blank(self.username.as_deref()).map(str::to_string))
            .or_else(|| non_blank(self.email.as_deref()).map(str::to_string))
            .unwrap_or_else(|| "guest".to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_full_name() {
        let user = User {
            full_name: Some("Amina Baig".to_string()),
            first_name: Some("Ignored".to_string()),
            ..User::default()
        };
        assert_eq!(user.display_name().as_deref(), Some("Amina Baig"));
    }

    #[test]
    fn test_display_name_joins_first_and_last() {
        let user = User {
            first_name: Some("Amina".to_string()),
            last_name: Some(" Baig ".to_string()),
            ..User::default()
        };
        assert_eq!(user.display_name().as_deref(), Some("Amina Baig"));

        let nameless = User::default();
        assert_eq!(nameless.display_name(), None);
        assert_eq!(nameless.label(), "guest");
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let json = r#"{"id": 7, "email": "a@b.co", "is_staff": false}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, Some(UserId::new(7)));
        assert_eq!(user.extra.get("is_staff"), Some(&serde_json::Value::Bool(false)));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back["is_staff"], serde_json::Value::Bool(false));
    }
}
