//! User records returned by the directory.

use chrono::{DateTime, Utc};

use crate::{GraphError, GraphResult};

/// User fields to select from the Graph API.
pub const USER_SELECT_FIELDS: &str = "id,userPrincipalName,mail,displayName,givenName,surname,\
    department,jobTitle,accountEnabled,signInActivity";

/// A user record from the directory, with normalized fields.
///
/// Transient: produced per sync run and reconciled into local storage, never
/// persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryUserRecord {
    /// Entra object ID.
    pub external_id: String,
    /// User principal name (usually email format).
    pub user_principal_name: String,
    /// Display name.
    pub display_name: String,
    /// Primary email address.
    pub email: Option<String>,
    /// Given (first) name.
    pub given_name: Option<String>,
    /// Surname (last name).
    pub surname: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Department.
    pub department: Option<String>,
    /// Whether the account is enabled.
    pub account_enabled: bool,
    /// Last sign-in timestamp.
    pub last_sign_in: Option<DateTime<Utc>>,
}

impl DirectoryUserRecord {
    /// Parses a user from the Graph API JSON response.
    pub fn from_json(value: &serde_json::Value) -> GraphResult<Self> {
        Ok(Self {
            external_id: value
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| GraphError::InvalidRecord("missing user id".into()))?
                .to_string(),
            user_principal_name: value
                .get("userPrincipalName")
                .and_then(|v| v.as_str())
                .ok_or_else(|| GraphError::InvalidRecord("missing userPrincipalName".into()))?
                .to_string(),
            display_name: value
                .get("displayName")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            email: value.get("mail").and_then(|v| v.as_str()).map(String::from),
            given_name: value
                .get("givenName")
                .and_then(|v| v.as_str())
                .map(String::from),
            surname: value
                .get("surname")
                .and_then(|v| v.as_str())
                .map(String::from),
            job_title: value
                .get("jobTitle")
                .and_then(|v| v.as_str())
                .map(String::from),
            department: value
                .get("department")
                .and_then(|v| v.as_str())
                .map(String::from),
            account_enabled: value
                .get("accountEnabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            last_sign_in: value
                .get("signInActivity")
                .and_then(|v| v.get("lastSignInDateTime"))
                .and_then(|v| v.as_str())
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}
