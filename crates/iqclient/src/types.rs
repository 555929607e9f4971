//! Core types for the IQ Server API.
//!
//! Wire DTOs mirror the server's JSON (camelCase, every field optional).
//! Scope and member kinds are closed enums with two spellings: the lower-case
//! path token used in URLs and the upper-case token the server returns in
//! membership listings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner scope of an entity.
///
/// # Example
///
/// ```
/// use iqclient::OwnerType;
///
/// assert_eq!(OwnerType::Application.as_str(), "application");
/// assert!(OwnerType::Application.matches_wire("APPLICATION"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    /// An organization (including the root organization).
    Organization,
    /// A single application.
    Application,
}

impl OwnerType {
    /// Path token used in request URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Application => "application",
        }
    }

    /// Whether a token returned by the server denotes this owner type.
    #[must_use]
    pub fn matches_wire(&self, token: &str) -> bool {
        token.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a role member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    /// A single user, addressed by user name.
    User,
    /// A group, addressed by group name.
    Group,
}

impl MemberType {
    /// Path token used in request URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }

    /// Whether a token returned by the server denotes this member type.
    #[must_use]
    pub fn matches_wire(&self, token: &str) -> bool {
        token.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source control configuration of an organization or application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceControl {
    /// Server-issued identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Internal id of the owning organization or application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// HTTP(S) or SSH URL of the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    /// Access token for the SCM system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// SCM provider, e.g. `github`, `gitlab`, `azure`, `bitbucket`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Base branch of the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    /// Legacy spelling of `pull_request_commenting_enabled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_pull_requests: Option<bool>,
    /// Automated remediation pull requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_pull_requests_enabled: Option<bool>,
    /// Pull request commenting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_commenting_enabled: Option<bool>,
    /// Server-triggered source control evaluations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_control_evaluations_enabled: Option<bool>,
}

/// All role memberships under one owner scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMemberships {
    /// One entry per role that has at least one member.
    #[serde(default)]
    pub member_mappings: Vec<MemberMapping>,
}

/// Members granted one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMapping {
    /// Role identifier.
    #[serde(default)]
    pub role_id: Option<String>,
    /// Members holding the role, possibly inherited from parent scopes.
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A single membership entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Internal id of the scope the grant was made on.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// `APPLICATION`, `ORGANIZATION` or `GLOBAL`.
    #[serde(default)]
    pub owner_type: Option<String>,
    /// `USER` or `GROUP`.
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
    /// User or group name.
    #[serde(default)]
    pub user_or_group_name: Option<String>,
}

impl Member {
    /// Build a member entry with the server's upper-case wire tokens.
    pub fn new(
        owner_type: OwnerType,
        owner_id: impl Into<String>,
        member_type: MemberType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            owner_type: Some(owner_type.as_str().to_ascii_uppercase()),
            member_type: Some(member_type.as_str().to_ascii_uppercase()),
            user_or_group_name: Some(name.into()),
        }
    }
}

/// Credentials attached to every API call.
///
/// The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Password or user token passcode.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        use base64::Engine;

        let raw = format!("{}:{}", self.username, self.password);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
