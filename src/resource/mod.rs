//! IQ Server entity types managed by iqform
//!
//! Each entity type is a [`Reconciler`](declarative::Reconciler) over the
//! [`iqclient::Client`]. The helpers here are shared by both of them.

pub mod application_role_membership;
pub mod source_control;

use declarative::validate::is_populated;
use declarative::{Diagnostic, Registry};
use iqclient::{Client, MemberType, OwnerType};

/// Registry of every supported resource type
pub fn registry() -> Registry<Client> {
    Registry::new()
        .with(source_control::SourceControlReconciler)
        .with(application_role_membership::RoleMembershipReconciler)
}

/// Pick the owner scope of a resource
///
/// Validation has already ensured exactly one of the two is set. When the
/// organization is not populated the application wins.
pub fn resolve_owner<'a>(
    organization_id: Option<&'a str>,
    application_id: Option<&'a str>,
) -> (OwnerType, &'a str) {
    if is_populated(organization_id) {
        (OwnerType::Organization, organization_id.unwrap_or_default())
    } else {
        (OwnerType::Application, application_id.unwrap_or_default())
    }
}

/// Pick the member kind of a role membership
///
/// Same precondition as [`resolve_owner`]; when no user is populated the
/// group wins.
pub fn resolve_member<'a>(
    user_name: Option<&'a str>,
    group_name: Option<&'a str>,
) -> (MemberType, &'a str) {
    if is_populated(user_name) {
        (MemberType::User, user_name.unwrap_or_default())
    } else {
        (MemberType::Group, group_name.unwrap_or_default())
    }
}

/// Diagnostic for a failed remote call
///
/// `attempt` reads like "create source control entry". The client error
/// renders as `<status line>: <body>` for API errors and as the transport
/// message otherwise.
pub(crate) fn unexpected(summary: &str, attempt: &str, error: &iqclient::Error) -> Diagnostic {
    Diagnostic::new(
        summary,
        format!("Could not {attempt}, unexpected error: {error}"),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use iqclient::{Client, Credentials, MockBackend};

    /// Client over a fresh mock backend, plus a handle on the mock
    pub fn mock_client() -> (Client, MockBackend) {
        let mock = MockBackend::new();
        let client = Client::with_backend(
            Box::new(mock.clone()),
            Credentials::new("admin", "admin123"),
        );
        (client, mock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_knows_both_types() {
        assert_eq!(
            registry().types(),
            vec!["application_role_membership", "source_control"]
        );
    }

    #[test]
    fn test_resolve_owner() {
        assert_eq!(
            resolve_owner(Some("org-1"), None),
            (OwnerType::Organization, "org-1")
        );
        assert_eq!(
            resolve_owner(None, Some("app-1")),
            (OwnerType::Application, "app-1")
        );
        assert_eq!(
            resolve_owner(Some(""), Some("app-1")),
            (OwnerType::Application, "app-1")
        );
    }

    #[test]
    fn test_resolve_member() {
        assert_eq!(resolve_member(Some("alice"), None), (MemberType::User, "alice"));
        assert_eq!(resolve_member(None, Some("devs")), (MemberType::Group, "devs"));
        assert_eq!(resolve_member(Some(""), Some("devs")), (MemberType::Group, "devs"));
    }

    #[test]
    fn test_unexpected_renders_status_and_body() {
        let error = iqclient::Error::api(400, "bad owner");
        let diag = unexpected(
            "Error creating source control entry",
            "create source control entry",
            &error,
        );
        assert_eq!(
            diag.detail,
            "Could not create source control entry, unexpected error: 400 Bad Request: bad owner"
        );

        let error = iqclient::Error::Transport("connection refused".into());
        let diag = unexpected("Error", "delete application role membership", &error);
        assert!(diag.detail.ends_with("unexpected error: connection refused"));
    }
}
