//! Application role membership resource - a role granted to a user or group
//! on one application

use declarative::validate::{exactly_one_of, required};
use declarative::{Diagnostic, ReadOutcome, ReconcileError, Reconciler, ValidationError};
use iqclient::{Client, MemberType, OwnerType, RoleMemberships};
use serde::{Deserialize, Serialize};

use super::{resolve_member, unexpected};

/// Desired and recorded state of a role membership
///
/// Exactly one of `user_name` and `group_name` is set. The server issues no
/// identifier for a grant, so `id` is synthesized from the other fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationRoleMembership {
    pub id: Option<String>,
    pub role_id: Option<String>,
    pub application_id: Option<String>,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
}

impl ApplicationRoleMembership {
    fn role_id(&self) -> &str {
        self.role_id.as_deref().unwrap_or_default()
    }

    fn application_id(&self) -> &str {
        self.application_id.as_deref().unwrap_or_default()
    }

    fn member(&self) -> (MemberType, &str) {
        resolve_member(self.user_name.as_deref(), self.group_name.as_deref())
    }

    /// `{application}_{role}_{member type}_{member name}`
    pub fn synthetic_id(&self) -> String {
        let (member_type, member_name) = self.member();
        synthetic_id(self.application_id(), self.role_id(), member_type, member_name)
    }

    /// Whether a membership listing contains this grant
    ///
    /// Scans mappings for the role, then members for one matching kind, name
    /// and application scope. Wire tokens compare case-insensitively.
    fn is_granted_in(&self, listing: &RoleMemberships) -> bool {
        let (member_type, member_name) = self.member();
        let application_id = self.application_id();

        listing
            .member_mappings
            .iter()
            .find(|mapping| mapping.role_id.as_deref() == Some(self.role_id()))
            .is_some_and(|mapping| {
                mapping.members.iter().any(|member| {
                    member
                        .member_type
                        .as_deref()
                        .is_some_and(|t| member_type.matches_wire(t))
                        && member.user_or_group_name.as_deref() == Some(member_name)
                        && member
                            .owner_type
                            .as_deref()
                            .is_some_and(|t| OwnerType::Application.matches_wire(t))
                        && member.owner_id.as_deref() == Some(application_id)
                })
            })
    }
}

/// Deterministic identifier of a membership
pub fn synthetic_id(
    application_id: &str,
    role_id: &str,
    member_type: MemberType,
    member_name: &str,
) -> String {
    format!("{application_id}_{role_id}_{member_type}_{member_name}")
}

pub struct RoleMembershipReconciler;

impl Reconciler<Client> for RoleMembershipReconciler {
    type Model = ApplicationRoleMembership;

    fn type_name(&self) -> &'static str {
        "application_role_membership"
    }

    fn validate(&self, model: &ApplicationRoleMembership) -> Result<(), ValidationError> {
        required("role_id", model.role_id.as_deref())?;
        required("application_id", model.application_id.as_deref())?;
        exactly_one_of(&[
            ("user_name", model.user_name.as_deref()),
            ("group_name", model.group_name.as_deref()),
        ])
    }

    fn id<'m>(&self, model: &'m ApplicationRoleMembership) -> Option<&'m str> {
        model.id.as_deref()
    }

    fn create(
        &self,
        client: &Client,
        desired: ApplicationRoleMembership,
    ) -> Result<ApplicationRoleMembership, ReconcileError> {
        let (member_type, member_name) = desired.member();
        log::info!(
            "Granting role {} on application {} to {member_type} {member_name}",
            desired.role_id(),
            desired.application_id()
        );

        client
            .grant_role_membership(
                OwnerType::Application,
                desired.application_id(),
                desired.role_id(),
                member_type,
                member_name,
            )
            .map_err(|e| {
                unexpected(
                    "Error creating application role membership",
                    "create application role membership",
                    &e,
                )
            })?;

        Ok(ApplicationRoleMembership {
            id: Some(desired.synthetic_id()),
            ..desired
        })
    }

    fn read(
        &self,
        client: &Client,
        prior: ApplicationRoleMembership,
    ) -> Result<ReadOutcome<ApplicationRoleMembership>, ReconcileError> {
        let listing = match client.get_role_memberships(OwnerType::Application, prior.application_id())
        {
            Ok(listing) => listing,
            Err(e) if e.is_not_found() => return Ok(ReadOutcome::Gone),
            Err(e) => {
                return Err(Diagnostic::new(
                    "Error reading application role membership",
                    format!(
                        "Could not read application role membership with ID {}: {e}",
                        prior.id.as_deref().unwrap_or_default()
                    ),
                )
                .into());
            }
        };

        if prior.is_granted_in(&listing) {
            Ok(ReadOutcome::Found(prior))
        } else {
            log::debug!("Role membership {} not found in listing", prior.synthetic_id());
            Ok(ReadOutcome::Gone)
        }
    }

    fn delete(
        &self,
        client: &Client,
        prior: &ApplicationRoleMembership,
    ) -> Result<(), ReconcileError> {
        let (member_type, member_name) = prior.member();
        log::info!(
            "Revoking role {} on application {} from {member_type} {member_name}",
            prior.role_id(),
            prior.application_id()
        );

        client
            .revoke_role_membership(
                OwnerType::Application,
                prior.application_id(),
                prior.role_id(),
                member_type,
                member_name,
            )
            .map_err(|e| {
                unexpected(
                    "Error deleting application role membership",
                    "delete application role membership",
                    &e,
                )
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::mock_client;
    use iqclient::backend::{Call, Failure, Operation};
    use iqclient::{Member, MemberMapping};

    fn alice() -> ApplicationRoleMembership {
        ApplicationRoleMembership {
            role_id: Some("role-9".into()),
            application_id: Some("app-1".into()),
            user_name: Some("alice".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_synthetic_id_is_deterministic() {
        assert_eq!(alice().synthetic_id(), "app-1_role-9_user_alice");
        assert_eq!(alice().synthetic_id(), alice().synthetic_id());

        let devs = ApplicationRoleMembership {
            user_name: None,
            group_name: Some("devs".into()),
            ..alice()
        };
        assert_eq!(devs.synthetic_id(), "app-1_role-9_group_devs");
    }

    #[test]
    fn test_validate() {
        let reconciler = RoleMembershipReconciler;
        assert!(reconciler.validate(&alice()).is_ok());

        let both = ApplicationRoleMembership {
            group_name: Some("devs".into()),
            ..alice()
        };
        assert!(matches!(
            reconciler.validate(&both),
            Err(ValidationError::MultipleSet { .. })
        ));

        let neither = ApplicationRoleMembership {
            user_name: Some(String::new()),
            ..alice()
        };
        assert!(matches!(
            reconciler.validate(&neither),
            Err(ValidationError::NoneSet { .. })
        ));

        let no_role = ApplicationRoleMembership {
            role_id: None,
            ..alice()
        };
        assert_eq!(
            reconciler.validate(&no_role),
            Err(ValidationError::Missing("role_id".into()))
        );
    }

    #[test]
    fn test_create_grants_and_synthesizes_id() {
        let (client, mock) = mock_client();

        let created = RoleMembershipReconciler.create(&client, alice()).unwrap();
        assert_eq!(created.id.as_deref(), Some("app-1_role-9_user_alice"));
        assert_eq!(
            mock.calls(),
            vec![Call::GrantRoleMembership {
                owner_type: OwnerType::Application,
                owner_id: "app-1".into(),
                role_id: "role-9".into(),
                member_type: MemberType::User,
                member_name: "alice".into(),
            }]
        );
    }

    #[test]
    fn test_create_then_read_is_found() {
        let (client, _mock) = mock_client();
        let created = RoleMembershipReconciler.create(&client, alice()).unwrap();
        let read = RoleMembershipReconciler.read(&client, created.clone()).unwrap();
        assert_eq!(read, ReadOutcome::Found(created));
    }

    #[test]
    fn test_read_miss_when_role_holds_other_member() {
        let (client, mock) = mock_client();
        mock.set_role_memberships(
            OwnerType::Application,
            "app-1",
            RoleMemberships {
                member_mappings: vec![MemberMapping {
                    role_id: Some("role-9".into()),
                    members: vec![Member::new(
                        OwnerType::Application,
                        "app-1",
                        MemberType::Group,
                        "devs",
                    )],
                }],
            },
        );

        let prior = ApplicationRoleMembership {
            id: Some("app-1_role-9_user_alice".into()),
            ..alice()
        };
        assert!(RoleMembershipReconciler.read(&client, prior).unwrap().is_gone());
    }

    #[test]
    fn test_read_ignores_inherited_grants() {
        let (client, mock) = mock_client();
        mock.set_role_memberships(
            OwnerType::Application,
            "app-1",
            RoleMemberships {
                member_mappings: vec![MemberMapping {
                    role_id: Some("role-9".into()),
                    members: vec![Member::new(
                        OwnerType::Organization,
                        "org-1",
                        MemberType::User,
                        "alice",
                    )],
                }],
            },
        );

        assert!(RoleMembershipReconciler.read(&client, alice()).unwrap().is_gone());
    }

    #[test]
    fn test_read_matches_wire_tokens_case_insensitively() {
        let (client, mock) = mock_client();
        mock.set_role_memberships(
            OwnerType::Application,
            "app-1",
            RoleMemberships {
                member_mappings: vec![MemberMapping {
                    role_id: Some("role-9".into()),
                    members: vec![Member {
                        owner_id: Some("app-1".into()),
                        owner_type: Some("application".into()),
                        member_type: Some("user".into()),
                        user_or_group_name: Some("alice".into()),
                    }],
                }],
            },
        );

        let read = RoleMembershipReconciler.read(&client, alice()).unwrap();
        assert_eq!(read, ReadOutcome::Found(alice()));
    }

    #[test]
    fn test_read_listing_not_found_is_gone() {
        let (client, mock) = mock_client();
        mock.fail(
            Operation::GetRoleMemberships,
            Failure::Status(404, "Application not found".into()),
        );
        assert!(RoleMembershipReconciler.read(&client, alice()).unwrap().is_gone());
    }

    #[test]
    fn test_delete_then_read_is_gone() {
        let (client, mock) = mock_client();
        let created = RoleMembershipReconciler.create(&client, alice()).unwrap();

        RoleMembershipReconciler.delete(&client, &created).unwrap();
        assert_eq!(mock.grant_count(), 0);
        assert!(RoleMembershipReconciler.read(&client, created).unwrap().is_gone());
    }

    #[test]
    fn test_create_failure_embeds_status_and_body() {
        let (client, mock) = mock_client();
        mock.fail(
            Operation::GrantRoleMembership,
            Failure::Status(404, "Role not found".into()),
        );

        let err = RoleMembershipReconciler.create(&client, alice()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error creating application role membership: Could not create application role membership, unexpected error: 404 Not Found: Role not found"
        );
    }

    #[test]
    fn test_delete_failure_reports_diagnostic() {
        let (client, mock) = mock_client();
        let created = RoleMembershipReconciler.create(&client, alice()).unwrap();
        mock.fail(
            Operation::RevokeRoleMembership,
            Failure::Status(500, "boom".into()),
        );

        let err = RoleMembershipReconciler.delete(&client, &created).unwrap_err();
        assert!(matches!(err, ReconcileError::Diagnostic(ref d)
            if d.summary == "Error deleting application role membership"));
        assert_eq!(mock.grant_count(), 1);
    }
}
