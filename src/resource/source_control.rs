//! Source control resource - the repository link of an organization or application

use declarative::validate::exactly_one_of;
use declarative::{Diagnostic, ReadOutcome, ReconcileError, Reconciler, ValidationError};
use iqclient::Client;
use serde::{Deserialize, Serialize};

use super::{resolve_owner, unexpected};

/// Desired and recorded state of a source control entry
///
/// Exactly one of `organization_id` and `application_id` is set. Every other
/// field passes through to the server as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceControl {
    /// Identifier issued by the server
    pub id: Option<String>,
    pub organization_id: Option<String>,
    pub application_id: Option<String>,
    pub repository_url: Option<String>,
    /// Access token for the SCM system
    ///
    /// Refresh records whatever the server returns. A server that never
    /// echoes the token leaves it unset in state, so a configured token then
    /// plans a replace on every apply.
    pub token: Option<String>,
    pub provider: Option<String>,
    pub base_branch: Option<String>,
    pub remediation_pull_requests_enabled: Option<bool>,
    pub pull_request_commenting_enabled: Option<bool>,
    pub source_control_evaluations_enabled: Option<bool>,
}

impl SourceControl {
    /// Request body for the create call
    ///
    /// The commenting flag is also sent under its legacy name, which older
    /// servers read instead.
    fn payload(&self) -> iqclient::SourceControl {
        iqclient::SourceControl {
            repository_url: self.repository_url.clone(),
            token: self.token.clone(),
            provider: self.provider.clone(),
            base_branch: self.base_branch.clone(),
            enable_pull_requests: self.pull_request_commenting_enabled,
            remediation_pull_requests_enabled: self.remediation_pull_requests_enabled,
            pull_request_commenting_enabled: self.pull_request_commenting_enabled,
            source_control_evaluations_enabled: self.source_control_evaluations_enabled,
            ..Default::default()
        }
    }

    /// Overwrite every server-owned field from a fetched entry, keeping the
    /// owner scope
    fn refreshed(self, entry: iqclient::SourceControl) -> Self {
        Self {
            id: entry.id,
            organization_id: self.organization_id,
            application_id: self.application_id,
            repository_url: entry.repository_url,
            token: entry.token,
            provider: entry.provider,
            base_branch: entry.base_branch,
            remediation_pull_requests_enabled: entry.remediation_pull_requests_enabled,
            pull_request_commenting_enabled: entry.pull_request_commenting_enabled,
            source_control_evaluations_enabled: entry.source_control_evaluations_enabled,
        }
    }
}

pub struct SourceControlReconciler;

impl Reconciler<Client> for SourceControlReconciler {
    type Model = SourceControl;

    fn type_name(&self) -> &'static str {
        "source_control"
    }

    fn sensitive_attributes(&self) -> &'static [&'static str] {
        &["token"]
    }

    fn validate(&self, model: &SourceControl) -> Result<(), ValidationError> {
        exactly_one_of(&[
            ("organization_id", model.organization_id.as_deref()),
            ("application_id", model.application_id.as_deref()),
        ])
    }

    fn id<'m>(&self, model: &'m SourceControl) -> Option<&'m str> {
        model.id.as_deref()
    }

    fn create(&self, client: &Client, desired: SourceControl) -> Result<SourceControl, ReconcileError> {
        let (owner_type, owner_id) = resolve_owner(
            desired.organization_id.as_deref(),
            desired.application_id.as_deref(),
        );
        log::info!("Creating source control entry for {owner_type} {owner_id}");

        let created = client
            .add_source_control(owner_type, owner_id, &desired.payload())
            .map_err(|e| {
                unexpected(
                    "Error creating source control entry",
                    "create source control entry",
                    &e,
                )
            })?;

        let id = created.id.filter(|id| !id.is_empty()).ok_or_else(|| {
            Diagnostic::new(
                "Error creating source control entry",
                "Could not create source control entry, the response carried no id",
            )
        })?;

        Ok(SourceControl {
            id: Some(id),
            ..desired
        })
    }

    fn read(
        &self,
        client: &Client,
        prior: SourceControl,
    ) -> Result<ReadOutcome<SourceControl>, ReconcileError> {
        let (owner_type, owner_id) = resolve_owner(
            prior.organization_id.as_deref(),
            prior.application_id.as_deref(),
        );

        match client.get_source_control(owner_type, owner_id) {
            Ok(entry) => Ok(ReadOutcome::Found(prior.refreshed(entry))),
            Err(e) if e.is_not_found() => Ok(ReadOutcome::Gone),
            Err(e) => Err(Diagnostic::new(
                "Error reading source control entry",
                format!(
                    "Could not read source control entry with ID {}: {e}",
                    prior.id.as_deref().unwrap_or_default()
                ),
            )
            .into()),
        }
    }

    fn delete(&self, client: &Client, prior: &SourceControl) -> Result<(), ReconcileError> {
        let (owner_type, owner_id) = resolve_owner(
            prior.organization_id.as_deref(),
            prior.application_id.as_deref(),
        );
        log::info!("Deleting source control entry for {owner_type} {owner_id}");

        client
            .delete_source_control(owner_type, owner_id)
            .map_err(|e| {
                unexpected(
                    "Error deleting source control entry",
                    "delete source control entry",
                    &e,
                )
                .into()
            })
    }
}
