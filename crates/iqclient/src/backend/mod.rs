//! Backend trait and implementations for the IQ Server REST API.
//!
//! [`Backend`] is the narrow contract the reconcilers consume: one method per
//! remote operation, each taking the caller's [`Credentials`] explicitly.
//! [`http::HttpBackend`] talks to a real server; [`MockBackend`] keeps
//! entities in memory for tests.
//!
//! # Testing
//!
//! ```
//! use iqclient::backend::{Backend, MockBackend};
//! use iqclient::{Credentials, OwnerType, SourceControl};
//!
//! let mock = MockBackend::new();
//! let creds = Credentials::new("admin", "admin123");
//!
//! let created = mock
//!     .add_source_control(&creds, OwnerType::Organization, "org-1", &SourceControl::default())
//!     .unwrap();
//! let fetched = mock
//!     .get_source_control(&creds, OwnerType::Organization, "org-1")
//!     .unwrap();
//! assert_eq!(created.id, fetched.id);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    Credentials, Member, MemberMapping, MemberType, OwnerType, RoleMemberships, SourceControl,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Remote entity service.
///
/// Every call is blocking and completes with either the decoded response or
/// an [`Error`]. A 404 surfaces as [`Error::Api`] with status 404; callers
/// decide whether that means "absent" or "failed".
pub trait Backend: Send + Sync {
    /// Create the source control entry of an owner.
    fn add_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        payload: &SourceControl,
    ) -> Result<SourceControl>;

    /// Fetch the source control entry of an owner.
    fn get_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<SourceControl>;

    /// Delete the source control entry of an owner.
    fn delete_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<()>;

    /// Grant a role to a user or group on an owner.
    fn grant_role_membership(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> Result<()>;

    /// List every role membership visible on an owner.
    fn get_role_memberships(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<RoleMemberships>;

    /// Revoke a role from a user or group on an owner.
    fn revoke_role_membership(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> Result<()>;
}

/// Remote operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddSourceControl,
    GetSourceControl,
    DeleteSourceControl,
    GrantRoleMembership,
    GetRoleMemberships,
    RevokeRoleMembership,
}

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddSourceControl {
        owner_type: OwnerType,
        owner_id: String,
        payload: SourceControl,
    },
    GetSourceControl {
        owner_type: OwnerType,
        owner_id: String,
    },
    DeleteSourceControl {
        owner_type: OwnerType,
        owner_id: String,
    },
    GrantRoleMembership {
        owner_type: OwnerType,
        owner_id: String,
        role_id: String,
        member_type: MemberType,
        member_name: String,
    },
    GetRoleMemberships {
        owner_type: OwnerType,
        owner_id: String,
    },
    RevokeRoleMembership {
        owner_type: OwnerType,
        owner_id: String,
        role_id: String,
        member_type: MemberType,
        member_name: String,
    },
}

impl Call {
    /// The operation this call invoked.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::AddSourceControl { .. } => Operation::AddSourceControl,
            Self::GetSourceControl { .. } => Operation::GetSourceControl,
            Self::DeleteSourceControl { .. } => Operation::DeleteSourceControl,
            Self::GrantRoleMembership { .. } => Operation::GrantRoleMembership,
            Self::GetRoleMemberships { .. } => Operation::GetRoleMemberships,
            Self::RevokeRoleMembership { .. } => Operation::RevokeRoleMembership,
        }
    }
}

/// Failure injected into [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Answer with this status and body.
    Status(u16, String),
    /// Fail before any response, as an unreachable server would.
    Transport(String),
}

impl Failure {
    fn to_error(&self) -> Error {
        match self {
            Self::Status(status, body) => Error::api(*status, body.clone()),
            Self::Transport(message) => Error::Transport(message.clone()),
        }
    }
}

type Grant = (OwnerType, String, String, MemberType, String);

#[derive(Debug, Default)]
struct MockState {
    source_controls: HashMap<(OwnerType, String), SourceControl>,
    grants: Vec<Grant>,
    listings: HashMap<(OwnerType, String), RoleMemberships>,
    failures: HashMap<Operation, Failure>,
    calls: Vec<Call>,
    usernames: Vec<String>,
    next_id: u64,
}

/// In-memory backend for testing without network access.
///
/// Source control entries and grants live in memory. Membership listings are
/// derived from the grants unless a listing was set explicitly with
/// [`MockBackend::set_role_memberships`]. Every call is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent call of `operation` fail.
    pub fn fail(&self, operation: Operation, failure: Failure) {
        self.state().failures.insert(operation, failure);
    }

    /// Remove an injected failure.
    pub fn clear_failure(&self, operation: Operation) {
        self.state().failures.remove(&operation);
    }

    /// Replace the membership listing returned for an owner.
    pub fn set_role_memberships(
        &self,
        owner_type: OwnerType,
        owner_id: impl Into<String>,
        memberships: RoleMemberships,
    ) {
        self.state()
            .listings
            .insert((owner_type, owner_id.into()), memberships);
    }

    /// Store a source control entry as if it had been created remotely.
    pub fn insert_source_control(
        &self,
        owner_type: OwnerType,
        owner_id: impl Into<String>,
        entry: SourceControl,
    ) {
        self.state()
            .source_controls
            .insert((owner_type, owner_id.into()), entry);
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// User names the calls were authenticated as, in call order.
    #[must_use]
    pub fn usernames(&self) -> Vec<String> {
        self.state().usernames.clone()
    }

    /// Number of source control entries currently stored.
    #[must_use]
    pub fn source_control_count(&self) -> usize {
        self.state().source_controls.len()
    }

    /// Number of grants currently stored.
    #[must_use]
    pub fn grant_count(&self) -> usize {
        self.state().grants.len()
    }

    fn record(&self, credentials: &Credentials, call: Call) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        let operation = call.operation();
        state.calls.push(call);
        state.usernames.push(credentials.username.clone());
        if let Some(failure) = state.failures.get(&operation) {
            return Err(failure.to_error());
        }
        Ok(state)
    }
}

fn listing_from_grants(grants: &[Grant], owner_type: OwnerType, owner_id: &str) -> RoleMemberships {
    let mut mappings: Vec<MemberMapping> = Vec::new();
    for (grant_owner, grant_owner_id, role_id, member_type, name) in grants {
        if *grant_owner != owner_type || grant_owner_id != owner_id {
            continue;
        }
        let member = Member::new(*grant_owner, grant_owner_id.clone(), *member_type, name.clone());
        match mappings
            .iter_mut()
            .find(|m| m.role_id.as_deref() == Some(role_id.as_str()))
        {
            Some(mapping) => mapping.members.push(member),
            None => mappings.push(MemberMapping {
                role_id: Some(role_id.clone()),
                members: vec![member],
            }),
        }
    }
    RoleMemberships {
        member_mappings: mappings,
    }
}

impl Backend for MockBackend {
    fn add_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        payload: &SourceControl,
    ) -> Result<SourceControl> {
        let mut state = self.record(
            credentials,
            Call::AddSourceControl {
                owner_type,
                owner_id: owner_id.to_string(),
                payload: payload.clone(),
            },
        )?;

        let key = (owner_type, owner_id.to_string());
        if state.source_controls.contains_key(&key) {
            return Err(Error::api(
                409,
                format!("source control already exists for {owner_type} {owner_id}"),
            ));
        }

        state.next_id += 1;
        let mut entry = payload.clone();
        entry.id = Some(format!("sc-{}", state.next_id));
        entry.owner_id = Some(owner_id.to_string());
        state.source_controls.insert(key, entry.clone());
        Ok(entry)
    }

    fn get_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<SourceControl> {
        let state = self.record(
            credentials,
            Call::GetSourceControl {
                owner_type,
                owner_id: owner_id.to_string(),
            },
        )?;

        state
            .source_controls
            .get(&(owner_type, owner_id.to_string()))
            .cloned()
            .ok_or_else(|| Error::api(404, ""))
    }

    fn delete_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<()> {
        let mut state = self.record(
            credentials,
            Call::DeleteSourceControl {
                owner_type,
                owner_id: owner_id.to_string(),
            },
        )?;

        state
            .source_controls
            .remove(&(owner_type, owner_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::api(404, ""))
    }

    fn grant_role_membership(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> Result<()> {
        let mut state = self.record(
            credentials,
            Call::GrantRoleMembership {
                owner_type,
                owner_id: owner_id.to_string(),
                role_id: role_id.to_string(),
                member_type,
                member_name: member_name.to_string(),
            },
        )?;

        let grant = (
            owner_type,
            owner_id.to_string(),
            role_id.to_string(),
            member_type,
            member_name.to_string(),
        );
        if !state.grants.contains(&grant) {
            state.grants.push(grant);
        }
        Ok(())
    }

    fn get_role_memberships(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<RoleMemberships> {
        let state = self.record(
            credentials,
            Call::GetRoleMemberships {
                owner_type,
                owner_id: owner_id.to_string(),
            },
        )?;

        if let Some(listing) = state.listings.get(&(owner_type, owner_id.to_string())) {
            return Ok(listing.clone());
        }
        Ok(listing_from_grants(&state.grants, owner_type, owner_id))
    }

    fn revoke_role_membership(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> Result<()> {
        let mut state = self.record(
            credentials,
            Call::RevokeRoleMembership {
                owner_type,
                owner_id: owner_id.to_string(),
                role_id: role_id.to_string(),
                member_type,
                member_name: member_name.to_string(),
            },
        )?;

        let before = state.grants.len();
        state.grants.retain(|(o, oid, r, t, n)| {
            !(*o == owner_type
                && oid == owner_id
                && r == role_id
                && *t == member_type
                && n == member_name)
        });
        if state.grants.len() == before {
            return Err(Error::api(404, ""));
        }
        Ok(())
    }
}
