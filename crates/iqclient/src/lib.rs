//! # iqclient
//!
//! Blocking client for the parts of the IQ Server REST API that manage
//! source control links and role memberships.
//!
//! ## Example
//!
//! ```no_run
//! use iqclient::{Client, Credentials, OwnerType};
//!
//! let client = Client::connect(
//!     "http://localhost:8070",
//!     Credentials::new("admin", "admin123"),
//! )
//! .expect("invalid server URL");
//!
//! let entry = client
//!     .get_source_control(OwnerType::Organization, "ROOT_ORGANIZATION_ID")
//!     .expect("request failed");
//! println!("provider: {:?}", entry.provider);
//! ```
//!
//! ## Endpoints
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | add / get / delete source control | POST / GET / DELETE | `/api/v2/sourceControl/{ownerType}/{ownerId}` |
//! | list role memberships | GET | `/api/v2/roleMemberships/{ownerType}/{ownerId}` |
//! | grant / revoke role | PUT / DELETE | `/api/v2/roleMemberships/{ownerType}/{ownerId}/role/{roleId}/{memberType}/{memberName}` |

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::{
    Credentials, Member, MemberMapping, MemberType, OwnerType, RoleMemberships, SourceControl,
};

use backend::Backend;
pub use backend::MockBackend;
use backend::http::HttpBackend;

/// High-level client: a backend plus the credentials every call carries.
///
/// The client is read-only once built and can be shared across threads.
pub struct Client {
    backend: Box<dyn Backend>,
    credentials: Credentials,
}

impl Client {
    /// Create a client for a live server.
    pub fn connect(base_url: impl Into<String>, credentials: Credentials) -> Result<Self> {
        Ok(Self {
            backend: Box::new(HttpBackend::new(base_url)?),
            credentials,
        })
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>, credentials: Credentials) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    /// Credentials attached to every call.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // =========================================================================
    // Source Control
    // =========================================================================

    /// Create the source control entry of an owner.
    pub fn add_source_control(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        payload: &SourceControl,
    ) -> Result<SourceControl> {
        self.backend
            .add_source_control(&self.credentials, owner_type, owner_id, payload)
    }

    /// Fetch the source control entry of an owner.
    pub fn get_source_control(&self, owner_type: OwnerType, owner_id: &str) -> Result<SourceControl> {
        self.backend
            .get_source_control(&self.credentials, owner_type, owner_id)
    }

    /// Delete the source control entry of an owner.
    pub fn delete_source_control(&self, owner_type: OwnerType, owner_id: &str) -> Result<()> {
        self.backend
            .delete_source_control(&self.credentials, owner_type, owner_id)
    }

    // =========================================================================
    // Role Memberships
    // =========================================================================

    /// Grant a role to a user or group.
    pub fn grant_role_membership(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> Result<()> {
        self.backend.grant_role_membership(
            &self.credentials,
            owner_type,
            owner_id,
            role_id,
            member_type,
            member_name,
        )
    }

    /// List every role membership visible on an owner.
    pub fn get_role_memberships(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<RoleMemberships> {
        self.backend
            .get_role_memberships(&self.credentials, owner_type, owner_id)
    }

    /// Revoke a role from a user or group.
    pub fn revoke_role_membership(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> Result<()> {
        self.backend.revoke_role_membership(
            &self.credentials,
            owner_type,
            owner_id,
            role_id,
            member_type,
            member_name,
        )
    }
}
