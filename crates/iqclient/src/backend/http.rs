//! HTTP backend.
//!
//! Blocking `ureq` agent against the server's `/api/v2` endpoints. Non-2xx
//! responses are read in full so the caller can show the server's own
//! explanation; the agent is configured not to turn statuses into errors.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Credentials, MemberType, OwnerType, RoleMemberships, SourceControl};
use serde::de::DeserializeOwned;
use ureq::http::Response;

const USER_AGENT: &str = concat!("iqclient/", env!("CARGO_PKG_VERSION"));

/// Backend talking to a live IQ Server.
///
/// # Example
///
/// ```no_run
/// use iqclient::backend::Backend;
/// use iqclient::backend::http::HttpBackend;
/// use iqclient::{Credentials, OwnerType};
///
/// let backend = HttpBackend::new("http://localhost:8070").unwrap();
/// let creds = Credentials::new("admin", "admin123");
/// let memberships = backend
///     .get_role_memberships(&creds, OwnerType::Application, "app-1")
///     .unwrap();
/// println!("{} roles", memberships.member_mappings.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Server base URL without trailing slash.
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(USER_AGENT)
            .build()
            .into();
        Ok(Self { agent, base_url })
    }

    /// Get the server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn source_control_url(&self, owner_type: OwnerType, owner_id: &str) -> String {
        format!(
            "{}/api/v2/sourceControl/{}/{}",
            self.base_url,
            owner_type.as_str(),
            urlencoding::encode(owner_id)
        )
    }

    fn role_memberships_url(&self, owner_type: OwnerType, owner_id: &str) -> String {
        format!(
            "{}/api/v2/roleMemberships/{}/{}",
            self.base_url,
            owner_type.as_str(),
            urlencoding::encode(owner_id)
        )
    }

    fn role_membership_url(
        &self,
        owner_type: OwnerType,
        owner_id: &str,
        role_id: &str,
        member_type: MemberType,
        member_name: &str,
    ) -> String {
        format!(
            "{}/role/{}/{}/{}",
            self.role_memberships_url(owner_type, owner_id),
            urlencoding::encode(role_id),
            member_type.as_str(),
            urlencoding::encode(member_name)
        )
    }
}

/// Validate and normalize a server base URL.
fn normalize_base_url(url: String) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl {
            url,
            message: "URL is empty".to_string(),
        });
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::InvalidUrl {
            message: "expected an http:// or https:// URL".to_string(),
            url,
        });
    }
    Ok(trimmed.to_string())
}

/// Turn a non-success response into [`Error::Api`] carrying the full body.
fn check_status(mut response: Response<ureq::Body>) -> Result<Response<ureq::Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    log::debug!("IQ Server answered {status}");
    Err(Error::api(status.as_u16(), body))
}

fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T> {
    let mut response = check_status(response)?;
    let text = response.body_mut().read_to_string()?;
    Ok(serde_json::from_str(&text)?)
}

impl Backend for HttpBackend {
    fn add_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
        payload: &SourceControl,
    ) -> Result<SourceControl> {
        let url = self.source_control_url(owner_type, owner_id);
        log::debug!("POST {url}");

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &credentials.authorization_header())
            .header("Accept", "application/json")
            .send_json(payload)?;

        read_json(response)
    }

    fn get_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<SourceControl> {
        let url = self.source_control_url(owner_type, owner_id);
        log::debug!("GET {url}");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &credentials.authorization_header())
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
    }

    fn delete_source_control(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<()> {
        let url = self.source_control_url(owner_type, owner_id);
        log::debug!("DELETE {url}");

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &credentials.authorization_header())
            .call()?;

        check_status(response).map(|_| ())
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
        let url = self.role_membership_url(owner_type, owner_id, role_id, member_type, member_name);
        log::debug!("PUT {url}");

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &credentials.authorization_header())
            .send_empty()?;

        check_status(response).map(|_| ())
    }

    fn get_role_memberships(
        &self,
        credentials: &Credentials,
        owner_type: OwnerType,
        owner_id: &str,
    ) -> Result<RoleMemberships> {
        let url = self.role_memberships_url(owner_type, owner_id);
        log::debug!("GET {url}");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &credentials.authorization_header())
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
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
        let url = self.role_membership_url(owner_type, owner_id, role_id, member_type, member_name);
        log::debug!("DELETE {url}");

        let response = self
            .agent
            .delete(&url)
            .header("Authorization", &credentials.authorization_header())
            .call()?;

        check_status(response).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer a single request with `status` and `body`, returning the
    /// server URL and a handle yielding the raw request head.
    fn respond_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn creds() -> Credentials {
        Credentials::new("admin", "admin123")
    }

    #[test]
    fn test_not_found_response_maps_to_api_error() {
        let (url, server) = respond_once("404 Not Found", "{\"message\":\"no such owner\"}");
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .get_source_control(&creds(), OwnerType::Organization, "org-1")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(
            &err,
            Error::Api { status: 404, body, .. } if body == "{\"message\":\"no such owner\"}"
        ));

        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /api/v2/sourcecontrol/organization/org-1 "));
        assert!(request.contains("authorization: basic "));
    }

    #[test]
    fn test_rejected_request_keeps_status_line_and_body() {
        let (url, server) = respond_once("422 Unprocessable Entity", "role does not exist");
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .revoke_role_membership(
                &creds(),
                OwnerType::Application,
                "app-1",
                "role-9",
                MemberType::User,
                "alice",
            )
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "422 Unprocessable Entity: role does not exist");

        let request = server.join().unwrap();
        assert!(request.starts_with(
            "DELETE /api/v2/roleMemberships/application/app-1/role/role-9/user/alice "
        ));
    }

    #[test]
    fn test_success_response_is_decoded() {
        let (url, server) = respond_once(
            "200 OK",
            "{\"memberMappings\":[{\"roleId\":\"role-9\",\"members\":[{\"type\":\"GROUP\",\"userOrGroupName\":\"devs\"}]}]}",
        );
        let backend = HttpBackend::new(url).unwrap();

        let listing = backend
            .get_role_memberships(&creds(), OwnerType::Application, "app-1")
            .unwrap();
        server.join().unwrap();

        assert_eq!(listing.member_mappings.len(), 1);
        let mapping = &listing.member_mappings[0];
        assert_eq!(mapping.role_id.as_deref(), Some("role-9"));
        assert_eq!(mapping.members[0].member_type.as_deref(), Some("GROUP"));
        assert_eq!(mapping.members[0].user_or_group_name.as_deref(), Some("devs"));
    }

    #[test]
    fn test_malformed_success_body_is_invalid_response() {
        let (url, server) = respond_once("200 OK", "<html>login</html>");
        let backend = HttpBackend::new(url).unwrap();

        let err = backend
            .get_source_control(&creds(), OwnerType::Application, "app-1")
            .unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_source_control_url() {
        let backend = HttpBackend::new("http://localhost:8070").unwrap();
        assert_eq!(
            backend.source_control_url(OwnerType::Organization, "org-1"),
            "http://localhost:8070/api/v2/sourceControl/organization/org-1"
        );
    }

    #[test]
    fn test_role_memberships_url() {
        let backend = HttpBackend::new("https://iq.example.com/").unwrap();
        assert_eq!(
            backend.role_memberships_url(OwnerType::Application, "app-1"),
            "https://iq.example.com/api/v2/roleMemberships/application/app-1"
        );
    }

    #[test]
    fn test_role_membership_url_encodes_segments() {
        let backend = HttpBackend::new("https://iq.example.com").unwrap();
        let url = backend.role_membership_url(
            OwnerType::Application,
            "app-1",
            "role-9",
            MemberType::Group,
            "dev team/ops",
        );
        assert_eq!(
            url,
            "https://iq.example.com/api/v2/roleMemberships/application/app-1/role/role-9/group/dev%20team%2Fops"
        );
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let backend = HttpBackend::new("  http://localhost:8070///  ").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8070");
    }

    #[test]
    fn test_invalid_base_urls() {
        assert!(matches!(
            HttpBackend::new(""),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpBackend::new("localhost:8070"),
            Err(Error::InvalidUrl { .. })
        ));
    }
}
