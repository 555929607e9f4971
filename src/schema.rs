//! Resource file schema
//!
//! ```toml
//! [source_control.root]
//! organization_id = "ROOT_ORGANIZATION_ID"
//! provider = "github"
//!
//! [application_role_membership.alice_developer]
//! application_id = "app-1"
//! role_id = "role-9"
//! user_name = "alice"
//! ```
//!
//! Top-level tables are resource types, nested tables are named resources.
//! Attribute checking is left to each resource type's reconciler.

use anyhow::{Context, Result};
use declarative::{Address, ResourceConfig};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("`{0}` must be a table of named resources")]
    NotATypeTable(String),

    #[error("`{0}` must be a table of attributes")]
    NotAResourceTable(String),

    #[error("resource name `{0}` must not be empty or contain '.'")]
    InvalidName(String),

    #[error("attributes of `{address}` cannot be represented: {message}")]
    Attributes { address: String, message: String },
}

/// Every resource declared in one file
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResourceFile {
    pub resources: Vec<ResourceConfig>,
}

impl ResourceFile {
    /// Load and parse a resource file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource file: {}", path.display()))?;
        let file = Self::parse(&content)
            .with_context(|| format!("Failed to parse resource file: {}", path.display()))?;
        log::debug!(
            "Loaded {} resources from {}",
            file.resources.len(),
            path.display()
        );
        Ok(file)
    }

    /// Parse resource file content
    pub fn parse(content: &str) -> Result<Self, SchemaError> {
        let root: toml::Table = toml::from_str(content)?;
        let mut resources = Vec::new();

        for (resource_type, entries) in root {
            let toml::Value::Table(entries) = entries else {
                return Err(SchemaError::NotATypeTable(resource_type));
            };

            for (name, attributes) in entries {
                let address = Address::new(&resource_type, &name);
                if name.is_empty() || name.contains('.') {
                    return Err(SchemaError::InvalidName(address.to_string()));
                }
                if !attributes.is_table() {
                    return Err(SchemaError::NotAResourceTable(address.to_string()));
                }

                let attributes =
                    serde_json::to_value(&attributes).map_err(|e| SchemaError::Attributes {
                        address: address.to_string(),
                        message: e.to_string(),
                    })?;
                resources.push(ResourceConfig::new(address, attributes));
            }
        }

        Ok(Self { resources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const EXAMPLE: &str = r#"
[source_control.root]
organization_id = "ROOT_ORGANIZATION_ID"
provider = "github"
remediation_pull_requests_enabled = true

[application_role_membership.alice_developer]
application_id = "app-1"
role_id = "role-9"
user_name = "alice"
"#;

    #[test]
    fn test_parse_example() {
        let file = ResourceFile::parse(EXAMPLE).unwrap();
        assert_eq!(file.resources.len(), 2);

        let source_control = file
            .resources
            .iter()
            .find(|r| r.address == Address::new("source_control", "root"))
            .unwrap();
        assert_eq!(
            source_control.attributes,
            json!({
                "organization_id": "ROOT_ORGANIZATION_ID",
                "provider": "github",
                "remediation_pull_requests_enabled": true,
            })
        );
    }

    #[test]
    fn test_empty_file_has_no_resources() {
        assert!(ResourceFile::parse("").unwrap().resources.is_empty());
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            ResourceFile::parse("source_control = 1"),
            Err(SchemaError::NotATypeTable(_))
        ));
        assert!(matches!(
            ResourceFile::parse("[source_control]\nroot = 1"),
            Err(SchemaError::NotAResourceTable(_))
        ));
        assert!(matches!(
            ResourceFile::parse("[source_control.\"a.b\"]\nprovider = \"github\""),
            Err(SchemaError::InvalidName(_))
        ));
        assert!(matches!(
            ResourceFile::parse("[source_control"),
            Err(SchemaError::Toml(_))
        ));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("iqform.toml");
        fs::write(&path, EXAMPLE).unwrap();
        assert_eq!(ResourceFile::load(&path).unwrap().resources.len(), 2);

        let err = ResourceFile::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
