//! Configuration-level preconditions
//!
//! These run before any reconciler logic. An attribute counts as set when it
//! is present and not the empty string.

use crate::error::ValidationError;

/// Whether an optional string attribute counts as set
pub fn is_populated(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Require exactly one of a group of mutually exclusive attributes
///
/// # Example
///
/// ```
/// use declarative::validate::exactly_one_of;
///
/// assert!(exactly_one_of(&[("user_name", Some("alice")), ("group_name", None)]).is_ok());
/// assert!(exactly_one_of(&[("user_name", None), ("group_name", None)]).is_err());
/// ```
pub fn exactly_one_of(fields: &[(&str, Option<&str>)]) -> Result<(), ValidationError> {
    let set: Vec<String> = fields
        .iter()
        .filter(|(_, value)| is_populated(*value))
        .map(|(name, _)| (*name).to_string())
        .collect();

    match set.len() {
        1 => Ok(()),
        0 => Err(ValidationError::NoneSet {
            fields: field_names(fields),
        }),
        _ => Err(ValidationError::MultipleSet {
            fields: field_names(fields),
            set,
        }),
    }
}

/// Require a single attribute to be set, returning its value
pub fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(name.to_string())),
    }
}

fn field_names(fields: &[(&str, Option<&str>)]) -> Vec<String> {
    fields.iter().map(|(name, _)| (*name).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_of_accepts_single() {
        assert!(exactly_one_of(&[("organization_id", Some("org-1")), ("application_id", None)]).is_ok());
        assert!(exactly_one_of(&[("organization_id", None), ("application_id", Some("app-1"))]).is_ok());
    }

    #[test]
    fn test_exactly_one_of_rejects_none() {
        let err = exactly_one_of(&[("user_name", None), ("group_name", None)]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NoneSet {
                fields: vec!["user_name".into(), "group_name".into()]
            }
        );
    }

    #[test]
    fn test_exactly_one_of_rejects_both() {
        let err = exactly_one_of(&[("user_name", Some("alice")), ("group_name", Some("devs"))])
            .unwrap_err();
        assert!(matches!(err, ValidationError::MultipleSet { ref set, .. } if set.len() == 2));
    }

    #[test]
    fn test_empty_string_counts_as_unset() {
        assert!(exactly_one_of(&[("user_name", Some("")), ("group_name", None)]).is_err());
        assert!(exactly_one_of(&[("user_name", Some("")), ("group_name", Some("devs"))]).is_ok());
    }

    #[test]
    fn test_required() {
        assert_eq!(required("role_id", Some("role-9")), Ok("role-9"));
        assert_eq!(
            required("role_id", Some("")),
            Err(ValidationError::Missing("role_id".into()))
        );
        assert!(required("role_id", None).is_err());
    }
}
