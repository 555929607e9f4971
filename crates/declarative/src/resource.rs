//! Reconciler trait for declarative state management
//!
//! A reconciler translates between one entity type's desired state and the
//! remote system that owns it. It is stateless: everything it needs arrives
//! as arguments, including the client `C` that carries credentials.

use crate::error::{Diagnostic, ReconcileError, ValidationError};
use crate::state::StateRecord;
use crate::types::Address;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of reading a resource back from the remote system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    /// The entity exists; here is its current state
    Found(T),
    /// The entity no longer exists and should be dropped from state
    Gone,
}

impl<T> ReadOutcome<T> {
    /// Map the found value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOutcome<U> {
        match self {
            Self::Found(value) => ReadOutcome::Found(f(value)),
            Self::Gone => ReadOutcome::Gone,
        }
    }

    /// Check if the entity is gone
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

/// Core trait for declarative resources
///
/// Every entity type implements this trait with its own `Model`, which is
/// both the desired-state record and the state record.
///
/// # Contract
///
/// - `validate` is called before any remote call; `create` may assume it passed
/// - `create` either returns the full model with its identifier set or fails
///   without side effects on state
/// - `read` returns [`ReadOutcome::Gone`] instead of an error when the remote
///   system reports the entity as absent
/// - `delete` failures leave the record in state so the delete can be retried
///
/// # Example
///
/// ```ignore
/// impl Reconciler<Client> for WidgetReconciler {
///     type Model = Widget;
///
///     fn type_name(&self) -> &'static str { "widget" }
///
///     fn validate(&self, model: &Widget) -> Result<(), ValidationError> {
///         validate::exactly_one_of(&[("a", model.a.as_deref()), ("b", model.b.as_deref())])
///     }
///
///     fn id<'m>(&self, model: &'m Widget) -> Option<&'m str> { model.id.as_deref() }
///
///     fn create(&self, client: &Client, desired: Widget) -> Result<Widget, ReconcileError> { .. }
///     fn read(&self, client: &Client, prior: Widget) -> Result<ReadOutcome<Widget>, ReconcileError> { .. }
///     fn delete(&self, client: &Client, prior: &Widget) -> Result<(), ReconcileError> { .. }
/// }
/// ```
pub trait Reconciler<C: ?Sized>: Send + Sync {
    /// Desired-state and state record of this entity type
    type Model: Serialize + DeserializeOwned + Clone + fmt::Debug;

    /// Resource type name used in configuration and state, e.g. "source_control"
    fn type_name(&self) -> &'static str;

    /// Attributes whose values must not be displayed
    fn sensitive_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check configuration-level constraints
    fn validate(&self, model: &Self::Model) -> Result<(), ValidationError>;

    /// Computed identifier of a model, if it has one yet
    fn id<'m>(&self, model: &'m Self::Model) -> Option<&'m str>;

    /// Create the remote entity
    fn create(&self, client: &C, desired: Self::Model) -> Result<Self::Model, ReconcileError>;

    /// Read the remote entity back
    fn read(&self, client: &C, prior: Self::Model)
    -> Result<ReadOutcome<Self::Model>, ReconcileError>;

    /// Delete the remote entity
    fn delete(&self, client: &C, prior: &Self::Model) -> Result<(), ReconcileError>;
}

/// Type-erased view of a [`Reconciler`] operating on JSON attribute documents
///
/// Implemented for every `Reconciler`; the registry stores these so
/// heterogeneous resource types can share one plan.
pub trait ErasedReconciler<C: ?Sized>: Send + Sync {
    /// Resource type name
    fn type_name(&self) -> &'static str;

    /// Attributes whose values must not be displayed
    fn sensitive_attributes(&self) -> &'static [&'static str];

    /// Decode and validate a desired attribute document
    fn validate(&self, attributes: &serde_json::Value) -> Result<(), ReconcileError>;

    /// Validate, then create the remote entity and build its state record
    fn create(
        &self,
        client: &C,
        address: &Address,
        attributes: &serde_json::Value,
    ) -> Result<StateRecord, ReconcileError>;

    /// Read a recorded entity back
    fn read(&self, client: &C, prior: &StateRecord)
    -> Result<ReadOutcome<StateRecord>, ReconcileError>;

    /// Delete a recorded entity
    fn delete(&self, client: &C, prior: &StateRecord) -> Result<(), ReconcileError>;
}

impl<C: ?Sized, R: Reconciler<C>> ErasedReconciler<C> for R {
    fn type_name(&self) -> &'static str {
        Reconciler::type_name(self)
    }

    fn sensitive_attributes(&self) -> &'static [&'static str] {
        Reconciler::sensitive_attributes(self)
    }

    fn validate(&self, attributes: &serde_json::Value) -> Result<(), ReconcileError> {
        let model = decode::<C, R>(self, attributes)?;
        Reconciler::validate(self, &model)?;
        Ok(())
    }

    fn create(
        &self,
        client: &C,
        address: &Address,
        attributes: &serde_json::Value,
    ) -> Result<StateRecord, ReconcileError> {
        let desired = decode::<C, R>(self, attributes)?;
        Reconciler::validate(self, &desired)?;

        let created = Reconciler::create(self, client, desired)?;
        log::debug!("Created {address}");
        encode::<C, R>(self, address, &created)
    }

    fn read(
        &self,
        client: &C,
        prior: &StateRecord,
    ) -> Result<ReadOutcome<StateRecord>, ReconcileError> {
        let address = prior.address();
        let model = decode::<C, R>(self, &prior.attributes)?;

        match Reconciler::read(self, client, model)? {
            ReadOutcome::Found(current) => {
                encode::<C, R>(self, &address, &current).map(ReadOutcome::Found)
            }
            ReadOutcome::Gone => {
                log::info!("{address} no longer exists remotely");
                Ok(ReadOutcome::Gone)
            }
        }
    }

    fn delete(&self, client: &C, prior: &StateRecord) -> Result<(), ReconcileError> {
        let model = decode::<C, R>(self, &prior.attributes)?;
        Reconciler::delete(self, client, &model)?;
        log::debug!("Deleted {}", prior.address());
        Ok(())
    }
}

fn decode<C: ?Sized, R: Reconciler<C>>(
    reconciler: &R,
    attributes: &serde_json::Value,
) -> Result<R::Model, ReconcileError> {
    serde_json::from_value(attributes.clone()).map_err(|e| ReconcileError::InvalidAttributes {
        resource_type: Reconciler::type_name(reconciler).to_string(),
        message: e.to_string(),
    })
}

fn encode<C: ?Sized, R: Reconciler<C>>(
    reconciler: &R,
    address: &Address,
    model: &R::Model,
) -> Result<StateRecord, ReconcileError> {
    let id = reconciler.id(model).filter(|id| !id.is_empty()).ok_or_else(|| {
        ReconcileError::Diagnostic(Diagnostic::new(
            format!("Missing identifier for {address}"),
            "The remote system did not return an identifier for this resource",
        ))
    })?;
    let attributes =
        serde_json::to_value(model).map_err(|e| ReconcileError::InvalidAttributes {
            resource_type: Reconciler::type_name(reconciler).to_string(),
            message: e.to_string(),
        })?;

    Ok(StateRecord {
        resource_type: address.resource_type.clone(),
        name: address.name.clone(),
        id: id.to_string(),
        attributes,
    })
}

/// Reconcilers keyed by resource type name
pub struct Registry<C: ?Sized> {
    reconcilers: BTreeMap<&'static str, Box<dyn ErasedReconciler<C>>>,
}

impl<C: ?Sized> Registry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            reconcilers: BTreeMap::new(),
        }
    }

    /// Register a reconciler under its type name
    pub fn register<R>(&mut self, reconciler: R)
    where
        R: Reconciler<C> + 'static,
    {
        let name = Reconciler::type_name(&reconciler);
        self.reconcilers.insert(name, Box::new(reconciler));
    }

    /// Builder-style [`Registry::register`]
    pub fn with<R>(mut self, reconciler: R) -> Self
    where
        R: Reconciler<C> + 'static,
    {
        self.register(reconciler);
        self
    }

    /// Look up the reconciler for a resource type
    pub fn get(&self, resource_type: &str) -> Result<&dyn ErasedReconciler<C>, ReconcileError> {
        self.reconcilers
            .get(resource_type)
            .map(|boxed| &**boxed)
            .ok_or_else(|| ReconcileError::UnknownResourceType(resource_type.to_string()))
    }

    /// Registered type names, sorted
    pub fn types(&self) -> Vec<&'static str> {
        self.reconcilers.keys().copied().collect()
    }
}

impl<C: ?Sized> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_lookup() {
        let registry = registry();
        assert_eq!(registry.types(), vec!["widget"]);
        assert!(registry.get("widget").is_ok());
        assert_eq!(
            registry.get("gadget").err(),
            Some(ReconcileError::UnknownResourceType("gadget".into()))
        );
    }

    #[test]
    fn test_erased_validate() {
        let registry = registry();
        let widget = registry.get("widget").unwrap();

        assert!(widget.validate(&json!({ "left": "x" })).is_ok());
        assert!(matches!(
            widget.validate(&json!({ "left": "x", "right": "y" })),
            Err(ReconcileError::Validation(_))
        ));
        assert!(matches!(
            widget.validate(&json!({ "left": 42 })),
            Err(ReconcileError::InvalidAttributes { .. })
        ));
    }

    #[test]
    fn test_erased_create_validates_before_remote_call() {
        let remote = Remote::default();
        let registry = registry();
        let widget = registry.get("widget").unwrap();
        let address = Address::new("widget", "a");

        let result = widget.create(&remote, &address, &json!({}));
        assert!(matches!(result, Err(ReconcileError::Validation(_))));
        assert_eq!(remote.count(), 0);
    }

    #[test]
    fn test_erased_create_read_delete() {
        let remote = Remote::default();
        let registry = registry();
        let widget = registry.get("widget").unwrap();
        let address = Address::new("widget", "a");

        let record = widget
            .create(&remote, &address, &json!({ "left": "x", "color": "red" }))
            .unwrap();
        assert_eq!(record.id, "w-1");
        assert_eq!(record.address(), address);
        assert_eq!(record.attributes["left"], "x");

        let read = widget.read(&remote, &record).unwrap();
        assert_eq!(read, ReadOutcome::Found(record.clone()));

        widget.delete(&remote, &record).unwrap();
        assert!(widget.read(&remote, &record).unwrap().is_gone());
    }

    #[test]
    fn test_read_outcome_map() {
        assert_eq!(ReadOutcome::Found(2).map(|v| v * 2), ReadOutcome::Found(4));
        assert!(ReadOutcome::<i32>::Gone.map(|v| v * 2).is_gone());
    }
}
