mod error;

pub use self::error::{ProviderError, ProviderResult, Resources};
use crate::reconciler::Timeouts;
use crate::wait::StateChange;
use reconcile_model::{Configuration, NaturalKey, RemoteObject, ValidationReport};

/// The write that a [`StateChange`] follows.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Create,
    Update,
}

/// The fields that differ between a Canonical Document and a Desired Document, split by whether
/// the change can be made in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Diff {
    /// Changed fields that can only be changed by deleting and recreating the remote object.
    pub replace: Vec<String>,
    /// Changed fields that an update can change in place.
    pub update: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty() && self.update.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        !self.replace.is_empty()
    }

    /// Record `field` as force-replacement if `current` and `desired` differ.
    pub fn replace_if_changed<F, T>(&mut self, field: F, current: &T, desired: &T)
    where
        F: Into<String>,
        T: PartialEq + ?Sized,
    {
        if current != desired {
            self.replace.push(field.into())
        }
    }

    /// Record `field` as updatable in place if `current` and `desired` differ.
    pub fn update_if_changed<F, T>(&mut self, field: F, current: &T, desired: &T)
    where
        F: Into<String>,
        T: PartialEq + ?Sized,
    {
        if current != desired {
            self.update.push(field.into())
        }
    }

    /// All changed fields, force-replacement fields first.
    pub fn fields(&self) -> Vec<String> {
        self.replace.iter().chain(self.update.iter()).cloned().collect()
    }
}

/// You implement the [`Provider`] trait once per remote object type. It describes how a typed
/// document maps to and from the management API's wire object. The [`Reconciler`] drives the
/// remote calls and the waiting; a `Provider` never talks to the remote API itself.
///
/// ## Custom Types
///
/// - `Config` is the document users write (the Desired Document) and also the shape that a read
///   returns (the Canonical Document). Fields computed by the remote side are optional in it.
///
/// - `Object` is the wire object sent to and received from the management API.
///
/// [`Reconciler`]: crate::Reconciler
pub trait Provider: Send + Sync {
    type Config: Configuration;
    type Object: RemoteObject;

    /// A human readable name for the object type, used in logs and errors.
    fn kind(&self) -> &'static str;

    /// The resource group and name that identify the object described by `config`.
    fn natural_key(&self, config: &Self::Config) -> NaturalKey;

    /// Check `config` without calling the remote API.
    fn validate(&self, config: &Self::Config) -> ValidationReport;

    /// Build the wire object for `config`. Computed and read-only fields are never set.
    fn expand(&self, config: &Self::Config) -> ProviderResult<Self::Object>;

    /// Build the Canonical Document for `object`. Fields that the remote API never returns are
    /// taken from `prior`, the caller's previous document, when an entry with a matching name can
    /// be found there.
    fn flatten(
        &self,
        key: &NaturalKey,
        object: &Self::Object,
        prior: Option<&Self::Config>,
    ) -> ProviderResult<Self::Config>;

    /// Compare `current` with `desired`. Computed fields are ignored, and write-only fields are
    /// only compared when `current` carries them.
    fn diff(&self, current: &Self::Config, desired: &Self::Config) -> Diff;

    /// Whether an existing object can be changed in place.
    fn supports_update(&self) -> bool {
        false
    }

    /// The provisioning states to wait through, and to wait for, after `operation`.
    fn state_change(&self, operation: Operation) -> StateChange;

    /// How long operations on this object type may take.
    fn default_timeouts(&self) -> Timeouts {
        Timeouts::default()
    }
}
