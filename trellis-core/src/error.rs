//! Error types for view registration and evaluation.

use thiserror::Error;

/// Boxed error produced by user view code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Everything that can go wrong while defining models or calling views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No model with this name is registered with the store.
    #[error("unknown model `{0}`")]
    UnknownModel(String),

    /// The model exists but has no view with this name.
    #[error("model `{model}` has no view named `{view}`")]
    UnknownView { model: String, view: String },

    /// A model with this name was already registered.
    #[error("model `{0}` is already registered")]
    DuplicateModel(String),

    /// The model definition failed validation. Holds every violated rule.
    #[error("invalid model definition: {0}")]
    InvalidModel(String),

    /// A declared dependency model has no state in the store.
    #[error("view `{model}.{view}` depends on model `{dependency}`, which is not registered")]
    MissingDependency {
        model: String,
        view: String,
        dependency: String,
    },

    /// A view re-entered itself while it was still being evaluated.
    #[error("cyclic view evaluation: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// The view function itself failed.
    #[error("view computation failed: {0}")]
    Computation(#[source] BoxError),

    /// The store configuration could not be parsed.
    #[error("invalid store configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ViewError {
    /// Wrap an arbitrary error raised inside a view function.
    pub fn computation<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Computation(err.into())
    }

    /// Fail a view computation with a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Computation(message.into().into())
    }
}
