//! State Store
//!
//! The store is the smallest state container the views need: it holds the
//! current state of every registered model, lets callers replace or rewrite
//! a model's state, and evaluates views against whatever state is current
//! at call time.
//!
//! There are no actions, reducers or subscriptions here. Views are pulled:
//! call them again to see new state.
//!
//! # State Updates
//!
//! The root state is an `Arc` that is swapped on every update. Updates build
//! new values with path copying (see `Value::set_in`), so everything outside
//! the changed path keeps its reference and every view that only read from
//! there stays cached.
//!
//! Replacing references without changing content (for example rebuilding
//! the whole state from scratch on every update) works, but defeats the
//! caches: every view that read anything recomputes.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::config::{StoreConfig, ViewsConfig};
use crate::error::{Result, ViewError};
use crate::state::{Key, Map, Value};
use crate::views::{ModelDefinition, ModelViews};

/// Snapshot of all model states, keyed by model name.
pub type RootState = Arc<Map>;

/// Anything that can hand out the current root state.
pub trait StateSource {
    fn get_state(&self) -> RootState;
}

/// A set of models, their state, and their views.
#[derive(Debug)]
pub struct Store {
    name: Option<String>,
    views_config: ViewsConfig,
    state: RwLock<RootState>,
    models: RwLock<IndexMap<String, Arc<ModelViews>>>,
}

impl Store {
    /// An empty store with default settings.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// An empty store seeded with the configured initial state.
    pub fn with_config(config: StoreConfig) -> Self {
        let state: Map = config.state.into_iter().collect();
        Self {
            name: config.name,
            views_config: config.views,
            state: RwLock::new(Arc::new(state)),
            models: RwLock::new(IndexMap::new()),
        }
    }

    /// A store configured from JSON text.
    pub fn from_json_config(text: &str) -> Result<Self> {
        Ok(Self::with_config(StoreConfig::from_json(text)?))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Register a model.
    ///
    /// The model's state is added unless the configuration already seeded
    /// state under its name. Dependencies do not need to be registered yet;
    /// a view whose dependency is still missing when it is called fails.
    pub fn add_model(&self, model: ModelDefinition) -> Result<()> {
        model.validate()?;

        let mut models = self.models.write();
        if models.contains_key(model.name()) {
            return Err(ViewError::DuplicateModel(model.name().to_owned()));
        }

        {
            let mut state = self.state.write();
            if !state.contains_key(model.name()) {
                let mut next = Map::clone(&state);
                next.insert(model.name().to_owned(), model.state().clone());
                *state = Arc::new(next);
            }
        }

        let views = ModelViews::new(&model, &self.views_config);
        tracing::info!(
            store = self.name.as_deref().unwrap_or_default(),
            model = model.name(),
            views = model.views().len(),
            dependencies = ?model.dependencies(),
            "model registered"
        );
        models.insert(model.name().to_owned(), Arc::new(views));
        Ok(())
    }

    /// Names of the registered models, in registration order.
    pub fn model_names(&self) -> Vec<String> {
        self.models.read().keys().cloned().collect()
    }

    /// Current state of one model.
    pub fn state(&self, model: &str) -> Result<Value> {
        self.state
            .read()
            .get(model)
            .cloned()
            .ok_or_else(|| ViewError::UnknownModel(model.to_owned()))
    }

    /// Replace a model's state.
    pub fn set_state(&self, model: &str, value: Value) -> Result<()> {
        self.update(model, |_| value)
    }

    /// Rewrite a model's state from its current value.
    ///
    /// `f` runs without any store lock held, so it may read state or call
    /// views. Two concurrent updates of the same model race: the last one
    /// to finish wins.
    pub fn update<F>(&self, model: &str, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Value,
    {
        if !self.models.read().contains_key(model) {
            return Err(ViewError::UnknownModel(model.to_owned()));
        }
        let current = self.state.read().get(model).cloned().unwrap_or_default();
        let replaced = f(&current);

        let mut state = self.state.write();
        let mut next = Map::clone(&state);
        next.insert(model.to_owned(), replaced);
        *state = Arc::new(next);
        tracing::trace!(model, "state updated");
        Ok(())
    }

    /// Replace the node at `path` inside a model's state.
    pub fn set_in(&self, model: &str, path: &[Key], value: Value) -> Result<()> {
        self.update(model, |current| current.set_in(path, value))
    }

    /// The views of one model.
    pub fn views(&self, model: &str) -> Result<ViewHandle<'_>> {
        let views = self
            .models
            .read()
            .get(model)
            .cloned()
            .ok_or_else(|| ViewError::UnknownModel(model.to_owned()))?;
        Ok(ViewHandle { store: self, views })
    }

    /// Evaluate one view against the current state.
    pub fn view(&self, model: &str, view: &str, args: Option<&Value>) -> Result<Value> {
        self.views(model)?.call(view, args)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSource for Store {
    fn get_state(&self) -> RootState {
        self.state.read().clone()
    }
}

/// Call surface for one model's views.
#[derive(Debug, Clone)]
pub struct ViewHandle<'s> {
    store: &'s Store,
    views: Arc<ModelViews>,
}

impl ViewHandle<'_> {
    /// Evaluate a view with an optional extra argument.
    pub fn call(&self, view: &str, args: Option<&Value>) -> Result<Value> {
        self.views.call(self.store, view, args)
    }

    /// Evaluate a view without an extra argument.
    pub fn get(&self, view: &str) -> Result<Value> {
        self.call(view, None)
    }

    /// The registered views behind this handle.
    pub fn model(&self) -> &ModelViews {
        &self.views
    }
}
