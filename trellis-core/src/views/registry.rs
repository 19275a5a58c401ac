//! View Registry
//!
//! `ModelViews` holds one `MemoizedViewCache` per view of a model. On every
//! call it reads the current state from a `StateSource`, slices out the
//! model's own state, assembles the dependency state from the models the
//! definition named, and hands both to the view's cache.
//!
//! Which models are dependencies never changes after definition. What they
//! contain is read fresh on each call.

use std::sync::Arc;

use indexmap::IndexMap;

use super::cache::MemoizedViewCache;
use super::context::ViewKey;
use super::model::ModelDefinition;
use super::self_views::SiblingViews;
use crate::config::ViewsConfig;
use crate::error::{Result, ViewError};
use crate::state::{Map, Value};
use crate::store::{RootState, StateSource};

/// The views of one model.
#[derive(Debug)]
pub struct ModelViews {
    name: String,
    dependencies: Vec<String>,
    caches: IndexMap<String, MemoizedViewCache>,
}

impl ModelViews {
    /// Build a cache for every view of `model`.
    pub fn new(model: &ModelDefinition, config: &ViewsConfig) -> Self {
        let caches = model
            .views()
            .iter()
            .map(|view| {
                let cache = MemoizedViewCache::new(
                    ViewKey::new(model.name(), view.name()),
                    Arc::clone(view.compute()),
                    config.failure_policy,
                );
                (view.name().to_owned(), cache)
            })
            .collect();

        Self {
            name: model.name().to_owned(),
            dependencies: model.dependencies().to_vec(),
            caches,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    /// The cache behind a view.
    pub fn cache(&self, view: &str) -> Option<&MemoizedViewCache> {
        self.caches.get(view)
    }

    /// Evaluate `view` against the state currently in `source`.
    pub fn call(&self, source: &dyn StateSource, view: &str, args: Option<&Value>) -> Result<Value> {
        let cache = self.caches.get(view).ok_or_else(|| ViewError::UnknownView {
            model: self.name.clone(),
            view: view.to_owned(),
        })?;

        let root = source.get_state();
        let own = root
            .get(&self.name)
            .cloned()
            .ok_or_else(|| ViewError::UnknownModel(self.name.clone()))?;
        let cross = self.dependency_state(&root, view)?;

        let siblings = BoundViews { views: self, source };
        cache.call(&own, &cross, &siblings, args)
    }

    /// A fresh object holding each dependency's current state under its
    /// model name.
    fn dependency_state(&self, root: &RootState, view: &str) -> Result<Value> {
        let mut slice = Map::with_capacity(self.dependencies.len());
        for dependency in &self.dependencies {
            let Some(state) = root.get(dependency) else {
                tracing::warn!(
                    model = self.name.as_str(),
                    view,
                    dependency = dependency.as_str(),
                    "dependency model is not registered"
                );
                return Err(ViewError::MissingDependency {
                    model: self.name.clone(),
                    view: view.to_owned(),
                    dependency: dependency.clone(),
                });
            };
            slice.insert(dependency.clone(), state.clone());
        }
        Ok(Value::Object(Arc::new(slice)))
    }

    /// Drop every cached value of this model.
    pub fn invalidate_all(&self) {
        self.caches.values().for_each(MemoizedViewCache::invalidate);
    }
}

/// A model's views bound to the state source of the current call.
struct BoundViews<'s> {
    views: &'s ModelViews,
    source: &'s dyn StateSource,
}

impl SiblingViews for BoundViews<'_> {
    fn model_name(&self) -> &str {
        &self.views.name
    }

    fn call_sibling(&self, name: &str) -> Result<Value> {
        self.views.call(self.source, name, None)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
