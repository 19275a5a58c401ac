//! Model Definitions
//!
//! A model is a named unit of state plus the views derived from it. Views
//! may also read the state of the models listed as dependencies; that list
//! is fixed once the model is defined.
//!
//! ```rust,ignore
//! let cart = ModelDefinition::new("cart", json!({ "items": [] }).into())
//!     .depends_on("prices")
//!     .view("count", |state, _, _, _| Ok(Value::from(state.get("items").len() as i64)));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::access::Traced;
use crate::error::{Result, ViewError};
use crate::state::Value;

use super::SelfViews;

/// A view function.
///
/// Arguments, in order: the model's own state, the state of its dependency
/// models keyed by model name, the model's sibling views, and the extra
/// call argument. View functions must be pure with respect to these inputs.
pub type ViewFn = Arc<
    dyn Fn(&Traced<'_>, &Traced<'_>, &SelfViews<'_>, Option<&Value>) -> Result<Value>
        + Send
        + Sync,
>;

/// A named view owned by one model.
#[derive(Clone)]
pub struct ViewDescriptor {
    name: String,
    compute: ViewFn,
}

impl ViewDescriptor {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Traced<'_>, &Traced<'_>, &SelfViews<'_>, Option<&Value>) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compute(&self) -> &ViewFn {
        &self.compute
    }
}

impl fmt::Debug for ViewDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Everything the store needs to register a model.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    name: String,
    state: Value,
    views: Vec<ViewDescriptor>,
    dependencies: Vec<String>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, state: Value) -> Self {
        Self {
            name: name.into(),
            state,
            views: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Allow this model's views to read another model's state.
    pub fn depends_on(mut self, model: impl Into<String>) -> Self {
        self.dependencies.push(model.into());
        self
    }

    /// Add a view.
    pub fn view<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Traced<'_>, &Traced<'_>, &SelfViews<'_>, Option<&Value>) -> Result<Value>
            + Send
            + Sync
            + 'static,
    {
        self.views.push(ViewDescriptor::new(name, compute));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The initial state.
    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn views(&self) -> &[ViewDescriptor] {
        &self.views
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Check the definition, reporting every violated rule at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("model name must not be empty".to_string());
        }

        let mut seen_views = HashSet::new();
        for view in &self.views {
            if view.name.trim().is_empty() {
                errors.push(format!("model `{}` has a view with an empty name", self.name));
            } else if !seen_views.insert(view.name.as_str()) {
                errors.push(format!("view `{}` is defined more than once", view.name));
            }
        }

        let mut seen_deps = HashSet::new();
        for dep in &self.dependencies {
            if *dep == self.name {
                errors.push(format!("model `{}` cannot depend on itself", self.name));
            } else if !seen_deps.insert(dep.as_str()) {
                errors.push(format!("dependency `{dep}` is listed more than once"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ViewError::InvalidModel(errors.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(_: &Traced<'_>, _: &Traced<'_>, _: &SelfViews<'_>, _: Option<&Value>) -> Result<Value> {
        Ok(Value::Null)
    }

    #[test]
    fn valid_definition_passes() {
        let model = ModelDefinition::new("second", Value::Null)
            .depends_on("first")
            .view("a", constant)
            .view("b", |_, _, _, _| Ok(Value::from(1)));

        assert!(model.validate().is_ok());
        assert_eq!(model.views().len(), 2);
        assert_eq!(model.dependencies(), ["first".to_string()]);
    }

    #[test]
    fn all_violations_are_reported_together() {
        let model = ModelDefinition::new("loop", Value::Null)
            .depends_on("loop")
            .depends_on("other")
            .depends_on("other")
            .view("", constant)
            .view("twice", constant)
            .view("twice", constant);

        let err = model.validate().unwrap_err();
        let ViewError::InvalidModel(message) = err else {
            panic!("expected InvalidModel");
        };
        assert_eq!(
            message,
            "model `loop` has a view with an empty name, \
             view `twice` is defined more than once, \
             model `loop` cannot depend on itself, \
             dependency `other` is listed more than once"
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = ModelDefinition::new(" ", Value::Null).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid model definition: model name must not be empty"
        );
    }
}
