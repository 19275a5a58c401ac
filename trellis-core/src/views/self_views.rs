//! Sibling Views
//!
//! A view can read the current value of any other view of the same model
//! through its `SelfViews` argument. Each read calls the sibling with no
//! extra argument, so the sibling answers from its own cache or recomputes,
//! and the value it returned is noted in the reading pass's self-access set.
//!
//! On the next call the set is replayed: every sibling read last time is
//! asked for its value again, and if any answer is a different reference the
//! reading view has to recompute.

use std::cell::{Cell, RefCell};
use std::fmt;

use indexmap::IndexMap;

use crate::error::Result;
use crate::state::Value;

/// The sibling views of one model, bound to a live state source.
///
/// All views of a model share one implementation of this trait per call.
pub trait SiblingViews {
    /// Name of the model whose views these are.
    fn model_name(&self) -> &str;

    /// Evaluate the sibling view `name` without an extra argument.
    fn call_sibling(&self, name: &str) -> Result<Value>;
}

/// Sibling values observed by one pass, in first-read order.
#[derive(Debug, Clone, Default)]
pub struct SelfAccess {
    observed: IndexMap<String, Value>,
}

impl SelfAccess {
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    /// The value observed for a sibling.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.observed.get(name)
    }

    /// `true` when every sibling read last time still returns the same
    /// reference. Stops at the first sibling that changed.
    pub fn is_still_valid(&self, siblings: &dyn SiblingViews) -> Result<bool> {
        for (name, seen) in &self.observed {
            let current = siblings.call_sibling(name)?;
            if !seen.same(&current) {
                tracing::trace!(
                    model = siblings.model_name(),
                    sibling = name.as_str(),
                    "sibling view changed"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Collects a pass's sibling reads.
#[derive(Debug, Default)]
pub struct SelfAccessRecorder {
    access: RefCell<SelfAccess>,
    enabled: Cell<bool>,
}

impl SelfAccessRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.enabled.set(true);
    }

    pub fn disable(&self) {
        self.enabled.set(false);
    }

    /// Keep the first value seen for each sibling.
    fn observe(&self, name: &str, value: &Value) {
        if !self.enabled.get() {
            return;
        }
        let mut access = self.access.borrow_mut();
        if !access.observed.contains_key(name) {
            access.observed.insert(name.to_owned(), value.clone());
        }
    }

    pub fn into_access(self) -> SelfAccess {
        self.access.into_inner()
    }
}

/// The self-view namespace handed to a view function.
pub struct SelfViews<'p> {
    siblings: &'p dyn SiblingViews,
    recorder: &'p SelfAccessRecorder,
}

impl<'p> SelfViews<'p> {
    pub fn new(siblings: &'p dyn SiblingViews, recorder: &'p SelfAccessRecorder) -> Self {
        Self { siblings, recorder }
    }

    /// Current value of the sibling view `name`.
    pub fn get(&self, name: &str) -> Result<Value> {
        let value = self.siblings.call_sibling(name)?;
        self.recorder.observe(name, &value);
        Ok(value)
    }

    /// Name of the owning model.
    pub fn model_name(&self) -> &str {
        self.siblings.model_name()
    }
}

impl fmt::Debug for SelfViews<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfViews")
            .field("model", &self.siblings.model_name())
            .field("recorder", &self.recorder)
            .finish()
    }
}
