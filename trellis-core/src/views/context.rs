//! Pass Context
//!
//! Tracks which view invocations are currently running on this thread.
//!
//! # Implementation
//!
//! We use a thread-local stack of view keys. Entering a view call pushes its
//! key and the returned guard pops it again, even if the view panics. A view
//! may call sibling views, which push on top of it, so the stack mirrors the
//! chain of nested calls.
//!
//! The stack is what turns self-referencing views into an error: if a key
//! is already on the stack, evaluating it again could never finish.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ViewError};

thread_local! {
    static PASS_STACK: RefCell<Vec<ViewKey>> = const { RefCell::new(Vec::new()) };
}

/// Names one view of one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    model: Arc<str>,
    view: Arc<str>,
}

impl ViewKey {
    pub fn new(model: &str, view: &str) -> Self {
        Self {
            model: model.into(),
            view: view.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn view(&self) -> &str {
        &self.view
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.view)
    }
}

/// Guard for one in-flight view invocation.
///
/// Pops its entry when dropped.
#[derive(Debug)]
pub struct PassContext {
    key: ViewKey,
}

impl PassContext {
    /// Enter a view invocation.
    ///
    /// Fails with `ViewError::Cycle` if the same view is already running on
    /// this thread.
    pub fn enter(key: ViewKey) -> Result<Self> {
        PASS_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack.iter().position(|entry| *entry == key) {
                let mut path: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
                path.push(key.to_string());
                return Err(ViewError::Cycle { path });
            }
            stack.push(key.clone());
            Ok(Self { key })
        })
    }

    /// Check if any view is running on this thread.
    pub fn is_active() -> bool {
        PASS_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost running view, if any.
    pub fn current() -> Option<ViewKey> {
        PASS_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Number of nested view invocations.
    pub fn depth() -> usize {
        PASS_STACK.with(|stack| stack.borrow().len())
    }

    pub fn key(&self) -> &ViewKey {
        &self.key
    }
}

impl Drop for PassContext {
    fn drop(&mut self) {
        PASS_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry, self.key,
                    "PassContext mismatch: expected {}, got {}",
                    self.key, entry
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_current_view() {
        let key = ViewKey::new("first", "first_view");

        assert!(!PassContext::is_active());
        assert!(PassContext::current().is_none());

        {
            let _ctx = PassContext::enter(key.clone()).unwrap();

            assert!(PassContext::is_active());
            assert_eq!(PassContext::current(), Some(key));
        }

        // Context should be cleaned up after drop
        assert!(!PassContext::is_active());
        assert_eq!(PassContext::depth(), 0);
    }

    #[test]
    fn nested_contexts() {
        let outer = ViewKey::new("first", "total");
        let inner = ViewKey::new("first", "subtotal");

        {
            let _outer = PassContext::enter(outer.clone()).unwrap();
            {
                let _inner = PassContext::enter(inner.clone()).unwrap();
                assert_eq!(PassContext::current(), Some(inner));
                assert_eq!(PassContext::depth(), 2);
            }

            // After inner context drops, outer should be current
            assert_eq!(PassContext::current(), Some(outer));
        }

        assert!(PassContext::current().is_none());
    }

    #[test]
    fn reentering_a_running_view_is_a_cycle() {
        let a = ViewKey::new("cart", "a");
        let b = ViewKey::new("cart", "b");

        let _a = PassContext::enter(a.clone()).unwrap();
        let _b = PassContext::enter(b).unwrap();
        let err = PassContext::enter(a).unwrap_err();

        match err {
            ViewError::Cycle { path } => assert_eq!(path, vec!["cart.a", "cart.b", "cart.a"]),
            other => panic!("expected a cycle, got {other:?}"),
        }
        // The failed entry pushed nothing.
        assert_eq!(PassContext::depth(), 2);
    }
}
