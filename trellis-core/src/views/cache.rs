//! Memoized View Cache
//!
//! A `MemoizedViewCache` returns the last value of its view until the view's
//! inputs change in a way the view could have noticed.
//!
//! # How a Call Works
//!
//! 1. The cache checks its baseline, the recordings of the last pass,
//!    against the call's inputs in three slots:
//!    - slot 0: the own-state access tree against the model's current state,
//!    - slot 1: the cross-model access tree against the dependency state,
//!    - slot 2: the extra argument by reference, and only if that matches,
//!      the sibling views read last time.
//!
//! 2. If every slot holds, the cached value is returned and nothing else
//!    happens.
//!
//! 3. Otherwise the view runs against traced handles with fresh recorders,
//!    and the result together with the new recordings becomes the baseline.
//!
//! # Failures
//!
//! A failing view function never produces a cached value. What happens to
//! the old one is decided by the store's `FailurePolicy`.
//!
//! # Thread Safety
//!
//! The baseline sits behind a lock that is only held to read or swap an
//! `Arc`. The view function and sibling checks run without it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::{PassContext, ViewKey};
use super::model::ViewFn;
use super::self_views::{SelfAccess, SelfAccessRecorder, SelfViews, SiblingViews};
use crate::access::{is_still_valid, AccessRecorder, AccessScope, AccessTree, Traced};
use crate::config::FailurePolicy;
use crate::error::Result;
use crate::state::Value;

/// Where a cache stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing to compare against. The next call computes.
    Empty,

    /// The cached value came from the recorded pass.
    Fresh,

    /// The recorded pass failed and the cached value is older than it.
    Stale,
}

/// Counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the cache.
    pub hits: u64,
    /// Successful evaluations of the view function.
    pub recomputes: u64,
    /// Evaluations that returned an error.
    pub failures: u64,
}

#[derive(Debug)]
struct Baseline {
    value: Option<Value>,
    own: AccessTree,
    cross: AccessTree,
    siblings: SelfAccess,
    args: Option<Value>,
    failed: bool,
}

/// Cache for a single view of a single model.
pub struct MemoizedViewCache {
    key: ViewKey,
    compute: ViewFn,
    policy: FailurePolicy,
    baseline: RwLock<Option<Arc<Baseline>>>,
    hits: AtomicU64,
    recomputes: AtomicU64,
    failures: AtomicU64,
}

impl MemoizedViewCache {
    pub fn new(key: ViewKey, compute: ViewFn, policy: FailurePolicy) -> Self {
        Self {
            key,
            compute,
            policy,
            baseline: RwLock::new(None),
            hits: AtomicU64::new(0),
            recomputes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> &ViewKey {
        &self.key
    }

    /// Evaluate the view, answering from the cache when its inputs still
    /// match the last pass.
    pub fn call(
        &self,
        own: &Value,
        cross: &Value,
        siblings: &dyn SiblingViews,
        args: Option<&Value>,
    ) -> Result<Value> {
        let _pass = PassContext::enter(self.key.clone())?;
        let baseline = self.baseline.read().clone();

        if let Some(baseline) = &baseline {
            if let Some(value) = &baseline.value {
                if self.is_still_valid(baseline, own, cross, siblings, args)? {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(view = %self.key, "view cache hit");
                    return Ok(value.clone());
                }
            }
        }

        self.recompute(own, cross, siblings, args, baseline)
    }

    fn is_still_valid(
        &self,
        baseline: &Baseline,
        own: &Value,
        cross: &Value,
        siblings: &dyn SiblingViews,
        args: Option<&Value>,
    ) -> Result<bool> {
        if !is_still_valid(&baseline.own, own) {
            tracing::trace!(view = %self.key, slot = 0, "own state changed");
            return Ok(false);
        }
        if !is_still_valid(&baseline.cross, cross) {
            tracing::trace!(view = %self.key, slot = 1, "dependency state changed");
            return Ok(false);
        }
        if !same_args(baseline.args.as_ref(), args) {
            tracing::trace!(view = %self.key, slot = 2, "arguments changed");
            return Ok(false);
        }
        baseline.siblings.is_still_valid(siblings)
    }

    fn recompute(
        &self,
        own: &Value,
        cross: &Value,
        siblings: &dyn SiblingViews,
        args: Option<&Value>,
        previous: Option<Arc<Baseline>>,
    ) -> Result<Value> {
        let own_recorder = AccessRecorder::new(AccessScope::Own, own.clone());
        let cross_recorder = AccessRecorder::new(AccessScope::Cross, cross.clone());
        let self_recorder = SelfAccessRecorder::new();

        let result = {
            let own_state = Traced::root(own.clone(), &own_recorder);
            let cross_state = Traced::root(cross.clone(), &cross_recorder);
            let self_views = SelfViews::new(siblings, &self_recorder);

            own_recorder.enable();
            cross_recorder.enable();
            self_recorder.enable();
            let result = (self.compute)(&own_state, &cross_state, &self_views, args);
            own_recorder.disable();
            cross_recorder.disable();
            self_recorder.disable();
            result
        };

        match result {
            Ok(value) => {
                self.recomputes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(view = %self.key, depth = PassContext::depth(), "view recomputed");
                *self.baseline.write() = Some(Arc::new(Baseline {
                    value: Some(value.clone()),
                    own: own_recorder.into_tree(),
                    cross: cross_recorder.into_tree(),
                    siblings: self_recorder.into_access(),
                    args: args.cloned(),
                    failed: false,
                }));
                Ok(value)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(view = %self.key, error = %err, policy = ?self.policy, "view failed");
                let next = match (self.policy, previous) {
                    (FailurePolicy::KeepStale, Some(previous)) => Some(Arc::new(Baseline {
                        // The stale value stays tied to the arguments it was computed for.
                        value: previous.value.clone(),
                        own: own_recorder.into_tree(),
                        cross: cross_recorder.into_tree(),
                        siblings: self_recorder.into_access(),
                        args: previous.args.clone(),
                        failed: true,
                    })),
                    _ => None,
                };
                *self.baseline.write() = next;
                Err(err)
            }
        }
    }

    /// Drop the cached value. The next call recomputes.
    pub fn invalidate(&self) {
        *self.baseline.write() = None;
    }

    pub fn state(&self) -> CacheState {
        match self.baseline.read().as_deref() {
            Some(Baseline { value: Some(_), failed: false, .. }) => CacheState::Fresh,
            Some(Baseline { value: Some(_), failed: true, .. }) => CacheState::Stale,
            _ => CacheState::Empty,
        }
    }

    /// Check if the cache holds a value.
    pub fn has_value(&self) -> bool {
        self.state() != CacheState::Empty
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            recomputes: self.recomputes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Extra arguments match when both are absent or both are the same value.
fn same_args(prior: Option<&Value>, next: Option<&Value>) -> bool {
    match (prior, next) {
        (None, None) => true,
        (Some(prior), Some(next)) => prior.same(next),
        _ => false,
    }
}

impl fmt::Debug for MemoizedViewCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedViewCache")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewError;
    use crate::views::ViewDescriptor;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct NoSiblings;

    impl SiblingViews for NoSiblings {
        fn model_name(&self) -> &str {
            "test"
        }

        fn call_sibling(&self, name: &str) -> Result<Value> {
            Err(ViewError::UnknownView {
                model: "test".into(),
                view: name.into(),
            })
        }
    }

    fn counted<F>(policy: FailurePolicy, body: F) -> (MemoizedViewCache, Arc<AtomicUsize>)
    where
        F: Fn(&Traced<'_>, Option<&Value>) -> Result<Value> + Send + Sync + 'static,
    {
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        let descriptor = ViewDescriptor::new("view", move |state, _, _, args| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            body(state, args)
        });
        let compute = descriptor.compute().clone();
        (
            MemoizedViewCache::new(ViewKey::new("test", "view"), compute, policy),
            runs,
        )
    }

    fn read_ax(state: &Traced<'_>, args: Option<&Value>) -> Result<Value> {
        let x = state.at(["a", "x"]).as_i64().unwrap_or(0);
        let n = args.and_then(Value::as_i64).unwrap_or(0);
        Ok(Value::from(x + n))
    }

    fn state() -> Value {
        Value::from(json!({ "a": { "x": 1 }, "b": { "y": 1 } }))
    }

    #[test]
    fn computes_on_first_call_and_caches() {
        let (cache, runs) = counted(FailurePolicy::Recompute, read_ax);
        let state = state();
        let cross = Value::Null;

        assert!(!cache.has_value());
        assert_eq!(cache.call(&state, &cross, &NoSiblings, None).unwrap(), Value::Int(1));
        assert_eq!(cache.call(&state, &cross, &NoSiblings, None).unwrap(), Value::Int(1));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.state(), CacheState::Fresh);
        assert_eq!(
            cache.stats(),
            CacheStats { hits: 1, recomputes: 1, failures: 0 }
        );
    }

    #[test]
    fn unread_branch_changes_do_not_recompute() {
        let (cache, runs) = counted(FailurePolicy::Recompute, read_ax);
        let state = state();
        cache.call(&state, &Value::Null, &NoSiblings, None).unwrap();

        let next = state.set_in(&["b".into()], Value::from(json!({ "y": 1 })));
        cache.call(&next, &Value::Null, &NoSiblings, None).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let next = next.set_in(&["a".into()], Value::from(json!({ "x": 1 })));
        cache.call(&next, &Value::Null, &NoSiblings, None).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arguments_compare_by_reference() {
        let (cache, runs) = counted(FailurePolicy::Recompute, read_ax);
        let state = state();
        let five = Value::from(5);

        assert_eq!(cache.call(&state, &Value::Null, &NoSiblings, Some(&five)).unwrap(), Value::Int(6));
        assert_eq!(cache.call(&state, &Value::Null, &NoSiblings, Some(&Value::from(5))).unwrap(), Value::Int(6));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        assert_eq!(cache.call(&state, &Value::Null, &NoSiblings, Some(&Value::from(7))).unwrap(), Value::Int(8));
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        cache.call(&state, &Value::Null, &NoSiblings, None).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        // Equal contents, distinct allocation.
        let list = Value::array([Value::from(1)]);
        cache.call(&state, &Value::Null, &NoSiblings, Some(&list)).unwrap();
        cache.call(&state, &Value::Null, &NoSiblings, Some(&list.clone())).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        cache.call(&state, &Value::Null, &NoSiblings, Some(&Value::array([Value::from(1)]))).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn view_ignoring_state_never_invalidates_on_state() {
        let (cache, runs) = counted(FailurePolicy::Recompute, |_, _| Ok(Value::from("const")));
        cache.call(&state(), &Value::Null, &NoSiblings, None).unwrap();
        cache.call(&Value::from(json!({ "other": true })), &Value::Null, &NoSiblings, None).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_propagated_and_forces_recompute() {
        let (cache, runs) = counted(FailurePolicy::Recompute, |state, _| {
            match state.at(["a", "x"]).as_i64() {
                Some(2) => Err(ViewError::msg("x must not be 2")),
                Some(x) => Ok(Value::from(x)),
                None => Ok(Value::Null),
            }
        });
        let first = state();
        assert_eq!(cache.call(&first, &Value::Null, &NoSiblings, None).unwrap(), Value::Int(1));

        let broken = first.set_in(&["a".into(), "x".into()], 2.into());
        assert!(matches!(
            cache.call(&broken, &Value::Null, &NoSiblings, None),
            Err(ViewError::Computation(_))
        ));
        assert_eq!(cache.state(), CacheState::Empty);

        // Even the first state is recomputed after a failure.
        assert_eq!(cache.call(&first, &Value::Null, &NoSiblings, None).unwrap(), Value::Int(1));
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(
            cache.stats(),
            CacheStats { hits: 0, recomputes: 2, failures: 1 }
        );
    }

    #[test]
    fn keep_stale_returns_pre_failure_value() {
        let (cache, runs) = counted(FailurePolicy::KeepStale, |state, _| {
            match state.at(["a", "x"]).as_i64() {
                Some(2) => Err(ViewError::msg("x must not be 2")),
                Some(x) => Ok(Value::from(x)),
                None => Ok(Value::Null),
            }
        });
        let first = state();
        assert_eq!(cache.call(&first, &Value::Null, &NoSiblings, None).unwrap(), Value::Int(1));

        let broken = first.set_in(&["a".into(), "x".into()], 2.into());
        assert!(cache.call(&broken, &Value::Null, &NoSiblings, None).is_err());
        assert_eq!(cache.state(), CacheState::Stale);

        // The failed pass's reads match, so the old value comes back
        // although x is now 2.
        assert_eq!(cache.call(&broken, &Value::Null, &NoSiblings, None).unwrap(), Value::Int(1));
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // A real change still recomputes.
        let fixed = broken.set_in(&["a".into(), "x".into()], 3.into());
        assert_eq!(cache.call(&fixed, &Value::Null, &NoSiblings, None).unwrap(), Value::Int(3));
        assert_eq!(cache.state(), CacheState::Fresh);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn keep_stale_value_is_not_returned_for_other_arguments() {
        let (cache, runs) = counted(FailurePolicy::KeepStale, |state, args| {
            match args.and_then(Value::as_i64) {
                Some(7) => Err(ViewError::msg("7 is not allowed")),
                _ => read_ax(state, args),
            }
        });
        let state = state();
        let five = Value::from(5);
        let seven = Value::from(7);

        assert_eq!(cache.call(&state, &Value::Null, &NoSiblings, Some(&five)).unwrap(), Value::Int(6));
        assert!(cache.call(&state, &Value::Null, &NoSiblings, Some(&seven)).is_err());
        assert_eq!(cache.state(), CacheState::Stale);

        // Calling with 7 again runs the body instead of answering with f(5).
        assert!(cache.call(&state, &Value::Null, &NoSiblings, Some(&seven)).is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        // The stale value still answers the arguments it came from.
        assert_eq!(cache.call(&state, &Value::Null, &NoSiblings, Some(&five)).unwrap(), Value::Int(6));
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn keep_stale_without_prior_value_recomputes() {
        let (cache, runs) = counted(FailurePolicy::KeepStale, |_, _| Err(ViewError::msg("always")));
        let state = state();
        assert!(cache.call(&state, &Value::Null, &NoSiblings, None).is_err());
        assert!(cache.call(&state, &Value::Null, &NoSiblings, None).is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let (cache, runs) = counted(FailurePolicy::Recompute, read_ax);
        let state = state();
        cache.call(&state, &Value::Null, &NoSiblings, None).unwrap();
        cache.invalidate();
        assert!(!cache.has_value());
        cache.call(&state, &Value::Null, &NoSiblings, None).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
