//! Resource ceilings enforced during evaluation: a cap on the number of
//! primitive nodes evaluated, and a cap on nested function-application depth.
//!
//! Both counters run unconditionally (cheap atomic increments); only the
//! ceiling check is skipped when a [`crate::config::RunConfig`] leaves a limit
//! as `None`, which is how the CLI's default, unrestricted run behaves.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::RunConfig;

/// A failure reported when a configured ceiling is exceeded mid-evaluation.
#[derive(Debug, Clone, Copy)]
pub enum ResourceError {
    /// More primitive nodes were evaluated than the configured ceiling.
    NodeCount { limit: usize, count: usize },
    /// Nested function application exceeded the configured recursion ceiling.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeCount { limit, count } => write!(f, "node evaluation limit exceeded: {count} > {limit}"),
            Self::Recursion { limit, depth } => write!(f, "recursion depth limit exceeded: {depth} > {limit}"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Tracks node-evaluation count and call-stack depth against the ceilings
/// carried by a [`RunConfig`]. Shared across worker threads via `&self` —
/// every counter is an atomic, so no lock is needed around either check.
#[derive(Debug)]
pub struct ResourceTracker {
    max_nodes: Option<usize>,
    max_recursion_depth: Option<usize>,
    nodes_evaluated: AtomicUsize,
    call_depth: AtomicUsize,
}

impl ResourceTracker {
    #[must_use]
    pub fn new(config: &RunConfig) -> Self {
        Self {
            max_nodes: config.max_nodes,
            max_recursion_depth: config.max_recursion_depth,
            nodes_evaluated: AtomicUsize::new(0),
            call_depth: AtomicUsize::new(0),
        }
    }

    /// Records one more node evaluation, failing once the configured ceiling
    /// has been passed.
    pub fn record_node(&self) -> Result<(), ResourceError> {
        let count = self.nodes_evaluated.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(limit) = self.max_nodes
            && count > limit
        {
            return Err(ResourceError::NodeCount { limit, count });
        }
        Ok(())
    }

    /// Enters one function application, failing if doing so would exceed the
    /// configured recursion ceiling. The returned guard releases the depth
    /// budget on drop, so an early `?` return from the call still unwinds it.
    pub fn enter_call(&self) -> Result<CallGuard<'_>, ResourceError> {
        let depth = self.call_depth.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(limit) = self.max_recursion_depth
            && depth > limit
        {
            self.call_depth.fetch_sub(1, Ordering::Relaxed);
            return Err(ResourceError::Recursion { limit, depth });
        }
        Ok(CallGuard { tracker: self })
    }

    #[must_use]
    pub fn nodes_evaluated(&self) -> usize {
        self.nodes_evaluated.load(Ordering::Relaxed)
    }
}

/// Releases one unit of call-stack depth when a function application
/// returns, including via an early error, so a failed call never leaks
/// recursion budget.
pub struct CallGuard<'t> {
    tracker: &'t ResourceTracker,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.tracker.call_depth.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_count_limit_is_enforced() {
        let config = RunConfig::default().with_max_nodes(Some(2));
        let tracker = ResourceTracker::new(&config);
        tracker.record_node().unwrap();
        tracker.record_node().unwrap();
        assert!(tracker.record_node().is_err());
    }

    #[test]
    fn recursion_guard_releases_depth_on_drop() {
        let config = RunConfig::default().with_max_recursion_depth(Some(1));
        let tracker = ResourceTracker::new(&config);
        {
            let _guard = tracker.enter_call().unwrap();
            assert!(tracker.enter_call().is_err());
        }
        assert!(tracker.enter_call().is_ok());
    }

    #[test]
    fn no_limit_never_rejects() {
        let tracker = ResourceTracker::new(&RunConfig::default());
        for _ in 0..1000 {
            tracker.record_node().unwrap();
        }
        assert_eq!(tracker.nodes_evaluated(), 1000);
    }
}
