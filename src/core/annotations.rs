//! Declarative metadata attached to resolver arguments
//!
//! Annotations are collected at schema build time and handed to every
//! parameter middleware. Each middleware picks the annotation types it
//! understands with [`ParameterAnnotations::of_type`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A validation rule declared for one argument
///
/// Several specs may target the same argument; they are combined in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    /// Name of the argument the rule applies to
    pub target: String,
    /// Rule expression, e.g. `email` or `starts_with:192|ipv4`
    pub rule: String,
}

impl RuleSpec {
    pub fn new(target: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            rule: rule.into(),
        }
    }
}

/// The annotations declared on one argument, in declaration order
#[derive(Clone, Default)]
pub struct ParameterAnnotations {
    entries: Vec<Arc<dyn Any + Send + Sync>>,
}

impl ParameterAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<A: Any + Send + Sync>(&mut self, annotation: A) {
        self.entries.push(Arc::new(annotation));
    }

    /// All annotations of type `A`, in declaration order
    pub fn of_type<A: Any + Send + Sync>(&self) -> impl Iterator<Item = &A> {
        self.entries
            .iter()
            .filter_map(|entry| (**entry).downcast_ref::<A>())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for ParameterAnnotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterAnnotations")
            .field("len", &self.entries.len())
            .finish()
    }
}
