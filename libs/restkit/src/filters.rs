//! Request and response filter chains.
//!
//! Filters carry a [`Priority`] and optional name-binding labels. For a
//! given resource method, the request chain runs in ascending priority
//! order and the response chain in descending order; ties preserve
//! registration order. A labeled filter applies to a method iff all of its
//! labels appear on the method; label-free filters are global.
//!
//! Pre-match request filters are registered separately: they run before
//! routing and may rewrite the request (e.g. the method), so they are
//! always global.

use async_trait::async_trait;
use std::sync::Arc;

use crate::request::RequestContext;
use crate::response::Outcome;

/// Filter ordering constant. Lower values run earlier in request chains
/// and later in response chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub const AUTHENTICATION: Priority = Priority(1000);
    pub const AUTHORIZATION: Priority = Priority(2000);
    pub const HEADER_DECORATOR: Priority = Priority(3000);
    pub const ENTITY_CODER: Priority = Priority(4000);
    pub const USER: Priority = Priority(5000);
}

impl Default for Priority {
    fn default() -> Self {
        Self::USER
    }
}

/// Name-binding label, the analogue of a binding annotation.
pub type Label = &'static str;

/// Result of a request filter: continue down the chain or short-circuit
/// with a response. An aborted request still traverses the response chain.
pub enum FilterAction {
    Continue,
    Abort(Outcome),
}

#[async_trait]
pub trait RequestFilter: Send + Sync {
    async fn filter(&self, ctx: &mut RequestContext) -> FilterAction;
}

#[async_trait]
pub trait ResponseFilter: Send + Sync {
    async fn filter(&self, ctx: &RequestContext, response: &mut Outcome);
}

/// A filter plus its ordering and binding metadata.
pub struct FilterBinding<F: ?Sized> {
    pub(crate) filter: Arc<F>,
    pub(crate) priority: Priority,
    pub(crate) labels: Vec<Label>,
}

impl<F: ?Sized> FilterBinding<F> {
    pub fn new(filter: Arc<F>) -> Self {
        Self {
            filter,
            priority: Priority::USER,
            labels: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// True when this filter belongs in the chain of a method carrying
    /// `method_labels`.
    pub(crate) fn applies_to(&self, method_labels: &[Label]) -> bool {
        self.labels.iter().all(|l| method_labels.contains(l))
    }
}

impl<F: ?Sized> Clone for FilterBinding<F> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
            priority: self.priority,
            labels: self.labels.clone(),
        }
    }
}

pub type RequestFilterBinding = FilterBinding<dyn RequestFilter>;
pub type ResponseFilterBinding = FilterBinding<dyn ResponseFilter>;

/// Ascending priority; stable, so ties keep registration order.
pub(crate) fn sort_request_chain(chain: &mut [RequestFilterBinding]) {
    chain.sort_by_key(|b| b.priority);
}

/// Descending priority; stable, so ties keep registration order.
pub(crate) fn sort_response_chain(chain: &mut [ResponseFilterBinding]) {
    chain.sort_by_key(|b| std::cmp::Reverse(b.priority));
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl RequestFilter for Noop {
        async fn filter(&self, _ctx: &mut RequestContext) -> FilterAction {
            FilterAction::Continue
        }
    }

    #[async_trait]
    impl ResponseFilter for Noop {
        async fn filter(&self, _ctx: &RequestContext, _response: &mut Outcome) {}
    }

    fn req_binding(priority: Priority) -> RequestFilterBinding {
        FilterBinding::<dyn RequestFilter>::new(Arc::new(Noop)).priority(priority)
    }

    #[test]
    fn request_chain_sorts_ascending() {
        let mut chain = vec![
            req_binding(Priority::USER),
            req_binding(Priority::AUTHENTICATION),
            req_binding(Priority::AUTHORIZATION),
        ];
        sort_request_chain(&mut chain);
        let order: Vec<_> = chain.iter().map(|b| b.priority).collect();
        assert_eq!(
            order,
            [
                Priority::AUTHENTICATION,
                Priority::AUTHORIZATION,
                Priority::USER
            ]
        );
    }

    #[test]
    fn response_chain_sorts_descending() {
        let mut chain = vec![
            FilterBinding::<dyn ResponseFilter>::new(Arc::new(Noop))
                .priority(Priority(Priority::USER.0 - 1)),
            FilterBinding::<dyn ResponseFilter>::new(Arc::new(Noop)).priority(Priority::USER),
            FilterBinding::<dyn ResponseFilter>::new(Arc::new(Noop))
                .priority(Priority(Priority::USER.0 + 1)),
        ];
        sort_response_chain(&mut chain);
        let order: Vec<_> = chain.iter().map(|b| b.priority.0).collect();
        assert_eq!(order, [5001, 5000, 4999]);
    }

    #[test]
    fn binding_applies_by_label_subset() {
        let foo = req_binding(Priority::USER).label("foo");
        let foo_bar = req_binding(Priority::USER).label("foo").label("bar");
        let global = req_binding(Priority::USER);

        assert!(global.applies_to(&[]));
        assert!(global.applies_to(&["foo"]));
        assert!(foo.applies_to(&["foo", "bar"]));
        assert!(!foo.applies_to(&["bar"]));
        assert!(foo_bar.applies_to(&["foo", "bar"]));
        assert!(!foo_bar.applies_to(&["foo"]));
    }
}
