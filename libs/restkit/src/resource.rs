//! Resource model: routes, handlers, and resource metadata.
//!
//! A [`Resource`] groups routes under a base path; sub-resources mount
//! beneath it. Handlers are async by default; a blocking variant runs on
//! the blocking pool (see [`crate::runtime::blocking_allowed`]).

use futures::future::BoxFuture;
use http::Method;
use std::future::Future;
use std::sync::Arc;

use crate::filters::Label;
use crate::mappers::Thrown;
use crate::request::RequestContext;
use crate::response::Outcome;

/// Metadata of a matched resource method, available to filters and
/// handlers through the request context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    pub class_name: &'static str,
    pub method_name: &'static str,
}

pub type HandlerFuture = BoxFuture<'static, Result<Outcome, Thrown>>;

/// Async resource method handler.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, Thrown>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        Box::pin((self)(ctx))
    }
}

pub(crate) enum HandlerKind {
    Async(Arc<dyn Handler>),
    /// Runs on the blocking pool via `spawn_blocking`.
    Blocking(Arc<dyn Fn(RequestContext) -> Result<Outcome, Thrown> + Send + Sync>),
}

impl Clone for HandlerKind {
    fn clone(&self) -> Self {
        match self {
            Self::Async(h) => Self::Async(Arc::clone(h)),
            Self::Blocking(h) => Self::Blocking(Arc::clone(h)),
        }
    }
}

/// One resource method: verb, relative path, name, bindings, handler.
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) name: &'static str,
    pub(crate) labels: Vec<Label>,
    pub(crate) handler: HandlerKind,
}

impl Route {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        name: &'static str,
        handler: impl Handler + 'static,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            name,
            labels: Vec::new(),
            handler: HandlerKind::Async(Arc::new(handler)),
        }
    }

    pub fn get(path: impl Into<String>, name: &'static str, handler: impl Handler + 'static) -> Self {
        Self::new(Method::GET, path, name, handler)
    }

    pub fn post(
        path: impl Into<String>,
        name: &'static str,
        handler: impl Handler + 'static,
    ) -> Self {
        Self::new(Method::POST, path, name, handler)
    }

    pub fn put(path: impl Into<String>, name: &'static str, handler: impl Handler + 'static) -> Self {
        Self::new(Method::PUT, path, name, handler)
    }

    pub fn delete(
        path: impl Into<String>,
        name: &'static str,
        handler: impl Handler + 'static,
    ) -> Self {
        Self::new(Method::DELETE, path, name, handler)
    }

    pub fn patch(
        path: impl Into<String>,
        name: &'static str,
        handler: impl Handler + 'static,
    ) -> Self {
        Self::new(Method::PATCH, path, name, handler)
    }

    pub fn head(
        path: impl Into<String>,
        name: &'static str,
        handler: impl Handler + 'static,
    ) -> Self {
        Self::new(Method::HEAD, path, name, handler)
    }

    pub fn options(
        path: impl Into<String>,
        name: &'static str,
        handler: impl Handler + 'static,
    ) -> Self {
        Self::new(Method::OPTIONS, path, name, handler)
    }

    /// A route whose handler runs on the blocking pool.
    pub fn blocking(
        method: Method,
        path: impl Into<String>,
        name: &'static str,
        handler: impl Fn(RequestContext) -> Result<Outcome, Thrown> + Send + Sync + 'static,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            name,
            labels: Vec::new(),
            handler: HandlerKind::Blocking(Arc::new(handler)),
        }
    }

    /// Attach a name-binding label (builder style).
    pub fn label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }
}

/// A group of routes under a base path, plus mounted sub-resources.
pub struct Resource {
    pub(crate) class_name: &'static str,
    pub(crate) base_path: String,
    pub(crate) routes: Vec<Route>,
    pub(crate) children: Vec<Resource>,
}

impl Resource {
    pub fn new(class_name: &'static str, base_path: impl Into<String>) -> Self {
        Self {
            class_name,
            base_path: base_path.into(),
            routes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Mount a sub-resource beneath this resource's base path.
    #[must_use]
    pub fn mount(mut self, child: Resource) -> Self {
        self.children.push(child);
        self
    }

    /// Flatten this resource tree into `(full_path, class_name, route)`.
    pub(crate) fn flatten(self) -> Vec<(String, &'static str, Route)> {
        let mut out = Vec::new();
        let base = self.base_path;
        for route in self.routes {
            let full = join_paths(&base, &route.path);
            out.push((full, self.class_name, route));
        }
        for child in self.children {
            for (suffix, class_name, route) in child.flatten() {
                out.push((join_paths(&base, &suffix), class_name, route));
            }
        }
        out
    }
}

fn join_paths(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        if base.is_empty() {
            "/".to_owned()
        } else {
            base.to_owned()
        }
    } else {
        format!("{base}/{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_ctx: RequestContext) -> Result<Outcome, Thrown> {
        Ok(Outcome::ok())
    }

    #[test]
    fn join_paths_normalizes_slashes() {
        assert_eq!(join_paths("/simple", ""), "/simple");
        assert_eq!(join_paths("/simple/", "/sub"), "/simple/sub");
        assert_eq!(join_paths("/simple", "params/{p}"), "/simple/params/{p}");
        assert_eq!(join_paths("", "a"), "/a");
    }

    #[test]
    fn flatten_includes_mounted_sub_resources() {
        let resource = Resource::new("Root", "/simple")
            .route(Route::get("", "root", noop))
            .mount(
                Resource::new("Sub", "/sub")
                    .route(Route::get("", "sub", noop))
                    .route(Route::get("/otherSub", "other_sub", noop)),
            );

        let flat = resource.flatten();
        let paths: Vec<_> = flat.iter().map(|(p, _, _)| p.as_str()).collect();
        assert_eq!(paths, ["/simple", "/simple/sub", "/simple/sub/otherSub"]);
        assert_eq!(flat[1].1, "Sub");
    }

    #[test]
    fn route_labels_accumulate() {
        let route = Route::get("/fooBarFilters", "foo_bar_filters", noop)
            .label("foo")
            .label("bar");
        assert_eq!(route.labels, ["foo", "bar"]);
    }
}
