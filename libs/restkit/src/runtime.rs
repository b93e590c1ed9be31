//! Runtime assembly and request dispatch.
//!
//! [`RuntimeBuilder`] collects resources, providers, features and dynamic
//! features, then compiles a per-method dispatch table: every resource
//! method gets its own pre-sorted request and response filter chains.
//! Route templates are matched with `matchit`.
//!
//! Dispatch order: pre-match filters, routing, bound request filters,
//! handler (or abort), exception mapping, response filters, entity
//! writing. The compiled runtime converts into an axum `Router` so it can
//! be served or driven in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, Method, StatusCode};
use std::cell::Cell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error;
use crate::features::{
    DynamicFeature, DynamicFeatures, Feature, MethodRegistrar, RegistrationContext,
    ResourceDynamicFeature,
};
use crate::filters::{
    FilterAction, RequestFilter, RequestFilterBinding, ResponseFilter, ResponseFilterBinding,
    sort_request_chain, sort_response_chain,
};
use crate::mappers::{ExceptionMapper, ExceptionMappers, Thrown};
use crate::request::RequestContext;
use crate::resource::{HandlerKind, Resource, ResourceInfo};
use crate::response::{Entity, Outcome};
use crate::writers::{MessageBodyWriter, WriterRegistry};

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

thread_local! {
    static BLOCKING_ALLOWED: Cell<bool> = const { Cell::new(false) };
}

/// True while the current thread is executing a blocking route handler.
#[must_use]
pub fn blocking_allowed() -> bool {
    BLOCKING_ALLOWED.with(Cell::get)
}

struct BlockingGuard;

impl BlockingGuard {
    fn enter() -> Self {
        BLOCKING_ALLOWED.with(|c| c.set(true));
        Self
    }
}

impl Drop for BlockingGuard {
    fn drop(&mut self) {
        BLOCKING_ALLOWED.with(|c| c.set(false));
    }
}

/// Names of registered providers, for introspection from handlers.
#[derive(Default)]
pub struct ProvidersSnapshot {
    pub(crate) exception_mappers: Vec<&'static str>,
    pub(crate) writers: Vec<&'static str>,
}

impl ProvidersSnapshot {
    #[must_use]
    pub fn exception_mappers(&self) -> &[&'static str] {
        &self.exception_mappers
    }

    #[must_use]
    pub fn writers(&self) -> &[&'static str] {
        &self.writers
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: Method, path: String },

    #[error("invalid route template '{path}': {source}")]
    InvalidTemplate {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

struct CompiledMethod {
    info: ResourceInfo,
    handler: HandlerKind,
    request_chain: Vec<Arc<dyn RequestFilter>>,
    response_chain: Vec<Arc<dyn ResponseFilter>>,
}

type MethodMap = HashMap<Method, Arc<CompiledMethod>>;

/// Collects resources and providers, then compiles a [`RestRuntime`].
#[must_use]
#[derive(Default)]
pub struct RuntimeBuilder {
    resources: Vec<Resource>,
    pre_match_filters: Vec<RequestFilterBinding>,
    request_filters: Vec<RequestFilterBinding>,
    response_filters: Vec<ResponseFilterBinding>,
    mappers: Vec<Arc<dyn ExceptionMapper>>,
    writers: Vec<Arc<dyn MessageBodyWriter>>,
    features: Vec<Arc<dyn Feature>>,
    dynamic_features: DynamicFeatures,
    max_body_bytes: usize,
}

impl RuntimeBuilder {
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Register a request filter that runs before routing. Always global;
    /// may rewrite the request method.
    pub fn pre_match_filter(mut self, binding: RequestFilterBinding) -> Self {
        self.pre_match_filters.push(binding);
        self
    }

    pub fn request_filter(mut self, binding: RequestFilterBinding) -> Self {
        self.request_filters.push(binding);
        self
    }

    pub fn response_filter(mut self, binding: ResponseFilterBinding) -> Self {
        self.response_filters.push(binding);
        self
    }

    pub fn exception_mapper(mut self, mapper: Arc<dyn ExceptionMapper>) -> Self {
        self.mappers.push(mapper);
        self
    }

    pub fn writer(mut self, writer: Arc<dyn MessageBodyWriter>) -> Self {
        self.writers.push(writer);
        self
    }

    pub fn feature(mut self, feature: Arc<dyn Feature>) -> Self {
        self.features.push(feature);
        self
    }

    pub fn dynamic_feature(mut self, name: &'static str, feature: Arc<dyn DynamicFeature>) -> Self {
        self.dynamic_features
            .add_feature(ResourceDynamicFeature::new(name, feature));
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Compile the dispatch table.
    ///
    /// # Errors
    /// [`BuildError`] on duplicate `(method, path)` registrations or
    /// conflicting route templates.
    pub fn build(mut self) -> Result<RestRuntime, BuildError> {
        // Features contribute global providers first, in registration order.
        let features = std::mem::take(&mut self.features);
        for feature in &features {
            let mut ctx = RegistrationContext {
                request_filters: &mut self.request_filters,
                response_filters: &mut self.response_filters,
                mappers: &mut self.mappers,
                writers: &mut self.writers,
            };
            feature.configure(&mut ctx);
        }

        let mut mappers = ExceptionMappers::default();
        for mapper in self.mappers {
            mappers.register(mapper);
        }
        let mut writers = WriterRegistry::default();
        for writer in self.writers {
            writers.register(writer);
        }
        let providers = Arc::new(ProvidersSnapshot {
            exception_mappers: mappers.names().to_vec(),
            writers: writers.names(),
        });

        let mut paths: Vec<String> = Vec::new();
        let mut by_path: HashMap<String, MethodMap> = HashMap::new();

        for resource in std::mem::take(&mut self.resources) {
            for (path, class_name, route) in resource.flatten() {
                let info = ResourceInfo {
                    class_name,
                    method_name: route.name,
                };

                // Dynamic features may add per-method filters.
                let mut extra_request: Vec<RequestFilterBinding> = Vec::new();
                let mut extra_response: Vec<ResponseFilterBinding> = Vec::new();
                for registration in self.dynamic_features.resource_dynamic_features() {
                    let mut registrar = MethodRegistrar {
                        request_filters: &mut extra_request,
                        response_filters: &mut extra_response,
                    };
                    registration.feature.configure(&info, &mut registrar);
                }

                let mut request_chain: Vec<RequestFilterBinding> = self
                    .request_filters
                    .iter()
                    .filter(|b| b.applies_to(&route.labels))
                    .cloned()
                    .collect();
                request_chain.extend(extra_request);
                sort_request_chain(&mut request_chain);

                let mut response_chain: Vec<ResponseFilterBinding> = self
                    .response_filters
                    .iter()
                    .filter(|b| b.applies_to(&route.labels))
                    .cloned()
                    .collect();
                response_chain.extend(extra_response);
                sort_response_chain(&mut response_chain);

                let compiled = Arc::new(CompiledMethod {
                    info,
                    handler: route.handler,
                    request_chain: request_chain.into_iter().map(|b| b.filter).collect(),
                    response_chain: response_chain.into_iter().map(|b| b.filter).collect(),
                });

                let entry = by_path.entry(path.clone()).or_insert_with(|| {
                    paths.push(path.clone());
                    MethodMap::new()
                });
                if entry.insert(route.method.clone(), compiled).is_some() {
                    return Err(BuildError::DuplicateRoute {
                        method: route.method,
                        path,
                    });
                }
            }
        }

        let mut router = matchit::Router::new();
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let methods = by_path.remove(&path).unwrap_or_default();
            router
                .insert(path.clone(), entries.len())
                .map_err(|source| BuildError::InvalidTemplate {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path, methods = methods.len(), "route registered");
            entries.push(methods);
        }

        sort_request_chain(&mut self.pre_match_filters);
        let pre_match = self
            .pre_match_filters
            .into_iter()
            .map(|b| b.filter)
            .collect();

        Ok(RestRuntime {
            router,
            entries,
            pre_match,
            mappers,
            writers,
            providers,
            max_body_bytes: if self.max_body_bytes == 0 {
                DEFAULT_MAX_BODY_BYTES
            } else {
                self.max_body_bytes
            },
        })
    }
}

/// Compiled dispatch table.
pub struct RestRuntime {
    router: matchit::Router<usize>,
    entries: Vec<MethodMap>,
    pre_match: Vec<Arc<dyn RequestFilter>>,
    mappers: ExceptionMappers,
    writers: WriterRegistry,
    providers: Arc<ProvidersSnapshot>,
    max_body_bytes: usize,
}

impl std::fmt::Debug for RestRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRuntime")
            .field("entries", &self.entries.len())
            .field("pre_match", &self.pre_match.len())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl RestRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Dispatch one request through the full pipeline.
    pub async fn dispatch(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);

        let bytes = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return error::Problem::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Payload Too Large",
                    format!("request body exceeds {} bytes", self.max_body_bytes),
                )
                .into_response();
            }
        };

        let mut ctx = RequestContext::new(
            parts.method,
            parts.uri,
            parts.headers,
            bytes,
            remote_addr,
            Arc::clone(&self.providers),
        );

        for filter in &self.pre_match {
            if let FilterAction::Abort(outcome) = filter.filter(&mut ctx).await {
                return self.finish(ctx.path(), outcome, false);
            }
        }

        let path = ctx.path().to_owned();
        let (entry_idx, params) = match self.router.at(&path) {
            Ok(matched) => {
                let params: Vec<(String, String)> = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                (*matched.value, params)
            }
            Err(_) => {
                tracing::debug!(path, "no route matched");
                return error::not_found("no resource matches the request path")
                    .with_instance(path)
                    .into_response();
            }
        };

        let entry = &self.entries[entry_idx];
        let method = ctx.method().clone();
        let drop_body = method == Method::HEAD;

        let compiled = entry.get(&method).or_else(|| {
            // HEAD falls back to GET with the body dropped.
            (method == Method::HEAD)
                .then(|| entry.get(&Method::GET))
                .flatten()
        });
        let Some(compiled) = compiled else {
            let allow = allow_header(entry);
            if method == Method::OPTIONS {
                let outcome = Outcome::new(StatusCode::NO_CONTENT).header("allow", &allow);
                return self.finish(&path, outcome, false);
            }
            let mut outcome = Outcome::from_problem(
                error::method_not_allowed(format!("{method} is not supported on this resource"))
                    .with_instance(path.clone()),
            );
            outcome.set_header("allow", &allow);
            return self.finish(&path, outcome, drop_body);
        };

        ctx.set_path_params(params);
        ctx.set_resource(compiled.info);

        let mut aborted = None;
        for filter in &compiled.request_chain {
            if let FilterAction::Abort(outcome) = filter.filter(&mut ctx).await {
                aborted = Some(outcome);
                break;
            }
        }

        let mut outcome = match aborted {
            Some(outcome) => outcome,
            None => self.invoke(compiled, ctx.clone()).await,
        };

        for filter in &compiled.response_chain {
            filter.filter(&ctx, &mut outcome).await;
        }

        self.finish(&path, outcome, drop_body)
    }

    async fn invoke(&self, compiled: &CompiledMethod, ctx: RequestContext) -> Outcome {
        let path = ctx.path().to_owned();
        let result = match &compiled.handler {
            HandlerKind::Async(handler) => handler.call(ctx).await,
            HandlerKind::Blocking(handler) => {
                let handler = Arc::clone(handler);
                match tokio::task::spawn_blocking(move || {
                    let _guard = BlockingGuard::enter();
                    handler(ctx)
                })
                .await
                {
                    Ok(result) => result,
                    Err(join_err) => {
                        tracing::error!(path, error = %join_err, "blocking handler failed");
                        Err(Thrown::from(error::internal_error(
                            "blocking handler failed",
                        )))
                    }
                }
            }
        };
        match result {
            Ok(outcome) => outcome,
            Err(thrown) => self.mappers.map_thrown(thrown, &path),
        }
    }

    /// Render an outcome into the final HTTP response.
    fn finish(&self, path: &str, outcome: Outcome, drop_body: bool) -> Response {
        let Outcome {
            status,
            mut headers,
            entity,
        } = outcome;

        let (body, content_type): (Body, Option<&'static str>) = match entity {
            Entity::Empty => (Body::empty(), None),
            Entity::Text(text) => (Body::from(text), Some("text/plain; charset=utf-8")),
            Entity::Json(bytes) => (Body::from(bytes), Some("application/json")),
            Entity::Typed(any) => match self.writers.write(any.as_ref()) {
                Some(written) => (Body::from(written.body), Some(written.content_type)),
                None => {
                    tracing::error!(path, "no message body writer accepts the entity");
                    return error::internal_error("no message body writer accepts the entity")
                        .with_instance(path)
                        .into_response();
                }
            },
        };

        if let Some(content_type) = content_type {
            headers
                .entry(http::header::CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
        }

        let mut resp = Response::new(if drop_body { Body::empty() } else { body });
        *resp.status_mut() = status;
        *resp.headers_mut() = headers;
        resp
    }

    /// Convert into an axum router that funnels every request through
    /// [`Self::dispatch`].
    #[must_use]
    pub fn into_router(self) -> axum::Router {
        let runtime = Arc::new(self);
        axum::Router::new().fallback(move |req: Request| {
            let runtime = Arc::clone(&runtime);
            async move { runtime.dispatch(req).await }
        })
    }
}

fn allow_header(entry: &MethodMap) -> String {
    let mut methods: Vec<&str> = entry.keys().map(http::Method::as_str).collect();
    methods.sort_unstable();
    methods.join(", ")
}
