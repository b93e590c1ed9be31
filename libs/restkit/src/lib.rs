//! A small JAX-RS-flavoured REST runtime on top of axum.
//!
//! Resources declare routes; providers (request/response filters,
//! exception mappers, message body writers) are registered globally or
//! contributed by features and per-method dynamic features. The compiled
//! [`RestRuntime`] dispatches requests through pre-match filters, routing,
//! name-bound filter chains, exception mapping and entity writing, and
//! converts into an [`axum::Router`] for serving or in-process testing.

pub mod error;
pub mod features;
pub mod filters;
pub mod mappers;
pub mod providers;
pub mod request;
pub mod resource;
pub mod response;
pub mod runtime;
pub mod validation;
pub mod writers;

pub use error::{Problem, ValidationViolation};
pub use features::{DynamicFeature, DynamicFeatures, Feature, MethodRegistrar, RegistrationContext};
pub use filters::{
    FilterAction, Priority, RequestFilter, RequestFilterBinding, ResponseFilter,
    ResponseFilterBinding,
};
pub use mappers::{ExceptionMapper, Thrown, WebError, mapper_fn};
pub use providers::{
    BeanContainer, BeanError, ProviderFactory, ProviderName, SingletonRegistry, SingletonSet,
    resolve_factory,
};
pub use request::RequestContext;
pub use resource::{Handler, Resource, ResourceInfo, Route};
pub use response::Outcome;
pub use runtime::{BuildError, ProvidersSnapshot, RestRuntime, RuntimeBuilder, blocking_allowed};
pub use validation::{Validate, require_valid, require_valid_result};
pub use writers::{MessageBodyWriter, WrittenBody};
