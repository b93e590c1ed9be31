//! Exception-to-response mapping.
//!
//! Handlers fail with a [`Thrown`]: a type-erased error value. Mapping rules,
//! in order:
//!
//! 1. a mapper registered for the concrete error type produces the response;
//! 2. a [`WebError`] carries its own response and is returned as-is;
//! 3. everything else becomes a 500 problem and is logged.

use http::StatusCode;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error;
use crate::response::Outcome;

/// Type-erased error raised by a handler or filter.
pub struct Thrown {
    payload: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Thrown {
    pub fn new<E: Any + Send + Sync>(err: E) -> Self {
        Self {
            payload: Box::new(err),
            type_name: std::any::type_name::<E>(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is<E: Any>(&self) -> bool {
        self.payload.is::<E>()
    }

    #[must_use]
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }
}

impl std::fmt::Debug for Thrown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thrown")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Error that already knows its response, analogous to a web application
/// exception. Returned verbatim unless a mapper claims it first.
pub struct WebError {
    outcome: Outcome,
}

impl WebError {
    pub fn new(outcome: Outcome) -> Self {
        Self { outcome }
    }

    pub fn status(status: StatusCode) -> Self {
        Self::new(Outcome::new(status))
    }

    #[must_use]
    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}

impl From<WebError> for Thrown {
    fn from(err: WebError) -> Self {
        Thrown::new(err)
    }
}

impl From<error::Problem> for Thrown {
    fn from(problem: error::Problem) -> Self {
        WebError::new(Outcome::from_problem(problem)).into()
    }
}

impl From<serde_json::Error> for Thrown {
    fn from(err: serde_json::Error) -> Self {
        Thrown::new(err)
    }
}

/// Maps a single error type to a response.
pub trait ExceptionMapper: Send + Sync {
    /// `TypeId` of the error type this mapper handles.
    fn error_type(&self) -> TypeId;

    /// Name of the handled error type, for introspection.
    fn error_type_name(&self) -> &'static str;

    /// Produce the response for a matched error.
    fn map(&self, err: &(dyn Any + Send + Sync)) -> Outcome;
}

/// Build an [`ExceptionMapper`] from a closure over a concrete error type.
pub fn mapper_fn<E, F>(f: F) -> impl ExceptionMapper
where
    E: Any + Send + Sync,
    F: Fn(&E) -> Outcome + Send + Sync + 'static,
{
    FnExceptionMapper {
        f,
        _marker: PhantomData::<fn(&E)>,
    }
}

struct FnExceptionMapper<E, F> {
    f: F,
    _marker: PhantomData<fn(&E)>,
}

impl<E, F> ExceptionMapper for FnExceptionMapper<E, F>
where
    E: Any + Send + Sync,
    F: Fn(&E) -> Outcome + Send + Sync + 'static,
{
    fn error_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn error_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn map(&self, err: &(dyn Any + Send + Sync)) -> Outcome {
        match err.downcast_ref::<E>() {
            Some(err) => (self.f)(err),
            // Registry keys mappers by TypeId, so this branch is unreachable
            // through normal dispatch.
            None => Outcome::from_problem(error::internal_error("exception mapper type mismatch")),
        }
    }
}

/// Mapper registry keyed by error `TypeId`.
#[derive(Default)]
pub(crate) struct ExceptionMappers {
    by_type: HashMap<TypeId, Arc<dyn ExceptionMapper>>,
    names: Vec<&'static str>,
}

impl ExceptionMappers {
    pub(crate) fn register(&mut self, mapper: Arc<dyn ExceptionMapper>) {
        self.names.push(mapper.error_type_name());
        self.by_type.insert(mapper.error_type(), mapper);
    }

    pub(crate) fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Resolve a thrown error to a response per the module rules.
    pub(crate) fn map_thrown(&self, thrown: Thrown, path: &str) -> Outcome {
        if let Some(mapper) = self.by_type.get(&thrown.payload.as_ref().type_id()) {
            return mapper.map(thrown.payload.as_ref());
        }
        match thrown.payload.downcast::<WebError>() {
            Ok(web) => web.into_outcome(),
            Err(_) => {
                tracing::error!(
                    error_type = thrown.type_name,
                    path,
                    "unmapped handler error"
                );
                Outcome::from_problem(
                    error::internal_error("unhandled application error").with_instance(path),
                )
            }
        }
    }
}
