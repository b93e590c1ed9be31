//! Handler output model.
//!
//! Handlers produce an [`Outcome`]: a status, response headers, and an
//! [`Entity`]. Entities are rendered into a body at the very end of the
//! dispatch pipeline, after response filters have run, so filters observe
//! and mutate the outcome rather than raw bytes.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::any::Any;

use crate::error::Problem;

/// Response payload, rendered by the writer registry at the end of dispatch.
pub enum Entity {
    Empty,
    /// Plain text, written as `text/plain`.
    Text(String),
    /// Pre-serialized JSON, written as `application/json`.
    Json(Bytes),
    /// Arbitrary typed payload, offered to registered message body writers.
    Typed(Box<dyn Any + Send + Sync>),
}

/// Status, headers and entity of a response under construction.
#[must_use]
pub struct Outcome {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) entity: Entity,
}

impl Outcome {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            entity: Entity::Empty,
        }
    }

    /// 200 with no entity.
    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// 200 with a plain-text entity.
    pub fn text(body: impl Into<String>) -> Self {
        let mut outcome = Self::ok();
        outcome.entity = Entity::Text(body.into());
        outcome
    }

    /// 200 with a JSON entity serialized from `value`.
    ///
    /// # Errors
    /// Returns the serialization error; handlers usually bubble it with `?`
    /// (it converts into a 500 via the exception mapping stage).
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        let mut outcome = Self::ok();
        outcome.entity = Entity::Json(Bytes::from(bytes));
        Ok(outcome)
    }

    /// 200 with a typed entity, rendered by a registered message body writer.
    pub fn entity<T: Any + Send + Sync>(value: T) -> Self {
        let mut outcome = Self::ok();
        outcome.entity = Entity::Typed(Box::new(value));
        outcome
    }

    pub fn from_problem(problem: Problem) -> Self {
        let status = problem.status;
        let mut outcome = Self::new(status);
        if let Ok(bytes) = serde_json::to_vec(&problem) {
            outcome.entity = Entity::Json(Bytes::from(bytes));
            outcome.headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(crate::error::APPLICATION_PROBLEM_JSON),
            );
        }
        outcome
    }

    /// Override the status code (builder style).
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a response header (builder style). Invalid names or values are
    /// dropped.
    pub fn header(mut self, name: &str, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Read a response header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Append an additional value under `name`, keeping existing ones.
    pub fn append_header(&mut self, name: &str, value: impl AsRef<str>) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.append(name, value);
        }
    }

    /// Replace `name` with `value`, overwriting any previous value.
    pub fn set_header(&mut self, name: &str, value: impl AsRef<str>) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
    }
}
