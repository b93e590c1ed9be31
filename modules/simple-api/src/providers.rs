//! Providers wired into the sample API: filters, exception mappers, a
//! custom writer, a feature and a dynamic feature.

use async_trait::async_trait;
use http::{Method, StatusCode};
use std::sync::Arc;

use restkit::features::{DynamicFeature, Feature, MethodRegistrar, RegistrationContext};
use restkit::filters::{FilterAction, Priority, RequestFilter, ResponseFilter};
use restkit::mappers::{ExceptionMapper, mapper_fn};
use restkit::writers::{MessageBodyWriter, WrittenBody};
use restkit::{Outcome, RequestContext, RequestFilterBinding, ResponseFilterBinding, ResourceInfo};

/// Status used by the custom-mapped application errors.
pub fn mapped_status() -> StatusCode {
    StatusCode::from_u16(666).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Status used by the feature-registered mapper.
pub fn feature_mapped_status() -> StatusCode {
    StatusCode::from_u16(667).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Application error with a registered mapper (status 666).
#[derive(Debug)]
pub struct TestError;

/// Application error no mapper knows about.
#[derive(Debug)]
pub struct UnknownError;

/// Application error whose mapper is contributed by [`TestFeature`].
#[derive(Debug)]
pub struct FeatureMappedError;

/// Maps [`TestError`] to `666 OK`.
pub struct TestErrorMapper;

impl ExceptionMapper for TestErrorMapper {
    fn error_type(&self) -> std::any::TypeId {
        std::any::TypeId::of::<TestError>()
    }

    fn error_type_name(&self) -> &'static str {
        std::any::type_name::<TestError>()
    }

    fn map(&self, _err: &(dyn std::any::Any + Send + Sync)) -> Outcome {
        Outcome::text("OK").status(mapped_status())
    }
}

/// Service resolved through the container-managed factory path.
#[derive(Default)]
pub struct HelloService;

impl HelloService {
    pub fn greeting(&self) -> &'static str {
        "Hello"
    }
}

/// Entity type only [`TestWriter`] knows how to render.
pub struct TestClass;

pub struct TestWriter;

impl MessageBodyWriter for TestWriter {
    fn name(&self) -> &'static str {
        "TestWriter"
    }

    fn write(&self, entity: &(dyn std::any::Any + Send + Sync)) -> Option<WrittenBody> {
        entity
            .downcast_ref::<TestClass>()
            .map(|_| WrittenBody::text("WRITER"))
    }
}

/// Appends its tag to a single accumulated request header value.
pub struct TagRequestFilter {
    header: &'static str,
    tag: &'static str,
}

impl TagRequestFilter {
    pub fn new(header: &'static str, tag: &'static str) -> Self {
        Self { header, tag }
    }
}

#[async_trait]
impl RequestFilter for TagRequestFilter {
    async fn filter(&self, ctx: &mut RequestContext) -> FilterAction {
        let value = match ctx.header(self.header) {
            Some(current) => format!("{current}-{}", self.tag),
            None => self.tag.to_owned(),
        };
        if let Ok(value) = value.parse() {
            if let Ok(name) = self.header.parse::<http::HeaderName>() {
                ctx.headers_mut().insert(name, value);
            }
        }
        FilterAction::Continue
    }
}

/// Appends its tag to a single accumulated response header value.
pub struct TagResponseFilter {
    header: &'static str,
    tag: &'static str,
}

impl TagResponseFilter {
    pub fn new(header: &'static str, tag: &'static str) -> Self {
        Self { header, tag }
    }
}

#[async_trait]
impl ResponseFilter for TagResponseFilter {
    async fn filter(&self, _ctx: &RequestContext, response: &mut Outcome) {
        let value = match response.header_str(self.header) {
            Some(current) => format!("{current}-{}", self.tag),
            None => self.tag.to_owned(),
        };
        response.set_header(self.header, value);
    }
}

/// Adds its tag as a separate response header value (multi-valued header).
pub struct AppendResponseFilter {
    header: &'static str,
    tag: &'static str,
}

impl AppendResponseFilter {
    pub fn new(header: &'static str, tag: &'static str) -> Self {
        Self { header, tag }
    }
}

#[async_trait]
impl ResponseFilter for AppendResponseFilter {
    async fn filter(&self, _ctx: &RequestContext, response: &mut Outcome) {
        response.append_header(self.header, self.tag);
    }
}

/// Pre-match filter: rewrites GET to POST on the pre-match endpoint, so
/// both verbs land on the single POST handler.
pub struct PreMatchMethodFilter;

#[async_trait]
impl RequestFilter for PreMatchMethodFilter {
    async fn filter(&self, ctx: &mut RequestContext) -> FilterAction {
        if ctx.path() == "/simple/pre-match" && ctx.method() == Method::GET {
            ctx.set_method(Method::POST);
        }
        FilterAction::Continue
    }
}

/// Exposes the matched resource class and method names as response headers.
pub struct ResourceInfoFilter;

#[async_trait]
impl ResponseFilter for ResourceInfoFilter {
    async fn filter(&self, ctx: &RequestContext, response: &mut Outcome) {
        if let Some(info) = ctx.resource() {
            response.set_header("class-name", info.class_name);
            response.set_header("method-name", info.method_name);
        }
    }
}

pub const FEATURE_REQUEST_HEADER: &str = "feature-filter-request";
pub const FEATURE_RESPONSE_HEADER: &str = "feature-filter-response";

/// Contributes feature-scoped filters and the 667 mapper at assembly time.
pub struct TestFeature;

impl Feature for TestFeature {
    fn configure(&self, ctx: &mut RegistrationContext<'_>) {
        ctx.register_request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new(
                FEATURE_REQUEST_HEADER,
                "authentication",
            )))
            .priority(Priority::AUTHENTICATION),
        );
        ctx.register_request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new(
                FEATURE_REQUEST_HEADER,
                "default",
            )))
            .priority(Priority::USER),
        );
        ctx.register_response_filter(
            ResponseFilterBinding::new(Arc::new(AppendResponseFilter::new(
                FEATURE_RESPONSE_HEADER,
                "high-priority",
            )))
            .priority(Priority(Priority::USER.0 + 1)),
        );
        ctx.register_response_filter(
            ResponseFilterBinding::new(Arc::new(AppendResponseFilter::new(
                FEATURE_RESPONSE_HEADER,
                "normal-priority",
            )))
            .priority(Priority::USER),
        );
        ctx.register_exception_mapper(Arc::new(mapper_fn(|_: &FeatureMappedError| {
            Outcome::new(feature_mapped_status())
        })));
    }
}

/// Adds low-priority filters to the one method that asks for them.
pub struct TestDynamicFeature;

impl DynamicFeature for TestDynamicFeature {
    fn configure(&self, info: &ResourceInfo, registrar: &mut MethodRegistrar<'_>) {
        if info.method_name != "dynamic_feature_filters" {
            return;
        }
        registrar.register_request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new(
                FEATURE_REQUEST_HEADER,
                "low",
            )))
            .priority(Priority(Priority::USER.0 + 1000)),
        );
        registrar.register_response_filter(
            ResponseFilterBinding::new(Arc::new(AppendResponseFilter::new(
                FEATURE_RESPONSE_HEADER,
                "low-priority",
            )))
            .priority(Priority(Priority::USER.0 - 1)),
        );
    }
}
