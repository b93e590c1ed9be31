//! Sample API module: a JAX-RS-flavoured resource tree wired through the
//! restkit runtime, exercising filters, features, dynamic features,
//! exception mappers, custom writers and both provider factory paths.

use anyhow::Context;
use std::sync::Arc;

use restkit::mappers::ExceptionMapper;
use restkit::{
    BeanContainer, Priority, ProviderName, RequestFilterBinding, ResponseFilterBinding,
    RestRuntime, SingletonRegistry, SingletonSet, resolve_factory,
};

pub mod person;
pub mod providers;
pub mod resource;

use providers::{
    PreMatchMethodFilter, ResourceInfoFilter, TagRequestFilter, TagResponseFilter,
    TestDynamicFeature, TestFeature, TestWriter,
};

const MAPPER_PROVIDER: &str = "simple_api::providers::TestErrorMapper";
const HELLO_PROVIDER: &str = "simple_api::providers::HelloService";

/// Build the compiled runtime for the sample API.
///
/// The exception mapper is resolved through the singleton factory path and
/// `HelloService` through the container-managed path, so both variants of
/// the provider factory are live in the wiring.
pub fn build_runtime() -> anyhow::Result<RestRuntime> {
    let singleton_registry = Arc::new(SingletonRegistry::new());
    let container = Arc::new(BeanContainer::new());
    let mut singletons = SingletonSet::new();

    let mapper_name = ProviderName::from(MAPPER_PROVIDER);
    let mapper: Arc<dyn ExceptionMapper> = Arc::new(providers::TestErrorMapper);
    singleton_registry.register(&mapper_name, mapper);
    singletons.insert(mapper_name.clone());

    let hello_name = ProviderName::from(HELLO_PROVIDER);
    container.register(&hello_name, || Arc::new(providers::HelloService));

    let mapper_factory = resolve_factory::<dyn ExceptionMapper>(
        &mapper_name,
        &singletons,
        &singleton_registry,
        &container,
    );
    let hello_factory = resolve_factory::<providers::HelloService>(
        &hello_name,
        &singletons,
        &singleton_registry,
        &container,
    );

    let mapper = mapper_factory
        .instance()
        .context("resolving the exception mapper singleton")?;

    let runtime = RestRuntime::builder()
        .resource(resource::simple_resource(hello_factory))
        .resource(resource::root_a())
        .resource(resource::root_b())
        .pre_match_filter(RequestFilterBinding::new(Arc::new(PreMatchMethodFilter)))
        .request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new(
                "filter-request",
                "authentication",
            )))
            .priority(Priority::AUTHENTICATION),
        )
        .request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new(
                "filter-request",
                "authorization",
            )))
            .priority(Priority::AUTHORIZATION),
        )
        .request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new("filter-request", "foo")))
                .priority(Priority::ENTITY_CODER)
                .label("foo"),
        )
        .request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new("filter-request", "default")))
                .priority(Priority::USER),
        )
        .request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new("filter-request", "bar")))
                .priority(Priority(Priority::USER.0 + 1000))
                .label("bar"),
        )
        .request_filter(
            RequestFilterBinding::new(Arc::new(TagRequestFilter::new("filter-request", "foobar")))
                .priority(Priority(Priority::USER.0 + 2000))
                .label("foo")
                .label("bar"),
        )
        .response_filter(
            ResponseFilterBinding::new(Arc::new(TagResponseFilter::new(
                "filter-response",
                "default",
            )))
            .priority(Priority::USER),
        )
        .response_filter(
            ResponseFilterBinding::new(Arc::new(TagResponseFilter::new("filter-response", "foo")))
                .priority(Priority::ENTITY_CODER)
                .label("foo"),
        )
        .response_filter(
            ResponseFilterBinding::new(Arc::new(TagResponseFilter::new("filter-response", "bar")))
                .priority(Priority::HEADER_DECORATOR)
                .label("bar"),
        )
        .response_filter(
            ResponseFilterBinding::new(Arc::new(TagResponseFilter::new(
                "filter-response",
                "foobar",
            )))
            .priority(Priority::AUTHORIZATION)
            .label("foo")
            .label("bar"),
        )
        .response_filter(ResponseFilterBinding::new(Arc::new(ResourceInfoFilter)))
        .exception_mapper(mapper)
        .writer(Arc::new(TestWriter))
        .feature(Arc::new(TestFeature))
        .dynamic_feature("TestDynamicFeature", Arc::new(TestDynamicFeature))
        .build()
        .context("assembling the sample API runtime")?;

    tracing::debug!("sample API runtime assembled");
    Ok(runtime)
}

/// The sample API as an axum router.
pub fn router() -> anyhow::Result<axum::Router> {
    Ok(build_runtime()?.into_router())
}
