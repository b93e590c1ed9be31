//! Resources of the sample API.

use http::Method;
use std::sync::Arc;

use restkit::mappers::{Thrown, WebError};
use restkit::validation::{require_valid, require_valid_result};
use restkit::{
    Outcome, ProviderFactory, RequestContext, Resource, Route, blocking_allowed, error,
};

use crate::person::Person;
use crate::providers::{
    FEATURE_REQUEST_HEADER, FeatureMappedError, HelloService, TestClass, TestError, UnknownError,
    mapped_status,
};

async fn get_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("GET"))
}

async fn get_foo(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("GET:foo"))
}

async fn post_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("POST"))
}

async fn put_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("PUT"))
}

async fn delete_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("DELETE"))
}

async fn patch_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("PATCH"))
}

async fn options_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("OPTIONS"))
}

async fn head_simple(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::ok().header("Stef", "head"))
}

async fn params(ctx: RequestContext) -> Result<Outcome, Thrown> {
    let p = ctx.path_param("p").unwrap_or_default().to_owned();
    let q = ctx.query_param("q").unwrap_or_default();
    let h = ctx.header("h").unwrap_or_default().to_owned();
    let f = ctx.form_param("f").unwrap_or_default();
    Ok(Outcome::text(format!(
        "params: p: {p}, q: {q}, h: {h}, f: {f}"
    )))
}

async fn get_person(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::json(&Person::new("Bob", "Builder"))?)
}

async fn echo_person(ctx: RequestContext) -> Result<Outcome, Thrown> {
    let person: Person = ctx.json()?;
    Ok(Outcome::json(&person)?)
}

async fn async_person(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    tokio::task::yield_now().await;
    Ok(Outcome::json(&Person::new("Bob", "Builder"))?)
}

async fn person_validated(ctx: RequestContext) -> Result<Outcome, Thrown> {
    let person = require_valid(ctx.json::<Person>()?)?;
    Ok(Outcome::json(&person)?)
}

async fn person_invalid_result(ctx: RequestContext) -> Result<Outcome, Thrown> {
    let mut person: Person = ctx.json()?;
    person.last = None;
    let person = require_valid_result(person)?;
    Ok(Outcome::json(&person)?)
}

fn blocking(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text(blocking_allowed().to_string()))
}

async fn pre_match(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("pre-match-post"))
}

/// Echoes the accumulated request-filter header back to the caller.
fn echo_header(ctx: &RequestContext, header: &str, body: &str) -> Outcome {
    let mut outcome = Outcome::text(body);
    if let Some(value) = ctx.header(header) {
        outcome = outcome.header(header, value);
    }
    outcome
}

async fn filters(ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(echo_header(&ctx, "filter-request", "filters"))
}

async fn feature_filters(ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(echo_header(&ctx, FEATURE_REQUEST_HEADER, "feature-filters"))
}

async fn providers(ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text(ctx.providers().exception_mappers().join(", ")))
}

async fn mapped_exception(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Err(Thrown::new(TestError))
}

async fn unknown_exception(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Err(Thrown::new(UnknownError))
}

async fn web_application_exception(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Err(WebError::new(Outcome::text("OK").status(mapped_status())).into())
}

async fn feature_mapped_exception(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Err(Thrown::new(FeatureMappedError))
}

async fn writer(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::entity(TestClass))
}

async fn lookup_writer(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::entity("OK".to_owned()))
}

async fn fast_writer(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("OK"))
}

async fn async_cs_ok(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    tokio::task::yield_now().await;
    Ok(Outcome::text("CS-OK"))
}

async fn async_uni_ok(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    tokio::task::yield_now().await;
    Ok(Outcome::text("UNI-OK"))
}

async fn async_fail(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    tokio::task::yield_now().await;
    Err(Thrown::new(TestError))
}

async fn request_response_params(ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text(ctx.remote_addr().ip().to_string()).header("dummy", "value"))
}

async fn jax_rs_request(ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text(ctx.method().to_string()))
}

async fn resource_info(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("ok"))
}

async fn sub(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("sub"))
}

async fn other_sub(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("otherSub"))
}

async fn root_a_handler(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("a"))
}

async fn root_b_handler(_ctx: RequestContext) -> Result<Outcome, Thrown> {
    Ok(Outcome::text("b"))
}

/// The `/simple` resource with its mounted sub-resource.
pub fn simple_resource(hello: ProviderFactory<HelloService>) -> Resource {
    let hello = Arc::new(hello);
    let hello_handler = move |_ctx: RequestContext| {
        let hello = Arc::clone(&hello);
        async move {
            let service = hello
                .instance()
                .map_err(|err| Thrown::from(error::internal_error(err.to_string())))?;
            Ok(Outcome::text(service.greeting()))
        }
    };

    Resource::new("SimpleResource", "/simple")
        .route(Route::get("", "get", get_simple))
        .route(Route::get("/foo", "get_foo", get_foo))
        .route(Route::post("", "post", post_simple))
        .route(Route::put("", "put", put_simple))
        .route(Route::delete("", "delete", delete_simple))
        .route(Route::patch("", "patch", patch_simple))
        .route(Route::options("", "options", options_simple))
        .route(Route::head("", "head", head_simple))
        .route(Route::post("/params/{p}", "params", params))
        .route(Route::get("/person", "get_person", get_person))
        .route(Route::post("/person", "post_person", echo_person))
        .route(Route::post("/person-large", "person_large", echo_person))
        .route(Route::get("/async-person", "async_person", async_person))
        .route(Route::post(
            "/person-validated",
            "person_validated",
            person_validated,
        ))
        .route(Route::post(
            "/person-invalid-result",
            "person_invalid_result",
            person_invalid_result,
        ))
        .route(Route::get("/hello", "hello", hello_handler))
        .route(Route::blocking(Method::GET, "/blocking", "blocking", blocking))
        .route(Route::post("/pre-match", "pre_match", pre_match))
        .route(Route::get("/filters", "filters", filters))
        .route(Route::get("/fooFilters", "foo_filters", filters).label("foo"))
        .route(Route::get("/barFilters", "bar_filters", filters).label("bar"))
        .route(
            Route::get("/fooBarFilters", "foo_bar_filters", filters)
                .label("foo")
                .label("bar"),
        )
        .route(Route::get(
            "/feature-filters",
            "feature_filters",
            feature_filters,
        ))
        .route(Route::get(
            "/dynamic-feature-filters",
            "dynamic_feature_filters",
            feature_filters,
        ))
        .route(Route::get("/providers", "providers", providers))
        .route(Route::get(
            "/mapped-exception",
            "mapped_exception",
            mapped_exception,
        ))
        .route(Route::get(
            "/unknown-exception",
            "unknown_exception",
            unknown_exception,
        ))
        .route(Route::get(
            "/web-application-exception",
            "web_application_exception",
            web_application_exception,
        ))
        .route(Route::get(
            "/feature-mapped-exception",
            "feature_mapped_exception",
            feature_mapped_exception,
        ))
        .route(Route::get("/writer", "writer", writer))
        .route(Route::get("/lookup-writer", "lookup_writer", lookup_writer))
        .route(Route::get("/fast-writer", "fast_writer", fast_writer))
        .route(Route::get("/async/cs/ok", "async_cs_ok", async_cs_ok))
        .route(Route::get("/async/cs/fail", "async_cs_fail", async_fail))
        .route(Route::get("/async/uni/ok", "async_uni_ok", async_uni_ok))
        .route(Route::get("/async/uni/fail", "async_uni_fail", async_fail))
        .route(Route::get(
            "/request-response-params",
            "request_response_params",
            request_response_params,
        ))
        .route(Route::get("/jax-rs-request", "jax_rs_request", jax_rs_request))
        .route(Route::get("/resource-info", "resource_info", resource_info))
        .mount(
            Resource::new("SubResource", "/sub")
                .route(Route::get("", "sub", sub))
                .route(Route::get("/otherSub", "other_sub", other_sub)),
        )
}

pub fn root_a() -> Resource {
    Resource::new("RootAResource", "/a").route(Route::get("", "a", root_a_handler))
}

pub fn root_b() -> Resource {
    Resource::new("RootBResource", "/b").route(Route::get("", "b", root_b_handler))
}
