//! Black-box acceptance tests for the sample API, driven in-process
//! through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::response::Response;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use simple_api::person::Person;

async fn send(req: Request<Body>) -> Response {
    simple_api::router()
        .expect("router builds")
        .oneshot(req)
        .await
        .expect("infallible")
}

async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn method(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

fn post_json<T: serde::Serialize>(path: &str, value: &T) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(value).unwrap()))
        .unwrap()
}

async fn assert_body(path: &str, expected: &str) {
    let resp = send(get(path)).await;
    assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    assert_eq!(body_string(resp).await, expected, "GET {path}");
}

#[tokio::test]
async fn simple_verbs() {
    assert_body("/simple", "GET").await;
    assert_body("/simple/foo", "GET:foo").await;

    for (m, expected) in [
        (Method::POST, "POST"),
        (Method::PUT, "PUT"),
        (Method::DELETE, "DELETE"),
        (Method::PATCH, "PATCH"),
        (Method::OPTIONS, "OPTIONS"),
    ] {
        let resp = send(method(m.clone(), "/simple")).await;
        assert_eq!(resp.status(), StatusCode::OK, "{m} /simple");
        assert_eq!(body_string(resp).await, expected, "{m} /simple");
    }

    let resp = send(method(Method::HEAD, "/simple")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Stef").unwrap(), "head");
    assert!(body_string(resp).await.is_empty());
}

#[tokio::test]
async fn missing_routes_are_404_problems() {
    for m in [Method::GET, Method::POST, Method::DELETE] {
        let resp = send(method(m.clone(), "/missing")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{m} /missing");
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/problem+json"
        );
    }
}

#[tokio::test]
async fn param_binding() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/simple/params/pv?q=qv")
        .header("h", "123")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("f=fv"))
        .unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_string(resp).await,
        "params: p: pv, q: qv, h: 123, f: fv"
    );
}

#[tokio::test]
async fn json_round_trip() {
    let resp = send(get("/simple/person")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let person: Person = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(person.first, "Bob");
    assert_eq!(person.last.as_deref(), Some("Builder"));

    let resp = send(post_json("/simple/person", &Person::new("Bob", "Builder"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let echoed: Person = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(echoed.first, "Bob");
    assert_eq!(echoed.last.as_deref(), Some("Builder"));
}

#[tokio::test]
async fn large_json_round_trip() {
    let long = "abc".repeat(10_000);
    let resp = send(post_json("/simple/person-large", &Person::new(&*long, &*long))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let echoed: Person = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(echoed.first, long);
    assert_eq!(echoed.last.as_deref(), Some(long.as_str()));
}

#[tokio::test]
async fn async_json() {
    let resp = send(get("/simple/async-person")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let person: Person = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(person.first, "Bob");
}

#[tokio::test]
async fn validated_json() {
    let resp = send(post_json(
        "/simple/person-validated",
        &Person::new("Bob", "Builder"),
    ))
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(post_json(
        "/simple/person-invalid-result",
        &Person::new("Bob", "Builder"),
    ))
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );

    let invalid = Person {
        first: "Bob".to_owned(),
        last: None,
    };
    let resp = send(post_json("/simple/person-validated", &invalid)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    let body = body_string(resp).await;
    assert!(body.contains("last"), "violations name the field: {body}");
}

#[tokio::test]
async fn injected_hello_service() {
    assert_body("/simple/hello", "Hello").await;
}

#[tokio::test]
async fn blocking_handler_runs_on_blocking_pool() {
    assert_body("/simple/blocking", "true").await;
}

#[tokio::test]
async fn pre_match_filter_rewrites_method() {
    for m in [Method::GET, Method::POST] {
        let resp = send(method(m.clone(), "/simple/pre-match")).await;
        assert_eq!(resp.status(), StatusCode::OK, "{m} /simple/pre-match");
        assert_eq!(body_string(resp).await, "pre-match-post");
    }
}

async fn assert_filter_headers(path: &str, request_chain: &str, response_chain: &str) {
    let resp = send(get(path)).await;
    assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    assert_eq!(
        resp.headers().get("filter-request").unwrap(),
        request_chain,
        "GET {path}"
    );
    assert_eq!(
        resp.headers().get("filter-response").unwrap(),
        response_chain,
        "GET {path}"
    );
}

#[tokio::test]
async fn filter_chains_order_by_priority_and_binding() {
    assert_filter_headers(
        "/simple/filters",
        "authentication-authorization-default",
        "default",
    )
    .await;
    assert_filter_headers(
        "/simple/fooFilters",
        "authentication-authorization-foo-default",
        "default-foo",
    )
    .await;
    assert_filter_headers(
        "/simple/barFilters",
        "authentication-authorization-default-bar",
        "default-bar",
    )
    .await;
    assert_filter_headers(
        "/simple/fooBarFilters",
        "authentication-authorization-foo-default-bar-foobar",
        "default-foo-bar-foobar",
    )
    .await;
}

#[tokio::test]
async fn providers_are_introspectable() {
    let resp = send(get("/simple/providers")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("TestError"), "providers body: {body}");
}

#[tokio::test]
async fn exception_mapping() {
    let resp = send(get("/simple/mapped-exception")).await;
    assert_eq!(resp.status().as_u16(), 666);
    assert_eq!(body_string(resp).await, "OK");

    let resp = send(get("/simple/unknown-exception")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = send(get("/simple/web-application-exception")).await;
    assert_eq!(resp.status().as_u16(), 666);
    assert_eq!(body_string(resp).await, "OK");
}

#[tokio::test]
async fn writers() {
    assert_body("/simple/lookup-writer", "OK").await;
    assert_body("/simple/writer", "WRITER").await;
    assert_body("/simple/fast-writer", "OK").await;
}

#[tokio::test]
async fn async_handlers() {
    assert_body("/simple/async/cs/ok", "CS-OK").await;
    assert_body("/simple/async/uni/ok", "UNI-OK").await;

    for path in ["/simple/async/cs/fail", "/simple/async/uni/fail"] {
        let resp = send(get(path)).await;
        assert_eq!(resp.status().as_u16(), 666, "GET {path}");
        assert_eq!(body_string(resp).await, "OK", "GET {path}");
    }
}

#[tokio::test]
async fn sub_resources() {
    assert_body("/simple/sub", "sub").await;
    assert_body("/simple/sub/otherSub", "otherSub").await;
}

#[tokio::test]
async fn multiple_root_resources() {
    assert_body("/a", "a").await;
    assert_body("/b", "b").await;
}

#[tokio::test]
async fn request_and_response_params() {
    let resp = send(get("/simple/request-response-params")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("dummy").unwrap(), "value");
    assert_eq!(body_string(resp).await, "127.0.0.1");
}

#[tokio::test]
async fn request_introspection() {
    assert_body("/simple/jax-rs-request", "GET").await;
}

#[tokio::test]
async fn feature_registration() {
    let resp = send(get("/simple/feature-mapped-exception")).await;
    assert_eq!(resp.status().as_u16(), 667);

    let resp = send(get("/simple/feature-filters")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("feature-filter-request").unwrap(),
        "authentication-default"
    );
    let values: Vec<_> = resp
        .headers()
        .get_all("feature-filter-response")
        .iter()
        .collect();
    assert_eq!(values, ["high-priority", "normal-priority"]);
}

#[tokio::test]
async fn dynamic_feature_registration() {
    let resp = send(get("/simple/dynamic-feature-filters")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("feature-filter-request").unwrap(),
        "authentication-default-low"
    );
    let values: Vec<_> = resp
        .headers()
        .get_all("feature-filter-response")
        .iter()
        .collect();
    assert_eq!(values, ["high-priority", "normal-priority", "low-priority"]);
}

#[tokio::test]
async fn resource_info_headers() {
    let resp = send(get("/simple/resource-info")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("class-name").unwrap(), "SimpleResource");
    assert_eq!(
        resp.headers().get("method-name").unwrap(),
        "resource_info"
    );
}
