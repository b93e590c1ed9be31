//! Per-request context handed to filters and handlers.
//!
//! The body is buffered before dispatch, so parameter accessors and JSON
//! decoding are synchronous. Pre-match filters may rewrite the method
//! before routing.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::error::Problem;
use crate::mappers::Thrown;
use crate::resource::ResourceInfo;
use crate::runtime::ProvidersSnapshot;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: SocketAddr,
    path_params: Vec<(String, String)>,
    resource: Option<ResourceInfo>,
    providers: Arc<ProvidersSnapshot>,
}

impl RequestContext {
    pub(crate) fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
        providers: Arc<ProvidersSnapshot>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            // No connect info (e.g. in-process test dispatch) means loopback.
            remote_addr: remote_addr
                .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)),
            path_params: Vec::new(),
            resource: None,
            providers,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Rewrite the request method. Only meaningful from a pre-match filter;
    /// routing has already happened by the time bound filters run.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Read a request header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Matched path parameter by template name.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First query parameter with the given name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
        pairs.into_iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// First form parameter with the given name. Requires an
    /// `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn form_param(&self, name: &str) -> Option<String> {
        let content_type = self.header(http::header::CONTENT_TYPE.as_str())?;
        if !content_type.starts_with(FORM_URLENCODED) {
            return None;
        }
        let body = std::str::from_utf8(&self.body).ok()?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body).ok()?;
        pairs.into_iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Decode the buffered body as JSON.
    ///
    /// # Errors
    /// A malformed body raises a 400 problem through the exception mapping
    /// stage.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Thrown> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Thrown::from(
                Problem::new(
                    StatusCode::BAD_REQUEST,
                    "Bad Request",
                    format!("malformed JSON body: {e}"),
                )
                .with_instance(self.path()),
            )
        })
    }

    /// Info about the matched resource method; `None` before routing.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceInfo> {
        self.resource.as_ref()
    }

    /// Snapshot of registered providers (mapper/writer type names).
    #[must_use]
    pub fn providers(&self) -> &ProvidersSnapshot {
        &self.providers
    }

    pub(crate) fn set_path_params(&mut self, params: Vec<(String, String)>) {
        self.path_params = params;
    }

    pub(crate) fn set_resource(&mut self, info: ResourceInfo) {
        self.resource = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(uri: &str, headers: &[(&str, &str)], body: &str) -> RequestContext {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                http::HeaderName::try_from(*name).unwrap(),
                http::HeaderValue::try_from(*value).unwrap(),
            );
        }
        RequestContext::new(
            Method::POST,
            uri.parse().unwrap(),
            map,
            Bytes::from(body.to_owned()),
            None,
            Arc::new(ProvidersSnapshot::default()),
        )
    }

    #[test]
    fn query_and_header_params() {
        let c = ctx("/simple/params/pv?q=qv", &[("h", "123")], "");
        assert_eq!(c.query_param("q").as_deref(), Some("qv"));
        assert_eq!(c.query_param("missing"), None);
        assert_eq!(c.header("h"), Some("123"));
    }

    #[test]
    fn form_params_require_urlencoded_content_type() {
        let c = ctx(
            "/simple/params/pv",
            &[("content-type", "application/x-www-form-urlencoded")],
            "f=fv",
        );
        assert_eq!(c.form_param("f").as_deref(), Some("fv"));

        let c = ctx("/simple/params/pv", &[], "f=fv");
        assert_eq!(c.form_param("f"), None);
    }

    #[test]
    fn json_decode_failure_maps_to_bad_request() {
        let c = ctx("/simple/person", &[], "{not json");
        let err = c.json::<serde_json::Value>().unwrap_err();
        assert!(err.is::<crate::mappers::WebError>());
    }

    #[test]
    fn remote_addr_defaults_to_loopback() {
        let c = ctx("/simple", &[], "");
        assert_eq!(c.remote_addr().ip().to_string(), "127.0.0.1");
    }
}
