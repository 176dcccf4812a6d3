//! axum middleware - format handler output through a template
//!
//! Handlers return a [`ResponseView`] holding application fields
//! (`info`, `data`, `pagination`, `status`, ...). The middleware picks it
//! out of the response extensions, builds the `req`/`res` context and
//! replaces the response body with the resolved template as JSON.
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use serde_json::json;
//! use shapeshift::middleware::{with_format, FormatLayer, ResponseView};
//! use shapeshift::Template;
//!
//! async fn hello() -> ResponseView {
//!     ResponseView::new().with("info", json!("hello"))
//! }
//!
//! let template = Template::from_value(json!({"response": {"info": "<%= res.info %>"}}));
//! let app: Router = with_format(Router::new().route("/", get(hello)), FormatLayer::new(template));
//! ```
//!
//! Responses without a `ResponseView` (404 fallbacks, static files, ...)
//! pass through untouched.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tracing::{debug, error, instrument, warn};

use crate::config::{FormatConfig, DEFAULT_STATUS_FIELD};
use crate::context::Context;
use crate::error::Result;
use crate::template::Template;

/// Application fields exposed to placeholders as `res.*`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseView(Map<String, Value>);

impl ResponseView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ResponseView {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl IntoResponse for ResponseView {
    fn into_response(self) -> Response {
        let mut response = StatusCode::OK.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Middleware state: the shared template and the status field name
#[derive(Debug, Clone)]
pub struct FormatLayer {
    template: Template,
    status_field: Arc<str>,
}

impl FormatLayer {
    pub fn new(template: Template) -> Self {
        Self {
            template,
            status_field: Arc::from(DEFAULT_STATUS_FIELD),
        }
    }

    pub fn with_status_field(mut self, field: impl AsRef<str>) -> Self {
        self.status_field = Arc::from(field.as_ref());
        self
    }

    /// Build from config, loading the template file
    pub fn from_config(config: &FormatConfig) -> Result<Self> {
        let template = config.load_template()?;
        Ok(Self::new(template).with_status_field(&config.status_field))
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Resolve the template for one request and write it over `response`
    ///
    /// Headers and extensions the handler set are kept; the body and
    /// `content-type` are replaced. The status comes from the view's status
    /// field, else the handler's status. Resolution errors become a 500 with
    /// `{"error": {"code", "kind", "message"}}`.
    pub fn render(&self, req: Value, view: ResponseView, response: Response) -> Response {
        let (mut parts, _) = response.into_parts();
        let res = view.into_value();
        let status = self.status_of(&res).unwrap_or(parts.status);
        let ctx = Context::new(req, res);

        let (status, body) = match self.template.resolve(&ctx) {
            Ok(body) => (status, body),
            Err(e) => {
                let kind = if e.is_template_error() {
                    error!(code = e.code(), error = %e, "response template is invalid");
                    "template"
                } else {
                    error!(code = e.code(), error = %e, "response view is missing data");
                    "context"
                };
                let body = json!({
                    "error": {
                        "code": e.code(),
                        "kind": kind,
                        "message": e.to_string(),
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        let (json_parts, json_body) = Json(body).into_response().into_parts();
        parts.status = if json_parts.status.is_success() {
            status
        } else {
            json_parts.status
        };
        parts.headers.remove(header::CONTENT_LENGTH);
        for (name, value) in &json_parts.headers {
            parts.headers.insert(name.clone(), value.clone());
        }

        Response::from_parts(parts, json_body)
    }

    /// Status code carried by the view, if present and usable
    fn status_of(&self, res: &Value) -> Option<StatusCode> {
        let value = res.get(&*self.status_field)?;

        let status = value
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .and_then(|n| StatusCode::from_u16(n).ok());

        if status.is_none() {
            warn!(field = %self.status_field, value = %value, "ignoring unusable status field");
        }
        status
    }
}

/// Middleware function for `axum::middleware::from_fn_with_state`
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn format_response(
    state: State<FormatLayer>,
    request: Request,
    next: Next,
) -> Response {
    let State(layer) = state;
    let req = request_view(&request);
    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<ResponseView>() {
        Some(view) => layer.render(req, view, response),
        None => {
            debug!(status = %response.status(), "no response view, passing through");
            response
        }
    }
}

/// Wrap a router so every `ResponseView` it produces is formatted
pub fn with_format<S>(router: Router<S>, layer: FormatLayer) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(layer, format_response))
}

/// Build the `req` view of an HTTP request
///
/// Fields: `method`, `path`, `href` (path and query), `url` (URI as
/// received), `query`, `headers` (lowercase names) and `httpVersion`.
pub fn request_view<B>(request: &axum::http::Request<B>) -> Value {
    let uri = request.uri();
    let href = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let query: Map<String, Value> = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| {
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect()
        })
        .unwrap_or_default();

    let version = format!("{:?}", request.version());

    json!({
        "method": request.method().as_str(),
        "path": uri.path(),
        "href": href,
        "url": uri.to_string(),
        "query": query,
        "headers": header_map(request.headers()),
        "httpVersion": version.trim_start_matches("HTTP/"),
    })
}

/// Repeated headers are joined with ", "
fn header_map(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match map.get_mut(name.as_str()) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                map.insert(name.as_str().to_string(), Value::String(value));
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method, Request as HttpRequest};

    fn layer(template: Value) -> FormatLayer {
        FormatLayer::new(Template::from_value(template))
    }

    #[test]
    fn request_view_fields() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/items?page=2&sort=name")
            .header(header::HOST, "example.com")
            .header("x-tag", "a")
            .header("x-tag", "b")
            .body(())
            .unwrap();

        let view = request_view(&request);
        assert_eq!(view["method"], "POST");
        assert_eq!(view["path"], "/items");
        assert_eq!(view["href"], "/items?page=2&sort=name");
        assert_eq!(view["query"], json!({"page": "2", "sort": "name"}));
        assert_eq!(view["headers"]["host"], "example.com");
        assert_eq!(view["headers"]["x-tag"], "a, b");
        assert_eq!(view["httpVersion"], "1.1");
    }

    #[test]
    fn request_view_without_query() {
        let request = HttpRequest::builder().uri("/").body(()).unwrap();
        let view = request_view(&request);
        assert_eq!(view["method"], "GET");
        assert_eq!(view["href"], "/");
        assert_eq!(view["query"], json!({}));
    }

    #[test]
    fn status_absent_falls_back() {
        let l = layer(json!({}));
        assert_eq!(l.status_of(&json!({"info": "x"})), None);
    }

    #[test]
    fn status_from_view() {
        let l = layer(json!({}));
        assert_eq!(l.status_of(&json!({"status": 201})), Some(StatusCode::CREATED));
    }

    #[test]
    fn status_custom_field() {
        let l = layer(json!({})).with_status_field("successStatus");
        assert_eq!(
            l.status_of(&json!({"successStatus": 202, "status": 500})),
            Some(StatusCode::ACCEPTED)
        );
    }

    #[test]
    fn status_unusable_values_ignored() {
        let l = layer(json!({}));
        assert_eq!(l.status_of(&json!({"status": "201"})), None);
        assert_eq!(l.status_of(&json!({"status": 42})), None);
        assert_eq!(l.status_of(&json!({"status": -1})), None);
        assert_eq!(l.status_of(&json!({"status": 70000})), None);
    }

    #[test]
    fn render_error_is_500() {
        let l = layer(json!({"info": "<%= res.missing %>"}));
        let response = l.render(json!({}), ResponseView::new(), StatusCode::OK.into_response());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn render_keeps_handler_headers_and_status() {
        let l = layer(json!({"info": "<%= res.info %>"}));
        let mut inner = (StatusCode::NOT_FOUND, [("x-request-id", "abc")]).into_response();
        inner
            .headers_mut()
            .insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        inner
            .headers_mut()
            .insert(header::CONTENT_LENGTH, "3".parse().unwrap());

        let view = ResponseView::new().with("info", json!("gone"));
        let response = l.render(json!({}), view, inner);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-request-id"], "abc");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    }

    #[test]
    fn render_view_status_overrides_handler_status() {
        let l = layer(json!({}));
        let inner = StatusCode::NOT_FOUND.into_response();
        let view = ResponseView::new().with("status", json!(201));
        let response = l.render(json!({}), view, inner);
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn from_config_uses_template_and_status_field() {
        let dir = tempfile::TempDir::new().unwrap();
        let template_path = dir.path().join("format.json");
        std::fs::write(&template_path, r#"{"response": {"info": "<%= res.info %>"}}"#).unwrap();
        let config_path = dir.path().join("shapeshift.toml");
        std::fs::write(
            &config_path,
            format!(
                "template = \"{}\"\nstatus_field = \"successStatus\"\n",
                template_path.display()
            ),
        )
        .unwrap();

        let config = FormatConfig::load(&config_path).unwrap();
        let l = FormatLayer::from_config(&config).unwrap();

        let refs = l.template().placeholders();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].pointer, "/response/info");
        assert_eq!(
            l.status_of(&json!({"successStatus": 202, "status": 500})),
            Some(StatusCode::ACCEPTED)
        );
    }

    #[test]
    fn from_config_without_template_fails() {
        let config = FormatConfig::default();
        let err = FormatLayer::from_config(&config).unwrap_err();
        assert_eq!(err.code(), "FMT-031");
    }

    #[test]
    fn response_view_insert_get_and_from_map() {
        let mut view = ResponseView::new();
        view.insert("info", json!("x"));
        assert_eq!(view.get("info"), Some(&json!("x")));
        assert_eq!(view.get("data"), None);

        let mut map = Map::new();
        map.insert("info".to_string(), json!("x"));
        assert_eq!(ResponseView::from(map), view);
    }

    #[test]
    fn response_view_into_response_carries_extension() {
        let view = ResponseView::new().with("info", json!("x"));
        let response = view.clone().into_response();
        assert_eq!(response.extensions().get::<ResponseView>(), Some(&view));
    }
}
