use std::error::Error;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{info, warn};
use url::Url;
use crate::modules::serialize::{PanelConfig, ProxyConfig};

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct ProxyState {
    target: Url,
    proxy: ProxyConfig,
    client: reqwest::Client,
}

impl ProxyState {
    pub fn new(config: &PanelConfig) -> Result<Self, Box<dyn Error>> {
        let target = Url::parse(&config.backend_url)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            target,
            proxy: config.proxy.clone(),
            client,
        })
    }
}

/// Serves a landing page at `/` and forwards the configured prefixes to the backend.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/", get(index))
        .fallback(forward)
        .with_state(state)
}

async fn index(State(state): State<ProxyState>) -> Html<String> {
    Html(index_html(&state))
}

async fn forward(State(state): State<ProxyState>, req: Request) -> Result<Response, ProxyError> {
    let path = req.uri().path().to_string();
    if !state.proxy.forwards(&path) {
        return Err(ProxyError::not_found(format!("{path} is not proxied")));
    }
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let url = state
        .target
        .join(&path_and_query)
        .map_err(|e| ProxyError::bad_request(e.to_string()))?;

    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ProxyError::bad_request(e.to_string()))?;

    // the client sets Host for the target origin
    let mut headers = parts.headers;
    headers.remove(HOST);

    info!("{} {path_and_query} -> {url}", parts.method);
    let upstream = state
        .client
        .request(parts.method, url.as_str())
        .headers(headers)
        .body(bytes)
        .send()
        .await
        .map_err(|e| {
            warn!("Backend unreachable: {e}");
            ProxyError::bad_gateway(e.to_string())
        })?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    for hop in [CONNECTION, TRANSFER_ENCODING] {
        headers.remove(hop);
    }
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ProxyError::bad_gateway(e.to_string()))?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[derive(Debug)]
pub struct ProxyError {
    code: StatusCode,
    message: String,
}

impl ProxyError {
    fn not_found(message: String) -> Self {
        Self {
            code: StatusCode::NOT_FOUND,
            message,
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn bad_gateway(message: String) -> Self {
        Self {
            code: StatusCode::BAD_GATEWAY,
            message,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.code, self.message).into_response()
    }
}

fn index_html(state: &ProxyState) -> String {
    let rows: String = state
        .proxy
        .prefixes
        .iter()
        .map(|p| format!("      <li><code>{p}</code></li>\n"))
        .collect();
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Task panel dev proxy</title>
</head>
<body>
  <h1>Task panel dev proxy</h1>
  <p>Forwarding to <code>{target}</code>:</p>
  <ul>
{rows}  </ul>
</body>
</html>
"#,
        target = state.target
    )
}
