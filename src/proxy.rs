//! Single-endpoint reverse proxy.
//!
//! Forwards whatever it receives to one fixed target, rewriting the URL so the
//! target's scheme, host and path win and the query strings are merged. The
//! `Host` header follows the target, otherwise virtual-hosted targets would not
//! know which app the request is for.

use std::collections::HashMap;

use actix_web::{
    http::{header, StatusCode},
    web::Bytes,
    HttpRequest, HttpResponse,
};
use tracing::{debug, warn};
use url::Url;

use crate::config::ProxyRoute;

// Connection-level headers that must not be forwarded
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name)
}

#[derive(Debug, Clone)]
pub struct SameHostProxy {
    target: Url,

    // When set, replaces the incoming body, and `headers` are applied
    body: Option<Bytes>,

    headers: Option<HashMap<String, String>>,
}

impl SameHostProxy {
    pub fn new(target: Url, body: Option<Bytes>, headers: Option<HashMap<String, String>>) -> Self {
        Self {
            target,
            body,
            headers,
        }
    }

    pub fn from_route(route: &ProxyRoute) -> Self {
        Self::new(
            route.target.clone(),
            route.body.clone().map(Bytes::from),
            route.headers.clone(),
        )
    }

    pub fn target_url(&self, incoming_query: &str) -> Url {
        let target_query = self.target.query().unwrap_or_default();

        let query = if target_query.is_empty() || incoming_query.is_empty() {
            format!("{target_query}{incoming_query}")
        } else {
            format!("{target_query}&{incoming_query}")
        };

        let mut url = self.target.clone();
        url.set_query((!query.is_empty()).then_some(query.as_str()));
        url
    }

    fn outgoing_headers(&self, req: &HttpRequest) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();

        for (name, value) in req.headers() {
            // reqwest derives Host and Content-Length from the outgoing request
            if *name == header::HOST || *name == header::CONTENT_LENGTH {
                continue;
            }
            if is_hop_by_hop(name.as_str()) {
                continue;
            }

            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
                reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }

        if !headers.contains_key(reqwest::header::USER_AGENT) {
            // Keep the HTTP client from filling in its own default
            headers.insert(
                reqwest::header::USER_AGENT,
                reqwest::header::HeaderValue::from_static(""),
            );
        }

        if self.body.is_some() {
            for (name, value) in self.headers.iter().flatten() {
                match (
                    reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                    reqwest::header::HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(value)) => {
                        headers.insert(name, value);
                    }
                    _ => warn!("Skipping invalid proxy header override {name:?}"),
                }
            }
        }

        headers
    }

    pub async fn forward(
        &self,
        client: &reqwest::Client,
        req: &HttpRequest,
        body: Bytes,
    ) -> actix_web::Result<HttpResponse> {
        let url = self.target_url(req.query_string());
        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .map_err(actix_web::error::ErrorBadRequest)?;

        debug!("Forwarding {method} {} to {url}", req.path());

        let body = self.body.clone().unwrap_or(body);

        let res = client
            .request(method, url)
            .headers(self.outgoing_headers(req))
            .body(body)
            .send()
            .await
            .map_err(actix_web::error::ErrorBadGateway)?;

        let status =
            StatusCode::from_u16(res.status().as_u16()).map_err(actix_web::error::ErrorBadGateway)?;

        let mut response = HttpResponse::build(status);
        for (name, value) in res.headers() {
            if is_hop_by_hop(name.as_str()) || *name == reqwest::header::CONTENT_LENGTH {
                continue;
            }
            if let Ok(value) = header::HeaderValue::from_bytes(value.as_bytes()) {
                response.append_header((name.as_str(), value));
            }
        }

        let bytes = res.bytes().await.map_err(actix_web::error::ErrorBadGateway)?;

        Ok(response.body(bytes))
    }
}
