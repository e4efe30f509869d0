use actix_web::{
    post,
    web::{self, Bytes, Data},
    HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};

use tracing::{info, warn};

use crate::hooks::{HookCheckResult, HookProvider, Providers, TransformResult};
use crate::trigger_api::{TriggerApiResponse, TriggerClient};

// Commit message markers that opt a commit out of CI
const SKIP_CI_MARKERS: [&str; 2] = ["[skip ci]", "[ci skip]"];

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_response: Option<TriggerApiResponse>,
}

impl HookResponse {
    fn skipped(reason: impl std::fmt::Display) -> Self {
        Self {
            message: Some(format!("Acknowledged, but skipping. Reason: {reason}")),
            ..Default::default()
        }
    }

    fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServiceHookPath {
    service_id: String,
    app_slug: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
pub struct HookPath {
    app_slug: String,
    api_token: String,
}

fn is_skip_ci(commit_message: &str) -> bool {
    let commit_message = commit_message.to_lowercase();
    SKIP_CI_MARKERS
        .iter()
        .any(|marker| commit_message.contains(marker))
}

#[tracing::instrument(skip_all, fields(service_id = %path.service_id, app_slug = %path.app_slug))]
#[post("/{service_id}/{app_slug}/{api_token}")]
pub async fn hook_for_service(
    req: HttpRequest,
    bytes: Bytes,
    path: web::Path<ServiceHookPath>,
    providers: Data<Providers>,
    trigger_client: Data<TriggerClient>,
) -> HttpResponse {
    let Some(provider) = providers.get(&path.service_id) else {
        warn!("No provider for service");
        return HttpResponse::NotFound().json(HookResponse::error(format!(
            "Unsupported service: {}",
            path.service_id
        )));
    };

    let check = provider.hook_check(req.headers());

    handle_hook(
        &path.service_id,
        provider,
        check,
        &req,
        &bytes,
        &path.app_slug,
        &path.api_token,
        &trigger_client,
    )
    .await
}

#[tracing::instrument(skip_all, fields(app_slug = %path.app_slug))]
#[post("/{app_slug}/{api_token}")]
pub async fn hook_autodetect(
    req: HttpRequest,
    bytes: Bytes,
    path: web::Path<HookPath>,
    providers: Data<Providers>,
    trigger_client: Data<TriggerClient>,
) -> HttpResponse {
    let Some((service_id, provider, check)) = providers.detect(req.headers()) else {
        warn!("No provider recognized the request");
        return HttpResponse::BadRequest().json(HookResponse::error("Unsupported webhook"));
    };

    info!("Detected {service_id} webhook");

    handle_hook(
        service_id,
        provider,
        check,
        &req,
        &bytes,
        &path.app_slug,
        &path.api_token,
        &trigger_client,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn handle_hook(
    service_id: &str,
    provider: &dyn HookProvider,
    check: HookCheckResult,
    req: &HttpRequest,
    bytes: &Bytes,
    app_slug: &str,
    api_token: &str,
    trigger_client: &TriggerClient,
) -> HttpResponse {
    if !check.is_supported_by_provider {
        warn!("Request is not a {service_id} webhook");
        return HttpResponse::BadRequest().json(HookResponse::error("Unsupported webhook"));
    }

    if let Some(reason) = check.cant_transform_reason {
        info!("Skipping: {reason}");
        return HttpResponse::Ok().json(HookResponse::skipped(reason));
    }

    let params = match provider.transform(req.headers(), Some(bytes.as_ref())) {
        TransformResult::Trigger(params) => params,
        TransformResult::Skip(reason) => {
            info!("Skipping: {reason}");
            return HttpResponse::Ok().json(HookResponse::skipped(reason));
        }
        TransformResult::Failed(err) => {
            warn!("Failed to transform webhook: {err}");
            return HttpResponse::BadRequest().json(HookResponse::error(err.to_string()));
        }
    };

    if is_skip_ci(&params.commit_message) {
        info!("Commit message asks to skip CI");
        return HttpResponse::Ok().json(HookResponse::skipped(
            "Commit message contains a skip ci marker",
        ));
    }

    match trigger_client
        .trigger_build(service_id, app_slug, api_token, &params)
        .await
    {
        Ok(res) => HttpResponse::Ok().json(HookResponse {
            trigger_response: Some(res),
            ..Default::default()
        }),
        Err(e) => {
            warn!("Error triggering build: {e:?}");
            HttpResponse::BadGateway().json(HookResponse::error(format!("{e:#}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TriggerApiConfig, DEFAULT_MAX_BODY_SIZE};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PUSH_BODY: &str = r#"{
  "ref": "refs/heads/master",
  "deleted": false,
  "head_commit": {
    "distinct": true,
    "id": "83b86e5f286f546dc5a4a58db66ceef44460c85e",
    "message": "re-structuring Hook Providers, with added tests"
  }
}"#;

    fn trigger_client(base_url: &str) -> TriggerClient {
        TriggerClient::build(&TriggerApiConfig {
            base_url: Url::parse(base_url).unwrap(),
            send_request_to: None,
            timeout_secs: 5,
        })
        .unwrap()
    }

    macro_rules! init_app {
        ($base_url:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new(Providers::builtin()))
                    .app_data(Data::new(trigger_client($base_url)))
                    .app_data(web::PayloadConfig::new(DEFAULT_MAX_BODY_SIZE))
                    .service(
                        web::scope("/h")
                            .service(hook_for_service)
                            .service(hook_autodetect),
                    ),
            )
            .await
        };
    }

    async fn mock_trigger_api() -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/app/my-app/build/start.json"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "status": "ok",
                "build_number": 42
            })))
            .mount(&server)
            .await;

        server
    }

    fn github_request(uri: &str, event: &str, body: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header(("X-GitHub-Event", event.to_string()))
            .insert_header(("Content-Type", "application/json"))
            .set_payload(body.to_string())
    }

    #[actix_web::test]
    async fn skip_ci_markers() {
        assert!(is_skip_ci("Fix typo [skip ci]"));
        assert!(is_skip_ci("[CI SKIP] docs"));
        assert!(!is_skip_ci("Fix CI skipping"));
    }

    #[actix_web::test]
    async fn push_triggers_build() {
        let server = mock_trigger_api().await;
        let app = init_app!(&server.uri());

        let req = github_request("/h/github/my-app/token", "push", PUSH_BODY).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: HookResponse = test::read_body_json(res).await;
        assert_eq!(body.trigger_response.unwrap().build_number, 42);
    }

    #[actix_web::test]
    async fn large_push_triggers_build() {
        let server = mock_trigger_api().await;
        let app = init_app!(&server.uri());

        // Well past actix's 256 KiB default payload limit
        let commits: Vec<_> = (0..3000)
            .map(|i| json!({"id": format!("{i:040}"), "message": "x".repeat(100)}))
            .collect();
        let mut push: serde_json::Value = serde_json::from_str(PUSH_BODY).unwrap();
        push["commits"] = json!(commits);
        let push = push.to_string();
        assert!(push.len() > 256 * 1024);

        let req = github_request("/h/github/my-app/token", "push", &push).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: HookResponse = test::read_body_json(res).await;
        assert_eq!(body.trigger_response.unwrap().build_number, 42);
    }

    #[actix_web::test]
    async fn autodetected_push_triggers_build() {
        let server = mock_trigger_api().await;
        let app = init_app!(&server.uri());

        let req = github_request("/h/my-app/token", "push", PUSH_BODY).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: HookResponse = test::read_body_json(res).await;
        assert_eq!(body.trigger_response.unwrap().status, "ok");
    }

    #[actix_web::test]
    async fn unsupported_event_is_acknowledged() {
        let server = MockServer::start().await;
        let app = init_app!(&server.uri());

        let req = github_request("/h/github/my-app/token", "ping", "{}").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: HookResponse = test::read_body_json(res).await;
        assert_eq!(
            body.message.as_deref(),
            Some("Acknowledged, but skipping. Reason: Unsupported GitHub hook event type: ping")
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn business_rule_skip_is_acknowledged() {
        let server = MockServer::start().await;
        let app = init_app!(&server.uri());

        let body = PUSH_BODY.replace("refs/heads/master", "refs/tags/v1.0");
        let req = github_request("/h/github/my-app/token", "push", &body).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: HookResponse = test::read_body_json(res).await;
        assert_eq!(
            body.message.as_deref(),
            Some("Acknowledged, but skipping. Reason: Ref (refs/tags/v1.0) is not a head ref")
        );
    }

    #[actix_web::test]
    async fn skip_ci_commit_is_acknowledged() {
        let server = MockServer::start().await;
        let app = init_app!(&server.uri());

        let body = PUSH_BODY.replace("with added tests", "with added tests [skip ci]");
        let req = github_request("/h/github/my-app/token", "push", &body).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn empty_body_is_bad_request() {
        let server = MockServer::start().await;
        let app = init_app!(&server.uri());

        let req = github_request("/h/github/my-app/token", "push", "").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let body: HookResponse = test::read_body_json(res).await;
        assert_eq!(
            body.error.as_deref(),
            Some("Failed to read content of request body: no or empty request body")
        );
    }

    #[actix_web::test]
    async fn unknown_service_is_not_found() {
        let server = MockServer::start().await;
        let app = init_app!(&server.uri());

        let req = github_request("/h/gitlab/my-app/token", "push", PUSH_BODY).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn non_github_request_is_rejected() {
        let server = MockServer::start().await;
        let app = init_app!(&server.uri());

        let req = test::TestRequest::post()
            .uri("/h/github/my-app/token")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(PUSH_BODY)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/h/my-app/token")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(PUSH_BODY)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn trigger_api_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "status": "error",
                "message": "internal error"
            })))
            .mount(&server)
            .await;
        let app = init_app!(&server.uri());

        let req = github_request("/h/github/my-app/token", "push", PUSH_BODY).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let body: HookResponse = test::read_body_json(res).await;
        assert!(body.error.unwrap().contains("internal error"));
    }
}
