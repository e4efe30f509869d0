use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
};
use tracing::Span;
use tracing_actix_web::{DefaultRootSpanBuilder, RootSpanBuilder};

pub struct SpanBuilder;

impl RootSpanBuilder for SpanBuilder {
    fn on_request_start(request: &ServiceRequest) -> Span {
        let peer_addr = request
            .connection_info()
            .peer_addr()
            .unwrap_or("unknown")
            .to_string();

        // Which provider event (if any) this request carries
        let github_event = request
            .headers()
            .get("x-github-event")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.path(),
            peer_addr,
            github_event,
            http.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            exception.message = tracing::field::Empty,
            exception.details = tracing::field::Empty,
        )
    }

    fn on_request_end<B: MessageBody>(
        span: Span,
        outcome: &Result<ServiceResponse<B>, actix_web::Error>,
    ) {
        // Capture the standard fields when the request finishes.
        DefaultRootSpanBuilder::on_request_end(span, outcome);
    }
}
