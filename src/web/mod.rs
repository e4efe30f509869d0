use actix_web::{
    web::{self, Bytes, Data},
    App, HttpRequest, HttpServer,
};
use tracing_actix_web::TracingLogger;

use tracing::info;

use crate::hooks::Providers;
use crate::proxy::SameHostProxy;
use crate::trigger_api::TriggerClient;

mod hook;
mod middleware;
mod ping;
mod span_builder;

/// Mount every route under the configured base url.
fn routes<'a>(
    base_url: &'a str,
    signature: middleware::VerifySignatureFactory,
    proxies: &'a [(String, SameHostProxy)],
) -> impl FnOnce(&mut web::ServiceConfig) + 'a {
    move |svc| {
        let mut scope = web::scope(base_url)
            .service(ping::index)
            .service(ping::ping)
            .service(
                web::scope("/h")
                    .wrap(signature)
                    .service(hook::hook_for_service)
                    .service(hook::hook_autodetect),
            );

        for (path, proxy) in proxies {
            let proxy = proxy.clone();
            scope = scope.route(
                path,
                web::route().to(
                    move |req: HttpRequest, body: Bytes, client: Data<reqwest::Client>| {
                        let proxy = proxy.clone();
                        async move { proxy.forward(&client, &req, body).await }
                    },
                ),
            );
        }

        svc.service(scope);
    }
}

pub async fn start_server(
    cfg: crate::config::Config,
    providers: Providers,
    trigger_client: TriggerClient,
) -> anyhow::Result<()> {
    let providers = Data::new(providers);
    let trigger_client = Data::new(trigger_client);
    let proxy_client = Data::new(reqwest::Client::new());
    let max_body_size = cfg.web.max_body_size;

    // "/" would otherwise double every route's leading slash
    let base_url = cfg.web.base_url.trim_end_matches('/').to_string();

    let signature =
        middleware::VerifySignatureFactory::new(cfg.github.verify_signature, &cfg.github.secret)?;

    let proxies: Vec<(String, SameHostProxy)> = cfg
        .proxy
        .iter()
        .map(|route| {
            info!("Forwarding {} to {}", route.path, route.target);
            (route.path.clone(), SameHostProxy::from_route(route))
        })
        .collect();

    let mut server = HttpServer::new(move || {
        let tracing_logger = TracingLogger::<span_builder::SpanBuilder>::new();
        App::new()
            .app_data(providers.clone())
            .app_data(trigger_client.clone())
            .app_data(proxy_client.clone())
            .app_data(web::PayloadConfig::new(max_body_size))
            .wrap(tracing_logger)
            .wrap(actix_web::middleware::Logger::default())
            .configure(routes(&base_url, signature.clone(), &proxies))
    });

    for bind in &cfg.web.bind {
        info!("Listening on {bind}");
        server = server.bind(bind)?
    }

    server.run().await?;

    Ok(())
}
