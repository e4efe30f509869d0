use hook_trigger::{config, hooks, trigger_api, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let cfg = config::read(&config_path)?;

    let trigger_client = trigger_api::TriggerClient::build(&cfg.trigger_api)?;

    web::start_server(cfg, hooks::Providers::builtin(), trigger_client).await
}
