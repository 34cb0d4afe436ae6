use std::sync::Arc;

use reqwest::Url;

use backoffice_context::{
    BackofficeContextResolver, HttpSessionService, InMemorySessionService, ResolverConfig,
    SessionService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backoffice_observability::init();

    let config = ResolverConfig::from_env()?;

    let sessions: Arc<dyn SessionService> = match std::env::var("SECURITY_CENTER_URL") {
        Ok(url) => Arc::new(HttpSessionService::new(Url::parse(&url)?, config.session_timeout)?),
        Err(_) => {
            tracing::warn!("SECURITY_CENTER_URL not set; using an empty in-memory session service");
            Arc::new(InMemorySessionService::new())
        }
    };

    let resolver = Arc::new(BackofficeContextResolver::new(sessions, config));
    let app = backoffice_api::app::build_app(resolver);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
