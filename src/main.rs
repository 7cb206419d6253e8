use localflags::config::Config;
use localflags::state::AppState;
use localflags::{routes, LocalFlags, MemoryFlagStore, PgFlagStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("localflags=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let flags = match &config.database_url {
        Some(url) => {
            let store = PgFlagStore::connect(url).await?;
            store.migrate().await?;
            info!("using postgres flag store");
            LocalFlags::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, flags are kept in memory and lost on restart");
            LocalFlags::new(MemoryFlagStore::new())
        }
    };

    let state = AppState { flags };

    let app = routes::routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    info!("server listening on http://{}", config.addr());

    axum::serve(listener, app).await?;

    Ok(())
}
