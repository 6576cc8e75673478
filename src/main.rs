use std::sync::Arc;

use ca_admin_api::authority::TokenAuthority;
use ca_admin_api::config::{AppConfig, StoreSettings};
use ca_admin_api::jwt::TokenConfig;
use ca_admin_api::store::{AdminStore, MemoryAdminStore, SqliteAdminStore};
use ca_admin_api::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn AdminStore> = match &config.store {
        StoreSettings::Sqlite { database_url } => {
            let pool = db::init(database_url).await?;
            Arc::new(SqliteAdminStore::new(pool))
        }
        StoreSettings::Memory { kind, seed } => Arc::new(match seed {
            Some(path) => MemoryAdminStore::from_seed_file(*kind, path)?,
            None => MemoryAdminStore::new(*kind),
        }),
    };

    let tokens = TokenConfig::new(config.token_secret.clone(), config.token_exp_minutes);
    let authority = TokenAuthority::new(tokens, config.admin_api_enabled);
    authority.load_provisioners(store.as_ref()).await?;

    tracing::info!(
        admin_api_enabled = config.admin_api_enabled,
        mode = store.backend_kind().as_str(),
        "admin store ready"
    );

    let app = create_app(AppState::new(Arc::new(authority), store));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
