//! wordchain-back binary entrypoint wiring the room engine, phrase store and HTTP transport.

use std::{env, net::SocketAddr, path::Path, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "gist-store")]
use wordchain_back::dao::phrase_store::gist::{GistConfig, GistPhraseStore};
use wordchain_back::{
    config::GameConfig,
    dao::{
        lookup::HttpLookup,
        phrase_store::{
            PhraseStore,
            file::{DEFAULT_PHRASE_STORE_PATH, FilePhraseStore, PHRASE_STORE_PATH_ENV},
        },
        seed::{self, DEFAULT_DICT_PATH, DICT_PATH_ENV},
        storage::StorageError,
    },
    routes,
    services::{persistence, storage_supervisor},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GameConfig::load();
    let dict_path = env::var(DICT_PATH_ENV).unwrap_or_else(|_| DEFAULT_DICT_PATH.into());
    let seed = seed::load_dictionary(Path::new(&dict_path));
    let lookup =
        HttpLookup::from_env(config.lookup_timeout).context("building remote lookup client")?;

    let (app_state, persist_queue) = AppState::new(config, Arc::new(lookup), seed);
    info!(
        phrases = app_state.dictionary().len(),
        "dictionary ready"
    );

    tokio::spawn(persistence::run(app_state.clone(), persist_queue));
    spawn_store_supervisor(app_state.clone());
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervise the gist store when `GIST_ID` is set, the local phrase file otherwise.
fn spawn_store_supervisor(state: SharedState) {
    #[cfg(feature = "gist-store")]
    {
        if let Ok(config) = GistConfig::from_env() {
            info!(gist_id = %config.gist_id, file = %config.file_name, "using gist phrase store");
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = GistPhraseStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn PhraseStore>)
                }
            }));
            return;
        }
    }

    let path = env::var(PHRASE_STORE_PATH_ENV).unwrap_or_else(|_| DEFAULT_PHRASE_STORE_PATH.into());
    info!(%path, "using file phrase store");
    let store = FilePhraseStore::new(path);
    tokio::spawn(storage_supervisor::run(state, move || {
        let store = store.clone();
        async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn PhraseStore>) }
    }));
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
