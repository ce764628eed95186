use tracing_subscriber::EnvFilter;

use movie_recommender::{
    api::{create_router, AppState},
    config::Config,
    services::{Recommender, SelectionSettings},
    store::{DatasetSource, RatingStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    // The store is built once; a dataset problem stops startup here.
    let source = DatasetSource::from_config(&config);
    let min_count = config.min_rating_count;
    let policy = config.duplicate_policy;
    let store =
        tokio::task::spawn_blocking(move || RatingStore::load(&source, min_count, policy))
            .await??;

    let settings = SelectionSettings {
        top_k: config.top_k,
        suggestion_threshold: config.suggestion_threshold,
    };
    let state = AppState::new(Recommender::new(store, settings), config.rng_seed);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
