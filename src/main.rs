use tracing_subscriber::EnvFilter;

use medical_chatbot::api;
use medical_chatbot::config::Config;
use medical_chatbot::state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Values already in the environment take precedence over .env
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Index: {} | chat model: {} | embeddings: {} ({})",
        config.pinecone.index_name,
        config.gemini.model,
        config.embedding.model,
        config.embedding.base_url
    );

    let app_state = match state::bootstrap(&config).await {
        Ok(app_state) => app_state,
        Err(e) => {
            tracing::error!("Fatal setup error: {e:#}");
            std::process::exit(1);
        }
    };

    let app = api::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
