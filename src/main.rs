use tinkerbell_provider::{init_logging, serve, TinkerbellProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting Tinkerbell provider");
    serve(TinkerbellProvider::new()).await
}
