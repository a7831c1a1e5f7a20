use tracing_subscriber::{EnvFilter, FmtSubscriber};
use volley_runtime::{runtime::DEFAULT_LOG_FILTER, VolleyRuntime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = VolleyRuntime::with_args().run().await?;
    println!("{output}");
    Ok(())
}
