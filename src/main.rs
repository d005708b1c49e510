use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = netpay::api::Cli::parse();
    if let Err(e) = netpay::api::run(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
