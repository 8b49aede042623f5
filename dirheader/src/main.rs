use clap::Parser;
use dirheader::config::{display_addr, Config};
use dirheader::server::{RunError, Server};
use dirheader::BoxError;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_logging();

    if let Err(e) = run(config).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), BoxError> {
    let listener = TcpListener::bind(&config.bind).await?;
    println!(
        "Serving HTTP http://{} -> {}",
        display_addr(listener.local_addr()?),
        config.root.display()
    );

    let timeout = config.shutdown_timeout();
    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        Some(timeout)
    };

    match Server::new(listener)
        .run_with_graceful_shutdown(config.serve_dir(), shutdown)
        .await
    {
        Ok(()) => Ok(()),
        // 监听器出错时，仍然等待已经建立的连接处理完成。
        Err(RunError::Listener(e, graceful)) => {
            graceful.shutdown(Some(timeout)).await;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "{}=info,dirheader_core=info",
                env!("CARGO_CRATE_NAME")
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
