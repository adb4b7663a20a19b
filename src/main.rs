//! promtior-rag 서버 진입점

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use promtior_rag::{pipeline, server, AppConfig, AppState};

#[derive(Parser)]
#[command(name = "promtior-rag")]
#[command(version, about = "Promtior 웹사이트 기반 RAG 챗봇 서버", long_about = None)]
struct Cli {
    /// 바인딩 주소
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// 포트
    #[arg(short, long, default_value_t = 8000)]
    port: u16,
}

fn main() -> Result<()> {
    // 로깅 초기화
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env()?;

    // 인덱스가 준비되기 전에는 연결을 받지 않음
    let chain = match pipeline::initialize(&config).await {
        Ok(chain) => chain,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    let bind_addr = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    server::serve(listener, AppState::new(chain)).await
}
