mod commands;
mod docker;

use clap::{Parser, Subcommand};
use colored::Colorize;
use mlirci_build::BuildError;
use mlirci_config::{Endpoints, Settings};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mlirci")]
#[command(about = "onnx-mlir の CI イメージを準備・ビルド・公開・掃除する", long_about = None)]
struct Cli {
    /// エンドポイント設定ファイル (YAML)。未指定なら MLIRCI_CONFIG、カレントディレクトリの順に探す
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Docker デーモンのソケット (unix:///var/run/docker.sock, tcp://host:2375)
    #[arg(long, global = true, env = "DOCKER_DAEMON_SOCKET")]
    docker_socket: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// llvm-project ツールチェーンイメージを用意（再利用・pull・ビルド）
    Llvm,
    /// onnx-mlir の dev / usr イメージをビルド
    Build,
    /// レジストリより新しいイメージを公開
    Publish,
    /// ビルド前に PR のイメージとワークスペースを掃除
    Prepare,
    /// ビルド後に PR のイメージとコンテナを掃除
    Cleanup,
    /// 同じ PR の古い実行中ビルドを停止
    #[command(name = "stop-previous")]
    StopPrevious,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr、進捗表示は stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "✗ エラー:".red().bold(), user_message(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Versionコマンドは設定不要
    if matches!(cli.command, Commands::Version) {
        println!("mlirci {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let endpoints = match &cli.config {
        Some(path) => Endpoints::load(path)?,
        None => Endpoints::discover()?,
    };

    let mut settings = Settings::from_env(endpoints)?;
    if cli.docker_socket.is_some() {
        settings.docker_socket = cli.docker_socket;
    }

    let source_root = std::env::current_dir()?;

    match cli.command {
        Commands::Llvm => commands::llvm::handle(&settings, &source_root).await,
        Commands::Build => commands::build::handle(&settings, &source_root).await,
        Commands::Publish => commands::publish::handle(&settings).await,
        Commands::Prepare => commands::prepare::handle(&settings).await,
        Commands::Cleanup => commands::cleanup::handle(&settings).await,
        Commands::StopPrevious => commands::stop::handle(&settings).await,
        Commands::Version => Ok(()),
    }
}

fn user_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<BuildError>() {
        Some(build_error) => build_error.user_message(),
        None => format!("{:#}", error),
    }
}
