// BestFTP - FTP/FTPS/SFTP 统一客户端
// 命令行入口

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use bestftp::constants::PASSWORD_ENV;
use bestftp::services::storage;
use bestftp::{ConnectionConfig, Protocol, TransferResult, UnifiedClient};

#[derive(Parser, Debug)]
#[command(name = "bestftp")]
#[command(about = "Unified FTP / FTPS / SFTP client")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    conn: ConnectArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ConnectArgs {
    /// Saved connection profile
    #[arg(short = 'P', long, global = true)]
    profile: Option<String>,

    /// ftp, ftps or sftp
    #[arg(long, global = true)]
    protocol: Option<String>,

    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Falls back to $BESTFTP_PASSWORD
    #[arg(long, global = true)]
    password: Option<String>,

    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Private key file (sftp only)
    #[arg(short = 'i', long, global = true)]
    identity: Option<PathBuf>,

    /// Per-operation timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List a remote directory
    Ls { path: String },
    /// List all files under a remote directory
    Tree { path: String },
    /// Download remote files into a local directory
    Get {
        #[arg(required = true)]
        remote: Vec<String>,
        #[arg(long)]
        to: PathBuf,
    },
    /// Download every file of a remote directory
    Pull {
        folder: String,
        #[arg(long)]
        to: PathBuf,
    },
    /// Upload local files into a remote directory
    Put {
        #[arg(required = true)]
        local: Vec<PathBuf>,
        #[arg(long)]
        to: String,
    },
    /// Print a remote file to stdout
    Cat { path: String },
    /// Delete a remote file
    Rm { path: String },
    /// Create a remote directory (with parents)
    Mkdir { path: String },
    /// Check whether a remote path exists
    Exists { path: String },
    /// List saved connection profiles
    Profiles,
}

impl ConnectArgs {
    /// 合并保存的配置与命令行参数，命令行优先
    fn resolve(&self) -> Result<ConnectionConfig> {
        let mut config = match &self.profile {
            Some(name) => storage::load_profile(name)?,
            None => {
                let (Some(host), Some(user)) = (&self.host, &self.user) else {
                    bail!("--host and --user are required without --profile");
                };
                ConnectionConfig::new(Protocol::default(), host, user, "")
            }
        };

        if let Some(protocol) = &self.protocol {
            config.protocol = protocol.parse()?;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(identity) = &self.identity {
            config.private_key = Some(identity.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_operation_timeout(timeout);
        }

        match &self.password {
            Some(password) => config.password = password.clone(),
            None if config.password.is_empty() => {
                if let Ok(password) = std::env::var(PASSWORD_ENV) {
                    config.password = password;
                }
            }
            None => {}
        }

        Ok(config)
    }
}

/// 打印批量结果，被截断时返回错误
fn report(result: &TransferResult<'_>) -> Result<()> {
    for path in &result.paths {
        println!("{}", path);
    }
    match &result.error_message {
        Some(message) => bail!(
            "stopped after {} item(s): {}",
            result.paths.len(),
            message
        ),
        None => Ok(()),
    }
}

async fn run_command(client: &UnifiedClient, command: Commands) -> Result<()> {
    match command {
        Commands::Ls { path } => {
            for entry in client.list(&path).await? {
                let marker = if entry.is_dir() { "d" } else { "-" };
                println!("{} {:>10} {}", marker, entry.format_size(), entry.name);
            }
        }
        Commands::Tree { path } => report(&client.list_recursive(&path).await)?,
        Commands::Get { remote, to } => report(&client.download_files(remote, &to).await)?,
        Commands::Pull { folder, to } => report(&client.download_files(folder, &to).await)?,
        Commands::Put { local, to } => report(&client.upload_files(&local, &to).await)?,
        Commands::Cat { path } => {
            let mut reader = client.get(&path).await?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut reader, &mut stdout).await?;
            stdout.flush().await?;
        }
        Commands::Rm { path } => client.delete(&path).await?,
        Commands::Mkdir { path } => client.mkdir(&path).await?,
        Commands::Exists { path } => {
            let exists = client.exists(&path).await?;
            println!("{}", exists);
            if !exists {
                bail!("{} does not exist", path);
            }
        }
        Commands::Profiles => list_profiles()?,
    }
    Ok(())
}

fn list_profiles() -> Result<()> {
    let profiles = storage::load_profiles()?;
    if profiles.is_empty() {
        println!("No saved profiles in {}", storage::get_profiles_file()?.display());
    }
    for (name, config) in profiles {
        println!("{:<20} {}", name, config.display_target());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Commands::Profiles) {
        return list_profiles();
    }

    let config = cli.conn.resolve()?;
    let target = config.display_target();
    let client = UnifiedClient::connect(config)
        .await
        .with_context(|| format!("无法连接到 {}", target))?;

    let outcome = run_command(&client, cli.command).await;

    if let Err(e) = client.end().await {
        warn!(
            "Failed to close connection to {}: {}",
            client.config().display_target(),
            e
        );
    }
    outcome
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 初始化日志系统
    // 可以通过 RUST_LOG 环境变量控制日志级别，例如：RUST_LOG=debug bestftp ls /
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false) // 不显示 target（模块路径）
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
