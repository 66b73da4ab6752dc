use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve artifact paths into managed storage, proxying from the
    /// configured remotes as needed
    Resolve {
        #[arg(short, long, env = "QUARRY_CONFIG")]
        config: Utf8PathBuf,
        #[arg(long, help = "Managed repository id")]
        repo: String,
        /// Relative artifact paths to resolve
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long, help = "Force a remote check even when the local copy is fresh")]
        force: bool,
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Remove artifacts (and their checksum companions) from managed storage
    Remove {
        #[arg(short, long, env = "QUARRY_CONFIG")]
        config: Utf8PathBuf,
        #[arg(long, help = "Managed repository id")]
        repo: String,
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Validate a configuration file
    #[command(name = "check-config")]
    CheckConfig {
        #[arg(short, long, env = "QUARRY_CONFIG")]
        config: Utf8PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Resolve {
            config,
            repo,
            paths,
            force,
            user,
        } => commands::cmd_resolve(config, repo, paths, force, user).await,
        Commands::Remove {
            config,
            repo,
            paths,
            user,
        } => commands::cmd_remove(config, repo, paths, user).await,
        Commands::CheckConfig { config } => commands::cmd_check_config(config),
    }
}
