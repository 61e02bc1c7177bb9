//! Rulegate server
//!
//! Answers Japanese questions about canoe competition rules with cited
//! excerpts from the official rule text.

mod middleware;
mod routes;
mod server;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rulegate_core::{config::AppConfig, logging};
use rulegate_prompt::{load_prompts, PromptName};
use std::path::PathBuf;

/// Rulegate - cited answers to canoe rule questions
#[derive(Parser, Debug)]
#[command(name = "rulegate")]
#[command(about = "Cited answers to canoe competition rule questions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "RULEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service (default)
    Serve(ServeArgs),

    /// Validate a prompt file and exit
    CheckPrompts {
        /// Prompt file to validate
        path: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Prompt file
    #[arg(long)]
    prompts: Option<PathBuf>,

    /// Generation provider (gemini, ollama)
    #[arg(long)]
    provider: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let args = match cli.command {
        Some(Commands::CheckPrompts { path }) => return check_prompts(&path),
        Some(Commands::Serve(args)) => args,
        None => ServeArgs::default(),
    };

    serve(cli.config, cli.log_level, cli.json_logs, cli.no_color, args).await
}

async fn serve(
    config_file: Option<PathBuf>,
    log_level: Option<String>,
    json_logs: bool,
    no_color: bool,
    args: ServeArgs,
) -> anyhow::Result<()> {
    // --config wins over RULEGATE_CONFIG; the rest comes from the environment
    let config_file = config_file.map(|p| p.to_string_lossy().into_owned());
    let config = AppConfig::load_from(|key| match key {
        "RULEGATE_CONFIG" if config_file.is_some() => config_file.clone(),
        _ => std::env::var(key).ok(),
    })
    .context("loading configuration")?
    .with_overrides(
        args.port,
        args.prompts,
        args.provider,
        log_level,
        json_logs,
        no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)
        .context("initializing logging")?;

    config.validate().context("invalid configuration")?;

    tracing::info!("Rulegate starting");
    tracing::debug!("Config file: {:?}", config.config_file);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Region: {}", config.region);

    let result = server::run(config).await;
    if let Err(e) = &result {
        tracing::error!("Server failed: {:#}", e);
    }
    result
}

fn check_prompts(path: &std::path::Path) -> anyhow::Result<()> {
    let prompts =
        load_prompts(path).with_context(|| format!("invalid prompt file {:?}", path))?;

    for name in PromptName::ALL {
        let chars = prompts.source(name).chars().count();
        println!("{:<22} {} chars", name.as_str(), chars);
    }
    println!("OK: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["rulegate", "--json-logs"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.json_logs);
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "rulegate",
            "serve",
            "--port",
            "9090",
            "--provider",
            "ollama",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Serve(args)) => {
                assert_eq!(args.port, Some(9090));
                assert_eq!(args.provider.as_deref(), Some("ollama"));
                assert!(args.prompts.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_prompts_args() {
        let cli = Cli::try_parse_from(["rulegate", "check-prompts", "prompts/prompts.md"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::CheckPrompts { ref path }) if path == &PathBuf::from("prompts/prompts.md")
        ));
    }

    #[test]
    fn test_check_shipped_prompts() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../prompts/prompts.md");
        check_prompts(&path).unwrap();
    }
}
