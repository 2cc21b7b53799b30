/// SpecSync keeps code, spec, tests and docs from drifting apart.
/// It runs as a pre-commit hook: the staged files go through the
/// steering rules, every configured checker looks at them under one
/// time budget, and the commit is blocked with a ranked list of fixes
/// when anything disagrees. The staged changes are never touched.
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use specsync::utils;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "specsync")]
#[command(about = "Commit-time governance for code, spec, test and doc alignment")]
struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
    Toml,
}

impl OutputFormat {
    fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Toml => "toml",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration and steering rules
    Init,
    /// Install the pre-commit hook
    InstallHooks,
    /// Remove the pre-commit hook, restoring any previous one
    UninstallHooks,
    /// Validate the staged changes
    Validate {
        /// Output format of the result
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Branch name to report (defaults to the checked-out branch)
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Lint the configuration and the steering rules
    ValidateConfig,
    /// Show the steering rules in effect
    ShowRules,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    utils::init_tracing(cli.json, level);

    match cli.command {
        Commands::Init => utils::initialize_repository()?,
        Commands::InstallHooks => utils::install_hooks()?,
        Commands::UninstallHooks => utils::uninstall_hooks()?,
        Commands::Validate { format, branch } => {
            if !utils::run_validation(format.as_str(), branch).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::ValidateConfig => utils::validate_config()?,
        Commands::ShowRules => utils::show_rules()?,
    }
    Ok(ExitCode::SUCCESS)
}
