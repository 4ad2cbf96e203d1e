//! `vision-flow` command-line client.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use vision_flow_app::{
    AnalyzeController, AnalyzeOutcome, AppError, ClientConfig, ConfigOverrides, Dashboard,
    AssumeYes, HttpBackend, PromptConfirmer, app_version, redact_sensitive,
};
use vision_flow_core::{AnalysisResult, Identity};
use vision_flow_history::{Confirmer, RemoveOutcome};
use vision_flow_session::{SessionContext, SessionError, restore_identity};
use vision_flow_ui::{DashboardView, NoticeLevel};

#[derive(Parser, Debug)]
#[command(name = "vision-flow", version, about = "Object detection client")]
struct Cli {
    /// Identity email used to scope history and uploads.
    #[arg(long, env = "VISION_FLOW_EMAIL", conflicts_with = "identity_file")]
    email: Option<String>,

    /// Display name paired with --email.
    #[arg(long, default_value = "User")]
    name: String,

    /// Stored login record (`{"first_name": ..., "email": ...}`).
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Backend origin; overrides VISION_FLOW_API_BASE.
    #[arg(long)]
    api_base: Option<String>,

    /// Static asset prefix; overrides VISION_FLOW_STATIC_PREFIX.
    #[arg(long)]
    static_prefix: Option<String>,

    /// Request timeout in seconds; overrides VISION_FLOW_TIMEOUT_SECS.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List past detections for the identity
    History,

    /// Upload an image and print the detection
    Analyze {
        /// Image file to analyze.
        file: PathBuf,
    },

    /// Show one past detection
    View {
        /// History entry id.
        id: i64,
    },

    /// Delete one past detection
    Delete {
        /// History entry id.
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            let message = redact_sensitive(&error.to_string());
            log::error!(
                "stage=cli action=failed kind={:?} error={message}",
                error.kind()
            );
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let config = ClientConfig::from_env()?.with_overrides(ConfigOverrides {
        api_base: cli.api_base.clone(),
        static_prefix: cli.static_prefix.clone(),
        timeout_secs: cli.timeout_secs,
    })?;
    log::info!(
        "stage=cli action=start version={} api_base={}",
        app_version(),
        config.api_base
    );

    let identity = resolve_identity(&cli)?;
    let backend = Arc::new(HttpBackend::new(&config)?);
    let controller = AnalyzeController::new(config.locator()?);
    let mut dashboard = Dashboard::with_backend(SessionContext::new(), controller, backend);

    let outcome = execute(&mut dashboard, identity, cli.command);
    for notice in dashboard.take_notices() {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warn",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
    outcome
}

fn execute(
    dashboard: &mut Dashboard,
    identity: Identity,
    command: Command,
) -> Result<ExitCode, AppError> {
    match command {
        Command::History => {
            dashboard.sign_in(identity)?;
            print_history(&dashboard.view());
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze { file } => {
            if let Err(error) = dashboard.sign_in(identity) {
                log::warn!("stage=cli action=initial_history_failed error={error}");
            }
            let content = std::fs::read(&file)?;
            dashboard.select_file(display_file_name(&file), content)?;

            match dashboard.analyze()? {
                AnalyzeOutcome::Succeeded(result) => {
                    print_result(&result);
                    print_history(&dashboard.view());
                    Ok(ExitCode::SUCCESS)
                }
                AnalyzeOutcome::Failed(_) | AnalyzeOutcome::Discarded { .. } => {
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::View { id } => {
            dashboard.sign_in(identity)?;
            let result = dashboard.view_history(id)?;
            print_result(&result);
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { id, yes } => {
            dashboard.sign_in(identity)?;
            let prompt = PromptConfirmer::new();
            let confirmer: &dyn Confirmer = if yes { &AssumeYes } else { &prompt };

            match dashboard.delete_history(id, confirmer)? {
                RemoveOutcome::Removed { .. } => {
                    print_history(&dashboard.view());
                    Ok(ExitCode::SUCCESS)
                }
                RemoveOutcome::Cancelled if prompt.failed() => {
                    eprintln!("error: could not read confirmation; pass --yes to delete");
                    Ok(ExitCode::FAILURE)
                }
                RemoveOutcome::Cancelled => {
                    println!("Delete cancelled.");
                    Ok(ExitCode::SUCCESS)
                }
                RemoveOutcome::Discarded(_) => Ok(ExitCode::FAILURE),
            }
        }
    }
}

fn resolve_identity(cli: &Cli) -> Result<Identity, AppError> {
    let identity = match (&cli.email, &cli.identity_file) {
        (Some(email), _) => Identity::new(cli.name.clone(), email.clone())?,
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(path)?;
            restore_identity(Some(&raw))?
        }
        (None, None) => Identity::anonymous(),
    };

    if identity.is_anonymous() {
        return Err(SessionError::Unauthenticated.into());
    }
    Ok(identity)
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_result(result: &AnalysisResult) {
    match result.id {
        Some(id) => println!("Detected: {} (#{id})", result.detected_label),
        None => println!("Detected: {}", result.detected_label),
    }
    if !result.advice.is_empty() {
        println!("Advice:   {}", result.advice);
    }
    if let Some(original) = &result.original_image_ref {
        println!("Original: {original}");
    }
    if let Some(heatmap) = &result.heatmap_ref {
        println!("Heatmap:  {heatmap}");
    }
}

fn print_history(view: &DashboardView) {
    println!("{} - {}", view.display_name, view.history_status);
    for row in &view.history {
        let marker = if row.selected { '*' } else { ' ' };
        println!("{marker} #{:<6} {}", row.id, row.label);
    }
}
