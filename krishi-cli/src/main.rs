//! krishi: command-line client for the KrishiMitra backend
//!
//! Runs the same upload → extract → analyze workflows as the web screens,
//! one command per screen visit.
//!
//! # Subcommands
//! - `login` / `register`: credential check and account creation
//! - `crop-advise <image>`: soil report + weather → crop recommendation
//! - `interpret <image>`: document summary in the chosen language
//! - `subsidy <image> [--save]`: subsidy form fields, optionally saving the deadline
//! - `deadlines list|delete|upcoming`: saved subsidy deadlines
//! - `dashboard`: everything stored for the user

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use krishi_core::models::{
    AnalysisResult, DashboardSummary, DeadlineRecord, Language, Session, UploadedImage,
};
use krishi_core::{HttpBackend, KrishiBackend, KrishiConfig, KrishiError};
use krishi_workflow::subsystems::auth;
use krishi_workflow::{
    Confirm, DeadlineTracker, DeleteOutcome, FixedLocation, UpcomingDeadline, WorkflowController,
    WorkflowKind, WorkflowView,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "krishi", version, about = "KrishiMitra farming assistant client")]
struct Cli {
    #[arg(short, long, default_value = "krishi.toml", global = true)]
    config: String,

    /// Backend URL (overrides `backend.base_url` from the config file)
    #[arg(long, env = "KRISHI_SERVER", global = true)]
    server: Option<String>,

    /// Print the final workflow state as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check credentials against the backend
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "KRISHI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        confirm: String,
        #[arg(short, long, default_value = "english")]
        language: Language,
    },

    /// Get a crop recommendation from a soil report photo
    CropAdvise {
        image: String,
        #[arg(short, long, env = "KRISHI_USER")]
        user: String,
        /// Place name for the weather lookup; device coordinates from the config are used otherwise
        #[arg(long)]
        place: Option<String>,
        #[arg(short, long)]
        language: Option<Language>,
    },

    /// Extract and summarize a document photo
    Interpret {
        image: String,
        #[arg(short, long, env = "KRISHI_USER")]
        user: String,
        #[arg(short, long)]
        language: Option<Language>,
    },

    /// Analyze a subsidy form photo
    Subsidy {
        image: String,
        #[arg(short, long, env = "KRISHI_USER")]
        user: String,
        /// Save the deadline after analysis
        #[arg(long)]
        save: bool,
        /// Deadline to save; defaults to the one found on the form
        #[arg(long, requires = "save")]
        deadline: Option<String>,
    },

    /// Manage saved subsidy deadlines
    Deadlines {
        #[arg(short, long, env = "KRISHI_USER")]
        user: String,
        #[command(subcommand)]
        action: DeadlineAction,
    },

    /// Show stored documents, recommendations and deadlines
    Dashboard {
        #[arg(short, long, env = "KRISHI_USER")]
        user: String,
    },
}

#[derive(Debug, Subcommand)]
enum DeadlineAction {
    List,
    /// Delete a deadline by id
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Deadlines due today or later, soonest first
    Upcoming {
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

// ============================================================================
// Prompts
// ============================================================================

/// Blocking yes/no prompt on stdin.
struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{} [y/N] ", prompt);
            let _ = stdout.flush();
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ============================================================================
// Rendering
// ============================================================================

fn render_view(view: &WorkflowView) -> String {
    let mut out = format!("Stage: {}\n", view.stage);

    if let Some(weather) = &view.weather {
        out.push_str(&format!("Weather ({}):\n", weather.location_label));
        out.push_str(&format!("  Temperature: {}\n", reading(weather.temperature, "°C")));
        out.push_str(&format!("  Humidity:    {}\n", reading(weather.humidity, "%")));
        out.push_str(&format!("  Wind:        {}\n", reading(weather.wind_speed, " m/s")));
        out.push_str(&format!(
            "  Condition:   {}\n",
            weather.condition.as_deref().unwrap_or("unknown")
        ));
        out.push_str(&format!(
            "  Rain (1h):   {}\n",
            reading(weather.recent_precipitation, " mm")
        ));
    }
    if let Some(e) = &view.enrichment_error {
        out.push_str(&format!("Weather error: {}\n", e));
    }

    if let Some(text) = &view.extracted_text {
        out.push_str("Extracted text:\n");
        for line in text.lines() {
            out.push_str(&format!("  {}\n", line));
        }
    }

    match &view.result {
        Some(AnalysisResult::Recommendation(r)) => {
            out.push_str(&format!("Recommendation:\n{}\n", r));
        }
        Some(AnalysisResult::Summary(s)) => {
            out.push_str(&format!("Summary:\n{}\n", s));
        }
        Some(AnalysisResult::Subsidy(d)) => {
            out.push_str(&format!(
                "Subsidy:     {}\n",
                d.subsidy_name.as_deref().unwrap_or("unknown")
            ));
            out.push_str(&format!("Eligibility: {}\n", d.eligibility_summary));
            if !d.required_documents.is_empty() {
                out.push_str("Documents:\n");
                for doc in &d.required_documents {
                    out.push_str(&format!("  - {}\n", doc));
                }
            }
            if let Some(deadline) = d.deadline {
                out.push_str(&format!("Deadline:    {}\n", deadline));
            }
        }
        None => {}
    }

    if let Some(notice) = &view.notice {
        out.push_str(&format!("Note: {}\n", notice));
    } else if let Some(reason) = &view.blocked_reason {
        if view.error.is_none() && view.result.is_none() {
            out.push_str(&format!("Next: {}\n", reason));
        }
    }
    if let Some(e) = &view.error {
        out.push_str(&format!("Error: {}\n", e));
    }
    out
}

fn reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v, unit),
        None => "unknown".to_string(),
    }
}

fn render_deadlines(list: &[DeadlineRecord]) -> String {
    if list.is_empty() {
        return "No deadlines saved yet.\n".to_string();
    }
    list.iter()
        .map(|d| format!("{}  {}  {}\n", d.deadline, d.subsidy_name, d.id))
        .collect()
}

fn render_upcoming(list: &[UpcomingDeadline]) -> String {
    if list.is_empty() {
        return "No upcoming deadlines.\n".to_string();
    }
    list.iter()
        .map(|u| {
            let when = match u.days_remaining {
                0 => "today".to_string(),
                1 => "tomorrow".to_string(),
                n => format!("in {} days", n),
            };
            format!("{}  {} ({})\n", u.record.deadline, u.record.subsidy_name, when)
        })
        .collect()
}

fn render_dashboard(summary: &DashboardSummary) -> String {
    let mut out = format!("Dashboard for {}\n", summary.username);

    out.push_str(&format!("\nDocuments ({}):\n", summary.documents.len()));
    for doc in &summary.documents {
        let name = doc.filename.as_deref().unwrap_or(doc.id.as_str());
        let preview: String = doc
            .summary
            .as_deref()
            .unwrap_or(doc.extracted_text.as_str())
            .chars()
            .take(80)
            .collect();
        out.push_str(&format!("  {}: {}\n", name, preview));
    }

    out.push_str(&format!("\nRecommendations ({}):\n", summary.recommendations.len()));
    for rec in &summary.recommendations {
        let preview: String = rec
            .recommendation
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(80)
            .collect();
        out.push_str(&format!("  {}\n", preview));
    }

    out.push_str(&format!("\nDeadlines ({}):\n", summary.deadlines.len()));
    out.push_str(&render_deadlines(&summary.deadlines));
    out
}

fn print_view(view: &WorkflowView, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        print!("{}", render_view(view));
    }
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

async fn load_image(path: &str) -> Result<UploadedImage, KrishiError> {
    let path = shellexpand::tilde(path).into_owned();
    UploadedImage::open(path).await
}

fn session(user: &str) -> anyhow::Result<Session> {
    Ok(Session::new(user)?)
}

/// Run one workflow over `image`. Errors are already captured in the view,
/// so only the final exit status depends on them.
async fn run_workflow(
    flow: &WorkflowController,
    image: &str,
    place: Option<&str>,
    json: bool,
) -> anyhow::Result<bool> {
    flow.select_image(load_image(image).await?).await;

    let ok = if flow.kind().uses_enrichment() {
        let weather = async {
            match place {
                Some(p) => flow.locate_by_name(p).await,
                None => flow.locate_by_device().await,
            }
        };
        let (extracted, weather) = tokio::join!(flow.extract(), weather);
        extracted.is_ok() && weather.is_ok() && flow.analyze().await.is_ok()
    } else {
        flow.interpret().await.is_ok()
    };

    print_view(&flow.view().await, json)?;
    Ok(ok)
}

async fn run(cli: Cli, config: KrishiConfig) -> anyhow::Result<bool> {
    let backend: Arc<dyn KrishiBackend> =
        Arc::new(HttpBackend::new(&config.backend).context("Invalid backend configuration")?);
    let settings = config.workflow.clone();

    match cli.command {
        Commands::Login { username, password } => {
            let session = auth::login(backend.as_ref(), &username, &password).await?;
            println!("Login successful. Welcome, {}!", session.username());
            Ok(true)
        }

        Commands::Register {
            username,
            password,
            confirm,
            language,
        } => {
            auth::register(backend.as_ref(), &username, &password, &confirm, language).await?;
            println!("Registration successful. You can now log in as {}.", username.trim());
            Ok(true)
        }

        Commands::CropAdvise {
            image,
            user,
            place,
            language,
        } => {
            let locator = Arc::new(FixedLocation::from_config(&config.device));
            let flow = WorkflowController::new(
                WorkflowKind::CropAdvisory,
                session(&user)?,
                backend,
                settings,
            )
            .with_locator(locator);
            if let Some(language) = language {
                flow.set_language(language).await;
            }
            run_workflow(&flow, &image, place.as_deref(), cli.json).await
        }

        Commands::Interpret {
            image,
            user,
            language,
        } => {
            let flow = WorkflowController::new(
                WorkflowKind::DocumentSummary,
                session(&user)?,
                backend,
                settings,
            );
            if let Some(language) = language {
                flow.set_language(language).await;
            }
            run_workflow(&flow, &image, None, cli.json).await
        }

        Commands::Subsidy {
            image,
            user,
            save,
            deadline,
        } => {
            let session = session(&user)?;
            let fallback = settings.fallback_subsidy_name.clone();
            let flow = WorkflowController::new(
                WorkflowKind::Subsidy,
                session.clone(),
                backend.clone(),
                settings,
            );
            let ok = run_workflow(&flow, &image, None, cli.json).await?;
            if !ok || !save {
                return Ok(ok);
            }

            let details = flow.subsidy_details().await;
            let date_input = deadline
                .or_else(|| details.as_ref().and_then(|d| d.deadline).map(|d| d.to_string()))
                .unwrap_or_default();

            let mut tracker = DeadlineTracker::new(backend, session, fallback);
            let saved = tracker.save(details.as_ref(), &date_input).await?;
            println!("Saved deadline {} for {}", saved.deadline, saved.subsidy_name);
            print!("{}", render_deadlines(tracker.deadlines()));
            Ok(true)
        }

        Commands::Deadlines { user, action } => {
            let fallback = settings.fallback_subsidy_name.clone();
            let mut tracker = DeadlineTracker::new(backend, session(&user)?, fallback);
            tracker.activate().await?;

            match action {
                DeadlineAction::List => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(tracker.deadlines())?);
                    } else {
                        print!("{}", render_deadlines(tracker.deadlines()));
                    }
                }
                DeadlineAction::Delete { id, yes } => {
                    let outcome = if yes {
                        tracker
                            .delete(&id, &krishi_workflow::AutoConfirm(true))
                            .await?
                    } else {
                        tracker.delete(&id, &StdinConfirm).await?
                    };
                    match outcome {
                        DeleteOutcome::Deleted => println!("Deadline deleted."),
                        DeleteOutcome::Declined => println!("Kept."),
                    }
                    print!("{}", render_deadlines(tracker.deadlines()));
                }
                DeadlineAction::Upcoming { today } => {
                    let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
                    let upcoming = tracker.upcoming(today);
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&upcoming)?);
                    } else {
                        print!("{}", render_upcoming(&upcoming));
                    }
                }
            }
            Ok(true)
        }

        Commands::Dashboard { user } => {
            let session = session(&user)?;
            let summary = backend
                .dashboard(session.username())
                .await
                .map_err(KrishiError::from)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", render_dashboard(&summary));
            }
            Ok(true)
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config_path = shellexpand::tilde(&cli.config).into_owned();
    let mut config = match KrishiConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path, e);
            std::process::exit(1);
        }
    };
    if let Some(server) = &cli.server {
        config.backend.base_url = server.trim_end_matches('/').to_string();
    }

    // Logs go to stderr so command output stays pipeable. RUST_LOG wins over the config.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    tracing::debug!(backend = %config.backend.base_url, "Configuration loaded");

    match run(cli, config).await {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            match e.downcast_ref::<KrishiError>() {
                Some(k) => eprintln!("krishi: {}", k.user_message()),
                None => eprintln!("krishi: {:#}", e),
            }
            std::process::exit(1);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
