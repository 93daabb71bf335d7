//! Tasksumma CLI - todo tracking with LLM summaries
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tasksumma::agent::OpenAiSummarizer;
use tasksumma::notify::SlackWebhook;
use tasksumma::pipeline::{Clock, SystemClock};
use tasksumma::server::{self, AppState};
use tasksumma::task::{parse_due_date, SortOrder, StatusFilter};
use tasksumma::{Config, NewTask, Priority, Storage, SummaryPipeline};

#[derive(Parser)]
#[command(name = "tasksumma")]
#[command(author, version, about = "Todo tracker with LLM summaries posted to chat", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Summarize pending todos and post the summary to chat
    Summarize {
        /// Only include todos belonging to this user
        #[arg(long)]
        user: Option<String>,
    },
    /// List stored todos
    List {
        /// all, active or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// date-desc, date-asc, priority or due-date
        #[arg(long, default_value = "date-desc")]
        sort: SortOrder,
    },
    /// Add a todo
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<Priority>,
        /// YYYY-MM-DD or an RFC 3339 timestamp
        #[arg(long, value_parser = parse_due_date)]
        due: Option<chrono::DateTime<chrono::Utc>>,
        #[arg(long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = Config::load()?;
    let storage = Arc::new(Storage::open(&config.storage.path)?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let pipeline = Arc::new(build_pipeline(&config, storage.clone())?);
            let state = Arc::new(AppState { storage, pipeline });
            let router = server::create_router(state, &config.server.cors_origins);
            server::serve(router, config.server.bind).await?;
        }
        Commands::Summarize { user } => {
            let pipeline = build_pipeline(&config, storage)?;
            let outcome = pipeline.run(user.as_deref()).await?;

            println!("{}\n", "=== Todo Summary ===".bold());
            println!("{}", outcome.summary);
            if outcome.used_fallback {
                println!("\n{}", "(fallback summary: LLM quota exhausted)".yellow());
            }
            println!("\n{}", "Posted to chat.".green());
        }
        Commands::List { status, sort } => {
            let tasks = storage.list(status, sort)?;
            if tasks.is_empty() {
                println!("No todos found.");
            } else {
                println!("Todos ({}):\n", tasks.len());
                for task in tasks {
                    let mark = if task.completed { "✔".green() } else { "•".normal() };
                    let priority = task
                        .priority
                        .map(|p| format!(" [{p}]"))
                        .unwrap_or_default();
                    let due = task
                        .due_date
                        .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
                        .unwrap_or_default();
                    println!("{mark} {}{priority}{due}", task.title);
                    println!("   {}", task.id.dimmed());
                }
            }
        }
        Commands::Add {
            title,
            description,
            priority,
            due,
            user,
        } => {
            if title.trim().is_empty() {
                anyhow::bail!("title must not be empty");
            }
            let task = storage.create(NewTask {
                title,
                description,
                completed: None,
                priority,
                due_date: due,
                user_id: user,
            })?;
            println!("Added {} ({})", task.title.bold(), task.id);
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config, storage: Arc<Storage>) -> anyhow::Result<SummaryPipeline> {
    let summarizer = OpenAiSummarizer::from_config(config)?;
    let notifier = SlackWebhook::new(
        config.notify.webhook_url.clone(),
        Duration::from_secs(config.notify.timeout_secs),
    )?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(SummaryPipeline::new(
        storage,
        Arc::new(summarizer),
        Arc::new(notifier),
        clock,
        config.notify.title.clone(),
    ))
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("TASKSUMMA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
