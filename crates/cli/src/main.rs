//! Help Desk CLI - one client session against the shared board
//!
//! Every invocation is its own session: it reads the shared store, applies
//! at most one action, and prints the refreshed board. Several terminals
//! pointed at the same database file are several clients.

mod logging;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use helpdesk_core::application::{
    stop_channel, AccessGate, HelperSecret, RefreshLoop, Session, WritePolicy,
};
use helpdesk_core::port::time_provider::{SystemTimeProvider, TimeProvider};
use helpdesk_core::AppError;
use helpdesk_infra_sqlite::{create_pool, run_migrations, SqliteSharedStore};

const DEFAULT_DB_PATH: &str = "~/.helpdesk/board.db";

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(about = "Shared help queue and Q&A board", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Shared board database (file path or sqlite: URL)
    #[arg(long, env = "HELPDESK_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db: String,

    /// Secret that unlocks helper controls
    #[arg(long = "secret", env = "HELPDESK_HELPER_SECRET", hide_env_values = true)]
    helper_secret: Option<String>,

    /// How writes are applied: last-write-wins or compare-and-swap
    #[arg(long, env = "HELPDESK_WRITE_POLICY", default_value = "last-write-wins")]
    write_policy: String,

    /// Retries after a conflicting write (compare-and-swap only)
    #[arg(long, env = "HELPDESK_CAS_RETRIES", default_value_t = helpdesk_core::application::constants::DEFAULT_CAS_RETRIES)]
    cas_retries: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the help queue
    Queue,

    /// Join the help queue
    Join {
        /// Your name
        name: String,
    },

    /// Help the student at the front of the queue (helper)
    Next {
        /// Helper password
        #[arg(long, env = "HELPDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Remove the student at a queue number (helper)
    Remove {
        /// Queue number as shown by `queue` (1 = next)
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        number: u64,

        /// Helper password
        #[arg(long, env = "HELPDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Remove a student by name (helper)
    RemoveName {
        name: String,

        /// Helper password
        #[arg(long, env = "HELPDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Clear the entire queue (helper)
    Clear {
        /// Helper password
        #[arg(long, env = "HELPDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show questions, newest first
    Questions,

    /// Post a new question
    Ask {
        /// Your name
        #[arg(short, long)]
        author: String,

        /// Your question
        #[arg(short, long)]
        question: String,
    },

    /// Answer a question
    Answer {
        /// Question number as shown by `questions` (1 = newest)
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        number: u64,

        /// Your name
        #[arg(short, long)]
        author: String,

        /// Your answer
        #[arg(short = 't', long)]
        text: String,
    },

    /// Show the queue and the questions
    Board,

    /// Keep the board on screen, re-reading it on an interval
    Watch {
        /// Seconds between refreshes
        #[arg(long, env = "HELPDESK_REFRESH_SECS", default_value = "5")]
        interval: u64,
    },
}

/// Convert a 1-based on-screen number to a 0-based index
fn to_index(number: u64) -> usize {
    (number - 1) as usize
}

fn write_policy(cli: &Cli) -> Result<WritePolicy> {
    let policy: WritePolicy = cli.write_policy.parse()?;
    Ok(match policy {
        WritePolicy::CompareAndSwap { .. } => WritePolicy::CompareAndSwap {
            max_retries: cli.cas_retries,
        },
        other => other,
    })
}

fn database_url(db: &str) -> Result<String> {
    let expanded = shellexpand::tilde(db).into_owned();
    if !expanded.starts_with("sqlite:") && !expanded.contains(":memory:") {
        if let Some(parent) = Path::new(&expanded).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
    }
    Ok(expanded)
}

async fn open_session(cli: &Cli) -> Result<Session> {
    let db_url = database_url(&cli.db)?;
    let policy = write_policy(cli)?;
    info!(db = %db_url, policy = ?policy, "Opening board");

    let pool = create_pool(&db_url).await.context("Database pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    let time_provider = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteSharedStore::new(pool, time_provider.clone()));
    let gate = AccessGate::new(cli.helper_secret.clone().map(HelperSecret::new));

    Ok(Session::new(store, time_provider, gate, policy))
}

fn unlock(session: &mut Session, password: &str) -> Result<(), AppError> {
    if !session.gate_mut().authenticate(password) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

async fn dispatch(session: &mut Session, command: Commands) -> Result<(), AppError> {
    session.refresh().await?;

    match command {
        Commands::Queue => render::queue(session.queue_snapshot()),

        Commands::Join { name } => {
            let entry = session.queue().join(&name).await?;
            let position = session.queue().position_of(&entry.name).unwrap_or(0) + 1;
            println!(
                "{}",
                format!("✓ You've been added to the queue, {}! You are #{}.", entry.name, position)
                    .green()
                    .bold()
            );
            println!();
            render::queue(session.queue_snapshot());
        }

        Commands::Next { password } => {
            unlock(session, &password)?;
            let entry = session.queue().help_next().await?;
            println!("{}", format!("✓ Now helping {}", entry.name).green().bold());
            println!();
            render::queue(session.queue_snapshot());
        }

        Commands::Remove { number, password } => {
            unlock(session, &password)?;
            let entry = session.queue().remove(to_index(number)).await?;
            println!("{}", format!("✓ Removed {}", entry.name).green().bold());
            println!();
            render::queue(session.queue_snapshot());
        }

        Commands::RemoveName { name, password } => {
            unlock(session, &password)?;
            let entry = session.queue().remove_by_name(&name).await?;
            println!("{}", format!("✓ Removed {}", entry.name).green().bold());
            println!();
            render::queue(session.queue_snapshot());
        }

        Commands::Clear { password } => {
            unlock(session, &password)?;
            session.queue().clear().await?;
            println!("{}", "✓ Queue cleared".green().bold());
        }

        Commands::Questions => render::questions(session.question_snapshot()),

        Commands::Ask { author, question } => {
            session.questions().post(&author, &question).await?;
            println!("{}", "✓ Question posted".green().bold());
            println!();
            render::questions(session.question_snapshot());
        }

        Commands::Answer {
            number,
            author,
            text,
        } => {
            session
                .questions()
                .answer_displayed(to_index(number), &author, &text)
                .await?;
            println!("{}", "✓ Answer posted".green().bold());
            println!();
            render::questions(session.question_snapshot());
        }

        Commands::Board => render::board(&session.view(), session.staleness()),

        // Handled in main: it owns the session for the loop's lifetime
        Commands::Watch { .. } => {}
    }

    Ok(())
}

async fn watch(session: Session, interval: Duration) -> Result<()> {
    let (refresh_loop, mut views) = RefreshLoop::new(session, interval);
    let (stop, signal) = stop_channel();
    let handle = tokio::spawn(refresh_loop.run(signal));

    println!("{}", "Watching the board. Press Ctrl+C to stop.".dimmed());

    loop {
        let view = views.borrow_and_update().clone();
        println!();
        render::board(&view, view.staleness(SystemTimeProvider.now_millis()));

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    stop.stop();
    join_refresh_loop(handle, Duration::from_secs(5)).await;
    Ok(())
}

/// Wait for a stopped refresh loop to hand its session back
async fn join_refresh_loop(handle: JoinHandle<Session>, wait: Duration) -> Option<Session> {
    match tokio::time::timeout(wait, handle).await {
        Ok(Ok(session)) => Some(session),
        Ok(Err(e)) => {
            warn!(error = %e, "Refresh loop task failed");
            None
        }
        Err(_) => {
            warn!(wait_ms = wait.as_millis() as u64, "Refresh loop did not stop in time");
            None
        }
    }
}

/// Print the one-line message for a failed operation and exit
fn fail(err: &AppError) -> ! {
    eprintln!("{} {}", "✗".red().bold(), render::error_message(err));
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let mut session = match open_session(&cli).await {
        Ok(session) => session,
        Err(e) => match e.downcast_ref::<AppError>() {
            Some(app_err) => {
                tracing::debug!(error = ?e, "Startup failed");
                fail(app_err)
            }
            None => return Err(e),
        },
    };

    if let Commands::Watch { interval } = cli.command {
        return watch(session, Duration::from_secs(interval)).await;
    }

    if let Err(e) = dispatch(&mut session, cli.command).await {
        tracing::debug!(error = %e, "Command failed");
        fail(&e);
    }

    Ok(())
}
