//! fieldbook - book mini-soccer fields from the terminal.
//!
//! Browse fields and their hourly schedules, log in, book slots and follow
//! the payment link, and review booking history.

mod app;
mod render;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, ProfileChanges};
use fieldbook_core::auth::Route;
use fieldbook_core::config::{ApiConfig, Config};
use fieldbook_core::models::RegisterRequest;

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "fieldbook.log";

#[derive(Parser, Debug)]
#[command(name = "fieldbook")]
#[command(about = "Browse and book mini-soccer fields")]
#[command(version)]
struct Args {
    /// Also write logs to a daily rolling file in this directory
    #[arg(long, env = "FIELDBOOK_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all fields
    Fields,

    /// Show a field and its schedule for a date
    Field {
        uuid: String,

        /// Date to show (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Book one or more slots on a field and get the payment link
    Book {
        uuid: String,

        /// Date to book (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Slot start time ("19:00") or slot uuid; repeat for several hours
        #[arg(short, long = "slot", required = true)]
        slots: Vec<String>,

        /// Skip the price confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Create an account
    Register,

    /// Log in
    Login {
        #[arg(short, long, env = "FIELDBOOK_USERNAME")]
        username: Option<String>,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show who is logged in, without contacting the server
    Whoami,

    /// Show your profile
    Profile,

    /// Update your profile
    ProfileUpdate {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
    },

    /// List your bookings
    Orders,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(filter)
                .init();
            None
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => {
            let input = prompt(&format!("{} [{}]", label, default))?;
            Ok(if input.is_empty() { default.to_string() } else { input })
        }
        None => prompt(label),
    }
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    Ok(password)
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/N]", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let log_guard = init_tracing(args.log_dir.as_ref());
    info!("fieldbook starting");

    let api_config = ApiConfig::from_env().context("Service configuration is incomplete")?;
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });

    let mut app = App::new(api_config, config)?;
    let result = run(&mut app, args.command).await;

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            // Flush the file log before exiting
            drop(log_guard);
            std::process::exit(1);
        }
    }
}

async fn run(app: &mut App, command: Command) -> Result<String> {
    match command {
        Command::Fields => app.fields().await,
        Command::Field { uuid, date } => app.field(&uuid, date.as_deref()).await,
        Command::Book {
            uuid,
            date,
            slots,
            yes,
        } => {
            app.require_login_for_checkout(&uuid)?;
            let selection = app.select_slots(&uuid, date.as_deref(), &slots).await?;
            println!("{}", render::schedule(&selection));
            let question = format!("Total price is {}. Continue to payment?", selection.total_display());
            if !yes && !confirm(&question)? {
                return Ok("Booking cancelled.".to_string());
            }
            app.checkout(&uuid, &selection).await
        }
        Command::Register => {
            if let Some(message) = app.auth_entry_redirect(&Route::Register) {
                return Ok(message);
            }
            let name = prompt("Name")?;
            let username = prompt("Username")?;
            let email = prompt("Email")?;
            let phone_number = prompt("Phone number")?;
            let password = prompt_password("Password")?;
            let confirm_password = prompt_password("Confirm password")?;
            let request = RegisterRequest {
                name,
                email,
                phone_number,
                username,
                password,
                confirm_password,
            };
            app.register(&request).await
        }
        Command::Login { username } => {
            if let Some(message) = app.auth_entry_redirect(&Route::Login) {
                return Ok(message);
            }
            let username = match username {
                Some(username) => username,
                None => prompt_with_default("Username", app.last_username())?,
            };
            let password = prompt_password("Password")?;
            app.login(&username, &password).await
        }
        Command::Logout => app.logout(),
        Command::Whoami => Ok(app.whoami()),
        Command::Profile => app.profile().await,
        Command::ProfileUpdate {
            name,
            email,
            phone_number,
            username,
            password,
        } => {
            let password = if password {
                let new_password = prompt_password("New password")?;
                let confirm_password = prompt_password("Confirm new password")?;
                Some((new_password, confirm_password))
            } else {
                None
            };
            let changes = ProfileChanges {
                name,
                email,
                phone_number,
                username,
                password,
            };
            app.update_profile(changes).await
        }
        Command::Orders => app.orders().await,
    }
}
