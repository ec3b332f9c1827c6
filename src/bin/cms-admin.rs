//! Operator commands: schema bootstrap, admin accounts, setup check.
//!
//! Reads the same environment as the server (`DATABASE_URL`, `DB_MAX_CONNECTIONS`, ...).

use clap::{Parser, Subcommand};
use cms_core::auth::{create_admin, reset_password};
use cms_core::{check_setup, ensure_database_exists, ensure_tables, PgExecutor, Settings};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cms-admin")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Administration commands for the CMS database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database (if missing) and every table
    InitSchema,
    /// Create an admin account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Overwrite an admin's password
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Check connectivity, tables and admin accounts
    CheckSetup,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cms_core=warn")))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    if matches!(command, Command::InitSchema) {
        ensure_database_exists(&settings.database_url).await?;
    }
    let db = PgExecutor::connect(&settings).await?;

    let code = match command {
        Command::InitSchema => {
            ensure_tables(&db).await?;
            println!("schema ready");
            ExitCode::SUCCESS
        }
        Command::CreateAdmin {
            email,
            password,
            full_name,
        } => {
            let user = create_admin(&db, &email, &password, full_name.as_deref()).await?;
            println!("created admin {} ({})", user.email, user.id);
            ExitCode::SUCCESS
        }
        Command::ResetPassword { email, password } => {
            let user = reset_password(&db, &email, &password).await?;
            println!("password updated for {}", user.email);
            ExitCode::SUCCESS
        }
        Command::CheckSetup => {
            let report = check_setup(&db).await?;
            print_report(&report);
            if report.is_ready() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    };
    db.close().await;
    Ok(code)
}

fn print_report(report: &cms_core::schema::SetupReport) {
    if !report.database_reachable {
        println!("database: unreachable");
        return;
    }
    println!("database: ok");
    if report.missing_tables.is_empty() {
        println!("tables: ok");
    } else {
        println!("tables: missing {}", report.missing_tables.join(", "));
        println!("  run `cms-admin init-schema`");
    }
    println!("admins: {}", report.admin_count);
    for email in &report.admin_emails {
        println!("  - {}", email);
    }
    if report.admin_count == 0 && !report.missing_tables.iter().any(|t| t == "admin_users") {
        println!("  run `cms-admin create-admin --email <email> --password <password>`");
    }
}
