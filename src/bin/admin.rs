//! Admin utility for AbleMind users and session history.
//!
//! Usage:
//!   cargo run --bin admin -- users
//!   cargo run --bin admin -- add-user --email ada@example.com --admin
//!   cargo run --bin admin -- sessions --user <id>
//!   cargo run --bin admin -- progress --user <id>
//!   cargo run --bin admin -- init-schema

use able_mind::config::Config;
use able_mind::history::load_progress;
use able_mind::init_tracing;
use able_mind::store::{NewUser, SessionStore, SurrealStore};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "admin")]
#[command(about = "AbleMind admin utilities", long_about = None)]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all users
    Users,
    /// Create a user
    AddUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        admin: bool,
    },
    /// List a user's sessions, oldest first
    Sessions {
        #[arg(long)]
        user: String,
    },
    /// Balance-score trend for a user
    Progress {
        #[arg(long)]
        user: String,
    },
    /// Define tables and indexes (idempotent)
    InitSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    init_tracing(&config.runtime);

    // Connecting also applies the schema
    let store = SurrealStore::connect(&config).await?;

    match cli.command {
        Commands::Users => users(&store, cli.json).await,
        Commands::AddUser {
            email,
            username,
            context,
            admin,
        } => {
            let user = store
                .create_user(NewUser {
                    email,
                    username,
                    onboarding_context: context,
                    is_admin: admin,
                })
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("✅ Created user {} ({})", user.id, user.email);
            }
            Ok(())
        }
        Commands::Sessions { user } => sessions(&store, &user, cli.json).await,
        Commands::Progress { user } => progress(&store, &user, cli.json).await,
        Commands::InitSchema => {
            println!(
                "✅ Schema initialized on {}/{}",
                config.system.database_ns, config.system.database_db
            );
            Ok(())
        }
    }
}

async fn users(store: &dyn SessionStore, json: bool) -> Result<()> {
    let users = store.list_users().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }
    println!("{:<24} {:<32} {:<6} {}", "ID", "EMAIL", "ADMIN", "CREATED");
    for u in &users {
        println!(
            "{:<24} {:<32} {:<6} {}",
            u.id,
            u.email,
            if u.is_admin { "yes" } else { "" },
            u.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("\n{} user(s)", users.len());
    Ok(())
}

async fn sessions(store: &dyn SessionStore, user: &str, json: bool) -> Result<()> {
    let sessions = store.list_sessions(user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("No sessions for {}", user);
        return Ok(());
    }
    for s in &sessions {
        let minutes = (s.end_time - s.start_time).num_seconds() as f64 / 60.0;
        println!(
            "{}  score {:>3}  {:<12} {:.1} min  ({})",
            s.start_time.format("%Y-%m-%d %H:%M"),
            s.human_ai_balance_score.value(),
            s.usage_context,
            minutes,
            s.id
        );
    }
    Ok(())
}

async fn progress(store: &dyn SessionStore, user: &str, json: bool) -> Result<()> {
    let summary = load_progress(store, user).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("📊 Progress for {}: {} session(s)", user, summary.total_sessions);
    if let (Some(latest), Some(avg), Some(best)) =
        (summary.latest_score, summary.average_score, summary.best_score)
    {
        println!("   latest {}  average {:.1}  best {}", latest, avg, best);
    }
    for p in &summary.points {
        let bar = "#".repeat((p.score / 5) as usize);
        println!("   {:<7} {:>3} {}", p.date, p.score, bar);
    }
    Ok(())
}
