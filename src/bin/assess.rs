//! Take an assessment in the terminal.
//!
//! Usage:
//!   cargo run --bin assess -- --ephemeral --context "writing code reviews"
//!   cargo run --bin assess -- --email ada@example.com --total 3

use std::sync::Arc;
use std::time::Instant;

use able_mind::assessment::{AssessmentRun, Challenge, RespondOutcome, RunSettings};
use able_mind::clients::create_model;
use able_mind::config::Config;
use able_mind::init_tracing;
use able_mind::store::{MemoryStore, NewUser, SessionStore, SurrealStore};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser)]
#[command(name = "assess")]
#[command(about = "Run an adaptive AI-reliance assessment interactively", long_about = None)]
struct Cli {
    /// How you use AI tools; asked for when omitted
    #[arg(long)]
    context: Option<String>,
    /// Existing user id
    #[arg(long, conflicts_with = "email")]
    user: Option<String>,
    /// Look up (or register) the user by email
    #[arg(long)]
    email: Option<String>,
    /// Keep everything in memory; nothing is written to the database
    #[arg(long)]
    ephemeral: bool,
    /// Number of challenges in the run
    #[arg(long)]
    total: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    init_tracing(&config.runtime);

    let model = create_model(&config)?;
    let store: Arc<dyn SessionStore> = if cli.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SurrealStore::connect(&config).await?)
    };
    let user_id = resolve_user(store.as_ref(), &cli).await?;

    let mut settings = RunSettings::from_config(&config);
    if let Some(total) = cli.total {
        settings.total_challenges = total.max(1);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let context = match cli.context {
        Some(c) => c,
        None => {
            println!("How do you use AI tools day to day?");
            read_line(&mut input).await?.unwrap_or_default()
        }
    };

    let mut run = AssessmentRun::new(user_id, &model, store, &settings);
    let mut challenge = run.start(&context).await?;
    let mut index = 1;

    loop {
        show(&challenge, index, settings.total_challenges);
        let shown = Instant::now();
        let Some(line) = read_line(&mut input).await? else {
            run.abandon();
            println!("\nInput closed; run abandoned.");
            return Ok(());
        };
        let answer = resolve_answer(&challenge, &line);
        if answer.trim().is_empty() {
            println!("(an answer is required)");
            continue;
        }
        let elapsed_ms = shown.elapsed().as_millis() as u64;

        if index == settings.total_challenges {
            println!("\nInterpreting your session...");
        }
        let outcome = tokio::select! {
            res = run.respond(&answer, elapsed_ms, None) => res?,
            _ = tokio::signal::ctrl_c() => {
                run.abandon();
                println!("\nInterrupted; run abandoned.");
                return Ok(());
            }
        };

        match outcome {
            RespondOutcome::Next {
                challenge: next,
                adjustment,
                performance,
                ..
            } => {
                println!(
                    "   performance {}/10, difficulty now {} ({})",
                    performance.value(),
                    adjustment.new_difficulty.value(),
                    adjustment.reason
                );
                challenge = next;
                index += 1;
            }
            RespondOutcome::Complete { outcome } => {
                println!("\n📊 Human/AI balance score: {}", outcome.score.value());
                println!("\nStrengths:");
                for s in &outcome.report.strengths {
                    println!("  + {}", s);
                }
                println!("Weaknesses:");
                for w in &outcome.report.weaknesses {
                    println!("  - {}", w);
                }
                println!("\n{}", outcome.report.insights);
                if !cli.ephemeral {
                    println!("\nSaved as session {}", outcome.session.id);
                }
                return Ok(());
            }
        }
    }
}

async fn resolve_user(store: &dyn SessionStore, cli: &Cli) -> Result<String> {
    if let Some(id) = &cli.user {
        store
            .get_user(id)
            .await?
            .with_context(|| format!("no user with id {}", id))?;
        return Ok(id.clone());
    }

    let email = cli
        .email
        .clone()
        .unwrap_or_else(|| "local@able-mind.invalid".to_string());
    let existing = store
        .list_users()
        .await?
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email.trim()));
    let user = match existing {
        Some(u) => u,
        None => {
            store
                .create_user(NewUser {
                    email,
                    ..NewUser::default()
                })
                .await?
        }
    };
    Ok(user.id)
}

fn show(challenge: &Challenge, index: usize, total: usize) {
    println!("\n[{}/{}] {}", index, total, challenge.text());
    for (i, option) in challenge.options().iter().enumerate() {
        println!("   {}. {}", i + 1, option);
    }
    print!("> ");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

/// A bare option number picks that option's text
fn resolve_answer(challenge: &Challenge, line: &str) -> String {
    let line = line.trim();
    if let Ok(n) = line.parse::<usize>()
        && let Some(option) = n.checked_sub(1).and_then(|i| challenge.options().get(i))
    {
        return option.clone();
    }
    line.to_string()
}

async fn read_line(input: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    Ok(input.next_line().await?)
}
