// eightpack command-line client.
//
// Startup sequence:
// 1. Parse arguments
// 2. Load config (config/client.toml under --base-dir, env override)
// 3. Initialize tracing (log to file, stdout is for command output)
// 4. Build the client context and refresh the session identity
// 5. Run the requested command and report any alert it raised

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use eightpack_core::alert::AlertKind;
use eightpack_core::config::{self, Config};
use eightpack_core::context::ClientContext;
use eightpack_core::protocol::Pick;

#[derive(Debug, Parser)]
#[command(name = "eightpack", version, about = "Log in, browse drafts and record playthroughs")]
struct Cli {
    /// Directory containing config/client.toml.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and remember the access token.
    Login { login: String, password: String },
    /// Create an account and log into it.
    Register { login: String, password: String },
    /// Forget the stored access token.
    Logout,
    /// Show who the stored token belongs to.
    Whoami,
    /// List available drafts.
    Drafts,
    /// Show the choices and playthroughs of a draft.
    Show { id: i64 },
    /// Record a playthrough: one card id per turn, in order.
    Save {
        id: i64,
        #[arg(required = true)]
        cards: Vec<i64>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::Logout => "logout",
            Command::Whoami => "whoami",
            Command::Drafts => "drafts",
            Command::Show { .. } => "show",
            Command::Save { .. } => "save",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.base_dir).context("failed to load configuration")?;
    init_tracing(&cli.base_dir, &config)?;
    info!("eightpack starting: {}", cli.command.name());

    let ctx = ClientContext::from_config(&config).context("failed to set up client")?;
    ctx.before_navigation().await;

    run(&ctx, cli.command).await;

    Ok(report_alert(&ctx))
}

async fn run(ctx: &ClientContext, command: Command) {
    match command {
        Command::Login { login, password } => {
            ctx.session.try_login(&login, &password).await;
            print_identity(ctx);
        }
        Command::Register { login, password } => {
            ctx.session.register(&login, &password).await;
            print_identity(ctx);
        }
        Command::Logout => {
            ctx.session.logout();
            println!("Logged out.");
        }
        Command::Whoami => print_identity(ctx),
        Command::Drafts => {
            if let Some(drafts) = ctx.draft.list_drafts().await {
                if drafts.is_empty() {
                    println!("No drafts.");
                }
                for draft in drafts {
                    match draft.created_at {
                        Some(at) => println!("#{}  created {}", draft.id, at),
                        None => println!("#{}", draft.id),
                    }
                }
            }
        }
        Command::Show { id } => {
            if let Some(in_flight) = ctx.draft.load(id) {
                in_flight.join().await;
            }
            print_draft(ctx);
        }
        Command::Save { id, cards } => {
            if let Some(in_flight) = ctx.draft.load(id) {
                in_flight.join().await;
            }
            for (turn, card_id) in cards.into_iter().enumerate() {
                ctx.draft.add_pick(Pick {
                    turn_number: turn as u32 + 1,
                    card_id,
                });
            }
            if ctx.draft.save_playthrough().await {
                println!("Playthrough saved for draft #{id}.");
            }
        }
    }
}

fn print_identity(ctx: &ClientContext) {
    match ctx.session.user_login() {
        Some(login) => println!("Logged in as {login}."),
        None if ctx.session.token().is_empty() => println!("Not logged in."),
        None => println!("Token stored but not verified (backend unreachable?)."),
    }
}

fn print_draft(ctx: &ClientContext) {
    let state = ctx.draft.snapshot();
    let Some(id) = state.draft_id else {
        return;
    };
    println!("Draft #{id}");

    match &state.choices {
        Some(choices) => {
            let mut turn = 0;
            for choice in choices {
                if choice.turn_number != turn {
                    turn = choice.turn_number;
                    println!("  Turn {turn}:");
                }
                println!(
                    "    [{}] {} (card {})",
                    choice.option_number, choice.card.name, choice.card.id
                );
            }
        }
        None => println!("  Choices unavailable."),
    }

    println!("  Playthroughs: {}", state.playthroughs.len());
    for play in &state.playthroughs {
        let cards: Vec<String> = play.picks.iter().map(|p| p.card_id.to_string()).collect();
        println!(
            "    #{} by {}: {}",
            play.id,
            play.player.as_deref().unwrap_or("?"),
            cards.join(", ")
        );
    }

    if state.is_loading() {
        println!("  ({} part(s) failed to load)", state.pending);
    }
}

/// Print the alert left by the last command, if any. Error alerts fail the
/// process.
fn report_alert(ctx: &ClientContext) -> ExitCode {
    match ctx.alert.current() {
        Some(alert) => {
            eprintln!("{}: {}", alert.kind, alert.text);
            if alert.kind == AlertKind::Error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        None => ExitCode::SUCCESS,
    }
}

/// Initialize tracing to log to `logs/eightpack.log` under the base directory.
fn init_tracing(base_dir: &Path, config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("eightpack.log"))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
