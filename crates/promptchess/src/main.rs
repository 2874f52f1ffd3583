use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use council::{
    EventBus, GameConfig, GameController, GameEvent, RulesEngine, SharedAgent, Side, SideAgents,
    StandardChess,
};
use promptchess::{check_endpoint, LlmCouncil, ProviderConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "promptchess", version, about = "Chess played by debating piece fractions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play one game with LLM agents on both sides.
    Play(PlayArgs),
}

#[derive(clap::Args)]
struct PlayArgs {
    /// Turn cap, overrides the config file.
    #[arg(long)]
    max_turns: Option<u32>,

    /// TOML game config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from this FEN instead of the standard position.
    #[arg(long)]
    fen: Option<String>,

    /// Opening directive for every white fraction.
    #[arg(long)]
    white_directive: Option<String>,

    /// Opening directive for every black fraction.
    #[arg(long)]
    black_directive: Option<String>,

    /// Write the game record as JSON to this path.
    #[arg(long)]
    record: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Play(args) => play(args).await,
    }
}

fn load_config(args: &PlayArgs) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GameConfig::default().with_env_overrides(),
    };
    if let Some(max_turns) = args.max_turns {
        config.max_turns = max_turns;
    }
    config.validate().context("Invalid game config")?;
    Ok(config)
}

/// Print debate progress as it happens.
fn spawn_printer(bus: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &GameEvent) {
    match event {
        GameEvent::TurnStarted { turn, side } => {
            println!("\n=== Turn {} ({}) ===", turn + 1, side);
        }
        GameEvent::DirectiveUpdated {
            side,
            fraction,
            directive,
            ..
        } => println!("  [{} strategist] {} now: \"{}\"", side, fraction.title(), directive),
        GameEvent::DirectiveRejected {
            side,
            fraction,
            error,
            ..
        } => println!("  [{} strategist] {} update refused: {}", side, fraction.title(), error),
        GameEvent::ProposalReceived {
            fraction,
            mv,
            justification,
            ..
        } => println!("  {} proposes {}: {}", fraction.title(), mv, justification),
        GameEvent::FractionAbstained {
            fraction, reason, ..
        } => {
            if !reason.is_not_invited() {
                println!("  {} abstains ({})", fraction.title(), reason);
            }
        }
        GameEvent::MoveSelected { mv, source, .. } => {
            println!("  -> {} by {}", mv, source);
        }
        GameEvent::MoveApplied { board, .. } => println!("\n{}", board),
        GameEvent::GameEnded { status, .. } => println!("\nGame over: {}", status),
    }
}

async fn play(args: PlayArgs) -> Result<()> {
    let config = load_config(&args)?;
    let rules = match &args.fen {
        Some(fen) => StandardChess::from_fen(fen).context("Invalid --fen")?,
        None => StandardChess::new(),
    };

    let provider = ProviderConfig::default();
    if !check_endpoint(&provider.base_url, &provider.api_key).await {
        warn!(url = %provider.base_url, "endpoint not reachable, agents will abstain until it is");
    }
    info!(
        url = %provider.base_url,
        fraction_model = %provider.models.fraction,
        king_model = %provider.models.king,
        max_turns = config.max_turns,
        "Prompt Chess starting"
    );

    let agent: SharedAgent = Arc::new(LlmCouncil::new(provider)?);
    let bus = EventBus::new().shared();
    let printer = spawn_printer(&bus);

    let mut game = GameController::new(rules, config, SideAgents::shared(agent))?
        .with_events(Arc::clone(&bus));
    for (side, directive) in [
        (Side::White, &args.white_directive),
        (Side::Black, &args.black_directive),
    ] {
        if let Some(text) = directive {
            game.seed_directive(side, text)
                .with_context(|| format!("Invalid {} directive", side))?;
        }
    }

    let start = game.rules().snapshot(game.position());
    println!("{}", start.board);

    let status = game.play_to_end().await?;
    let score = game.scoreboard();
    println!(
        "\nResult: {} after {} turns. Points: white {}, black {}. Evaluation: {:+}",
        status,
        game.turn(),
        score.points(Side::White),
        score.points(Side::Black),
        game.evaluation()
    );

    if let Some(path) = &args.record {
        game.record()
            .save(path)
            .with_context(|| format!("Failed to write record {}", path.display()))?;
        info!(path = %path.display(), "game record saved");
    }

    drop(game);
    drop(bus);
    printer.await.context("event printer failed")?;
    Ok(())
}
