//! Council CLI - moderated AI panel debates
//!
//! A command-line tool for convening a panel of personas to debate a topic.

use clap::{ArgAction, Parser};
use colored::Colorize;
use council_core::{
    Config, DebateConfig, DebateEngine, DebateEvent, GeneratedGuestFactory, GenerationClient,
    Intensity, OpenAiGenerator, OpenAiSettings, Phase, PersonaRepository, SpeakerKind,
    default_config,
};
use futures::StreamExt;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "council",
    version,
    about = "Council - watch a panel of personas debate a topic",
    long_about = "A CLI tool for running moderated, multi-phase panel debates using OpenAI-compatible APIs."
)]
struct Cli {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Persona ids to seat, in speaking order (specify once per participant)
    #[arg(short, long = "persona", action = ArgAction::Append, value_name = "ID")]
    persona: Vec<String>,

    /// Model to use (falls back to COUNCIL_MODEL)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Debate length preset: quick, standard or thorough
    #[arg(short, long, value_name = "LEVEL")]
    intensity: Option<String>,

    /// Cross-examination rounds (overrides the preset)
    #[arg(long, value_name = "N")]
    rounds: Option<usize>,

    /// Open-debate exchanges (overrides the preset)
    #[arg(long, value_name = "N")]
    exchanges: Option<usize>,

    /// Disable guest nominations
    #[arg(long)]
    no_nominations: bool,

    /// Maximum guests per session
    #[arg(long, value_name = "N")]
    max_nominations: Option<usize>,

    /// Path to a TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of additional persona files (*.toml)
    #[arg(long, value_name = "DIR")]
    personas_dir: Option<PathBuf>,

    /// Write the finished transcript as JSON
    #[arg(short, long, value_name = "FILE")]
    transcript: Option<PathBuf>,

    /// Ask the moderator for a position analysis after the debate
    #[arg(long)]
    analyze: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("COUNCIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };

    let mut personas = PersonaRepository::from_config(&config);
    if let Some(dir) = &cli.personas_dir {
        let loaded = personas.load_dir(dir)?;
        tracing::info!(loaded, dir = %dir.display(), "Loaded persona files");
    }

    if cli.persona.is_empty() {
        eprintln!(
            "{} Choose at least {} personas with -p. Available: {}",
            "Error:".red().bold(),
            config.debate.min_participants,
            personas.ids().collect::<Vec<_>>().join(", ")
        );
        std::process::exit(1);
    }
    let roster = personas.resolve(cli.persona.as_slice())?;

    // Get API configuration from environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    let model = cli
        .model
        .clone()
        .or_else(|| env::var("COUNCIL_MODEL").ok())
        .unwrap_or_else(|| "gpt-4o-mini".to_string());

    let intensity = cli.intensity.as_deref().map(str::parse::<Intensity>).transpose()?;
    let (preset_rounds, preset_exchanges) = config.rounds_for(intensity);
    let rounds = cli.rounds.unwrap_or(preset_rounds);
    let exchanges = cli.exchanges.unwrap_or(preset_exchanges);

    let mut debate = DebateConfig::from_config(&cli.topic, &config);
    if cli.no_nominations {
        debate = debate.with_nominations(false);
    }
    if let Some(max) = cli.max_nominations {
        debate = debate.with_max_nominations(max);
    }

    let client: Arc<dyn GenerationClient> =
        Arc::new(OpenAiGenerator::new(OpenAiSettings::new(api_base, api_key, &model))?);
    let guest_factory = Arc::new(GeneratedGuestFactory::new(client.clone()));
    let mut engine = DebateEngine::new(debate, roster, client, guest_factory)?;

    print_header(&engine, &model, rounds, exchanges);

    {
        let mut events = pin!(engine.run_full_debate(rounds, exchanges));
        let mut current_phase: Option<Phase> = None;

        while let Some(event) = events.next().await {
            let event = event?;
            if current_phase != Some(event.phase()) {
                current_phase = Some(event.phase());
                print_phase_banner(event.phase());
            }
            render_event(event);
        }
    }

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", "  Debate concluded.".bright_green().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    if cli.analyze {
        let analysis = engine.analyze_positions().await?;
        println!("{}", "Positions".bold());
        for position in &analysis.positions {
            println!("  {} {}", format!("{}:", position.participant_id).bright_cyan(), position.stance);
            for argument in &position.key_arguments {
                println!("    - {}", argument.dimmed());
            }
        }
        if !analysis.disagreements.is_empty() {
            println!("{}", "Key Disagreements".bold());
            for d in &analysis.disagreements {
                println!(
                    "  {} vs {} on {}",
                    d.first.participant_id.yellow(),
                    d.second.participant_id.yellow(),
                    d.topic
                );
            }
        }
        if let Some(focus) = &analysis.recommended_focus {
            println!("{} {}", "Recommended focus:".bold(), focus);
        }
        println!();
    }

    if let Some(path) = &cli.transcript {
        std::fs::write(path, engine.transcript().to_json()?)?;
        println!(
            "{} {}",
            "Transcript saved:".green(),
            path.display().to_string().bright_white()
        );
    }

    Ok(())
}

fn print_header(engine: &DebateEngine, model: &str, rounds: usize, exchanges: usize) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {} - {}", "Council".bold(), engine.topic()).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{}", "Panel:".bold());
    for (i, p) in engine.roster().iter().enumerate() {
        println!("  {}. {}", i + 1, p.name.bright_cyan());
    }
    println!();
    println!(
        "{} {} cross-examination round(s), {} open exchange(s), {} guest seat(s) - using {}",
        "Format:".bold(),
        rounds,
        exchanges,
        engine.nominations_remaining(),
        model.dimmed()
    );
    println!("{}", "─".repeat(70).dimmed());
}

fn print_phase_banner(phase: Phase) {
    println!();
    println!("{}", "═".repeat(70).bright_magenta());
    println!("{}", format!("  {}", phase.display_name()).bright_magenta().bold());
    println!("{}", "═".repeat(70).bright_magenta());
    println!();
}

fn render_event(event: DebateEvent) {
    match event {
        DebateEvent::TurnStart { speaker, kind, .. } => match kind {
            SpeakerKind::Moderator => println!("{} {}", "▶".bright_white(), speaker.bright_white().bold()),
            SpeakerKind::Participant => println!("{} {}", "▶".bright_cyan(), speaker.bright_cyan().bold()),
        },
        DebateEvent::Fragment { text, .. } => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        DebateEvent::TurnEnd { .. } => {
            println!();
            println!();
        }
        DebateEvent::GuestNominated { guest, nominated_by, .. } => {
            println!();
            println!(
                "{}",
                format!(">> {} nominates {} to join the debate", nominated_by, guest.name)
                    .bright_magenta()
                    .bold()
            );
        }
    }
}
