use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tramvia::api::{ApiServer, ApiState};
use tramvia::db::{self, PreferenceRepo, QueryLogRepo};
use tramvia::providers::{NominatimClient, OpenDataClient, OsrmClient};
use tramvia::voice::{GoogleTranslateTts, LocalRecognizer, VoiceManager, WebSpeechStt};
use tramvia::{CacheStore, Config, Orchestrator};

/// Tramvia - voice-driven urban mobility assistant for Valencia
#[derive(Parser)]
#[command(name = "tramvia", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "TRAMVIA_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single text query and print the response
    Query {
        /// The query text, in Spanish
        text: String,
        /// Device latitude
        #[arg(long)]
        lat: Option<f64>,
        /// Device longitude
        #[arg(long)]
        lon: Option<f64>,
    },
    /// Remove synthesized audio past its retention window
    CleanupAudio,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,tramvia=info",
        1 => "info,tramvia=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = db::init(config.db_path())?;
    let orchestrator = build_orchestrator(&config, pool.clone())?;

    match cli.command {
        Some(Command::Query { text, lat, lon }) => {
            let location = match (lat, lon) {
                (Some(lat), Some(lon)) => {
                    Some(tramvia::providers::Coordinates::new(lat, lon))
                }
                _ => None,
            };
            let response = orchestrator.handle_text_query(&text, location, "cli").await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Some(Command::CleanupAudio) => {
            let removed = orchestrator.cleanup_audio(config.voice.audio_max_age)?;
            println!("removed {removed} audio files");
            Ok(())
        }
        None => {
            let port = cli.port.unwrap_or(config.server.port);
            tracing::info!(port, "starting tramvia");

            let state = Arc::new(ApiState {
                db: pool,
                orchestrator,
                max_audio_bytes: config.voice.max_audio_bytes,
            });

            ApiServer::new(state, port, config.voice.audio_dir.clone())
                .run()
                .await?;
            Ok(())
        }
    }
}

/// Wire providers, voice engines, and repositories into an orchestrator
fn build_orchestrator(config: &Config, pool: db::DbPool) -> anyhow::Result<Orchestrator> {
    let cache = Arc::new(CacheStore::new());

    let mobility = Arc::new(OpenDataClient::new(
        config.opendata.search_url.clone(),
        config.opendata.timeout,
        cache,
    )?);
    let routing = Arc::new(OsrmClient::new(
        config.routing.osrm_url.clone(),
        config.routing.timeout,
    )?);
    let geocoding = Arc::new(NominatimClient::new(
        config.geocoding.nominatim_url.clone(),
        config.geocoding.user_agent.clone(),
        config.geocoding.timeout,
    )?);

    let primary = Box::new(LocalRecognizer::new(
        config.voice.local_stt_url.clone(),
        config.voice.timeout,
    )?);
    let fallback = Box::new(WebSpeechStt::new(
        config.voice.web_speech_url.clone(),
        config.voice.web_speech_key.clone(),
        config.voice.timeout,
    )?);
    let tts = Box::new(GoogleTranslateTts::new(
        config.voice.tts_url.clone(),
        config.voice.timeout,
    )?);

    let voice = VoiceManager::new(
        primary,
        Some(fallback),
        tts,
        config.voice.audio_dir.clone(),
        config.voice.language.clone(),
    )?;

    Ok(Orchestrator::new(
        mobility,
        routing,
        geocoding,
        voice,
        QueryLogRepo::new(pool.clone()),
        PreferenceRepo::new(pool),
        config.voice.max_audio_bytes,
    ))
}
