//! Configuration management for the mobility assistant

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;

/// Default OpenDataSoft search endpoint for Valencia city data
const DEFAULT_OPENDATA_URL: &str = "https://valencia.opendatasoft.com/api/records/1.0/search/";

/// Default public OSRM instance
const DEFAULT_OSRM_URL: &str = "http://router.project-osrm.org";

/// Default public Nominatim instance
const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Default hosted web speech endpoint
const DEFAULT_WEB_SPEECH_URL: &str = "http://www.google.com/speech-api/v2/recognize";

/// Default speech synthesis endpoint
const DEFAULT_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Open data endpoints
    pub opendata: OpenDataConfig,

    /// Routing endpoint
    pub routing: RoutingConfig,

    /// Geocoding endpoint
    pub geocoding: GeocodingConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// Path to data directory (database, audio artifacts)
    pub data_dir: PathBuf,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Open data endpoints
#[derive(Debug, Clone)]
pub struct OpenDataConfig {
    /// OpenDataSoft search URL
    pub search_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Routing endpoint
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// OSRM server base URL
    pub osrm_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Geocoding endpoint
#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    /// Nominatim server base URL
    pub nominatim_url: String,

    /// User-Agent header sent to the geocoder
    pub user_agent: String,

    /// Per-request timeout
    pub timeout: Duration,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Recognition language tag
    pub language: String,

    /// Local recognizer server URL (primary STT), None disables it
    pub local_stt_url: Option<String>,

    /// Hosted web speech API URL (fallback STT)
    pub web_speech_url: String,

    /// Hosted web speech API key
    pub web_speech_key: String,

    /// Speech synthesis endpoint URL
    pub tts_url: String,

    /// Directory where synthesized audio is written
    pub audio_dir: PathBuf,

    /// Max accepted upload size in bytes
    pub max_audio_bytes: u64,

    /// Synthesized audio retention
    pub audio_max_age: Duration,

    /// Per-request timeout for STT and TTS calls
    pub timeout: Duration,
}

impl Config {
    /// Load configuration with priority: env > toml > default
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let data_dir = std::env::var("TRAMVIA_DATA_DIR")
            .ok()
            .or(fc.server.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);
        std::fs::create_dir_all(&data_dir)?;

        let server = ServerConfig {
            port: std::env::var("TRAMVIA_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8080),
        };

        let timeout = Duration::from_secs(
            std::env::var("TRAMVIA_HTTP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.opendata.timeout_secs)
                .unwrap_or(10),
        );

        let opendata = OpenDataConfig {
            search_url: std::env::var("TRAMVIA_OPENDATA_URL")
                .ok()
                .or(fc.opendata.search_url)
                .unwrap_or_else(|| DEFAULT_OPENDATA_URL.to_string()),
            timeout,
        };

        let routing = RoutingConfig {
            osrm_url: std::env::var("TRAMVIA_OSRM_URL")
                .ok()
                .or(fc.routing.osrm_url)
                .unwrap_or_else(|| DEFAULT_OSRM_URL.to_string()),
            timeout,
        };

        let geocoding = GeocodingConfig {
            nominatim_url: std::env::var("TRAMVIA_NOMINATIM_URL")
                .ok()
                .or(fc.geocoding.nominatim_url)
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string()),
            user_agent: fc
                .geocoding
                .user_agent
                .unwrap_or_else(|| format!("tramvia/{}", env!("CARGO_PKG_VERSION"))),
            timeout,
        };

        let voice = VoiceConfig {
            language: std::env::var("TRAMVIA_STT_LANGUAGE")
                .ok()
                .or(fc.voice.language)
                .unwrap_or_else(|| "es-ES".to_string()),
            local_stt_url: std::env::var("TRAMVIA_LOCAL_STT_URL")
                .ok()
                .or(fc.voice.local_stt_url),
            web_speech_url: std::env::var("TRAMVIA_WEB_SPEECH_URL")
                .ok()
                .or(fc.voice.web_speech_url)
                .unwrap_or_else(|| DEFAULT_WEB_SPEECH_URL.to_string()),
            web_speech_key: std::env::var("TRAMVIA_WEB_SPEECH_KEY")
                .ok()
                .or(fc.voice.web_speech_key)
                .unwrap_or_default(),
            tts_url: std::env::var("TRAMVIA_TTS_URL")
                .ok()
                .or(fc.voice.tts_url)
                .unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
            audio_dir: data_dir.join("tts"),
            max_audio_bytes: fc.voice.max_audio_bytes.unwrap_or(5 * 1024 * 1024),
            audio_max_age: Duration::from_secs(fc.voice.audio_max_age_secs.unwrap_or(3600)),
            timeout,
        };

        Ok(Self {
            server,
            opendata,
            routing,
            geocoding,
            voice,
            data_dir,
        })
    }

    /// Path of the SQLite database file
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tramvia.db")
    }
}

/// Default data directory: `~/.local/share/tramvia` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("tramvia"))
}
