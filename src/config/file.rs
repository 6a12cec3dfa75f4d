//! TOML configuration file loading
//!
//! Supports `~/.config/tramvia/config.toml` as a persistent config source.
//! All fields are optional, the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TramviaConfigFile {
    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Open data endpoints
    #[serde(default)]
    pub opendata: OpenDataFileConfig,

    /// Routing endpoint
    #[serde(default)]
    pub routing: RoutingFileConfig,

    /// Geocoding endpoint
    #[serde(default)]
    pub geocoding: GeocodingFileConfig,

    /// Voice processing configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Data directory override (database, audio artifacts)
    pub data_dir: Option<String>,
}

/// Open data endpoints
#[derive(Debug, Default, Deserialize)]
pub struct OpenDataFileConfig {
    /// OpenDataSoft search URL
    pub search_url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Routing endpoint
#[derive(Debug, Default, Deserialize)]
pub struct RoutingFileConfig {
    /// OSRM server base URL
    pub osrm_url: Option<String>,
}

/// Geocoding endpoint
#[derive(Debug, Default, Deserialize)]
pub struct GeocodingFileConfig {
    /// Nominatim server base URL
    pub nominatim_url: Option<String>,

    /// User-Agent header sent to the geocoder
    pub user_agent: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Recognition language tag (e.g. "es-ES")
    pub language: Option<String>,

    /// Local recognizer server URL (primary STT)
    pub local_stt_url: Option<String>,

    /// Hosted web speech API URL (fallback STT)
    pub web_speech_url: Option<String>,

    /// Hosted web speech API key
    pub web_speech_key: Option<String>,

    /// Speech synthesis endpoint URL
    pub tts_url: Option<String>,

    /// Max accepted upload size in bytes
    pub max_audio_bytes: Option<u64>,

    /// Synthesized audio retention in seconds
    pub audio_max_age_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `TramviaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> TramviaConfigFile {
    let Some(path) = config_file_path() else {
        return TramviaConfigFile::default();
    };

    if !path.exists() {
        return TramviaConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TramviaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TramviaConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/tramvia/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("tramvia").join("config.toml"))
}
