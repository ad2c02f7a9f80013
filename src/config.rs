use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Without it the service keeps data in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL for catalog lookups. Without it lookups are not cached.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Gemini API key
    pub google_generative_ai_api_key: String,

    /// Gemini model used for recommendations
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Spotify client-credentials pair
    pub spotify_client_id: String,
    pub spotify_client_secret: String,

    /// Spotify Web API base URL
    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    /// Spotify accounts (token) base URL
    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts_url: String,

    /// Firebase project that issues the ID tokens we accept
    pub firebase_project_id: String,

    /// Service account JSON, required only for account deletion
    #[serde(default)]
    pub firebase_service_account_json: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Candidates tried before giving up on catalog verification
    #[serde(default = "default_max_verification_attempts")]
    pub max_verification_attempts: usize,

    /// Model turns allowed per candidate
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_verification_attempts() -> usize {
    3
}

fn default_max_tool_iterations() -> usize {
    6
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
