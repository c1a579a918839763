use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub settings_path: String,
    pub uploads_dir: String,
    pub host: String,
    pub port: u16,
    /// Base URL the visitor app is served from; used to build QR and short URLs.
    pub public_base_url: String,
    pub cors_origins: Vec<String>,
    // Admin auth (disabled when no password is configured)
    pub admin_password: Option<String>,
    pub session_secret: String,
    pub session_days: i64,
    // Third-party services (all optional)
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub google_vision_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub libretranslate_url: String,
    pub libretranslate_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let admin_password = optional("ADMIN_PASSWORD");
        let session_secret = match optional("SESSION_SECRET") {
            Some(secret) => secret,
            None => {
                if admin_password.is_some() {
                    tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
                }
                random_secret()
            }
        };

        Ok(Self {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "data/dev.db".into()),
            settings_path: env::var("SETTINGS_PATH")
                .unwrap_or_else(|_| "data/settings.json".into()),
            uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into())
                .trim_end_matches('/')
                .to_string(),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            admin_password,
            session_secret,
            session_days: env::var("SESSION_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
            gemini_api_key: optional("GEMINI_API_KEY").or_else(|| optional("VITE_GEMINI_API_KEY")),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".into()),
            google_vision_api_key: optional("GOOGLE_VISION_API_KEY"),
            google_maps_api_key: optional("GOOGLE_MAPS_API_KEY"),
            deepgram_api_key: optional("DEEPGRAM_API_KEY"),
            elevenlabs_api_key: optional("ELEVENLABS_API_KEY"),
            libretranslate_url: env::var("LIBRETRANSLATE_URL")
                .unwrap_or_else(|_| "https://libretranslate.com".into())
                .trim_end_matches('/')
                .to_string(),
            libretranslate_api_key: optional("LIBRETRANSLATE_API_KEY"),
        })
    }

    /// Configuration for tests and tools: local paths, no auth, no external keys.
    pub fn for_paths(database_path: &str, settings_path: &str, uploads_dir: &str) -> Self {
        Self {
            database_path: database_path.into(),
            settings_path: settings_path.into(),
            uploads_dir: uploads_dir.into(),
            host: "127.0.0.1".into(),
            port: 3000,
            public_base_url: "http://localhost:5173".into(),
            cors_origins: Vec::new(),
            admin_password: None,
            session_secret: "test-session-secret".into(),
            session_days: 7,
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".into(),
            google_vision_api_key: None,
            google_maps_api_key: None,
            deepgram_api_key: None,
            elevenlabs_api_key: None,
            libretranslate_url: "https://libretranslate.com".into(),
            libretranslate_api_key: None,
        }
    }

    pub fn auth_required(&self) -> bool {
        self.admin_password.is_some()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn random_secret() -> String {
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
