use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    /// HS256 secret shared with the auth provider that issues session tokens
    pub session_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub storage: StorageConfig,
    pub vision: VisionConfig,
    /// First sign-in with this email is created as an admin
    pub admin_email: Option<String>,
}

#[derive(Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub model: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            session_secret: env::var("SESSION_SECRET")
                .expect("SESSION_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            storage: StorageConfig {
                base_url: env::var("STORAGE_URL")
                    .expect("STORAGE_URL must be set")
                    .trim_end_matches('/')
                    .to_string(),
                service_key: env::var("STORAGE_SERVICE_KEY")
                    .expect("STORAGE_SERVICE_KEY must be set"),
                bucket: env::var("STORAGE_BUCKET")
                    .unwrap_or_else(|_| "car-listing-image".to_string()),
            },
            vision: VisionConfig {
                api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            },
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|e| !e.is_empty()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
