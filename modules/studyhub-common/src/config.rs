use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::info;

/// Weights of the popularity score. Sign and magnitude are policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub upvotes: f64,
    pub downvotes: f64,
    pub favorites: f64,
    pub downloads: f64,
    pub comments: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            upvotes: 1.0,
            downvotes: -1.0,
            favorites: 2.0,
            downloads: 0.5,
            comments: 1.0,
        }
    }
}

impl Weights {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            upvotes: parsed_env("POPULARITY_WEIGHT_UPVOTES", defaults.upvotes),
            downvotes: parsed_env("POPULARITY_WEIGHT_DOWNVOTES", defaults.downvotes),
            favorites: parsed_env("POPULARITY_WEIGHT_FAVORITES", defaults.favorites),
            downloads: parsed_env("POPULARITY_WEIGHT_DOWNLOADS", defaults.downloads),
            comments: parsed_env("POPULARITY_WEIGHT_COMMENTS", defaults.comments),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
    pub base_url: String,

    // Sessions
    pub session_secret: String,

    // GitHub OAuth app
    pub github_client_id: String,
    pub github_client_secret: String,

    // Listings
    pub page_size: u32,
    pub weights: Weights,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        let page_size: u32 = parsed_env("PAGE_SIZE", 12);
        if page_size == 0 {
            panic!("PAGE_SIZE must be a positive integer");
        }

        Self {
            database_url: required_env("DATABASE_URL"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 3000),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            session_secret: required_env("SESSION_SECRET"),
            github_client_id: required_env("GITHUB_APP_CLIENT_ID"),
            github_client_secret: required_env("GITHUB_APP_CLIENT_SECRET"),
            page_size,
            weights: Weights::from_env(),
        }
    }

    /// Configuration for tests and local runs without a database or OAuth app.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            base_url: "http://localhost:3000".to_string(),
            session_secret: "test-session-secret".to_string(),
            github_client_id: "test-client-id".to_string(),
            github_client_secret: "test-client-secret".to_string(),
            page_size: 12,
            weights: Weights::default(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid number: {e}")),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
