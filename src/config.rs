use crate::error::{config_error, env_error, BotResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Default subject filter for meeting-request mails
pub const DEFAULT_SUBJECT_FILTER: &str = "create event";

/// Default Gemini model used for extraction
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Mailbox address the bot polls and sends from
    pub email_address: String,
    /// Mailbox password (app password for most providers)
    pub email_password: String,
    /// IMAP server host
    pub imap_host: String,
    /// IMAP server port
    pub imap_port: u16,
    /// SMTP server host
    pub smtp_host: String,
    /// Gemini API key
    pub gemini_api_key: String,
    /// Gemini model used for extraction
    pub gemini_model: String,
    /// Subject filter for the mailbox search
    pub subject_filter: String,
    /// Path to the SQLite event database
    pub database_path: String,
    /// Timezone in which extracted local times are interpreted
    pub timezone: String,
}

/// Optional overrides loaded from config/kutsubotti.toml
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    gemini_model: Option<String>,
    subject_filter: Option<String>,
    database_path: Option<String>,
    timezone: Option<String>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let email_address =
            env::var("EMAIL_ADDRESS").map_err(|_| env_error("EMAIL_ADDRESS"))?;
        let email_password =
            env::var("EMAIL_PASSWORD").map_err(|_| env_error("EMAIL_PASSWORD"))?;
        let gemini_api_key =
            env::var("GEMINI_API_KEY").map_err(|_| env_error("GEMINI_API_KEY"))?;

        // Optional, with provider defaults
        let imap_host =
            env::var("IMAP_HOST").unwrap_or_else(|_| String::from("imap.gmail.com"));
        let imap_port = match env::var("IMAP_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|_| env_error("Invalid IMAP_PORT format"))?,
            Err(_) => 993,
        };
        let smtp_host =
            env::var("SMTP_HOST").unwrap_or_else(|_| String::from("smtp.gmail.com"));

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| String::from(DEFAULT_GEMINI_MODEL));
        let subject_filter =
            env::var("SUBJECT_FILTER").unwrap_or_else(|_| String::from(DEFAULT_SUBJECT_FILTER));
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| String::from("events.db"));
        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC"));

        let mut config = Config {
            email_address,
            email_password,
            imap_host,
            imap_port,
            smtp_host,
            gemini_api_key,
            gemini_model,
            subject_filter,
            database_path,
            timezone,
        };

        // Apply overrides from file if it exists
        if let Ok(content) = fs::read_to_string("config/kutsubotti.toml") {
            let overrides: FileOverrides = toml::from_str(&content)?;
            config.apply_overrides(overrides);
        }

        Ok(config)
    }

    fn apply_overrides(&mut self, overrides: FileOverrides) {
        if let Some(model) = overrides.gemini_model {
            self.gemini_model = model;
        }
        if let Some(filter) = overrides.subject_filter {
            self.subject_filter = filter;
        }
        if let Some(path) = overrides.database_path {
            self.database_path = path;
        }
        if let Some(timezone) = overrides.timezone {
            self.timezone = timezone;
        }
    }

    /// Parse the configured timezone name
    pub fn timezone(&self) -> BotResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Invalid timezone: {}", self.timezone)))
    }
}
