use config::{Config, File};
use reqwest::Url;
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::scheduler::DailySchedule;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load the configuration files.")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub news_api: NewsApiSettings,
    pub digest: DigestSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub base_url: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub username: String,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub password: Secret<String>,
    pub sender_email: String,
    pub sender_name: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct NewsApiSettings {
    pub base_url: String,
    pub api_key: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct DigestSettings {
    pub subject: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub hour: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub minute: u32,
    pub scheduler_enabled: bool,
}

impl Settings {
    /// Checks the values that would otherwise only fail once the first digest
    /// goes out.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.email_client.get_sender_email()?;
        self.digest.get_schedule()?;
        self.get_app_base_url()?;

        if self.email_client.host.trim().is_empty() {
            return Err(ConfigurationError::Invalid(String::from(
                "email_client.host is empty",
            )));
        }

        if self.email_client.username.trim().is_empty() {
            return Err(ConfigurationError::Invalid(String::from(
                "email_client.username is empty",
            )));
        }

        if self.news_api.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigurationError::Invalid(String::from(
                "news_api.api_key is empty",
            )));
        }

        Ok(())
    }

    pub fn get_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Public address the unsubscribe links point at. It must be an absolute
    /// url that can carry a path.
    pub fn get_app_base_url(&self) -> Result<Url, ConfigurationError> {
        let url = Url::parse(&self.application.base_url).map_err(|err| {
            ConfigurationError::Invalid(format!("application.base_url: {}", err))
        })?;

        if url.cannot_be_a_base() {
            return Err(ConfigurationError::Invalid(format!(
                "application.base_url: {} cannot carry a path",
                self.application.base_url
            )));
        }

        Ok(url)
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }

    pub fn set_news_api_base_url(&mut self, new_base_url: String) {
        self.news_api.base_url = new_base_url
    }

    pub fn set_db_url(&mut self, url: String) {
        self.database.url = url
    }
}

impl DatabaseSettings {
    pub fn get_db_options(&self) -> Result<SqliteConnectOptions, ConfigurationError> {
        let db_options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|err| ConfigurationError::Invalid(format!("database.url: {}", err)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .log_statements(log::LevelFilter::Trace);

        Ok(db_options)
    }

    /// An in-memory database lives as long as its connection, so the pool
    /// must hold exactly one.
    pub fn get_max_connections(&self) -> u32 {
        if self.url.contains(":memory:") {
            1
        } else {
            self.max_connections.max(1)
        }
    }
}

impl EmailClientSettings {
    pub fn get_sender_email(&self) -> Result<SubscriberEmail, ConfigurationError> {
        SubscriberEmail::parse(self.sender_email.clone())
            .map_err(|err| ConfigurationError::Invalid(format!("email_client.sender_email: {}", err)))
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl NewsApiSettings {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl DigestSettings {
    pub fn get_schedule(&self) -> Result<DailySchedule, ConfigurationError> {
        DailySchedule::new(self.hour, self.minute)
            .map_err(|err| ConfigurationError::Invalid(format!("digest schedule: {}", err)))
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigurationError> {
    let root_path = std::env::current_dir().map_err(|err| {
        ConfigurationError::Invalid(format!("Failed to determine the current directory: {}", err))
    })?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigurationError::Invalid)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(environment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_NEWS_API__API_KEY would set Settings.news_api.api_key
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", environment);

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}
