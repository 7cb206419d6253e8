use dotenvy::dotenv;
use std::env;

use crate::error::FlagError;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// When unset the service keeps flags in memory.
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, FlagError> {
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FlagError> {
        let port = lookup("PORT")
            .ok_or_else(|| FlagError::Config("PORT missing, it is required".to_string()))?
            .parse()
            .map_err(|_| FlagError::Config("PORT must be a valid u16 number".to_string()))?;

        let host = lookup("HOST")
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());

        Ok(Self {
            host,
            port,
            database_url,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
