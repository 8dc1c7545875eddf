use anyhow::{anyhow, Result};
use std::env;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/king-says.db";
const DEFAULT_PLACEHOLDERS_PATH: &str = "./data/placeholders.json";
const DEFAULT_WEB_MESSAGE_CAPACITY: i64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub placeholders_path: String,
    /// How many recent messages a web player can still fetch.
    pub web_message_capacity: i64,
    /// Base URL of the companion web page. That page, not this process,
    /// serves `/invite/{token}` and talks to the `/join` API here.
    pub public_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;
        
        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }
        
        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        let placeholders_path = non_empty_var("PLACEHOLDERS_PATH")
            .unwrap_or_else(|| DEFAULT_PLACEHOLDERS_PATH.to_string());

        let web_message_capacity = match non_empty_var("WEB_MESSAGE_CAPACITY") {
            Some(value) => value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or_else(|| anyhow!("Invalid WEB_MESSAGE_CAPACITY"))?,
            None => DEFAULT_WEB_MESSAGE_CAPACITY,
        };

        let public_url = non_empty_var("PUBLIC_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string());
        
        Ok(Config {
            telegram_bot_token: token,
            database_url: Self::database_url_from_env(),
            http_port,
            placeholders_path,
            web_message_capacity,
            public_url,
        })
    }

    /// `DATABASE_URL` or the default SQLite file; needs no bot token.
    pub fn database_url_from_env() -> String {
        non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    /// Shareable link to the external invite page, `None` without `PUBLIC_URL`.
    ///
    /// The `/invite` route is not served by this crate's HTTP server.
    pub fn invite_link(&self, session_token: &str) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|url| format!("{url}/invite/{session_token}"))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
