//! Service configuration.
//!
//! Everything is read from the environment once at startup; there is no
//! config file and no reload. Missing required values fail fast with a
//! message naming the variable.

use std::path::PathBuf;

use common::Secret;
use cosmetics::DEFAULT_CATALOG_URL;
use epic_auth::OAuthApp;

const DEFAULT_STORE_PATH: &str = "epic_links.json";
const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration for the link service.
#[derive(Debug)]
pub struct Config {
    /// OAuth client id registered with Epic (`EPIC_CLIENT_ID`).
    pub client_id: String,
    /// Optional confidential-client secret (`EPIC_CLIENT_SECRET`).
    pub client_secret: Option<Secret<String>>,
    /// Callback URL registered for this client (`EPIC_REDIRECT_URI`).
    pub redirect_uri: String,
    /// Optional API key sent to the catalog service (`CATALOG_API_KEY`).
    pub catalog_api_key: Option<Secret<String>>,
    /// Path of the JSON token store (`TOKEN_STORE_PATH`).
    pub store_path: PathBuf,
    /// Listen port (`PORT`).
    pub port: u16,
    /// Catalog endpoint. Fixed at the public default; tests point this
    /// at a local mock.
    pub catalog_url: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `EPIC_CLIENT_ID` and `EPIC_REDIRECT_URI` are required; everything
    /// else has a default or is optional. Blank values count as unset.
    pub fn from_env() -> common::Result<Self> {
        let client_id = required("EPIC_CLIENT_ID")?;
        let redirect_uri = required("EPIC_REDIRECT_URI")?;
        if !redirect_uri.starts_with("http://") && !redirect_uri.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "EPIC_REDIRECT_URI must be an http(s) URL, got: {redirect_uri}"
            )));
        }

        let client_secret = optional("EPIC_CLIENT_SECRET").map(Secret::new);
        let catalog_api_key = optional("CATALOG_API_KEY").map(Secret::new);

        let store_path = optional("TOKEN_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let port = match optional("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                common::Error::Config(format!("PORT must be a port number, got: {raw}"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            catalog_api_key,
            store_path,
            port,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
        })
    }

    /// The OAuth application identity described by this config.
    pub fn oauth_app(&self) -> OAuthApp {
        OAuthApp::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.redirect_uri.clone(),
        )
    }
}

fn required(key: &str) -> common::Result<String> {
    optional(key).ok_or_else(|| common::Error::Config(format!("{key} is required")))
}

fn optional(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => {
            let value = value.trim();
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
        Err(_) => None,
    }
}
