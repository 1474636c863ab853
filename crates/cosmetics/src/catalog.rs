//! Public cosmetics catalog client
//!
//! Fetches the full battle-royale cosmetics catalog in one request. The
//! catalog is public data; the optional API key only raises rate limits.
//! No caching and no retries: a failed fetch is the caller's problem to
//! surface, and the ownership projection explicitly refuses to serve stale
//! or partial guesses.

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Default catalog endpoint (full item dump, one JSON document).
pub const DEFAULT_CATALOG_URL: &str = "https://fortnite-api.com/v2/cosmetics/br";

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<CatalogItem>,
}

/// One catalog entry, reduced to the fields classification needs.
///
/// Everything except `id` and `name` is optional on the wire; unreleased
/// items routinely ship with `null` metadata. Use the accessor methods
/// rather than the raw fields to get the tolerant view.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: Option<TypeInfo>,
    #[serde(default)]
    pub rarity: Option<RarityInfo>,
    #[serde(default)]
    pub images: Option<ImageSet>,
    #[serde(default)]
    pub introduction: Option<Introduction>,
    #[serde(default)]
    pub gameplay_tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeInfo {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RarityInfo {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSet {
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub small_icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Introduction {
    #[serde(default)]
    pub text: String,
}

impl CatalogItem {
    /// Declared category (`outfit`, `pickaxe`, `emote`, ...), empty when absent.
    pub fn type_value(&self) -> &str {
        self.item_type.as_ref().map(|t| t.value.as_str()).unwrap_or("")
    }

    /// Rarity label, empty when absent.
    pub fn rarity_value(&self) -> &str {
        self.rarity.as_ref().map(|r| r.value.as_str()).unwrap_or("")
    }

    /// Icon URL, falling back to the small icon, empty when neither exists.
    pub fn icon(&self) -> &str {
        self.images
            .as_ref()
            .and_then(|i| i.icon.as_deref().or(i.small_icon.as_deref()))
            .unwrap_or("")
    }

    /// Introduction text ("Introduced in Chapter 2, Season 5."), empty when absent.
    pub fn introduction_text(&self) -> &str {
        self.introduction.as_ref().map(|i| i.text.as_str()).unwrap_or("")
    }

    /// Gameplay tags, empty slice when absent.
    pub fn tags(&self) -> &[String] {
        self.gameplay_tags.as_deref().unwrap_or(&[])
    }
}

/// Fetch the full catalog.
///
/// Sends the API key in `Authorization` when one is configured. Non-2xx
/// responses and undecodable bodies are hard errors carrying the status and
/// body text; so is a well-formed response with zero items, since an empty
/// catalog can only mean the upstream is broken.
pub async fn fetch_catalog(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
) -> Result<Vec<CatalogItem>> {
    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request.header(reqwest::header::AUTHORIZATION, key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("catalog request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Http(format!(
            "catalog endpoint returned {status}: {body}"
        )));
    }

    let catalog = response
        .json::<CatalogResponse>()
        .await
        .map_err(|e| Error::Parse(format!("invalid catalog response: {e}")))?;

    if catalog.data.is_empty() {
        return Err(Error::Empty);
    }

    debug!(items = catalog.data.len(), "fetched cosmetics catalog");
    Ok(catalog.data)
}
