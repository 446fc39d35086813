//! HTTP client for the MediaWiki query API.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ClientError, Encyclopedia};

/// Default MediaWiki endpoint.
pub const DEFAULT_ENCYCLOPEDIA_URL: &str = "https://en.wikipedia.org/w/api.php";

const SEARCH_LIMIT: &str = "5";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    pageid: u64,
    /// Search rank when the pages come from a search generator.
    index: Option<u32>,
    extract: Option<String>,
}

/// Article extracts from a MediaWiki site.
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    base_url: String,
    client: Client,
}

impl WikipediaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }
}

/// Pick the first page, by search rank, whose extract is not blank.
fn first_extract(body: QueryResponse) -> Option<String> {
    let mut pages: Vec<Page> = body.query?.pages.into_values().collect();
    pages.sort_by_key(|p| (p.index.unwrap_or(u32::MAX), p.pageid));
    pages
        .into_iter()
        .filter_map(|p| p.extract)
        .map(|e| e.trim().to_string())
        .find(|e| !e.is_empty())
}

#[async_trait]
impl Encyclopedia for WikipediaClient {
    async fn extract(&self, title: &str) -> Result<Option<String>, ClientError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("generator", "search"),
                ("gsrsearch", title),
                ("gsrlimit", SEARCH_LIMIT),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }

        let body: QueryResponse = response.json().await?;
        Ok(first_extract(body))
    }
}
