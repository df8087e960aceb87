//! Web search collaborator
//!
//! DuckDuckGo's Instant Answer API backs the `web_search` tool. Results come
//! back in the provider's raw shape; the tool maps them to title/url/snippet.

use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A search hit as the provider reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSearchResult {
    pub title: Option<String>,
    pub href: Option<String>,
    pub body: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, SearchError>;
}

/// DuckDuckGo Instant Answer client.
///
/// The endpoint only knows encyclopedic abstracts and related topics. It has
/// no news or live quotes, so queries like "precio bitcoin hoy" usually come
/// back with zero hits. An empty list is a normal answer, not an error.
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("financial-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, SearchError> {
        debug!(query, max_results, "Searching DuckDuckGo");

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let answer: InstantAnswer = response.json().await?;
        Ok(answer.into_results(max_results))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a single topic or a named group of topics
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Topic {
        #[serde(rename = "Text", default)]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
}

impl InstantAnswer {
    fn into_results(self, max_results: usize) -> Vec<RawSearchResult> {
        let mut results = Vec::new();

        if !self.abstract_text.is_empty() {
            results.push(RawSearchResult {
                title: Some(self.heading.clone()),
                href: non_empty(self.abstract_url),
                body: Some(self.abstract_text),
            });
        }

        flatten_topics(self.related_topics, &mut results);
        results.truncate(max_results);
        results
    }
}

fn flatten_topics(topics: Vec<RelatedTopic>, out: &mut Vec<RawSearchResult>) {
    for topic in topics {
        match topic {
            RelatedTopic::Group { topics } => flatten_topics(topics, out),
            RelatedTopic::Topic { text, first_url } => {
                if text.is_empty() {
                    continue;
                }
                // Topic text reads "Title - snippet"
                let title = text.split(" - ").next().unwrap_or(&text).to_string();
                out.push(RawSearchResult {
                    title: Some(title),
                    href: non_empty(first_url),
                    body: Some(text),
                });
            }
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Fixed result set, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    results: Vec<RawSearchResult>,
}

impl StaticSearch {
    pub fn new(results: Vec<RawSearchResult>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, SearchError> {
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}
