//! Natural-language search over the history view.
//!
//! The records are listed in a prompt with their positions as IDs; the model
//! answers with a comma-separated list of matching IDs. Anything that is not
//! such a list selects nothing.

use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::types::{GenerateContentRequest, GenerateContentResponse, TransactionRecord};

const PROMPT_HEADER: &str = "You are a smart search tool for solana transactions. \
Your response must be numbers that represent transaction IDs, \
for example if IDs that match the search are 1,3 and 4, your response should be '1,3,4'. \
These are the transactions of current user: \n";

/// Build the search prompt for `records` and the user's `query`.
pub fn build_prompt(records: &[TransactionRecord], query: &str) -> String {
    let lines: Vec<String> = records
        .iter()
        .enumerate()
        .map(|(id, record)| {
            format!(
                "transaction ID: {id} {} sent {} {} to {}. Date and time of transaction: {}",
                record.sender_label(),
                record.amount,
                record.token,
                record.recipient_label(),
                record.time_label(),
            )
        })
        .collect();
    format!(
        "{PROMPT_HEADER}{}.\n\nThis is the search term: {query}",
        lines.join("\n")
    )
}

/// Parse the model's answer into record indices.
///
/// Accepts only a comma-separated list of integers in `0..len`, optionally
/// wrapped in quotes. Any other token makes the whole answer select nothing.
pub fn parse_index_response(text: &str, len: usize) -> BTreeSet<usize> {
    let body = text.trim().trim_matches(|c| matches!(c, '\'' | '"' | '`')).trim();
    if body.is_empty() {
        return BTreeSet::new();
    }
    let mut indices = BTreeSet::new();
    for token in body.split(',') {
        match token.trim().parse::<usize>() {
            Ok(index) if index < len => {
                indices.insert(index);
            }
            _ => {
                debug!(token, "unusable search response");
                return BTreeSet::new();
            }
        }
    }
    indices
}

/// Records at `indices`, in their original order.
pub fn filter_records(
    records: &[TransactionRecord],
    indices: &BTreeSet<usize>,
) -> Vec<TransactionRecord> {
    records
        .iter()
        .enumerate()
        .filter(|(i, _)| indices.contains(i))
        .map(|(_, r)| r.clone())
        .collect()
}

/// Records whose sender or recipient address contains `term`.
pub fn filter_by_address(records: &[TransactionRecord], term: &str) -> Vec<TransactionRecord> {
    let term = term.trim();
    if term.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| r.sender.contains(term) || r.recipient.contains(term))
        .cloned()
        .collect()
}

/// Client for the `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GenerativeClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GenerativeClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(WalletError::Search("API key is required".into()));
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Client for the configured endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Search` when no API key is configured.
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        let api_key = config
            .generative_api_key
            .as_deref()
            .ok_or_else(|| WalletError::Search("GEMINI_API_KEY is not set".into()))?;
        Self::new(
            &config.generative_url,
            &config.generative_model,
            api_key,
            config.request_timeout,
        )
    }

    /// Single-turn generation; returns the first candidate's text.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Search` when the response carries no candidate.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.request(prompt)
            .await?
            .text()
            .ok_or_else(|| WalletError::Search("response has no candidates".into()))
    }

    async fn request(&self, prompt: &str) -> Result<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(WalletError::Http { status, message });
        }

        Ok(resp.json().await?)
    }

    /// Ask the model which of `records` match `query`.
    ///
    /// An answer without candidates, such as a blocked prompt, matches
    /// nothing. Transport and HTTP failures are still errors.
    pub async fn search(
        &self,
        records: &[TransactionRecord],
        query: &str,
    ) -> Result<Vec<TransactionRecord>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.request(&build_prompt(records, query)).await?;
        let Some(answer) = response.text() else {
            warn!(
                query,
                block_reason = response.block_reason().unwrap_or("none"),
                "search response has no candidates"
            );
            return Ok(Vec::new());
        };
        let indices = parse_index_response(&answer, records.len());
        if indices.is_empty() {
            warn!(query, "search matched nothing");
        }
        Ok(filter_records(records, &indices))
    }
}
