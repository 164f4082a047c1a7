//! AdBounty API client
//!
//! Read-only access to the endpoints the bots render for users.

use adbounty::models::{Bounty, Channel, Deal, Transaction, UserId};
use anyhow::{anyhow, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BountyEnvelope {
    bounty: Bounty,
}

#[derive(Debug, Deserialize)]
struct BountiesEnvelope {
    bounties: Vec<Bounty>,
}

#[derive(Debug, Deserialize)]
struct DealsEnvelope {
    deals: Vec<Deal>,
}

#[derive(Debug, Deserialize)]
struct TransactionsEnvelope {
    transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
struct ChannelsEnvelope {
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

pub struct AdBountyClient {
    client: Client,
    base_url: String,
}

impl AdBountyClient {
    pub fn new(api_url: &str) -> Self {
        // Build HTTP client with timeout, falling back to default client if builder fails
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::decode(resp, what).await
    }

    async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let text = resp.text().await.unwrap_or_else(|_| "Unknown error".into());
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.detail)
                .unwrap_or(text);
            Err(anyhow!("Failed to fetch {} ({}): {}", what, status, detail))
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json("health", "health").await
    }

    pub async fn get_bounty(&self, bounty_id: &str) -> Result<Bounty> {
        let env: BountyEnvelope = self
            .get_json(&format!("bounties/{}", bounty_id), "bounty")
            .await?;
        Ok(env.bounty)
    }

    pub async fn user_bounties(&self, user_id: UserId) -> Result<Vec<Bounty>> {
        let env: BountiesEnvelope = self
            .get_json(&format!("bounties/user/{}", user_id), "bounties")
            .await?;
        Ok(env.bounties)
    }

    pub async fn user_deals(&self, user_id: UserId) -> Result<Vec<Deal>> {
        let env: DealsEnvelope = self
            .get_json(&format!("deals/user/{}", user_id), "deals")
            .await?;
        Ok(env.deals)
    }

    pub async fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let env: TransactionsEnvelope = self
            .get_json(&format!("transactions/{}", user_id), "transactions")
            .await?;
        Ok(env.transactions)
    }

    pub async fn verified_channels(&self) -> Result<Vec<Channel>> {
        let env: ChannelsEnvelope = self.get_json("channels/verified", "channels").await?;
        Ok(env.channels)
    }
}
