// Draw Lottery - Persistence Gateway
//
// Client for the lottery store:
//   POST   /lottery/save   bearer (authenticated)   {lotteryId, data}
//   GET    /lottery        bearer (public accepted)
//   GET    /lottery/:id    no auth
//   DELETE /lottery/:id    bearer (authenticated)
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{LotteryError, LotteryResult};
use crate::state::Run;

/// Body of a save request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest<'a> {
    pub lottery_id: &'a str,
    pub data: &'a Run,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lottery_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// A run as the store keeps it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLottery {
    pub lottery_id: String,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub data: Run,
}

/// Confirmation of a successful save
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveReceipt {
    pub success: bool,
    pub id: String,
}

/// One row of the saved-lottery listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub participant_count: usize,
    pub prize_count: usize,
    pub saved_at: Option<DateTime<Utc>>,
}

impl From<&StoredLottery> for RunSummary {
    fn from(stored: &StoredLottery) -> Self {
        Self {
            id: stored.lottery_id.clone(),
            created_at: stored.data.created_at,
            participant_count: stored.data.participants.len(),
            prize_count: stored.data.prizes.len(),
            saved_at: stored.saved_at,
        }
    }
}

/// HTTP client for saving, listing, fetching and deleting finalized runs.
/// Cloning is cheap and shares the connection pool.
#[derive(Clone, Debug)]
pub struct LotteryGateway {
    client: Client,
    config: StoreConfig,
}

impl LotteryGateway {
    pub fn new(config: StoreConfig) -> LotteryResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn lottery_url(&self, id: &str) -> String {
        self.url(&format!("/lottery/{}", utf8_percent_encode(id, NON_ALPHANUMERIC)))
    }

    /// Accept only a real caller token; the public key never authorizes writes
    fn authenticated<'a>(&self, auth_token: Option<&'a str>) -> LotteryResult<&'a str> {
        match auth_token.map(str::trim) {
            Some(token) if !token.is_empty() && token != self.config.public_key => Ok(token),
            _ => {
                warn!("Rejected store write without an authenticated token");
                Err(LotteryError::AuthRequired)
            }
        }
    }

    async fn send(request: RequestBuilder, id: Option<&str>) -> LotteryResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(LotteryError::AuthRequired),
            StatusCode::NOT_FOUND => Err(LotteryError::NotFound(id.unwrap_or_default().to_string())),
            status if !status.is_success() => Err(LotteryError::Network(format!(
                "Store responded with {}",
                status
            ))),
            _ => Ok(response),
        }
    }

    /// Upsert a run under `id`
    pub async fn save(
        &self,
        id: &str,
        run: &Run,
        auth_token: Option<&str>,
    ) -> LotteryResult<SaveReceipt> {
        let token = self.authenticated(auth_token)?;

        let request = self
            .client
            .post(self.url("/lottery/save"))
            .bearer_auth(token)
            .json(&SaveRequest {
                lottery_id: id,
                data: run,
            });
        let body: SaveResponse = Self::send(request, Some(id)).await?.json().await?;
        if !body.success {
            return Err(LotteryError::Network(
                body.message.unwrap_or_else(|| "Save was not accepted".into()),
            ));
        }

        let id = body.lottery_id.unwrap_or_else(|| id.to_string());
        info!("Lottery saved ({} participants)", run.participants.len());
        debug!("Saved lottery id {}", id);
        Ok(SaveReceipt { success: true, id })
    }

    /// Saved runs, most recently saved first
    pub async fn list(&self, auth_token: Option<&str>) -> LotteryResult<Vec<RunSummary>> {
        let bearer = auth_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .unwrap_or(self.config.public_key.as_str());

        let request = self.client.get(self.url("/lottery")).bearer_auth(bearer);
        let body: Envelope<Vec<serde_json::Value>> = Self::send(request, None).await?.json().await?;
        if !body.success {
            return Err(LotteryError::Network(
                body.message.unwrap_or_else(|| "Listing failed".into()),
            ));
        }

        let mut summaries: Vec<RunSummary> = body
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<StoredLottery>(entry) {
                Ok(stored) => Some(RunSummary::from(&stored)),
                Err(e) => {
                    warn!("Skipping unreadable stored lottery: {}", e);
                    None
                }
            })
            .collect();
        // None sorts first ascending, so reversing puts undated entries last
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }

    /// Fetch one stored run
    pub async fn get(&self, id: &str) -> LotteryResult<Run> {
        let request = self.client.get(self.lottery_url(id));
        let body: Envelope<serde_json::Value> = Self::send(request, Some(id)).await?.json().await?;
        if !body.success {
            return Err(LotteryError::Network(
                body.message.unwrap_or_else(|| "Fetch failed".into()),
            ));
        }

        let entry = body
            .data
            .ok_or_else(|| LotteryError::NotFound(id.to_string()))?;
        let stored: StoredLottery = serde_json::from_value(entry)?;
        stored
            .data
            .validate()
            .map_err(|e| LotteryError::Decode(e.to_string()))?;
        Ok(stored.data)
    }

    /// Remove a stored run
    pub async fn delete(&self, id: &str, auth_token: Option<&str>) -> LotteryResult<()> {
        let token = self.authenticated(auth_token)?;

        let request = self.client.delete(self.lottery_url(id)).bearer_auth(token);
        Self::send(request, Some(id)).await?;
        info!("Lottery deleted");
        debug!("Deleted lottery id {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> LotteryGateway {
        LotteryGateway::new(StoreConfig::new("http://127.0.0.1:1")).unwrap()
    }

    #[test]
    fn public_key_and_blank_tokens_are_not_authenticated() {
        let gateway = gateway();
        assert_eq!(gateway.authenticated(None), Err(LotteryError::AuthRequired));
        assert_eq!(gateway.authenticated(Some("  ")), Err(LotteryError::AuthRequired));
        assert_eq!(
            gateway.authenticated(Some("public")),
            Err(LotteryError::AuthRequired)
        );
        assert_eq!(gateway.authenticated(Some("user-jwt")), Ok("user-jwt"));
    }

    #[test]
    fn ids_are_escaped_in_paths() {
        let gateway = gateway();
        assert_eq!(
            gateway.lottery_url("LOTTERY-v1.ab_c"),
            "http://127.0.0.1:1/lottery/LOTTERY%2Dv1%2Eab%5Fc"
        );
    }

    #[test]
    fn summary_counts_entries() {
        let mut run = Run::new();
        run.add_participant("Finn", 1).unwrap();
        run.add_prize("Hat").unwrap();
        run.add_prize("Scarf").unwrap();
        let stored = StoredLottery {
            lottery_id: "abc".into(),
            saved_at: None,
            data: run.clone(),
        };
        let summary = RunSummary::from(&stored);
        assert_eq!(summary.participant_count, 1);
        assert_eq!(summary.prize_count, 2);
        assert_eq!(summary.created_at, run.created_at);
    }

    #[tokio::test]
    async fn writes_without_token_never_reach_the_network() {
        let gateway = gateway();
        let run = Run::new();
        assert_eq!(
            gateway.save("abc", &run, None).await,
            Err(LotteryError::AuthRequired)
        );
        assert_eq!(
            gateway.delete("abc", Some("public")).await,
            Err(LotteryError::AuthRequired)
        );
    }
}
