use crate::api::outcome::{classify_failure, SubmissionError};
use crate::models::{OddsResponse, PeriodKey, PriorWager, UserWeekBets};
use crate::utils::submission::WagerRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Anything that can persist a wager. The live client talks HTTP; tests swap
/// in a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WagerGateway: Send + Sync {
    /// Persist one wager and return the stored record
    async fn create_wager(&self, request: &WagerRequest) -> Result<PriorWager, SubmissionError>;
}

pub struct WagerApiClient {
    api_endpoint: String,
    id_token: Option<String>,
    client: reqwest::Client,
}

impl WagerApiClient {
    pub fn new(api_endpoint: String, id_token: Option<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            id_token,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.api_endpoint, route)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.id_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch the game feed for a period
    pub async fn fetch_odds(&self, period: PeriodKey) -> Result<OddsResponse> {
        info!("Loading games for {}...", period);

        let response = self
            .authorized(self.client.get(self.url("/odds/get_nfl_odds")))
            .query(&[
                ("week", period.week.to_string()),
                ("year", period.year.to_string()),
                ("season_type", period.season_type.id().to_string()),
            ])
            .send()
            .await
            .context("Failed to fetch odds from the wager API")?;

        if !response.status().is_success() {
            anyhow::bail!("Odds endpoint returned error: {}", response.status());
        }

        let odds: OddsResponse = read_envelope(response)
            .await
            .context("Failed to parse odds response")?;
        debug!("Received {} games for {}", odds.odds.len(), period);
        Ok(odds)
    }

    /// Fetch the bettor's persisted wagers for the server's current week
    pub async fn fetch_current_week_bets(&self) -> Result<UserWeekBets> {
        if self.id_token.is_none() {
            anyhow::bail!("Authentication required to load placed bets");
        }

        let response = self
            .authorized(self.client.get(self.url("/bet/get_user_bets_for_current_week")))
            .send()
            .await
            .context("Failed to fetch placed bets")?;

        if !response.status().is_success() {
            anyhow::bail!("Bets endpoint returned error: {}", response.status());
        }

        read_envelope(response)
            .await
            .context("Failed to parse placed bets response")
    }
}

/// Some endpoints wrap their payload in `{"data": ...}`
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").map_or(false, Value::is_object) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body: Value = response.json().await?;
    Ok(serde_json::from_value(unwrap_envelope(body))?)
}

#[async_trait]
impl WagerGateway for WagerApiClient {
    async fn create_wager(&self, request: &WagerRequest) -> Result<PriorWager, SubmissionError> {
        if self.id_token.is_none() {
            return Err(SubmissionError::AuthenticationRequired);
        }

        let response = self
            .authorized(self.client.post(self.url("/bet/create")))
            .json(request)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        if !status.is_success() {
            let error = classify_failure(status.as_u16(), &body);
            warn!("Wager on game {} rejected: {}", request.game_id, error);
            return Err(error);
        }

        let created = serde_json::from_str::<Value>(&body)
            .map(unwrap_envelope)
            .and_then(serde_json::from_value::<PriorWager>)
            .unwrap_or_else(|e| {
                // accepted but unreadable; rebuild the record from what was sent
                debug!("Unparseable create response ({}), using request", e);
                PriorWager::default()
            });

        Ok(PriorWager {
            game_id: created.game_id.or_else(|| Some(request.game_id.clone())),
            points_wagered: created
                .points_wagered
                .or(Some(request.game_bet.points_wagered().value())),
            event_datetime: created.event_datetime.or(Some(request.event_datetime)),
            ..created
        })
    }
}
