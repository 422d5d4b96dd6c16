pub mod api;
pub mod config;
pub mod models;
pub mod utils;

pub use api::*;
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use api::wager_api::WagerApiClient;
use config::Config;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utils::data::{cache_file, load_from_cache, save_to_cache};

/// The games on offer and the wagers already placed for one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodData {
    pub period: PeriodKey,
    pub games: Vec<Game>,
    pub prior_wagers: Vec<PriorWager>,
}

/// Prior wagers only count toward `period` when the server says they belong
/// to it. Fields the server leaves out are not held against the response.
fn bets_match_period(bets: &UserWeekBets, period: PeriodKey) -> bool {
    bets.week.map_or(true, |w| w == period.week)
        && bets.year.map_or(true, |y| y == period.year)
        && bets.season_type.map_or(true, |s| s == period.season_type.id())
}

/// Fetch the games and prior wagers for a period, from cache or the API
pub async fn fetch_period_data(
    config: &Config,
    client: &WagerApiClient,
    period: PeriodKey,
) -> Result<PeriodData> {
    let odds_cache_file = cache_file(&config.cache_dir, "odds", period);
    let bets_cache_file = cache_file(&config.cache_dir, "bets", period);

    let odds: OddsResponse = if config.use_cache && odds_cache_file.exists() {
        info!("Loading odds from cache file: {}", odds_cache_file.display());
        load_from_cache(&odds_cache_file)?
    } else {
        let odds = client
            .fetch_odds(period)
            .await
            .context("Failed to fetch odds")?;
        save_to_cache(&odds, &odds_cache_file)?;
        info!("Saved odds to cache file: {}", odds_cache_file.display());
        odds
    };

    let bets: UserWeekBets = if config.use_cache && bets_cache_file.exists() {
        info!("Loading placed bets from cache file: {}", bets_cache_file.display());
        load_from_cache(&bets_cache_file)?
    } else if config.id_token.is_none() {
        warn!("WAGER_ID_TOKEN not set; assuming no points have been used this week");
        UserWeekBets::default()
    } else {
        let bets = client
            .fetch_current_week_bets()
            .await
            .context("Failed to fetch placed bets")?;
        save_to_cache(&bets, &bets_cache_file)?;
        bets
    };

    let prior_wagers = if bets_match_period(&bets, period) {
        bets.bets
    } else {
        info!("Placed bets belong to another week; none count toward {}", period);
        Vec::new()
    };

    Ok(PeriodData {
        period,
        games: odds.odds,
        prior_wagers,
    })
}
