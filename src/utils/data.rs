use crate::models::PeriodKey;
use crate::utils::submission::{GameBetRequest, WagerRequest};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Cache file for one kind of payload in one period, e.g.
/// `cache/odds_2025_regular_season_week_3.json`
pub fn cache_file(cache_dir: &Path, kind: &str, period: PeriodKey) -> PathBuf {
    cache_dir.join(format!(
        "{}_{}_{}_week_{}.json",
        kind,
        period.year,
        period.season_type.name(),
        period.week
    ))
}

/// Save any serializable payload to a JSON cache file
pub fn save_to_cache<T: Serialize + ?Sized>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create cache directory")?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    fs::write(path, json).context("Failed to write cache file")?;
    Ok(())
}

/// Load a payload previously written by `save_to_cache`
pub fn load_from_cache<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file {}", path.display()))?;
    serde_json::from_str(&json).context("Failed to deserialize cache data")
}

/// Flat CSV row for one wager request
#[derive(Debug, Serialize)]
struct WagerRow<'a> {
    #[serde(rename = "Room")]
    room_id: &'a str,
    #[serde(rename = "Game")]
    game_id: &'a str,
    #[serde(rename = "Matchup")]
    matchup: String,
    #[serde(rename = "Season Type")]
    season_type: &'static str,
    #[serde(rename = "Week")]
    week: u8,
    #[serde(rename = "Kickoff")]
    event_datetime: i64,
    #[serde(rename = "Bet Type")]
    bet_type: &'static str,
    #[serde(rename = "Choice")]
    choice: &'static str,
    #[serde(rename = "Line")]
    line: f64,
    #[serde(rename = "Points")]
    points: u8,
}

impl<'a> From<&'a WagerRequest> for WagerRow<'a> {
    fn from(request: &'a WagerRequest) -> Self {
        let (bet_type, choice, line) = match &request.game_bet {
            GameBetRequest::Spread {
                team_choice,
                spread_value,
                ..
            } => ("spread", team_choice.as_str(), *spread_value),
            GameBetRequest::OverUnder {
                over_under_choice,
                total_value,
                ..
            } => ("over_under", over_under_choice.as_str(), *total_value),
        };

        WagerRow {
            room_id: &request.room_id,
            game_id: &request.game_id,
            matchup: request.odds_snapshot.matchup(),
            season_type: request.season_type.short_name(),
            week: request.week,
            event_datetime: request.event_datetime,
            bet_type,
            choice,
            line,
            points: request.game_bet.points_wagered().value(),
        }
    }
}

/// Save assembled wager requests to CSV
pub fn save_wagers_to_csv(requests: &[WagerRequest], filename: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;
    for request in requests {
        writer
            .serialize(WagerRow::from(request))
            .context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::game;
    use crate::models::{Game, Points, SeasonType, Selection};
    use crate::utils::submission::assemble;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nfl_wager_pool_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_cache_file_name() {
        let period = PeriodKey::new(2025, SeasonType::Regular, 3).unwrap();
        assert_eq!(
            cache_file(Path::new("cache"), "odds", period),
            PathBuf::from("cache/odds_2025_regular_season_week_3.json")
        );
    }

    #[test]
    fn test_cache_preserves_unknown_fields() {
        let dir = scratch_dir("cache");
        let path = dir.join("odds.json");
        let games = vec![game("G1", Some(3.0), Some("home"))];

        save_to_cache(&games, &path).unwrap();
        let loaded: Vec<Game> = load_from_cache(&path).unwrap();

        assert_eq!(loaded[0].game_id, "G1");
        assert_eq!(loaded[0].snapshot()["venue"]["name"], "Arrowhead Stadium");
        assert_eq!(loaded[0].snapshot(), games[0].snapshot());
        assert!(load_from_cache::<Vec<Game>>(dir.join("missing.json")).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_wagers_csv() {
        let dir = scratch_dir("csv");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wagers.csv");

        let period = PeriodKey::new(2025, SeasonType::Regular, 1).unwrap();
        let selection = Selection {
            points: Points::THREE,
            ..Selection::with_defaults("G1")
        };
        let request = assemble(&selection, &game("G1", Some(3.0), Some("home")), period, "room-1").unwrap();

        save_wagers_to_csv(&[request], &path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Room,Game,Matchup,Season Type,Week,Kickoff,Bet Type,Choice,Line,Points"
        );
        assert_eq!(
            lines.next().unwrap(),
            "room-1,G1,BUF @ KC,REG,1,1757264400,spread,home,-3.0,3"
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
