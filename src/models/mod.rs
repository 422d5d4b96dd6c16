use crate::utils::season::SeasonError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Game lifecycle as reported by the odds feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Pre,
    In,
    Post,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A game with no status reads as `Unknown` and is never bettable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    #[serde(default)]
    pub state: GameState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_detail: Option<String>,
}

/// One side of a matchup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    /// Unannounced opponents (e.g. postseason seeding) come through as TBD
    #[serde(default = "tbd")]
    pub name: String,
    #[serde(default = "tbd")]
    pub abbreviation: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn tbd() -> String {
    "TBD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teams {
    pub home: Team,
    pub away: Team,
}

/// Fields the engine reads from a feed record
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameRecord {
    #[serde(rename = "game_id", deserialize_with = "required_string")]
    game_id: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    status: GameStatus,
    teams: Teams,
    #[serde(default, deserialize_with = "lenient_number")]
    spread: Option<f64>,
    #[serde(default)]
    spread_details: Option<String>,
    #[serde(default, deserialize_with = "lenient_side")]
    favored_team: Option<TeamSide>,
    #[serde(default, deserialize_with = "lenient_number")]
    over_under: Option<f64>,
}

/// A game snapshot from the odds feed for a single period.
///
/// The parsed fields drive selection and assembly. The record itself is kept
/// untouched and is what gets serialized, so a wager's audit copy matches
/// the feed byte for byte in meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Game {
    pub game_id: String,
    /// Kickoff timestamp as published upstream
    pub date: Option<String>,
    pub status: GameStatus,
    pub teams: Teams,
    /// Published spread magnitude
    pub spread: Option<f64>,
    pub spread_details: Option<String>,
    pub favored_team: Option<TeamSide>,
    pub over_under: Option<f64>,
    snapshot: Value,
}

impl TryFrom<Value> for Game {
    type Error = serde_json::Error;

    fn try_from(snapshot: Value) -> Result<Self, Self::Error> {
        let record = GameRecord::deserialize(&snapshot)?;
        Ok(Game {
            game_id: record.game_id,
            date: record.date,
            status: record.status,
            teams: record.teams,
            spread: record.spread,
            spread_details: record.spread_details,
            favored_team: record.favored_team,
            over_under: record.over_under,
            snapshot,
        })
    }
}

impl From<Game> for Value {
    fn from(game: Game) -> Value {
        game.snapshot
    }
}

impl Game {
    /// The feed record as received
    pub fn snapshot(&self) -> &Value {
        &self.snapshot
    }

    /// Betting is only open before kickoff and once a line is published
    pub fn is_bettable(&self) -> bool {
        self.status.state == GameState::Pre && self.spread.is_some()
    }

    pub fn team(&self, side: TeamSide) -> &Team {
        match side {
            TeamSide::Home => &self.teams.home,
            TeamSide::Away => &self.teams.away,
        }
    }

    /// "AWAY @ HOME" using abbreviations
    pub fn matchup(&self) -> String {
        format!(
            "{} @ {}",
            self.teams.away.abbreviation, self.teams.home.abbreviation
        )
    }
}

/// Body of `GET /odds/get_nfl_odds`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsResponse {
    /// Records that cannot be read are dropped one by one
    #[serde(default, deserialize_with = "readable_games")]
    pub odds: Vec<Game>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub week: Option<u8>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub season_type: Option<u8>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn opposite(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

impl FromStr for TeamSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(TeamSide::Home),
            "away" => Ok(TeamSide::Away),
            other => Err(format!("unknown team side: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalSide {
    Over,
    Under,
}

impl TotalSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TotalSide::Over => "over",
            TotalSide::Under => "under",
        }
    }
}

impl FromStr for TotalSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "over" => Ok(TotalSide::Over),
            "under" => Ok(TotalSide::Under),
            other => Err(format!("unknown total side: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    Spread,
    OverUnder,
}

impl FromStr for BetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "spread" => Ok(BetType::Spread),
            "overUnder" | "over_under" | "total" => Ok(BetType::OverUnder),
            other => Err(format!("unknown bet type: {}", other)),
        }
    }
}

/// What the bettor is backing. The variant fixes the bet type, so a choice
/// can never be stale relative to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetChoice {
    Spread(TeamSide),
    Total(TotalSide),
}

impl BetChoice {
    /// First valid choice for a bet type (home / over)
    pub fn default_for(bet_type: BetType) -> Self {
        match bet_type {
            BetType::Spread => BetChoice::Spread(TeamSide::Home),
            BetType::OverUnder => BetChoice::Total(TotalSide::Over),
        }
    }

    pub fn bet_type(&self) -> BetType {
        match self {
            BetChoice::Spread(_) => BetType::Spread,
            BetChoice::Total(_) => BetType::OverUnder,
        }
    }
}

impl FromStr for BetChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<TeamSide>()
            .map(BetChoice::Spread)
            .or_else(|_| s.parse::<TotalSide>().map(BetChoice::Total))
            .map_err(|_| format!("unknown choice: {}", s))
    }
}

/// Rejected point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("points must be 1, 2, or 3 (got {0})")]
pub struct InvalidPoints(pub u8);

/// A confidence weight; each value may back at most one wager per period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub struct Points(u8);

impl Points {
    pub const ONE: Points = Points(1);
    pub const TWO: Points = Points(2);
    pub const THREE: Points = Points(3);
    pub const ALL: [Points; 3] = [Points::ONE, Points::TWO, Points::THREE];

    pub fn new(value: u8) -> Option<Self> {
        (1..=3).contains(&value).then_some(Points(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Points {
    type Error = InvalidPoints;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Points::new(value).ok_or(InvalidPoints(value))
    }
}

impl From<Points> for u8 {
    fn from(points: Points) -> u8 {
        points.0
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending, unsubmitted pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub game_id: String,
    pub choice: BetChoice,
    pub points: Points,
}

impl Selection {
    /// spread / home / 1
    pub fn with_defaults(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            choice: BetChoice::default_for(BetType::Spread),
            points: Points::ONE,
        }
    }

    pub fn bet_type(&self) -> BetType {
        self.choice.bet_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SeasonType {
    Preseason,
    Regular,
    Postseason,
}

impl SeasonType {
    pub const ALL: [SeasonType; 3] = [
        SeasonType::Preseason,
        SeasonType::Regular,
        SeasonType::Postseason,
    ];

    /// Numeric code used by the odds API
    pub fn id(self) -> u8 {
        match self {
            SeasonType::Preseason => 1,
            SeasonType::Regular => 2,
            SeasonType::Postseason => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        SeasonType::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            SeasonType::Preseason => "preseason",
            SeasonType::Regular => "regular_season",
            SeasonType::Postseason => "postseason",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SeasonType::Preseason => "Preseason",
            SeasonType::Regular => "Regular Season",
            SeasonType::Postseason => "Playoffs",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            SeasonType::Preseason => "PRE",
            SeasonType::Regular => "REG",
            SeasonType::Postseason => "POST",
        }
    }

    pub fn max_weeks(self) -> u8 {
        match self {
            SeasonType::Preseason => 4,
            SeasonType::Regular => 18,
            SeasonType::Postseason => 4,
        }
    }

    /// Successor in the fixed order preseason -> regular -> postseason -> preseason.
    /// The flag is true when the step crosses into the next season year.
    pub fn next(self) -> (SeasonType, bool) {
        match self {
            SeasonType::Preseason => (SeasonType::Regular, false),
            SeasonType::Regular => (SeasonType::Postseason, false),
            SeasonType::Postseason => (SeasonType::Preseason, true),
        }
    }
}

impl TryFrom<u8> for SeasonType {
    type Error = SeasonError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        SeasonType::from_id(id).ok_or(SeasonError::InvalidSeasonType(id))
    }
}

impl From<SeasonType> for u8 {
    fn from(season_type: SeasonType) -> u8 {
        season_type.id()
    }
}

impl FromStr for SeasonType {
    type Err = SeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(id) = s.parse::<u8>() {
            return SeasonType::try_from(id);
        }
        SeasonType::ALL
            .into_iter()
            .find(|t| t.name() == s || t.short_name().eq_ignore_ascii_case(&s))
            .or(match s.as_str() {
                "regular" => Some(SeasonType::Regular),
                "playoffs" => Some(SeasonType::Postseason),
                _ => None,
            })
            .ok_or_else(|| SeasonError::UnknownSeasonType(s.clone()))
    }
}

/// The (year, season type, week) scope shared by selections and prior wagers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriodKey")]
pub struct PeriodKey {
    pub year: i32,
    pub season_type: SeasonType,
    pub week: u8,
}

#[derive(Deserialize)]
struct RawPeriodKey {
    year: i32,
    season_type: SeasonType,
    week: u8,
}

impl TryFrom<RawPeriodKey> for PeriodKey {
    type Error = SeasonError;

    fn try_from(raw: RawPeriodKey) -> Result<Self, Self::Error> {
        PeriodKey::new(raw.year, raw.season_type, raw.week)
    }
}

impl PeriodKey {
    pub fn new(year: i32, season_type: SeasonType, week: u8) -> Result<Self, SeasonError> {
        if !crate::utils::season::is_valid_week(season_type, week) {
            return Err(SeasonError::InvalidWeek { season_type, week });
        }
        Ok(Self {
            year,
            season_type,
            week,
        })
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            crate::utils::season::season_display_text(self.year, self.season_type, Some(self.week))
        )
    }
}

/// A wager the bettor already placed in the active period
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorWager {
    #[serde(default, deserialize_with = "lenient_string")]
    pub game_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub points_wagered: Option<u8>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub event_datetime: Option<i64>,
    #[serde(default)]
    pub game_bet: Option<PlacedBet>,
    /// Game snapshot captured at submission time; legacy records vary in shape
    #[serde(default)]
    pub odds_snapshot: Option<Value>,
}

/// Bet fields as persisted by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacedBet {
    #[serde(default)]
    pub bet_type: Option<String>,
    #[serde(default)]
    pub team_choice: Option<String>,
    #[serde(default)]
    pub over_under_choice: Option<String>,
    #[serde(default)]
    pub spread_value: Option<Value>,
    #[serde(default)]
    pub total_value: Option<Value>,
}

/// Body of `GET /bet/get_user_bets_for_current_week`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserWeekBets {
    #[serde(default)]
    pub bets: Vec<PriorWager>,
    #[serde(default)]
    pub week: Option<u8>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub season_type: Option<u8>,
}

/// Read a JSON number or numeric string. Anything else is treated as absent.
pub fn parse_number<T: FromStr>(value: &Value) -> Option<T> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_number))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn readable_games<'de, D>(deserializer: D) -> Result<Vec<Game>, D::Error>
where
    D: Deserializer<'de>,
{
    let records = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(records
        .into_iter()
        .filter_map(|record| match Game::try_from(record) {
            Ok(game) => Some(game),
            Err(e) => {
                warn!("Skipping unreadable game in odds feed: {}", e);
                None
            }
        })
        .collect())
}

fn lenient_side<'de, D>(deserializer: D) -> Result<Option<TeamSide>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| s.parse().ok()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_game() -> Value {
        json!({
            "game_id": "401772510",
            "date": "2025-09-07T17:00Z",
            "status": { "state": "pre", "detail": "Sun, September 7th at 1:00 PM EDT" },
            "teams": {
                "home": { "id": "12", "name": "Kansas City Chiefs", "abbreviation": "KC", "score": "0" },
                "away": { "id": 2, "name": "Buffalo Bills", "abbreviation": "BUF", "score": null }
            },
            "spread": "3.5",
            "spreadDetails": "KC -3.5",
            "favoredTeam": "HOME",
            "overUnder": 47.5,
            "venue": { "name": "Arrowhead Stadium", "indoor": false }
        })
    }

    /// A pre-game snapshot with a published line
    pub(crate) fn game(id: &str, spread: Option<f64>, favored: Option<&str>) -> Game {
        let mut raw = sample_game();
        raw["game_id"] = json!(id);
        raw["spread"] = json!(spread);
        raw["favoredTeam"] = json!(favored);
        serde_json::from_value(raw).unwrap()
    }
}
