use crate::models::{BetChoice, Game, PeriodKey, Points, SeasonType, Selection, TeamSide, TotalSide};
use crate::utils::constraints::evaluate;
use crate::utils::lines::side_lines_for_game;
use crate::utils::season::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

pub const SPORT: &str = "football";
pub const LEAGUE: &str = "nfl";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("incomplete data for game {game_id}: {reason}")]
    IncompleteGameData { game_id: String, reason: String },

    #[error("game {0} is not open for betting")]
    NotBettable(String),

    #[error("resolve point conflicts before submitting: {points:?}")]
    ConflictsPresent { points: Vec<Points> },
}

impl AssemblyError {
    fn incomplete(game_id: &str, reason: impl Into<String>) -> Self {
        AssemblyError::IncompleteGameData {
            game_id: game_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// `game_bet` body; the tag selects which line fields are present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bet_type", rename_all = "snake_case")]
pub enum GameBetRequest {
    Spread {
        points_wagered: Points,
        team_choice: TeamSide,
        spread_value: f64,
    },
    OverUnder {
        points_wagered: Points,
        over_under_choice: TotalSide,
        total_value: f64,
    },
}

impl GameBetRequest {
    pub fn points_wagered(&self) -> Points {
        match self {
            GameBetRequest::Spread { points_wagered, .. }
            | GameBetRequest::OverUnder { points_wagered, .. } => *points_wagered,
        }
    }
}

/// Body of `POST /bet/create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerRequest {
    pub room_id: String,
    pub game_id: String,
    pub sport: String,
    pub league: String,
    pub season_type: SeasonType,
    pub week: u8,
    /// Kickoff, epoch seconds
    pub event_datetime: i64,
    pub game_bet: GameBetRequest,
    /// The game exactly as it was offered, kept so the line can be shown later
    pub odds_snapshot: Game,
}

/// Requests ready to send plus the selections that could not be assembled
#[derive(Debug, Clone, Default)]
pub struct AssembledBatch {
    pub requests: Vec<WagerRequest>,
    pub failures: Vec<AssemblyError>,
}

/// Build the request for one pick from its game snapshot
pub fn assemble(
    selection: &Selection,
    game: &Game,
    period: PeriodKey,
    room_id: &str,
) -> Result<WagerRequest, AssemblyError> {
    if !game.is_bettable() {
        return Err(AssemblyError::NotBettable(game.game_id.clone()));
    }

    let kickoff = game
        .date
        .as_deref()
        .ok_or_else(|| AssemblyError::incomplete(&game.game_id, "missing kickoff time"))?;
    let event_datetime = parse_timestamp(kickoff)
        .map_err(|_| {
            AssemblyError::incomplete(
                &game.game_id,
                format!("unparseable kickoff time {:?}", kickoff),
            )
        })?
        .timestamp();

    let game_bet = match selection.choice {
        BetChoice::Spread(side) => GameBetRequest::Spread {
            points_wagered: selection.points,
            team_choice: side,
            spread_value: side_lines_for_game(game).for_side(side).ok_or_else(|| {
                AssemblyError::incomplete(&game.game_id, "spread has no favored team")
            })?,
        },
        BetChoice::Total(side) => GameBetRequest::OverUnder {
            points_wagered: selection.points,
            over_under_choice: side,
            total_value: game.over_under.ok_or_else(|| {
                AssemblyError::incomplete(&game.game_id, "no published over/under")
            })?,
        },
    };

    Ok(WagerRequest {
        room_id: room_id.to_string(),
        game_id: game.game_id.clone(),
        sport: SPORT.to_string(),
        league: LEAGUE.to_string(),
        season_type: period.season_type,
        week: period.week,
        event_datetime,
        game_bet,
        odds_snapshot: game.clone(),
    })
}

/// Assemble every pending pick. Refuses outright while any point conflict
/// stands; otherwise a pick that fails does not hold back the others.
pub fn assemble_batch(
    selections: &[Selection],
    prior_points: &BTreeSet<Points>,
    games: &[Game],
    period: PeriodKey,
    room_id: &str,
) -> Result<AssembledBatch, AssemblyError> {
    let report = evaluate(selections, prior_points);
    if report.has_conflict {
        return Err(AssemblyError::ConflictsPresent {
            points: report.conflicting_points,
        });
    }

    let mut batch = AssembledBatch::default();
    for selection in selections {
        let assembled = games
            .iter()
            .find(|g| g.game_id == selection.game_id)
            .ok_or_else(|| {
                AssemblyError::incomplete(&selection.game_id, "not in the current odds snapshot")
            })
            .and_then(|game| assemble(selection, game, period, room_id));

        match assembled {
            Ok(request) => {
                debug!(
                    "Assembled {}-point wager on game {}",
                    selection.points, selection.game_id
                );
                batch.requests.push(request);
            }
            Err(e) => {
                warn!("Skipping selection: {}", e);
                batch.failures.push(e);
            }
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::game;
    use crate::models::GameState;

    fn period() -> PeriodKey {
        PeriodKey::new(2025, SeasonType::Regular, 1).unwrap()
    }

    fn pick(game_id: &str, choice: BetChoice, points: u8) -> Selection {
        Selection {
            game_id: game_id.to_string(),
            choice,
            points: Points::new(points).unwrap(),
        }
    }

    #[test]
    fn test_spread_request_uses_side_line() {
        let g = game("G1", Some(3.5), Some("home"));
        let request = assemble(
            &pick("G1", BetChoice::Spread(TeamSide::Away), 2),
            &g,
            period(),
            "room-1",
        )
        .unwrap();

        assert_eq!(request.event_datetime, 1757264400);
        assert_eq!(
            request.game_bet,
            GameBetRequest::Spread {
                points_wagered: Points::TWO,
                team_choice: TeamSide::Away,
                spread_value: 3.5,
            }
        );
    }

    #[test]
    fn test_total_request_uses_over_under() {
        let g = game("G1", Some(3.5), Some("home"));
        let request = assemble(
            &pick("G1", BetChoice::Total(TotalSide::Under), 3),
            &g,
            period(),
            "room-1",
        )
        .unwrap();
        assert_eq!(
            request.game_bet,
            GameBetRequest::OverUnder {
                points_wagered: Points::THREE,
                over_under_choice: TotalSide::Under,
                total_value: 47.5,
            }
        );
    }

    #[test]
    fn test_wire_shape() {
        let g = game("G1", Some(6.0), Some("away"));
        let request = assemble(
            &pick("G1", BetChoice::Spread(TeamSide::Away), 1),
            &g,
            period(),
            "room-1",
        )
        .unwrap();
        let wire = serde_json::to_value(&request).unwrap();

        assert_eq!(wire["room_id"], "room-1");
        assert_eq!(wire["sport"], "football");
        assert_eq!(wire["league"], "nfl");
        assert_eq!(wire["season_type"], 2);
        assert_eq!(wire["week"], 1);
        assert_eq!(wire["game_bet"]["bet_type"], "spread");
        assert_eq!(wire["game_bet"]["team_choice"], "away");
        assert_eq!(wire["game_bet"]["spread_value"], -6.0);
        assert_eq!(wire["game_bet"]["points_wagered"], 1);
        assert_eq!(wire["odds_snapshot"]["game_id"], "G1");
        assert_eq!(wire["odds_snapshot"]["venue"]["name"], "Arrowhead Stadium");
        assert_eq!(&wire["odds_snapshot"], g.snapshot());
        assert_eq!(wire["odds_snapshot"]["favoredTeam"], "away");
    }

    #[test]
    fn test_missing_or_bad_kickoff_is_incomplete() {
        let mut g = game("G1", Some(3.0), Some("home"));
        g.date = None;
        let err = assemble(&Selection::with_defaults("G1"), &g, period(), "r").unwrap_err();
        assert!(matches!(err, AssemblyError::IncompleteGameData { .. }));

        g.date = Some("Sunday".to_string());
        let err = assemble(&Selection::with_defaults("G1"), &g, period(), "r").unwrap_err();
        assert!(matches!(err, AssemblyError::IncompleteGameData { .. }));
    }

    #[test]
    fn test_spread_without_favorite_is_incomplete() {
        let g = game("G1", Some(3.0), None);
        let err = assemble(&Selection::with_defaults("G1"), &g, period(), "r").unwrap_err();
        assert_eq!(
            err,
            AssemblyError::IncompleteGameData {
                game_id: "G1".to_string(),
                reason: "spread has no favored team".to_string(),
            }
        );
    }

    #[test]
    fn test_closed_game_is_not_bettable() {
        let mut g = game("G1", Some(3.0), Some("home"));
        g.status.state = GameState::Post;
        assert_eq!(
            assemble(&Selection::with_defaults("G1"), &g, period(), "r").unwrap_err(),
            AssemblyError::NotBettable("G1".to_string())
        );

        let no_line = game("G2", None, Some("home"));
        assert!(assemble(&Selection::with_defaults("G2"), &no_line, period(), "r").is_err());
    }

    #[test]
    fn test_batch_refuses_conflicts() {
        let games = vec![game("G1", Some(3.0), Some("home")), game("G2", Some(1.0), Some("away"))];
        let selections = vec![
            pick("G1", BetChoice::Spread(TeamSide::Home), 2),
            pick("G2", BetChoice::Spread(TeamSide::Home), 2),
        ];
        let err = assemble_batch(&selections, &BTreeSet::new(), &games, period(), "r").unwrap_err();
        assert_eq!(err, AssemblyError::ConflictsPresent { points: vec![Points::TWO] });

        let selections = vec![pick("G1", BetChoice::Spread(TeamSide::Home), 1)];
        let taken = BTreeSet::from([Points::ONE]);
        assert!(assemble_batch(&selections, &taken, &games, period(), "r").is_err());
    }

    #[test]
    fn test_batch_partial_failure_keeps_siblings() {
        let mut broken = game("G2", Some(1.0), Some("away"));
        broken.date = None;
        let games = vec![game("G1", Some(3.0), Some("home")), broken];
        let selections = vec![
            pick("G1", BetChoice::Spread(TeamSide::Home), 1),
            pick("G2", BetChoice::Spread(TeamSide::Away), 2),
            pick("G9", BetChoice::Total(TotalSide::Over), 3),
        ];

        let batch = assemble_batch(&selections, &BTreeSet::new(), &games, period(), "r").unwrap();
        assert_eq!(batch.requests.len(), 1);
        assert_eq!(batch.requests[0].game_id, "G1");
        assert_eq!(batch.failures.len(), 2);
    }
}
