use crate::models::{parse_number, Game, PriorWager, TeamSide};
use serde::Serialize;
use serde_json::Value;

/// Shown when a wager has no usable line
pub const TBD: &str = "TBD";

/// Per-team spread lines. Negative means favored (must win by more than the
/// magnitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideLines {
    pub home: Option<f64>,
    pub away: Option<f64>,
}

impl SideLines {
    pub fn for_side(&self, side: TeamSide) -> Option<f64> {
        match side {
            TeamSide::Home => self.home,
            TeamSide::Away => self.away,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.home.is_some() && self.away.is_some()
    }
}

/// Split a published magnitude into signed lines for each side.
/// Without a known favorite neither line is usable.
pub fn side_lines(magnitude: Option<f64>, favored: Option<TeamSide>) -> SideLines {
    match (magnitude, favored) {
        (Some(magnitude), Some(favored)) if magnitude.is_finite() => {
            let magnitude = magnitude.abs();
            let line = |side: TeamSide| if side == favored { -magnitude } else { magnitude };
            SideLines {
                home: Some(line(TeamSide::Home)),
                away: Some(line(TeamSide::Away)),
            }
        }
        _ => SideLines {
            home: None,
            away: None,
        },
    }
}

pub fn side_lines_for_game(game: &Game) -> SideLines {
    side_lines(game.spread, game.favored_team)
}

/// Fallback for historical records that lack a favored-team tag.
///
/// Assumes the stored value is signed from the home team's perspective:
/// negative means home is favored, positive means away is favored.
pub fn infer_favored_from_sign(raw_spread: f64) -> Option<TeamSide> {
    if raw_spread < 0.0 {
        Some(TeamSide::Home)
    } else if raw_spread > 0.0 {
        Some(TeamSide::Away)
    } else {
        None
    }
}

/// The spread as seen by the bettor: negative when they backed the favorite,
/// positive when they took the underdog. Without a team choice the raw sign
/// is kept.
pub fn displayed_spread(
    raw_spread: Option<f64>,
    favored: Option<TeamSide>,
    team_choice: Option<TeamSide>,
) -> String {
    let raw = match raw_spread {
        Some(raw) if raw.is_finite() => raw,
        _ => return TBD.to_string(),
    };
    let magnitude = raw.abs();

    let signed = match team_choice {
        Some(choice) => match favored.or_else(|| infer_favored_from_sign(raw)) {
            Some(favored) if favored == choice => -magnitude,
            _ => magnitude,
        },
        None => raw,
    };

    format_signed_tenths(signed)
}

/// `displayed_spread` for a persisted wager. The line comes from the bet
/// itself when recorded, else from its odds snapshot.
pub fn displayed_spread_for_wager(wager: &PriorWager) -> String {
    let bet = wager.game_bet.as_ref();
    let snapshot = wager.odds_snapshot.as_ref();

    let raw = bet
        .and_then(|b| b.spread_value.as_ref())
        .filter(|v| !v.is_null())
        .or_else(|| snapshot.and_then(|s| s.get("spread")))
        .and_then(parse_number::<f64>);

    let favored = snapshot
        .and_then(|s| s.get("favoredTeam"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok());

    let team_choice = bet
        .and_then(|b| b.team_choice.as_deref())
        .and_then(|s| s.parse().ok());

    displayed_spread(raw, favored, team_choice)
}

/// Round to the nearest tenth, then render with an explicit sign. Zero has no
/// sign and integral values have no decimals.
pub fn format_signed_tenths(value: f64) -> String {
    let rounded = (value.abs() * 10.0).round() / 10.0;
    let body = if rounded.fract() != 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{:.0}", rounded)
    };

    if rounded == 0.0 {
        body
    } else if value > 0.0 {
        format!("+{}", body)
    } else {
        format!("-{}", body)
    }
}

/// Fixed one-decimal rendering used next to team names, e.g. `KC -3.0`
pub fn format_line(line: Option<f64>) -> String {
    match line {
        None => String::new(),
        Some(n) if n > 0.0 => format!("+{:.1}", n),
        Some(n) if n == 0.0 => "0.0".to_string(),
        Some(n) => format!("{:.1}", n),
    }
}
