use crate::models::{BetChoice, Game, Selection, TotalSide};
use crate::utils::lines::{format_line, side_lines_for_game};
use serde::Serialize;

/// One pending pick, rendered for review before submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryLine {
    pub game_id: String,
    /// "AWAY @ HOME", or the bare game id when the game is not in the feed
    pub matchup: String,
    /// e.g. "KC Spread -3.0" or "Over 47.5"
    pub pick: String,
    pub points: u8,
}

impl SummaryLine {
    pub fn points_label(&self) -> String {
        if self.points == 1 {
            "1 point".to_string()
        } else {
            format!("{} points", self.points)
        }
    }

    pub fn format(&self) -> String {
        format!("{}: {} ({})", self.matchup, self.pick, self.points_label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionSummary {
    pub lines: Vec<SummaryLine>,
    pub total_points: u32,
}

impl SelectionSummary {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn pick_label(selection: &Selection, game: Option<&Game>) -> String {
    let with_line = |label: String, line: Option<f64>| match format_line(line) {
        formatted if formatted.is_empty() => label,
        formatted => format!("{} {}", label, formatted),
    };

    match selection.choice {
        BetChoice::Spread(side) => {
            let team = game
                .map(|g| g.team(side).abbreviation.clone())
                .unwrap_or_else(|| side.as_str().to_uppercase());
            let line = game.and_then(|g| side_lines_for_game(g).for_side(side));
            with_line(format!("{} Spread", team), line)
        }
        BetChoice::Total(side) => {
            let label = match side {
                TotalSide::Over => "Over",
                TotalSide::Under => "Under",
            };
            // totals are unsigned
            let total = game.and_then(|g| g.over_under);
            match total {
                Some(total) => format!("{} {:.1}", label, total),
                None => label.to_string(),
            }
        }
    }
}

/// Describe pending picks in selection order
pub fn summarize(selections: &[Selection], games: &[Game]) -> SelectionSummary {
    let lines: Vec<SummaryLine> = selections
        .iter()
        .map(|selection| {
            let game = games.iter().find(|g| g.game_id == selection.game_id);
            SummaryLine {
                game_id: selection.game_id.clone(),
                matchup: game
                    .map(Game::matchup)
                    .unwrap_or_else(|| selection.game_id.clone()),
                pick: pick_label(selection, game),
                points: selection.points.value(),
            }
        })
        .collect();

    SelectionSummary {
        total_points: lines.iter().map(|l| u32::from(l.points)).sum(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::game;
    use crate::models::{Points, TeamSide};

    fn pick(game_id: &str, choice: BetChoice, points: u8) -> Selection {
        Selection {
            game_id: game_id.to_string(),
            choice,
            points: Points::new(points).unwrap(),
        }
    }

    #[test]
    fn test_summary_lines() {
        let games = vec![game("G1", Some(3.0), Some("home"))];
        let selections = vec![
            pick("G1", BetChoice::Spread(TeamSide::Home), 2),
            pick("G1", BetChoice::Total(TotalSide::Over), 1),
        ];
        let summary = summarize(&selections, &games);

        assert_eq!(summary.total_points, 3);
        assert_eq!(summary.lines[0].format(), "BUF @ KC: KC Spread -3.0 (2 points)");
        assert_eq!(summary.lines[1].format(), "BUF @ KC: Over 47.5 (1 point)");
    }

    #[test]
    fn test_summary_for_unknown_game() {
        let summary = summarize(&[pick("G9", BetChoice::Spread(TeamSide::Away), 3)], &[]);
        assert_eq!(summary.lines[0].matchup, "G9");
        assert_eq!(summary.lines[0].pick, "AWAY Spread");
        assert!(summarize(&[], &[]).is_empty());
    }
}
