use crate::models::{Points, PriorWager, Selection};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Why a point value cannot be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Already backs a persisted wager in this period
    TakenThisPeriod,
    /// Picked on more than one pending selection
    DuplicateInSession,
}

impl ConflictReason {
    pub fn message(&self, points: Points) -> String {
        match self {
            ConflictReason::TakenThisPeriod => {
                format!("{} points already used this week", points)
            }
            ConflictReason::DuplicateInSession => {
                format!("{} points already selected in another bet", points)
            }
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            ConflictReason::TakenThisPeriod => "USED THIS WEEK",
            ConflictReason::DuplicateInSession => "DUPLICATE",
        }
    }
}

/// Outcome of checking pending picks against the one-wager-per-point-value rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintReport {
    pub has_conflict: bool,
    /// Ascending
    pub conflicting_points: Vec<Points>,
    pub reason_by_point: BTreeMap<Points, ConflictReason>,
}

impl ConstraintReport {
    pub fn is_clean(&self) -> bool {
        !self.has_conflict
    }

    pub fn reason_for(&self, points: Points) -> Option<ConflictReason> {
        self.reason_by_point.get(&points).copied()
    }

    /// Pending picks whose point value is in conflict, in selection order
    pub fn conflicting_games<'a>(&self, selections: &'a [Selection]) -> Vec<&'a Selection> {
        selections
            .iter()
            .filter(|s| self.reason_by_point.contains_key(&s.points))
            .collect()
    }

    /// One user-facing line per conflicting value
    pub fn messages(&self) -> Vec<String> {
        self.reason_by_point
            .iter()
            .map(|(points, reason)| reason.message(*points))
            .collect()
    }
}

/// Point values already spent on persisted wagers this period. Records with a
/// missing or out-of-range value are skipped.
pub fn taken_points(prior_wagers: &[PriorWager]) -> BTreeSet<Points> {
    prior_wagers
        .iter()
        .filter_map(|wager| match wager.points_wagered.and_then(Points::new) {
            Some(points) => Some(points),
            None => {
                warn!(
                    "Ignoring prior wager {:?} with unusable points {:?}",
                    wager.game_id, wager.points_wagered
                );
                None
            }
        })
        .collect()
}

/// Recompute conflicts from scratch.
///
/// A value repeated across pending picks is a session duplicate; a pending
/// value already spent this period is a period conflict. When both apply the
/// period reason wins, since editing the session alone cannot clear it.
pub fn evaluate(selections: &[Selection], prior_points: &BTreeSet<Points>) -> ConstraintReport {
    let mut frequency: BTreeMap<Points, usize> = BTreeMap::new();
    for selection in selections {
        *frequency.entry(selection.points).or_default() += 1;
    }

    let mut reason_by_point = BTreeMap::new();
    for (points, count) in &frequency {
        if prior_points.contains(points) {
            reason_by_point.insert(*points, ConflictReason::TakenThisPeriod);
        } else if *count > 1 {
            reason_by_point.insert(*points, ConflictReason::DuplicateInSession);
        }
    }

    ConstraintReport {
        has_conflict: !reason_by_point.is_empty(),
        conflicting_points: reason_by_point.keys().copied().collect(),
        reason_by_point,
    }
}

/// State of one point button on a selected game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointStatus {
    Current,
    Available,
    TakenThisPeriod,
    SelectedElsewhere,
}

impl PointStatus {
    pub fn is_selectable(&self) -> bool {
        matches!(self, PointStatus::Current | PointStatus::Available)
    }

    pub fn tooltip(&self, points: Points) -> Option<String> {
        match self {
            PointStatus::TakenThisPeriod => {
                Some(ConflictReason::TakenThisPeriod.message(points))
            }
            PointStatus::SelectedElsewhere => {
                Some(ConflictReason::DuplicateInSession.message(points))
            }
            _ => None,
        }
    }
}

/// Status of each point value for `game_id`. The game's own value always
/// reads as current so it stays clickable.
pub fn point_availability(
    selections: &[Selection],
    prior_points: &BTreeSet<Points>,
    game_id: &str,
) -> [(Points, PointStatus); 3] {
    let current = selections
        .iter()
        .find(|s| s.game_id == game_id)
        .map(|s| s.points);

    Points::ALL.map(|points| {
        let status = if current == Some(points) {
            PointStatus::Current
        } else if prior_points.contains(&points) {
            PointStatus::TakenThisPeriod
        } else if selections
            .iter()
            .any(|s| s.game_id != game_id && s.points == points)
        {
            PointStatus::SelectedElsewhere
        } else {
            PointStatus::Available
        };
        (points, status)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pick(game_id: &str, points: u8) -> Selection {
        Selection {
            points: Points::new(points).unwrap(),
            ..Selection::with_defaults(game_id)
        }
    }

    fn points(values: &[u8]) -> BTreeSet<Points> {
        values.iter().filter_map(|v| Points::new(*v)).collect()
    }

    #[test]
    fn test_period_conflict_is_reported() {
        let selections = vec![pick("G1", 1), pick("G2", 2)];
        let report = evaluate(&selections, &points(&[2]));

        assert!(report.has_conflict);
        assert_eq!(report.conflicting_points, vec![Points::TWO]);
        assert_eq!(report.reason_for(Points::TWO), Some(ConflictReason::TakenThisPeriod));
        assert_eq!(report.reason_for(Points::ONE), None);
        assert_eq!(report.messages(), vec!["2 points already used this week"]);
    }

    #[test]
    fn test_session_duplicate_is_reported() {
        let selections = vec![pick("G1", 3), pick("G2", 3), pick("G3", 1)];
        let report = evaluate(&selections, &BTreeSet::new());

        assert!(report.has_conflict);
        assert_eq!(report.conflicting_points, vec![Points::THREE]);
        assert_eq!(
            report.reason_for(Points::THREE),
            Some(ConflictReason::DuplicateInSession)
        );
        let games: Vec<_> = report
            .conflicting_games(&selections)
            .iter()
            .map(|s| s.game_id.as_str())
            .collect();
        assert_eq!(games, vec!["G1", "G2"]);
    }

    #[test]
    fn test_period_reason_wins_over_duplicate() {
        let selections = vec![pick("G1", 2), pick("G2", 2)];
        let report = evaluate(&selections, &points(&[2]));
        assert_eq!(report.reason_for(Points::TWO), Some(ConflictReason::TakenThisPeriod));
        assert_eq!(report.conflicting_points.len(), 1);
    }

    #[test]
    fn test_clean_selection() {
        let selections = vec![pick("G1", 1), pick("G2", 3)];
        let report = evaluate(&selections, &points(&[2]));
        assert!(report.is_clean());
        assert!(report.conflicting_points.is_empty());
        assert!(evaluate(&[], &points(&[1, 2, 3])).is_clean());
    }

    #[test]
    fn test_clean_report_implies_unique_and_disjoint() {
        let prior_sets: Vec<BTreeSet<Points>> =
            vec![points(&[]), points(&[1]), points(&[2, 3]), points(&[1, 2, 3])];

        for a in 1..=3u8 {
            for b in 1..=3u8 {
                for c in 1..=3u8 {
                    let selections = vec![pick("A", a), pick("B", b), pick("C", c)];
                    for prior in &prior_sets {
                        let report = evaluate(&selections, prior);
                        if report.is_clean() {
                            let values: BTreeSet<_> = selections.iter().map(|s| s.points).collect();
                            assert_eq!(values.len(), selections.len());
                            assert!(values.is_disjoint(prior));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_taken_points_skips_unusable_records() {
        let wagers: Vec<PriorWager> = serde_json::from_value(json!([
            { "game_id": "a", "points_wagered": 3 },
            { "game_id": "b", "points_wagered": "1" },
            { "game_id": "c", "points_wagered": 9 },
            { "game_id": "d" }
        ]))
        .unwrap();
        assert_eq!(taken_points(&wagers), points(&[1, 3]));
    }

    #[test]
    fn test_point_availability() {
        let selections = vec![pick("G1", 1), pick("G2", 3)];
        let availability = point_availability(&selections, &points(&[2]), "G1");

        assert_eq!(availability[0], (Points::ONE, PointStatus::Current));
        assert_eq!(availability[1], (Points::TWO, PointStatus::TakenThisPeriod));
        assert_eq!(availability[2], (Points::THREE, PointStatus::SelectedElsewhere));
        assert!(!availability[2].1.is_selectable());
        assert_eq!(
            availability[2].1.tooltip(Points::THREE).unwrap(),
            "3 points already selected in another bet"
        );
    }

    #[test]
    fn test_current_value_stays_selectable_even_when_taken() {
        let selections = vec![pick("G1", 2)];
        let availability = point_availability(&selections, &points(&[2]), "G1");
        assert_eq!(availability[1].1, PointStatus::Current);
        assert_eq!(availability[0].1, PointStatus::Available);
    }
}
