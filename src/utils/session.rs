use crate::api::outcome::SubmissionError;
use crate::api::wager_api::WagerGateway;
use crate::models::{
    BetChoice, BetType, Game, PeriodKey, Points, PriorWager, SeasonType, Selection,
};
use crate::utils::constraints::{evaluate, point_availability, taken_points, ConstraintReport, PointStatus};
use crate::utils::season::{default_selection, next_period, SeasonError};
use crate::utils::selection::{SelectionError, SelectionStore, ToggleOutcome};
use crate::utils::submission::{assemble_batch, AssemblyError};
use crate::utils::summary::{summarize, SelectionSummary};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Result of sending a batch of wagers
#[derive(Debug, Clone, Default)]
pub struct SubmissionReport {
    pub accepted: Vec<PriorWager>,
    /// Picks that never reached the server
    pub assembly_failures: Vec<AssemblyError>,
    /// (game id, reason) for each request the server refused
    pub rejected: Vec<(String, SubmissionError)>,
}

impl SubmissionReport {
    pub fn is_complete_success(&self) -> bool {
        self.assembly_failures.is_empty() && self.rejected.is_empty()
    }

    /// Another submission beat us to a point value
    pub fn has_race(&self) -> bool {
        self.rejected.iter().any(|(_, e)| e.is_race())
    }
}

/// One bettor's view of one room for one period.
///
/// Holds the pending picks and the point values already spent. Changing the
/// period discards both, so nothing leaks from one week into the next.
#[derive(Debug, Clone)]
pub struct WagerSession {
    room_id: String,
    period: PeriodKey,
    store: SelectionStore,
    taken: BTreeSet<Points>,
    report: ConstraintReport,
}

impl WagerSession {
    pub fn new(room_id: impl Into<String>, period: PeriodKey) -> Self {
        Self {
            room_id: room_id.into(),
            period,
            store: SelectionStore::new(),
            taken: BTreeSet::new(),
            report: ConstraintReport::default(),
        }
    }

    /// Start on the period the calendar says is current
    pub fn for_date(room_id: impl Into<String>, today: NaiveDate) -> Self {
        let default = default_selection(today);
        info!("Defaulting to {}", default.display_text);
        Self::new(room_id, default.period)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn period(&self) -> PeriodKey {
        self.period
    }

    pub fn selections(&self) -> &[Selection] {
        self.store.all()
    }

    pub fn taken_points(&self) -> &BTreeSet<Points> {
        &self.taken
    }

    /// Conflicts as of the latest mutation
    pub fn report(&self) -> &ConstraintReport {
        &self.report
    }

    pub fn set_week(&mut self, week: u8) -> Result<(), SeasonError> {
        let period = PeriodKey::new(self.period.year, self.period.season_type, week)?;
        self.change_period(period);
        Ok(())
    }

    pub fn set_year(&mut self, year: i32) -> Result<(), SeasonError> {
        let period = PeriodKey::new(year, self.period.season_type, self.period.week)?;
        self.change_period(period);
        Ok(())
    }

    /// The week is kept when the new season type has it, else capped to its
    /// last week.
    pub fn set_season_type(&mut self, season_type: SeasonType) -> Result<(), SeasonError> {
        let week = self.period.week.min(season_type.max_weeks());
        let period = PeriodKey::new(self.period.year, season_type, week)?;
        self.change_period(period);
        Ok(())
    }

    pub fn advance_week(&mut self) -> PeriodKey {
        self.change_period(next_period(self.period));
        self.period
    }

    fn change_period(&mut self, period: PeriodKey) {
        if period == self.period {
            return;
        }
        info!("Loading games for {}...", period);
        self.period = period;
        self.store.clear();
        self.taken.clear();
        self.refresh();
    }

    /// Replace the spent point values with the server's view of this period
    pub fn set_prior_wagers(&mut self, prior_wagers: &[PriorWager]) {
        self.taken = taken_points(prior_wagers);
        debug!("Points already used for {}: {:?}", self.period, self.taken);
        self.refresh();
    }

    pub fn toggle(&mut self, game_id: &str) -> Result<ToggleOutcome, SelectionError> {
        let outcome = self.store.toggle(game_id)?;
        self.refresh();
        Ok(outcome)
    }

    pub fn set_bet_type(&mut self, game_id: &str, bet_type: BetType) -> Result<(), SelectionError> {
        self.store.set_bet_type(game_id, bet_type)?;
        self.refresh();
        Ok(())
    }

    pub fn set_choice(&mut self, game_id: &str, choice: BetChoice) -> Result<(), SelectionError> {
        self.store.set_choice(game_id, choice)?;
        self.refresh();
        Ok(())
    }

    pub fn set_points(&mut self, game_id: &str, points: u8) -> Result<(), SelectionError> {
        self.store.set_points(game_id, points)?;
        self.refresh();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.report = evaluate(self.store.all(), &self.taken);
        for message in self.report.messages() {
            debug!("{}", message);
        }
    }

    pub fn availability(&self, game_id: &str) -> [(Points, PointStatus); 3] {
        point_availability(self.store.all(), &self.taken, game_id)
    }

    pub fn summary(&self, games: &[Game]) -> SelectionSummary {
        summarize(self.store.all(), games)
    }

    /// Send every pending pick. Refused as a whole while conflicts stand.
    /// Accepted picks leave the store; the rest stay so the bettor can fix
    /// and retry them.
    pub async fn submit<G>(
        &mut self,
        gateway: &G,
        games: &[Game],
    ) -> Result<SubmissionReport, AssemblyError>
    where
        G: WagerGateway + ?Sized,
    {
        let batch = assemble_batch(
            self.store.all(),
            &self.taken,
            games,
            self.period,
            &self.room_id,
        )?;

        let mut report = SubmissionReport {
            assembly_failures: batch.failures,
            ..SubmissionReport::default()
        };

        for request in &batch.requests {
            let points = request.game_bet.points_wagered();
            match gateway.create_wager(request).await {
                Ok(wager) => {
                    info!("Successfully placed {}-point bet on game {}", points, request.game_id);
                    self.taken.insert(points);
                    self.store.remove(&request.game_id);
                    report.accepted.push(wager);
                }
                Err(e) => {
                    warn!("Failed to place bet on game {}: {}", request.game_id, e);
                    if let SubmissionError::DuplicatePoints { points: Some(p) } = &e {
                        // the server's record wins over ours
                        self.taken.extend(Points::new(*p));
                    }
                    report.rejected.push((request.game_id.clone(), e));
                }
            }
        }

        if report.is_complete_success() {
            self.store.clear();
        }
        self.refresh();

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::wager_api::MockWagerGateway;
    use crate::models::fixtures::game;
    use crate::models::{TeamSide, TotalSide};
    use crate::utils::constraints::ConflictReason;
    use crate::utils::submission::WagerRequest;
    use serde_json::json;

    fn session() -> WagerSession {
        WagerSession::new("room-1", PeriodKey::new(2025, SeasonType::Regular, 1).unwrap())
    }

    fn games() -> Vec<Game> {
        vec![
            game("G1", Some(3.0), Some("home")),
            game("G2", Some(7.5), Some("away")),
            game("G3", Some(1.0), Some("home")),
        ]
    }

    fn prior(points: u8) -> PriorWager {
        serde_json::from_value(json!({ "game_id": "old", "points_wagered": points })).unwrap()
    }

    fn echo(request: &WagerRequest) -> Result<PriorWager, SubmissionError> {
        Ok(PriorWager {
            game_id: Some(request.game_id.clone()),
            points_wagered: Some(request.game_bet.points_wagered().value()),
            ..PriorWager::default()
        })
    }

    #[test]
    fn test_period_change_clears_selections() {
        let mut s = session();
        s.toggle("G1").unwrap();
        s.set_prior_wagers(&[prior(2)]);

        s.set_week(2).unwrap();
        assert!(s.selections().is_empty());
        assert!(s.taken_points().is_empty());
        assert_eq!(s.period().week, 2);

        s.toggle("G1").unwrap();
        s.set_year(2024).unwrap();
        assert!(s.selections().is_empty());

        s.toggle("G1").unwrap();
        s.set_season_type(SeasonType::Postseason).unwrap();
        assert!(s.selections().is_empty());
        assert_eq!(s.period().week, 2);
    }

    #[test]
    fn test_same_period_keeps_selections() {
        let mut s = session();
        s.toggle("G1").unwrap();
        s.set_week(1).unwrap();
        assert_eq!(s.selections().len(), 1);
    }

    #[test]
    fn test_invalid_week_is_refused() {
        let mut s = session();
        s.toggle("G1").unwrap();
        assert!(s.set_week(19).is_err());
        assert!(s.set_week(0).is_err());
        assert_eq!(s.period().week, 1);
        assert_eq!(s.selections().len(), 1);
    }

    #[test]
    fn test_season_type_caps_week() {
        let mut s = session();
        s.set_week(15).unwrap();
        s.set_season_type(SeasonType::Postseason).unwrap();
        assert_eq!(s.period().week, 4);
    }

    #[test]
    fn test_advance_week_rolls_into_postseason() {
        let mut s = session();
        s.set_week(18).unwrap();
        let next = s.advance_week();
        assert_eq!(next.season_type, SeasonType::Postseason);
        assert_eq!(next.week, 1);
    }

    #[test]
    fn test_report_tracks_mutations() {
        let mut s = session();
        s.set_prior_wagers(&[prior(2)]);
        s.toggle("G1").unwrap();
        s.toggle("G2").unwrap();
        assert_eq!(s.report().reason_for(Points::ONE), Some(ConflictReason::DuplicateInSession));

        s.set_points("G2", 2).unwrap();
        assert_eq!(s.report().reason_for(Points::TWO), Some(ConflictReason::TakenThisPeriod));
        assert_eq!(s.availability("G1")[1].1, PointStatus::TakenThisPeriod);

        s.set_points("G2", 3).unwrap();
        assert!(s.report().is_clean());

        s.set_bet_type("G2", BetType::OverUnder).unwrap();
        s.set_choice("G2", BetChoice::Total(TotalSide::Under)).unwrap();
        assert_eq!(s.summary(&games()).lines[1].pick, "Under 47.5");
    }

    #[tokio::test]
    async fn test_submit_success_clears_store() {
        let mut s = session();
        s.toggle("G1").unwrap();
        s.toggle("G2").unwrap();
        s.set_points("G2", 3).unwrap();
        s.set_choice("G2", BetChoice::Spread(TeamSide::Away)).unwrap();

        let mut gateway = MockWagerGateway::new();
        gateway.expect_create_wager().times(2).returning(echo);

        let report = s.submit(&gateway, &games()).await.unwrap();
        assert!(report.is_complete_success());
        assert_eq!(report.accepted.len(), 2);
        assert!(s.selections().is_empty());
        assert_eq!(s.taken_points(), &BTreeSet::from([Points::ONE, Points::THREE]));
    }

    #[tokio::test]
    async fn test_submit_with_conflict_sends_nothing() {
        let mut s = session();
        s.set_prior_wagers(&[prior(1)]);
        s.toggle("G1").unwrap();

        let mut gateway = MockWagerGateway::new();
        gateway.expect_create_wager().never();

        let err = s.submit(&gateway, &games()).await.unwrap_err();
        assert_eq!(err, AssemblyError::ConflictsPresent { points: vec![Points::ONE] });
        assert_eq!(s.selections().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_race_keeps_store_and_marks_point() {
        let mut s = session();
        s.toggle("G1").unwrap();
        s.toggle("G3").unwrap();
        s.set_points("G3", 2).unwrap();

        let mut gateway = MockWagerGateway::new();
        gateway.expect_create_wager().times(2).returning(|request| {
            if request.game_id == "G3" {
                Err(SubmissionError::DuplicatePoints { points: Some(2) })
            } else {
                echo(request)
            }
        });

        let report = s.submit(&gateway, &games()).await.unwrap();
        assert!(report.has_race());
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.rejected[0].0, "G3");
        assert_eq!(s.selections().len(), 1);
        assert_eq!(s.selections()[0].game_id, "G3");
        assert!(s.taken_points().contains(&Points::TWO));
        assert!(s.report().has_conflict);
    }
}
