use crate::models::{BetChoice, BetType, InvalidPoints, Points, Selection};
use thiserror::Error;
use tracing::{debug, warn};

/// Most games a bettor may pick in one period
pub const MAX_SELECTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("You can only select up to 3 games for betting")]
    SelectionLimitExceeded,

    #[error("game {0} is not selected")]
    NotSelected(String),

    #[error(transparent)]
    InvalidPoints(#[from] InvalidPoints),

    #[error("{choice:?} is not a valid choice for a {bet_type:?} bet")]
    ChoiceMismatch { bet_type: BetType, choice: BetChoice },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
}

/// Caller passed something the presentation layer should never offer
fn contract_violation(message: &str) {
    warn!("contract violation: {}", message);
    #[cfg(feature = "strict")]
    panic!("contract violation: {}", message);
}

/// The bettor's unsubmitted picks for the active period, in selection order.
///
/// Owned by a single writer; every mutation goes through the methods below so
/// the cap and the bet-type/choice pairing cannot be broken from outside.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    selections: Vec<Selection>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deselect a picked game, or pick it with defaults (spread / home / 1).
    /// A fourth pick is rejected and leaves the store untouched.
    pub fn toggle(&mut self, game_id: &str) -> Result<ToggleOutcome, SelectionError> {
        if let Some(index) = self.position(game_id) {
            self.selections.remove(index);
            debug!("Deselected game {}", game_id);
            return Ok(ToggleOutcome::Deselected);
        }

        if self.is_full() {
            warn!(
                "Rejected selection of game {}: already holding {} picks",
                game_id, MAX_SELECTIONS
            );
            return Err(SelectionError::SelectionLimitExceeded);
        }

        self.selections.push(Selection::with_defaults(game_id));
        debug!("Selected game {}", game_id);
        Ok(ToggleOutcome::Selected)
    }

    /// Switch bet type. The choice resets to the type's first value; points
    /// are kept.
    pub fn set_bet_type(&mut self, game_id: &str, bet_type: BetType) -> Result<(), SelectionError> {
        let selection = self.get_mut(game_id)?;
        if selection.bet_type() != bet_type {
            selection.choice = BetChoice::default_for(bet_type);
        }
        Ok(())
    }

    pub fn set_choice(&mut self, game_id: &str, choice: BetChoice) -> Result<(), SelectionError> {
        let selection = self.get_mut(game_id)?;
        let bet_type = selection.bet_type();
        if choice.bet_type() != bet_type {
            contract_violation(&format!(
                "{:?} for game {}, which is a {:?} bet",
                choice, game_id, bet_type
            ));
            return Err(SelectionError::ChoiceMismatch { bet_type, choice });
        }
        selection.choice = choice;
        Ok(())
    }

    /// Values outside 1..=3 are refused without touching the store
    pub fn set_points(&mut self, game_id: &str, points: u8) -> Result<(), SelectionError> {
        let points = Points::try_from(points).map_err(|e| {
            contract_violation(&format!("{} for game {}", e, game_id));
            SelectionError::from(e)
        })?;
        self.get_mut(game_id)?.points = points;
        Ok(())
    }

    /// Drop a pick without the toggle semantics
    pub fn remove(&mut self, game_id: &str) -> Option<Selection> {
        self.position(game_id).map(|index| self.selections.remove(index))
    }

    pub fn clear(&mut self) {
        if !self.selections.is_empty() {
            debug!("Clearing {} pending selections", self.selections.len());
        }
        self.selections.clear();
    }

    pub fn all(&self) -> &[Selection] {
        &self.selections
    }

    pub fn get(&self, game_id: &str) -> Option<&Selection> {
        self.selections.iter().find(|s| s.game_id == game_id)
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.position(game_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.selections.len() >= MAX_SELECTIONS
    }

    /// Sum of points across pending picks
    pub fn total_points(&self) -> u32 {
        self.selections
            .iter()
            .map(|s| u32::from(s.points.value()))
            .sum()
    }

    fn position(&self, game_id: &str) -> Option<usize> {
        self.selections.iter().position(|s| s.game_id == game_id)
    }

    fn get_mut(&mut self, game_id: &str) -> Result<&mut Selection, SelectionError> {
        match self.selections.iter_mut().find(|s| s.game_id == game_id) {
            Some(selection) => Ok(selection),
            None => {
                warn!("Game {} is not in the current selection", game_id);
                Err(SelectionError::NotSelected(game_id.to_string()))
            }
        }
    }
}
