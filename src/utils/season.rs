use crate::models::{PeriodKey, SeasonType};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

/// Preseason opens August 1st of the season year
const PRESEASON_START: (u32, u32) = (8, 1);
/// Regular season opens September 1st of the season year
const REGULAR_SEASON_START: (u32, u32) = (9, 1);
/// Playoffs open January 8th of the following year
const PLAYOFFS_START: (u32, u32) = (1, 8);
/// First day after the playoffs (February 15th of the following year)
const PLAYOFFS_END: (u32, u32) = (2, 15);

/// Minute-precision timestamps published by the odds feed, e.g. `2025-09-07T17:00Z`
const FEED_MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeasonError {
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    #[error("invalid season type id: {0}")]
    InvalidSeasonType(u8),

    #[error("unknown season type: {0:?}")]
    UnknownSeasonType(String),

    #[error("week {week} is not valid for the {season_type:?} season")]
    InvalidWeek { season_type: SeasonType, week: u8 },
}

/// Result of mapping a calendar date onto the season calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodResolution {
    pub period: PeriodKey,
    pub is_off_season: bool,
}

impl PeriodResolution {
    pub fn season_type(&self) -> SeasonType {
        self.period.season_type
    }

    pub fn week(&self) -> u8 {
        self.period.week
    }

    pub fn year(&self) -> i32 {
        self.period.year
    }
}

/// Period used to seed a fresh room view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultSelection {
    pub period: PeriodKey,
    pub is_current_week: bool,
    pub display_text: String,
}

/// Half-open `[start, end)` date range for one season type
#[derive(Debug, Clone, Copy)]
struct SeasonWindow {
    season_type: SeasonType,
    start: NaiveDate,
    end: NaiveDate,
}

impl SeasonWindow {
    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Whole weeks elapsed since the window opened, 1-based and clamped to the
    /// season type's length
    fn week_of(&self, date: NaiveDate) -> u8 {
        let elapsed = date.signed_duration_since(self.start).num_days() / 7 + 1;
        elapsed.clamp(1, self.season_type.max_weeks() as i64) as u8
    }
}

fn ymd(year: i32, (month, day): (u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn season_windows(season_year: i32) -> Vec<SeasonWindow> {
    let bounds = [
        (
            SeasonType::Preseason,
            ymd(season_year, PRESEASON_START),
            ymd(season_year, REGULAR_SEASON_START),
        ),
        (
            SeasonType::Regular,
            ymd(season_year, REGULAR_SEASON_START),
            ymd(season_year + 1, PLAYOFFS_START),
        ),
        (
            SeasonType::Postseason,
            ymd(season_year + 1, PLAYOFFS_START),
            ymd(season_year + 1, PLAYOFFS_END),
        ),
    ];

    bounds
        .into_iter()
        .filter_map(|(season_type, start, end)| {
            Some(SeasonWindow {
                season_type,
                start: start?,
                end: end?,
            })
        })
        .collect()
}

/// The year a season is labelled by. January through July still belong to
/// the season that opened the previous August.
pub fn season_year(date: NaiveDate) -> i32 {
    if date.month() <= 7 {
        date.year() - 1
    } else {
        date.year()
    }
}

/// Year of the next season to open on or after `date`
fn upcoming_season_year(date: NaiveDate) -> i32 {
    match ymd(date.year(), PRESEASON_START) {
        Some(opening) if date < opening => date.year(),
        _ => date.year() + 1,
    }
}

/// Map a calendar date to its season type, week and season year.
///
/// Dates outside every window resolve to week 1 of the upcoming regular
/// season, flagged as off-season.
pub fn resolve_period(date: NaiveDate) -> PeriodResolution {
    let year = season_year(date);

    if let Some(window) = season_windows(year).into_iter().find(|w| w.contains(date)) {
        return PeriodResolution {
            period: PeriodKey {
                year,
                season_type: window.season_type,
                week: window.week_of(date),
            },
            is_off_season: false,
        };
    }

    PeriodResolution {
        period: PeriodKey {
            year: upcoming_season_year(date),
            season_type: SeasonType::Regular,
            week: 1,
        },
        is_off_season: true,
    }
}

/// Parse then resolve. Malformed input is an error, never "today".
pub fn resolve_period_str(input: &str) -> Result<PeriodResolution, SeasonError> {
    parse_date(input).map(resolve_period)
}

/// Resolve the local calendar date
pub fn current_period() -> PeriodResolution {
    resolve_period(Local::now().date_naive())
}

/// Step to the following week, rolling into the next season type at the end
/// of the current one (postseason rolls into next year's preseason)
pub fn next_period(period: PeriodKey) -> PeriodKey {
    if period.week < period.season_type.max_weeks() {
        return PeriodKey {
            week: period.week + 1,
            ..period
        };
    }

    let (season_type, new_year) = period.season_type.next();
    PeriodKey {
        year: if new_year { period.year + 1 } else { period.year },
        season_type,
        week: 1,
    }
}

/// The week after the one containing `date`. Off-season dates already point
/// at the upcoming season, so they are returned unchanged.
pub fn upcoming_period(date: NaiveDate) -> PeriodResolution {
    let current = resolve_period(date);
    if current.is_off_season {
        return current;
    }
    PeriodResolution {
        period: next_period(current.period),
        is_off_season: false,
    }
}

pub fn is_in_season(date: NaiveDate) -> bool {
    !resolve_period(date).is_off_season
}

pub fn default_selection(today: NaiveDate) -> DefaultSelection {
    let current = resolve_period(today);
    DefaultSelection {
        period: current.period,
        is_current_week: !current.is_off_season,
        display_text: season_display_text(current.year(), current.season_type(), None),
    }
}

pub fn is_valid_week(season_type: SeasonType, week: u8) -> bool {
    (1..=season_type.max_weeks()).contains(&week)
}

/// e.g. "2025 Regular Season Week 3", or "2025 Playoffs" without a week
pub fn season_display_text(year: i32, season_type: SeasonType, week: Option<u8>) -> String {
    match week {
        Some(week) => format!("{} {} Week {}", year, season_type.display_name(), week),
        None => format!("{} {}", year, season_type.display_name()),
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339, or the feed's minute-precision form. A
/// timestamp resolves to the calendar date in its own offset.
pub fn parse_date(input: &str) -> Result<NaiveDate, SeasonError> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, FEED_MINUTE_FORMAT) {
        return Ok(timestamp.date());
    }

    Err(SeasonError::InvalidDate(input.to_string()))
}

/// Parse a kickoff timestamp. Date-only values are taken as midnight UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, SeasonError> {
    let trimmed = input.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, FEED_MINUTE_FORMAT) {
        return Ok(Utc.from_utc_datetime(&timestamp));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight));
    }

    Err(SeasonError::InvalidDate(input.to_string()))
}
