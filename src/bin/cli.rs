//! Weekly NFL wager picker.
//!
//! Usage:
//!   cli period --date 2025-09-14          # Which week a date falls in
//!   cli next --year 2025 --season-type regular --week 18
//!   cli spread --raw 3.5 --favored away --choice away
//!   cli plan --odds cache/odds.json --pick 401772510:spread:away:2
//!   cli submit --pick 401772510:spread:away:2 --pick 401772511:total:under:1

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use nfl_wager_pool::api::wager_api::WagerApiClient;
use nfl_wager_pool::config::Config;
use nfl_wager_pool::data::{load_from_cache, save_wagers_to_csv};
use nfl_wager_pool::lines::displayed_spread;
use nfl_wager_pool::season::{
    current_period, default_selection, next_period, resolve_period, resolve_period_str,
    season_display_text,
};
use nfl_wager_pool::session::WagerSession;
use nfl_wager_pool::submission::assemble_batch;
use nfl_wager_pool::{
    fetch_period_data, BetChoice, BetType, OddsResponse, PeriodKey, SeasonType, TeamSide,
    UserWeekBets,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cli")]
#[command(about = "Pick and place weekly NFL confidence wagers")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a date (default: today) to its season period
    Period {
        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        date: Option<String>,
    },

    /// The period after the given one
    Next {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Show a spread from the bettor's side
    Spread {
        #[arg(long, allow_hyphen_values = true)]
        raw: f64,
        #[arg(long)]
        favored: Option<TeamSide>,
        #[arg(long)]
        choice: Option<TeamSide>,
    },

    /// Check picks against a saved odds file without sending anything
    Plan {
        /// Odds response saved as JSON
        #[arg(long)]
        odds: PathBuf,

        /// Placed-bets response saved as JSON
        #[arg(long)]
        prior: Option<PathBuf>,

        /// GAME_ID:TYPE:CHOICE:POINTS, e.g. 401772510:spread:home:2
        #[arg(long = "pick", value_parser = parse_pick)]
        picks: Vec<Pick>,

        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Fetch the period's games and place the picks
    Submit {
        #[arg(long = "pick", value_parser = parse_pick, required = true)]
        picks: Vec<Pick>,

        #[command(flatten)]
        period: PeriodArgs,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct PeriodArgs {
    #[arg(long)]
    year: Option<i32>,

    /// preseason, regular, postseason (or 1, 2, 3)
    #[arg(long)]
    season_type: Option<SeasonType>,

    #[arg(long)]
    week: Option<u8>,
}

impl PeriodArgs {
    /// Fill in whatever was not given from `fallback`
    fn resolve(self, fallback: PeriodKey) -> Result<PeriodKey> {
        Ok(PeriodKey::new(
            self.year.unwrap_or(fallback.year),
            self.season_type.unwrap_or(fallback.season_type),
            self.week.unwrap_or(fallback.week),
        )?)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Pick {
    game_id: String,
    bet_type: BetType,
    choice: BetChoice,
    points: u8,
}

fn parse_pick(input: &str) -> Result<Pick, String> {
    let parts: Vec<&str> = input.split(':').collect();
    let [game_id, bet_type, choice, points] = parts.as_slice() else {
        return Err(format!("expected GAME_ID:TYPE:CHOICE:POINTS, got {:?}", input));
    };

    let bet_type: BetType = bet_type.parse()?;
    let choice: BetChoice = choice.parse()?;
    if choice.bet_type() != bet_type {
        return Err(format!("{:?} does not go with a {:?} bet", choice, bet_type));
    }
    let points = points
        .parse::<u8>()
        .map_err(|e| format!("bad points {:?}: {}", points, e))?;

    Ok(Pick {
        game_id: game_id.to_string(),
        bet_type,
        choice,
        points,
    })
}

fn apply_picks(session: &mut WagerSession, picks: &[Pick]) -> Result<()> {
    for pick in picks {
        session.toggle(&pick.game_id)?;
        session.set_bet_type(&pick.game_id, pick.bet_type)?;
        session.set_choice(&pick.game_id, pick.choice)?;
        session.set_points(&pick.game_id, pick.points)?;
    }
    Ok(())
}

/// Print the pending picks and any conflicts. Returns false when conflicts
/// block submission.
fn print_review(session: &WagerSession, games: &[nfl_wager_pool::Game]) -> bool {
    let summary = session.summary(games);
    println!("{} picks, {} total points\n", summary.lines.len(), summary.total_points);
    for (i, line) in summary.lines.iter().enumerate() {
        println!("{}. {}", i + 1, line.format());
    }

    let report = session.report();
    if report.has_conflict {
        println!("\nPOINT CONFLICTS\n");
        for selection in report.conflicting_games(session.selections()) {
            if let Some(reason) = report.reason_for(selection.points) {
                println!("  {} [{}] {}", selection.game_id, reason.badge(), reason.message(selection.points));
            }
        }
        return false;
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    match args.command {
        Command::Period { date } => {
            let resolution = match date {
                Some(date) => resolve_period_str(&date)?,
                None => current_period(),
            };
            println!("{}", resolution.period);
            if resolution.is_off_season {
                println!("Off season; defaulting to the start of the upcoming season");
            }
            let default = default_selection(Local::now().date_naive());
            println!("Today: {}", default.display_text);
        }

        Command::Next { period } => {
            let period = period.resolve(current_period().period)?;
            println!("{}", next_period(period));
        }

        Command::Spread { raw, favored, choice } => {
            println!("{}", displayed_spread(Some(raw), favored, choice));
        }

        Command::Plan { odds, prior, picks, period } => {
            let odds: OddsResponse = load_from_cache(&odds)?;
            let fallback = match (odds.year, odds.season_type, odds.week) {
                (Some(year), Some(season_type), Some(week)) => PeriodKey::new(
                    year,
                    SeasonType::try_from(season_type)?,
                    week,
                )?,
                _ => resolve_period(Local::now().date_naive()).period,
            };
            let period = period.resolve(fallback)?;
            println!("{}\n", season_display_text(period.year, period.season_type, Some(period.week)));

            let mut session = WagerSession::new(config.room_id.clone().unwrap_or_default(), period);
            if let Some(prior) = prior {
                let bets: UserWeekBets = load_from_cache(&prior)?;
                session.set_prior_wagers(&bets.bets);
            }
            apply_picks(&mut session, &picks)?;

            if !print_review(&session, &odds.odds) {
                return Ok(());
            }

            let batch = assemble_batch(
                session.selections(),
                session.taken_points(),
                &odds.odds,
                period,
                session.room_id(),
            )?;
            for failure in &batch.failures {
                println!("Cannot place: {}", failure);
            }
            println!("\n{}", serde_json::to_string_pretty(&batch.requests)?);

            if config.save_csv && !batch.requests.is_empty() {
                let csv_file = config.cache_dir.join("planned_wagers.csv");
                save_wagers_to_csv(&batch.requests, &csv_file)?;
                println!("\nSaved planned wagers to {}", csv_file.display());
            }
        }

        Command::Submit { picks, period } => {
            let period = period.resolve(current_period().period)?;
            let client = WagerApiClient::new(
                config.require_api_endpoint()?.to_string(),
                config.id_token.clone(),
            );
            let data = fetch_period_data(&config, &client, period).await?;

            let mut session = WagerSession::new(config.require_room_id()?, period);
            session.set_prior_wagers(&data.prior_wagers);
            apply_picks(&mut session, &picks)?;

            if !print_review(&session, &data.games) {
                anyhow::bail!("Resolve point conflicts before submitting");
            }

            let report = session
                .submit(&client, &data.games)
                .await
                .context("Failed to submit wagers")?;

            println!();
            for wager in &report.accepted {
                println!(
                    "Placed {}-point bet on game {}",
                    wager.points_wagered.unwrap_or_default(),
                    wager.game_id.as_deref().unwrap_or("?")
                );
            }
            for failure in &report.assembly_failures {
                println!("Not sent: {}", failure);
            }
            for (game_id, error) in &report.rejected {
                println!("Rejected {}: {}", game_id, error);
            }
            if report.has_race() {
                println!("\nAnother submission used some of these points; refresh and pick again.");
            }
            if !report.is_complete_success() {
                anyhow::bail!("{} of the picks were not placed", session.selections().len());
            }
        }
    }

    Ok(())
}
