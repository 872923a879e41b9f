use std::{collections::BTreeMap, path::PathBuf};

use anyhow::Context;
use chrono::Utc;
use vpp_analysis::{allocation, defense::AdjustmentSign, league};
use vpp_engine::{PlayerId, PriorGetter, Rating, TeamHistoryPrior};
use vpp_stats::{descriptive::DescriptiveStats, percentiles::Percentiles};

use crate::{
    schema::ratings::{RatingsFile, TeamPriorsFile},
    util::{self, Output},
};

const SUMMARY_PERCENTILES: [f64; 5] = [5.0, 25.0, 50.0, 75.0, 95.0];

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct RateArg {
    /// Performances JSON file
    performances: PathBuf,
    /// League model file
    #[arg(long)]
    league: PathBuf,
    /// Per-team offensive priors (JSON object of team id to rating)
    #[arg(long)]
    team_priors: Option<PathBuf>,
    /// Override the sign the league models were fitted with (subtract or add)
    #[arg(long)]
    adjustment_sign: Option<AdjustmentSign>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &RateArg) -> anyhow::Result<()> {
    let RateArg {
        performances,
        league,
        team_priors,
        adjustment_sign,
        output,
    } = arg;

    let league = util::read_league_model_file(league)?;
    let records = util::read_performances_file(performances)?;
    eprintln!("Loaded {} performances", records.len());

    let prior = team_priors
        .as_ref()
        .map(|path| -> anyhow::Result<Box<dyn PriorGetter>> {
            let teams: TeamPriorsFile = util::read_json_file("team priors", path)?;
            let prior = TeamHistoryPrior::new(teams)
                .with_context(|| format!("Invalid team priors file: {}", path.display()))?;
            Ok(Box::new(prior))
        })
        .transpose()?;
    let sign = adjustment_sign.unwrap_or(league.adjustment_sign);
    if sign != league.adjustment_sign {
        tracing::warn!(
            fitted = %league.adjustment_sign,
            used = %sign,
            "adjustment sign differs from the one the models were fitted with"
        );
    }

    let ratings =
        league::rate_league(&records, &league.models, prior, sign).context("Rating pass failed")?;

    eprintln!();
    print_summary("offense", &ratings.offense);
    print_summary("defense", &ratings.defense);
    print_summary("adjusted offense", &ratings.adjusted_offense);

    let file = RatingsFile {
        rated_at: Utc::now(),
        adjustment_sign: sign,
        rosters: allocation::latest_rosters(&records),
        ratings,
    };
    Output::save_json(&file, output.clone())?;
    Ok(())
}

fn print_summary(name: &str, ratings: &BTreeMap<PlayerId, Rating>) {
    let means = ratings.values().map(|r| r.mean).collect::<Vec<_>>();
    let Some(stats) = DescriptiveStats::new(means.iter().copied()) else {
        eprintln!("{name}: no players rated");
        return;
    };
    let percentiles = Percentiles::new(&means, &SUMMARY_PERCENTILES);
    let sds = ratings.values().map(Rating::std_dev);
    let median_sd = DescriptiveStats::new(sds).map_or(f64::NAN, |s| s.median);

    eprintln!(
        "{name}: {} players, mean {:.4}, median rating sd {median_sd:.4}",
        stats.count, stats.mean
    );
    let line = percentiles
        .iter()
        .map(|(p, value)| format!("P{p:02.0} {value:.4}"))
        .collect::<Vec<_>>()
        .join("  ");
    eprintln!("  {line}");
}
