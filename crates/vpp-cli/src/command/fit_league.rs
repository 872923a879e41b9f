use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use vpp_analysis::{
    defense::AdjustmentSign,
    league,
    sample::CareerFilter,
    variance_model::{LeagueFit, VarianceModelConfig},
};

use crate::{
    schema::league_model::{FitSettings, LeagueModelFile},
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct FitLeagueArg {
    /// Performances JSON file
    performances: PathBuf,
    /// Number of possession percentile buckets
    #[arg(long, default_value_t = 100)]
    buckets: usize,
    /// Power whose negative linearizes bucket std against possessions
    #[arg(long, default_value_t = 3)]
    inverse_power: u32,
    /// Degree of the polynomial in possessions
    #[arg(long, default_value_t = 1)]
    degree: usize,
    /// Players need more than this many games to take part in fitting
    #[arg(long, default_value_t = 15)]
    min_games: usize,
    /// Players need more than this many possessions to take part in fitting
    #[arg(long, default_value_t = 100.0)]
    min_possessions: f64,
    /// How the defensive adjustment enters adjusted offense (subtract or add)
    #[arg(long, default_value = "subtract")]
    adjustment_sign: AdjustmentSign,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &FitLeagueArg) -> anyhow::Result<()> {
    let FitLeagueArg {
        performances,
        buckets,
        inverse_power,
        degree,
        min_games,
        min_possessions,
        adjustment_sign,
        output,
    } = arg;

    eprintln!("Loading performances from {}...", performances.display());
    let records = util::read_performances_file(performances)?;
    eprintln!("Loaded {} performances", records.len());

    let config = VarianceModelConfig {
        buckets: *buckets,
        inverse_power: *inverse_power,
        degree: *degree,
        career_filter: CareerFilter {
            min_games: *min_games,
            min_possessions: *min_possessions,
        },
    };
    let fit = league::fit_league_models(&records, &config, *adjustment_sign)
        .context("Failed to fit league models")?;

    eprintln!();
    print_fit_summary("base", &fit.base);
    print_fit_summary("defense", &fit.defense);
    print_fit_summary("adjusted offense", &fit.adjusted_offense);

    let file = LeagueModelFile {
        fitted_at: Utc::now(),
        adjustment_sign: *adjustment_sign,
        fit: FitSettings {
            buckets: *buckets,
            inverse_power: *inverse_power,
            degree: *degree,
            min_games: *min_games,
            min_possessions: *min_possessions,
            num_records: records.len(),
        },
        models: fit.models(),
    };
    Output::save_json(&file, output.clone())?;
    Ok(())
}

fn print_fit_summary(name: &str, fit: &LeagueFit) {
    let std_model = fit.model.possessions_to_vpp_std();
    let (min, max) = std_model.domain();
    let usable = fit
        .variance
        .buckets
        .iter()
        .filter(|b| b.deviation_std.is_some())
        .count();
    eprintln!("{name} model:");
    eprintln!(
        "  prior:        mean {:.4}, sd {:.4} ({} qualified players)",
        fit.model.vpp_mean(),
        fit.model.vpp_variance().sqrt(),
        fit.qualified_players
    );
    eprintln!(
        "  buckets:      {usable} of {} usable",
        fit.variance.buckets.len()
    );
    eprintln!("  domain:       [{min:.1}, {max:.1}] possessions");
    eprintln!(
        "  noise sd:     {:.4} at {min:.1}, {:.4} at {max:.1}",
        std_model.predict_std(min),
        std_model.predict_std(max)
    );
}
