use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use vpp_analysis::allocation;

use crate::{
    schema::allocator::AllocatorFile,
    util::{self, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct FitAllocatorArg {
    /// Performances JSON file
    performances: PathBuf,
    /// League model file
    #[arg(long)]
    league: PathBuf,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &FitAllocatorArg) -> anyhow::Result<()> {
    let FitAllocatorArg {
        performances,
        league,
        output,
    } = arg;

    let league = util::read_league_model_file(league)?;
    let records = util::read_performances_file(performances)?;
    eprintln!("Loaded {} performances", records.len());

    let allocator = allocation::fit_allocator(&records, &league.models.base)
        .context("Failed to fit possession allocator")?;

    eprintln!("Possession share by rank:");
    for (i, share) in allocator.shares().iter().enumerate() {
        let bar_width = (share * 100.0).round();
        eprintln!(
            "{:>4} | {share:.4} {}",
            i + 1,
            "#".repeat(bar_width_to_len(bar_width))
        );
    }

    let file = AllocatorFile {
        fitted_at: Utc::now(),
        allocator,
    };
    Output::save_json(&file, output.clone())?;
    Ok(())
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bar_width_to_len(width: f64) -> usize {
    width.clamp(0.0, 100.0) as usize
}
