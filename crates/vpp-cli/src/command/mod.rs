use clap::{Parser, Subcommand};

use self::{
    allocate::AllocateArg, fit_allocator::FitAllocatorArg, fit_league::FitLeagueArg,
    generate_performances::GeneratePerformancesArg, rate::RateArg,
};

mod allocate;
mod fit_allocator;
mod fit_league;
mod generate_performances;
mod rate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Generate a synthetic league history
    GeneratePerformances(#[clap(flatten)] GeneratePerformancesArg),
    /// Fit base, defense and adjusted-offense league models
    FitLeague(#[clap(flatten)] FitLeagueArg),
    /// Fit the possession allocation curve
    FitAllocator(#[clap(flatten)] FitAllocatorArg),
    /// Rate every player in a performance history
    Rate(#[clap(flatten)] RateArg),
    /// Split possessions among a roster
    Allocate(#[clap(flatten)] AllocateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::GeneratePerformances(arg) => generate_performances::run(&arg)?,
        Mode::FitLeague(arg) => fit_league::run(&arg)?,
        Mode::FitAllocator(arg) => fit_allocator::run(&arg)?,
        Mode::Rate(arg) => rate::run(&arg)?,
        Mode::Allocate(arg) => allocate::run(&arg)?,
    }
    Ok(())
}
