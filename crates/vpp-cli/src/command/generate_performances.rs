use std::path::PathBuf;

use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng as _};
use rand_distr::{Distribution as _, Normal};
use rand_pcg::Pcg64Mcg;
use vpp_analysis::performances::RawPerformance;

use crate::util::Output;

/// Shape of a synthetic league.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenerateConfig {
    pub teams: usize,
    pub players_per_team: usize,
    pub rounds: usize,
    pub seed: u64,
    pub start_date: NaiveDate,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            teams: 12,
            players_per_team: 9,
            rounds: 3,
            seed: 0,
            start_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap_or_default(),
        }
    }
}

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct GeneratePerformancesArg {
    /// Number of teams
    #[arg(long, default_value_t = 12)]
    teams: usize,
    /// Roster size of each team
    #[arg(long, default_value_t = 9)]
    players_per_team: usize,
    /// Number of full round robins to play
    #[arg(long, default_value_t = 3)]
    rounds: usize,
    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl GeneratePerformancesArg {
    fn config(&self) -> GenerateConfig {
        GenerateConfig {
            teams: self.teams,
            players_per_team: self.players_per_team,
            rounds: self.rounds,
            seed: self.seed,
            ..GenerateConfig::default()
        }
    }
}

const TEAM_POSSESSIONS_MEAN: f64 = 70.0;
const TEAM_POSSESSIONS_SD: f64 = 5.0;
const TALENT_MEAN: f64 = 0.95;
const TALENT_SD: f64 = 0.12;
const DEFENSE_SD: f64 = 0.05;
/// Per-game noise std at one possession; shrinks with `1 / sqrt(possessions)`.
const GAME_NOISE_SCALE: f64 = 1.3;
/// Players sharing a floor at a time.
const ON_FLOOR: f64 = 5.0;

#[derive(Debug, Clone)]
struct SyntheticPlayer {
    id: String,
    offense: f64,
    defense: f64,
    usage: f64,
}

pub(crate) fn run(arg: &GeneratePerformancesArg) -> anyhow::Result<()> {
    let config = arg.config();
    anyhow::ensure!(config.teams >= 2, "need at least two teams");
    anyhow::ensure!(config.players_per_team >= 1, "need at least one player per team");

    eprintln!("Generating synthetic performances...");
    let rows = generate(&config)?;
    eprintln!(
        "Generated {} rows for {} players on {} teams.",
        rows.len(),
        config.teams * config.players_per_team,
        config.teams
    );
    Output::save_json(&rows, arg.output.clone())?;
    Ok(())
}

fn generate(config: &GenerateConfig) -> anyhow::Result<Vec<RawPerformance>> {
    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);
    let rosters = (0..config.teams)
        .map(|team| roster(&mut rng, team, config.players_per_team))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let team_possessions = Normal::new(TEAM_POSSESSIONS_MEAN, TEAM_POSSESSIONS_SD)?;

    let games_per_day = (config.teams / 2).max(1);
    let mut rows = Vec::new();
    let mut game = 0_usize;
    for round in 0..config.rounds {
        for home in 0..config.teams {
            for away in (home + 1)..config.teams {
                let day = u64::try_from(game / games_per_day)?;
                let date = config
                    .start_date
                    .checked_add_days(Days::new(day))
                    .ok_or_else(|| anyhow::anyhow!("date out of range after {day} days"))?;
                let game_id = format!("r{round}-g{game}");
                let possessions = team_possessions.sample(&mut rng).max(ON_FLOOR * 4.0);
                for (team, opponent) in [(home, away), (away, home)] {
                    let opponent_defense = mean_defense(&rosters[opponent]);
                    rows.extend(team_game(
                        &mut rng,
                        &rosters[team],
                        team,
                        &game_id,
                        date,
                        possessions,
                        opponent_defense,
                    )?);
                }
                game += 1;
            }
        }
    }
    Ok(rows)
}

fn roster<R>(rng: &mut R, team: usize, size: usize) -> anyhow::Result<Vec<SyntheticPlayer>>
where
    R: Rng,
{
    let offense = Normal::new(TALENT_MEAN, TALENT_SD)?;
    let defense = Normal::new(0.0, DEFENSE_SD)?;
    let mut players = (0..size)
        .map(|slot| SyntheticPlayer {
            id: format!("t{team}-p{slot}"),
            offense: offense.sample(rng),
            defense: defense.sample(rng),
            usage: rng.random_range(0.5..1.5),
        })
        .collect::<Vec<_>>();
    // Better players play more.
    players.sort_by(|a, b| b.offense.total_cmp(&a.offense));
    let mut weight = 1.0;
    for player in &mut players {
        player.usage *= weight;
        weight *= 0.85;
    }
    Ok(players)
}

#[expect(clippy::cast_precision_loss)]
fn mean_defense(players: &[SyntheticPlayer]) -> f64 {
    players.iter().map(|p| p.defense).sum::<f64>() / players.len() as f64
}

fn team_game<R>(
    rng: &mut R,
    players: &[SyntheticPlayer],
    team: usize,
    game_id: &str,
    date: NaiveDate,
    possessions: f64,
    opponent_defense: f64,
) -> anyhow::Result<Vec<RawPerformance>>
where
    R: Rng,
{
    // Every player's possessions sum to five times the team's.
    let mut dressed = players
        .iter()
        .filter(|_| rng.random_bool(0.92))
        .collect::<Vec<_>>();
    if dressed.is_empty() {
        dressed = players.iter().collect();
    }
    let total_usage = dressed.iter().map(|p| p.usage).sum::<f64>();
    let mut rows = Vec::with_capacity(dressed.len());
    for player in dressed {
        let n_possessions = (possessions * ON_FLOOR * player.usage / total_usage).round();
        if n_possessions < 1.0 {
            continue;
        }
        let noise = Normal::new(0.0, GAME_NOISE_SCALE / n_possessions.sqrt())?;
        let vpp = player.offense - opponent_defense + noise.sample(rng);
        rows.push(RawPerformance {
            player_id: player.id.as_str().into(),
            team_id: format!("t{team}").into(),
            game_id: game_id.into(),
            value: vpp * n_possessions,
            n_possessions,
            date: Some(date),
        });
    }
    Ok(rows)
}
