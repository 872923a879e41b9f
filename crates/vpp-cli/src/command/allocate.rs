use std::{collections::BTreeMap, path::PathBuf};

use serde::Serialize;
use vpp_engine::{PlayerId, Rating, TeamId};

use crate::util::{self, Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AllocateArg {
    /// Allocator file
    #[arg(long)]
    allocator: PathBuf,
    /// Ratings file produced by `rate`
    #[arg(long)]
    ratings: PathBuf,
    /// Players to allocate among (comma separated)
    #[arg(long, value_delimiter = ',')]
    players: Vec<String>,
    /// Allocate among the players of this team's most recent game
    #[arg(long, conflicts_with = "players")]
    team: Option<String>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct PlayerShare {
    player_id: PlayerId,
    rating: Rating,
    share: f64,
}

pub(crate) fn run(arg: &AllocateArg) -> anyhow::Result<()> {
    let AllocateArg {
        allocator,
        ratings,
        players,
        team,
        output,
    } = arg;

    let allocator = util::read_allocator_file(allocator)?.allocator;
    let ratings = util::read_ratings_file(ratings)?;
    let offense = &ratings.ratings.offense;

    let roster = match (players.as_slice(), team) {
        ([], None) => offense.clone(),
        ([], Some(team)) => {
            let team = TeamId::from(team.as_str());
            let players = ratings
                .rosters
                .get(&team)
                .ok_or_else(|| anyhow::anyhow!("Team {team} has no recorded games"))?;
            let roster = players
                .iter()
                .filter_map(|player_id| Some((player_id.clone(), *offense.get(player_id)?)))
                .collect::<BTreeMap<_, _>>();
            anyhow::ensure!(!roster.is_empty(), "Team {team} has no rated players");
            roster
        }
        (players, _) => players
            .iter()
            .map(|id| -> anyhow::Result<(PlayerId, Rating)> {
                let player_id = PlayerId::from(id.as_str());
                let rating = offense
                    .get(&player_id)
                    .ok_or_else(|| anyhow::anyhow!("Player {id} has no rating"))?;
                Ok((player_id, *rating))
            })
            .collect::<anyhow::Result<BTreeMap<_, _>>>()?,
    };

    let shares = allocator
        .allocate(&roster)
        .into_iter()
        .map(|(player_id, share)| PlayerShare {
            rating: roster[&player_id],
            player_id,
            share,
        })
        .collect::<Vec<_>>();

    eprintln!("{:>4} {:<16} {:>8} {:>7}", "rank", "player", "rating", "share");
    for (i, entry) in shares.iter().enumerate() {
        eprintln!(
            "{:>4} {:<16} {:>8.4} {:>6.1}%",
            i + 1,
            entry.player_id,
            entry.rating.mean,
            entry.share * 100.0
        );
    }
    Output::save_json(&shares, output.clone())?;
    Ok(())
}
