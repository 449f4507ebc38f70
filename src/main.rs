use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

// Use library instead of local modules
use pokemon_vote::logging::init_tracing;
use pokemon_vote::{
    entities_with_stats, random_pair, ranked_results, submit_vote, RankedStats, StoreConfig,
    VoteRequest,
};

/// Pick your favorite of two Pokemon, see who the crowd loves most
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreConfig,

    /// Turn on debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the vote table and zero rows for every Pokemon
    Init,
    /// Every Pokemon with its tally, in id order
    List,
    /// Draw a random matchup
    Pair,
    /// Record that WINNER beat LOSER
    #[command(allow_negative_numbers = true)]
    Vote { winner: i64, loser: i64 },
    /// Show the leaderboard
    Results {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write the leaderboard to a CSV file
    Export { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let catalog = cli.store.load_catalog()?;
    let store = cli.store.open_store(&catalog)?;

    match cli.command {
        Command::Init => {
            println!("🗄️  Vote database ready: {:?}", cli.store.db_path);
            let votes = store.total_votes_cast()?;
            println!("✓ {} Pokemon, {} votes cast so far", catalog.len(), votes);
        }
        Command::List => {
            for stats in entities_with_stats(&catalog, &store)? {
                println!(
                    "{:>3}  {:<12} {:<14} W {:>4}  L {:>4}  total {:>4}",
                    stats.entity.id,
                    stats.entity.name,
                    stats.entity.category,
                    stats.wins,
                    stats.losses,
                    stats.total_votes
                );
            }
        }
        Command::Pair => {
            let (left, right) = random_pair(&catalog, &mut rand::thread_rng())?;
            println!("⚔️  {} (#{}) vs {} (#{})", left.name, left.id, right.name, right.id);
        }
        Command::Vote { winner, loser } => {
            submit_vote(&catalog, &store, &VoteRequest::new(winner, loser))
                .context("Vote was not recorded")?;
            println!("✅ Vote recorded: #{} beat #{}", winner, loser);
        }
        Command::Results { json } => {
            let results = ranked_results(&catalog, &store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_leaderboard(&results);
            }
        }
        Command::Export { path } => {
            let results = ranked_results(&catalog, &store)?;
            export_results(&path, &results)?;
            println!("✓ Exported {} rows to {:?}", results.len(), path);
        }
    }

    Ok(())
}

fn print_leaderboard(results: &[RankedStats]) {
    println!("🏆 Leaderboard");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for row in results {
        if row.stats.total_votes == 0 {
            println!("{:>3}. {:<12} no votes yet", row.rank, row.stats.entity.name);
        } else {
            println!(
                "{:>3}. {:<12} {:>5.1}%  ({} total votes)",
                row.rank, row.stats.entity.name, row.win_rate, row.stats.total_votes
            );
        }
    }
}

/// Flat CSV row (csv can't serialize flattened structs)
#[derive(Serialize)]
struct ExportRow<'a> {
    rank: usize,
    id: u32,
    name: &'a str,
    #[serde(rename = "type")]
    category: &'a str,
    wins: u64,
    losses: u64,
    total_votes: u64,
    win_rate: String,
}

fn write_results<W: Write>(writer: W, results: &[RankedStats]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for row in results {
        wtr.serialize(ExportRow {
            rank: row.rank,
            id: row.stats.entity.id,
            name: &row.stats.entity.name,
            category: &row.stats.entity.category,
            wins: row.stats.wins,
            losses: row.stats.losses,
            total_votes: row.stats.total_votes,
            win_rate: format!("{:.1}", row.win_rate),
        })?;
    }

    wtr.flush()?;
    Ok(())
}

fn export_results(path: &Path, results: &[RankedStats]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create export file {:?}", path))?;
    write_results(file, results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokemon_vote::{Catalog, VoteStore};

    #[test]
    fn test_write_results_csv() {
        let catalog = Catalog::builtin();
        let store = VoteStore::open_in_memory(&catalog).unwrap();
        store.initialize().unwrap();
        submit_vote(&catalog, &store, &VoteRequest::new(8, 1)).unwrap();

        let results = ranked_results(&catalog, &store).unwrap();
        let mut buffer = Vec::new();
        write_results(&mut buffer, &results).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "rank,id,name,type,wins,losses,total_votes,win_rate");
        assert_eq!(lines[1], "1,8,Snorlax,Normal,1,0,1,100.0");
    }

    #[test]
    fn test_cli_parses_vote() {
        let cli = Cli::try_parse_from(["pokemon-vote", "vote", "3", "7"]).unwrap();
        assert!(matches!(cli.command, Command::Vote { winner: 3, loser: 7 }));

        let cli = Cli::try_parse_from(["pokemon-vote", "results", "--json", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Results { json: true }));
    }
}
