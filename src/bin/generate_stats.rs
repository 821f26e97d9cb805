use std::path::PathBuf;

use anyhow::{Result, anyhow};

use valo_recap::archive::load_archive_matches;
use valo_recap::config::{self, FetchConfig};
use valo_recap::summary::{summarize_player, write_stats};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = FetchConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let registry = match flag_value(&args, "--players") {
        Some(raw) => config::parse_registry(&raw),
        None => config::registry_from_env(),
    };
    if registry.is_empty() {
        return Err(anyhow!(
            "no players registered; set RECAP_PLAYERS=Name#Tag[,Name#Tag...] or pass --players"
        ));
    }

    let dir = flag_value(&args, "--dir")
        .map(PathBuf::from)
        .unwrap_or(cfg.archive_dir);
    let out_path = flag_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| dir.join("stats.json"));
    let pretty_path = out_path.with_extension("pretty.json");

    let mut summaries = Vec::new();
    for player in &registry {
        let path = dir.join(player.archive_file_name());
        if !path.exists() {
            println!("skipping {player}: no archive at {}", path.display());
            continue;
        }
        let matches = load_archive_matches(&path)?;
        let summary = summarize_player(&matches, player);
        println!(
            "{}: {} matches, {} kills, {:.2} k/d, {} wins",
            summary.name, summary.match_count, summary.total_kills, summary.kd, summary.wins
        );
        summaries.push(summary);
    }
    if summaries.is_empty() {
        return Err(anyhow!("no archives found under {}", dir.display()));
    }

    write_stats(&out_path, &summaries, false)?;
    write_stats(&pretty_path, &summaries, true)?;
    println!("Wrote {} ({} players)", out_path.display(), summaries.len());
    println!("Debug copy: {}", pretty_path.display());

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(flag)
            && let Some(value) = value.strip_prefix('=')
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
        {
            let trimmed = next.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}
