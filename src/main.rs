use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use valo_recap::api::{self, HttpMatchSource};
use valo_recap::config::{FetchConfig, PlayerRef};
use valo_recap::fetch::{FetchSession, Resume, TerminationReason};
use valo_recap::http_client::http_client;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = FetchConfig::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let name = flag_value(&args, "--name")
        .ok_or_else(|| anyhow!("--name is required (in-game name)"))?;
    let tag = flag_value(&args, "--tag").ok_or_else(|| anyhow!("--tag is required (e.g. NA1)"))?;
    let resume = if let Some(raw) = flag_value(&args, "--resume-from") {
        Resume::AtOffset(raw.parse().context("--resume-from expects a page offset")?)
    } else if has_flag(&args, "--resume") {
        Resume::FromCheckpoint
    } else {
        Resume::Fresh
    };

    let player = PlayerRef {
        name: name.clone(),
        tag: Some(tag.clone()),
    };
    let archive_path = flag_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.archive_dir.join(player.archive_file_name()));

    let client = http_client()?;

    if has_flag(&args, "--verify-account") {
        let account = api::fetch_account(client, &cfg, &player.name, &tag)
            .map_err(|err| anyhow!("account lookup failed: {err}"))?;
        println!(
            "account {player}: puuid {}, region {}, level {}",
            account.puuid,
            account.region.as_deref().unwrap_or("?"),
            account
                .account_level
                .map_or_else(|| "?".to_string(), |l| l.to_string()),
        );
    }

    println!(
        "fetching {} matches for {player} ({}/{})",
        cfg.target_year, cfg.region, cfg.platform
    );

    let session = FetchSession::start(player, cfg.target_year, archive_path.clone(), resume)?
        .with_filters(cfg.mode.clone(), cfg.map.clone());
    let mut source = HttpMatchSource::new(client, &cfg, &name, &tag);
    let outcome = session.run(&mut source)?;

    println!("Archive: {}", archive_path.display());
    println!(
        "Matches: {} ({} new across {} pages)",
        outcome.matches.len(),
        outcome.added,
        outcome.pages_fetched
    );
    match outcome.reason {
        TerminationReason::Exhausted => println!("Done: history exhausted"),
        TerminationReason::YearBoundary => {
            println!("Done: reached the {} boundary", cfg.target_year - 1)
        }
        TerminationReason::Error => {
            let detail = outcome.error.as_deref().unwrap_or("unknown error");
            return Err(anyhow!(
                "fetch ended early: {detail}; resume with --resume (offset {})",
                outcome.next_offset
            ));
        }
    }

    Ok(())
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    flag_ref(args, flag).map(|s| s.to_string())
}

fn flag_ref<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(flag)
            && let Some(value) = value.strip_prefix('=')
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
        {
            let trimmed = next.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}
