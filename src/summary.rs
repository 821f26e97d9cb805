//! Folds a player's archived matches into the one summary object the recap
//! page consumes. Output keys follow the service-adjacent camelCase schema.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::PlayerRef;
use crate::model::{KillEvent, MatchRecord};

/// Five kills in one round.
const ACE_KILLS: u32 = 5;
const TOP_MAPS: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub name: String,
    pub tag: Option<String>,
    pub match_count: u32,
    pub total_kills: u32,
    pub total_deaths: u32,
    pub total_assists: u32,
    pub total_headshots: u32,
    pub total_bodyshots: u32,
    pub total_legshots: u32,
    pub wins: u32,
    pub headshot_percent: f64,
    pub kd: f64,
    pub win_rate: f64,
    pub top_agent: Option<(String, u32)>,
    /// Top maps by kills, best first.
    pub sorted_maps: Vec<(String, u32)>,
    pub best_match: Option<BestMatch>,
    pub aces: u32,
    pub first_bloods: u32,
    pub melee_kills: u32,
    pub melee_deaths: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestMatch {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub map: String,
    pub agent: String,
    pub date: String,
}

pub fn summarize_player(matches: &[MatchRecord], who: &PlayerRef) -> PlayerSummary {
    let mut summary = PlayerSummary {
        name: who.name.clone(),
        tag: who.tag.clone(),
        match_count: 0,
        total_kills: 0,
        total_deaths: 0,
        total_assists: 0,
        total_headshots: 0,
        total_bodyshots: 0,
        total_legshots: 0,
        wins: 0,
        headshot_percent: 0.0,
        kd: 0.0,
        win_rate: 0.0,
        top_agent: None,
        sorted_maps: Vec::new(),
        best_match: None,
        aces: 0,
        first_bloods: 0,
        melee_kills: 0,
        melee_deaths: 0,
    };

    let mut best_kills = 0u32;
    let mut kills_by_map: HashMap<String, u32> = HashMap::new();
    let mut agents: HashMap<String, u32> = HashMap::new();

    for m in matches {
        let Some(player) = m.find_player(&who.name) else {
            continue;
        };
        if summary.tag.is_none() && !player.tag.is_empty() {
            summary.tag = Some(player.tag.clone());
        }

        summary.match_count += 1;
        let stats = player.stats;
        let map_name = m.metadata.map.name.clone();

        summary.total_kills += stats.kills;
        summary.total_deaths += stats.deaths;
        summary.total_assists += stats.assists;
        summary.total_headshots += stats.headshots;
        summary.total_bodyshots += stats.bodyshots;
        summary.total_legshots += stats.legshots;

        if stats.kills > best_kills {
            best_kills = stats.kills;
            summary.best_match = Some(BestMatch {
                kills: stats.kills,
                deaths: stats.deaths,
                assists: stats.assists,
                map: map_name.clone(),
                agent: player.agent.name.clone(),
                date: m.start_date().to_string(),
            });
        }

        *kills_by_map.entry(map_name).or_insert(0) += stats.kills;
        *agents.entry(player.agent.name.clone()).or_insert(0) += 1;

        for round in &m.rounds {
            let aced = round
                .stats
                .iter()
                .filter(|row| row.player.name.eq_ignore_ascii_case(&who.name))
                .any(|row| row.stats.kills >= ACE_KILLS);
            if aced {
                summary.aces += 1;
            }
        }

        for first_kill in first_kills_by_round(&m.kills).values() {
            if first_kill.killer.name.eq_ignore_ascii_case(&who.name) {
                summary.first_bloods += 1;
            }
        }

        for kill in &m.kills {
            if !kill.is_melee() {
                continue;
            }
            if kill.killer.name.eq_ignore_ascii_case(&who.name) {
                summary.melee_kills += 1;
            }
            if kill.victim.name.eq_ignore_ascii_case(&who.name) {
                summary.melee_deaths += 1;
            }
        }

        let own = m.teams.iter().find(|t| t.team_id == player.team_id);
        let enemy = m.teams.iter().find(|t| t.team_id != player.team_id);
        if let (Some(own), Some(enemy)) = (own, enemy) {
            if own.rounds.won > enemy.rounds.won {
                summary.wins += 1;
            }
        }
    }

    let total_shots = summary.total_headshots + summary.total_bodyshots + summary.total_legshots;
    if total_shots > 0 {
        summary.headshot_percent =
            round_to(f64::from(summary.total_headshots) / f64::from(total_shots) * 100.0, 1);
    }
    summary.kd = if summary.total_deaths > 0 {
        round_to(
            f64::from(summary.total_kills) / f64::from(summary.total_deaths),
            2,
        )
    } else {
        f64::from(summary.total_kills)
    };
    if summary.match_count > 0 {
        summary.win_rate =
            (f64::from(summary.wins) / f64::from(summary.match_count) * 100.0).round();
    }

    let mut maps: Vec<(String, u32)> = kills_by_map.into_iter().collect();
    maps.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    maps.truncate(TOP_MAPS);
    summary.sorted_maps = maps;

    let mut agent_counts: Vec<(String, u32)> = agents.into_iter().collect();
    agent_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    summary.top_agent = agent_counts.into_iter().next();

    summary
}

/// Earliest kill of each round, by in-round time.
fn first_kills_by_round(kills: &[KillEvent]) -> HashMap<u32, &KillEvent> {
    let mut first: HashMap<u32, &KillEvent> = HashMap::new();
    for kill in kills {
        first
            .entry(kill.round)
            .and_modify(|held| {
                if kill.time_in_round_in_ms < held.time_in_round_in_ms {
                    *held = kill;
                }
            })
            .or_insert(kill);
    }
    first
}

/// Compact for the page, pretty for eyeballing; both atomic.
pub fn write_stats(path: &Path, summaries: &[PlayerSummary], pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(summaries)
    } else {
        serde_json::to_string(summaries)
    }
    .context("serialize player summaries")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {} into place", path.display()))?;
    Ok(())
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::round_to;

    #[test]
    fn rounding_matches_display_precision() {
        assert_eq!(round_to(33.333_333, 1), 33.3);
        assert_eq!(round_to(1.666_666_7, 2), 1.67);
        assert_eq!(round_to(2.0, 2), 2.0);
    }
}
