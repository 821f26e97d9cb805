//! Typed view of the match-history service's record schema, kept to the
//! fields the year filter and the recap aggregation actually read. Everything
//! else the service sends is ignored on input and absent from archives.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub metadata: MatchMetadata,
    #[serde(default)]
    pub players: Vec<MatchPlayer>,
    #[serde(default)]
    pub rounds: Vec<RoundResult>,
    #[serde(default)]
    pub kills: Vec<KillEvent>,
    #[serde(default)]
    pub teams: Vec<TeamScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetadata {
    pub match_id: String,
    /// RFC3339, e.g. `2025-12-18T07:13:14.185Z`.
    pub started_at: String,
    #[serde(default)]
    pub map: MapRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub agent: AgentRef,
    #[serde(default)]
    pub stats: PlayerStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub headshots: u32,
    #[serde(default)]
    pub bodyshots: u32,
    #[serde(default)]
    pub legshots: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    #[serde(default)]
    pub stats: Vec<RoundPlayerStat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundPlayerStat {
    pub player: PlayerHandle,
    #[serde(default)]
    pub stats: RoundStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    #[serde(default)]
    pub kills: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillEvent {
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub time_in_round_in_ms: u64,
    pub killer: PlayerHandle,
    pub victim: PlayerHandle,
    #[serde(default)]
    pub weapon: Option<WeaponRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHandle {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponRef {
    #[serde(rename = "type", default)]
    pub weapon_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub rounds: TeamRounds,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRounds {
    #[serde(default)]
    pub won: u32,
    #[serde(default)]
    pub lost: u32,
}

impl MatchRecord {
    pub fn started_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.metadata.started_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn start_year(&self) -> Option<i32> {
        self.started_at_utc().map(|dt| dt.year())
    }

    /// Calendar date prefix of the start timestamp, for display.
    pub fn start_date(&self) -> &str {
        self.metadata
            .started_at
            .get(..10)
            .unwrap_or(&self.metadata.started_at)
    }

    pub fn find_player(&self, name: &str) -> Option<&MatchPlayer> {
        self.players.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl KillEvent {
    pub fn is_melee(&self) -> bool {
        self.weapon
            .as_ref()
            .and_then(|w| w.weapon_type.as_deref())
            .is_some_and(|t| t.eq_ignore_ascii_case("Melee"))
    }
}
