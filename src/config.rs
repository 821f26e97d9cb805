use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_YEAR: i32 = 2025;

/// Everything the fetch loop needs from the environment. Credentials and the
/// target year are never embedded in code; `.env` / `.env.local` are loaded
/// by the binaries before this is read.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_token: Option<String>,
    pub region: String,
    pub platform: String,
    pub target_year: i32,
    pub mode: Option<String>,
    pub map: Option<String>,
    pub archive_dir: PathBuf,
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let api_token = env_opt("HENRIK_API_TOKEN");
        let region = env_opt("RECAP_REGION").unwrap_or_else(|| "na".to_string());
        let platform = env_opt("RECAP_PLATFORM").unwrap_or_else(|| "pc".to_string());
        let target_year = env::var("RECAP_TARGET_YEAR")
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_TARGET_YEAR);
        let mode = env_opt("RECAP_MODE");
        let map = env_opt("RECAP_MAP");
        let archive_dir = env_opt("RECAP_ARCHIVE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            api_token,
            region,
            platform,
            target_year,
            mode,
            map,
            archive_dir,
        }
    }
}

/// One registered player. The tag is optional in the stats registry; archives
/// always carry the tag the fetch ran with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl PlayerRef {
    /// Accepts `Name#Tag` or a bare `Name`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.split_once('#') {
            Some((name, tag)) if !name.trim().is_empty() => Some(Self {
                name: name.trim().to_string(),
                tag: non_empty(tag.trim()),
            }),
            Some(_) => None,
            None => Some(Self {
                name: raw.to_string(),
                tag: None,
            }),
        }
    }

    pub fn same_player(&self, other: &PlayerRef) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) {
            return false;
        }
        match (&self.tag, &other.tag) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        }
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}_matches.json", self.name)
    }
}

impl std::fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}#{}", self.name, tag),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Parses the `RECAP_PLAYERS` list, e.g. `ScrubCity#30fps, brassbonanza`.
/// Duplicate names keep their first occurrence.
pub fn registry_from_env() -> Vec<PlayerRef> {
    let Ok(raw) = env::var("RECAP_PLAYERS") else {
        return Vec::new();
    };
    parse_registry(&raw)
}

pub fn parse_registry(raw: &str) -> Vec<PlayerRef> {
    let mut out: Vec<PlayerRef> = Vec::new();
    for part in raw.split([',', ';']) {
        let Some(player) = PlayerRef::parse(part) else {
            continue;
        };
        if out.iter().any(|p| p.name.eq_ignore_ascii_case(&player.name)) {
            continue;
        }
        out.push(player);
    }
    out
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|v| non_empty(v.trim()))
}

fn non_empty(v: &str) -> Option<String> {
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{PlayerRef, parse_registry};

    #[test]
    fn parse_name_and_tag() {
        let p = PlayerRef::parse("ScrubCity#30fps").expect("valid");
        assert_eq!(p.name, "ScrubCity");
        assert_eq!(p.tag.as_deref(), Some("30fps"));
    }

    #[test]
    fn parse_bare_name_has_no_tag() {
        let p = PlayerRef::parse(" brassbonanza ").expect("valid");
        assert_eq!(p.name, "brassbonanza");
        assert_eq!(p.tag, None);
    }

    #[test]
    fn registry_skips_blanks_and_duplicates() {
        let reg = parse_registry("A#1,, B ; a#2");
        assert_eq!(reg.len(), 2);
        assert_eq!(reg[0].name, "A");
        assert_eq!(reg[0].tag.as_deref(), Some("1"));
        assert_eq!(reg[1].name, "B");
    }

    #[test]
    fn same_player_ignores_case_and_missing_tag() {
        let a = PlayerRef::parse("ScrubCity#30fps").expect("valid");
        let b = PlayerRef::parse("scrubcity").expect("valid");
        assert!(a.same_player(&b));
        let c = PlayerRef::parse("ScrubCity#other").expect("valid");
        assert!(!a.same_player(&c));
    }
}
