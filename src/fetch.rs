//! The fetch loop: plan a page request, partition the page by target year,
//! append the in-scope records, checkpoint, wait out the rate budget, repeat.
//! Pages are fetched strictly one at a time: the service's rate bucket is a
//! single per-credential counter, so concurrent requests would make the
//! remaining-budget accounting unsound.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{MatchPage, PAGE_SIZE, PageRequest, PaginationState, RateLimitInfo};
use crate::archive::{self, MatchArchive};
use crate::config::PlayerRef;
use crate::error::FetchError;
use crate::model::MatchRecord;

/// One page fetch. The HTTP implementation lives in `api`; tests script pages.
pub trait MatchSource {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<MatchPage, FetchError>;
}

/// Self-imposed backpressure. The long cooldown kicks in near the watermark
/// regardless of the server's reset hint: the hint crosses clocks we do not
/// control, a fixed wait does not.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub low_watermark: u64,
    pub cooldown: Duration,
    pub page_delay: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            low_watermark: 10,
            cooldown: Duration::from_secs(65),
            page_delay: Duration::from_secs(1),
        }
    }
}

impl RatePolicy {
    /// A missing `remaining` header counts as an exhausted budget.
    pub fn pause_after_page(&self, rate: &RateLimitInfo) -> Duration {
        if rate.remaining.unwrap_or(0) <= self.low_watermark {
            self.cooldown
        } else {
            self.page_delay
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PageSplit {
    pub in_scope: Vec<MatchRecord>,
    pub boundary_hit: bool,
}

/// Partitions one page by the target year. Records from later years are
/// dropped silently; the first record from an earlier year stops the scan and
/// flags the boundary; the rest of the page is never evaluated.
///
/// The scan also enforces the precondition the early stop depends on: pages
/// must be recency-descending. A record newer than its in-page predecessor
/// aborts with `OutOfOrderPage`.
pub fn split_page(
    records: Vec<MatchRecord>,
    target_year: i32,
    offset: u32,
) -> Result<PageSplit, FetchError> {
    let mut in_scope = Vec::new();
    let mut previous: Option<DateTime<Utc>> = None;

    for record in records {
        let Some(started) = record.started_at_utc() else {
            return Err(FetchError::BadTimestamp {
                match_id: record.metadata.match_id.clone(),
                raw: record.metadata.started_at.clone(),
            });
        };
        if let Some(prev) = previous {
            if started > prev {
                return Err(FetchError::OutOfOrderPage {
                    offset,
                    detail: format!(
                        "match {} started {} after its predecessor at {}",
                        record.metadata.match_id,
                        record.metadata.started_at,
                        prev.to_rfc3339()
                    ),
                });
            }
        }
        previous = Some(started);

        let year = started.year();
        if year == target_year {
            in_scope.push(record);
        } else if year < target_year {
            return Ok(PageSplit {
                in_scope,
                boundary_hit: true,
            });
        }
        // year > target_year: still ahead of the window, skip and keep scanning
    }

    Ok(PageSplit {
        in_scope,
        boundary_hit: false,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The service ran out of history: an empty or short page.
    Exhausted,
    /// A record older than the target year appeared.
    YearBoundary,
    /// Transport failure, bad payload, or a broken ordering precondition.
    Error,
}

/// How a session picks its starting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Fresh,
    /// Continue from the offset stored in the checkpoint.
    FromCheckpoint,
    /// Operator override for archives whose offset is known out of band.
    AtOffset(u32),
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub matches: Vec<MatchRecord>,
    pub reason: TerminationReason,
    pub pages_fetched: u32,
    /// Records added by this run (the rest were restored from the checkpoint).
    pub added: usize,
    /// Offset a follow-up run should request first. Meaningful after `Error`.
    pub next_offset: u32,
    pub error: Option<String>,
}

pub struct FetchSession {
    player: PlayerRef,
    target_year: i32,
    archive_path: PathBuf,
    archive: MatchArchive,
    cursor: PaginationState,
    policy: RatePolicy,
    mode: Option<String>,
    map: Option<String>,
}

impl FetchSession {
    pub fn start(
        player: PlayerRef,
        target_year: i32,
        archive_path: PathBuf,
        resume: Resume,
    ) -> Result<Self> {
        if let Resume::AtOffset(offset) = resume {
            if offset % PAGE_SIZE != 0 {
                return Err(anyhow!(
                    "resume offset {offset} is not a multiple of the page size {PAGE_SIZE}"
                ));
            }
        }

        let mut archive = match resume {
            Resume::Fresh => MatchArchive::new(player.clone(), target_year),
            Resume::FromCheckpoint | Resume::AtOffset(_) => {
                if archive_path.exists() {
                    archive::load_archive(&archive_path, &player, target_year)?
                } else {
                    println!(
                        "no checkpoint at {}, starting fresh",
                        archive_path.display()
                    );
                    MatchArchive::new(player.clone(), target_year)
                }
            }
        };
        if let Resume::AtOffset(offset) = resume {
            archive.next_offset = offset;
            archive.terminated = false;
            archive.termination_reason = None;
        }
        if !archive.matches.is_empty() {
            println!(
                "resuming {} at offset {} with {} matches restored",
                player,
                archive.next_offset,
                archive.matches.len()
            );
        }

        let cursor = PaginationState::starting_at(archive.next_offset);
        Ok(Self {
            player,
            target_year,
            archive_path,
            archive,
            cursor,
            policy: RatePolicy::default(),
            mode: None,
            map: None,
        })
    }

    pub fn with_policy(mut self, policy: RatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_filters(mut self, mode: Option<String>, map: Option<String>) -> Self {
        self.mode = mode;
        self.map = map;
        self
    }

    pub fn run<S: MatchSource>(mut self, source: &mut S) -> Result<FetchOutcome> {
        let start_len = self.archive.matches.len();

        if self.archive.terminated {
            let reason = self
                .archive
                .termination_reason
                .unwrap_or(TerminationReason::Exhausted);
            println!(
                "archive for {} already complete ({:?}); nothing to fetch",
                self.player, reason
            );
            return Ok(self.into_outcome(reason, 0, start_len, None));
        }

        let mut pages_fetched = 0u32;

        loop {
            let request = PageRequest::next(self.cursor, self.mode.as_deref(), self.map.as_deref());
            let page = match source.fetch_page(&request) {
                Ok(page) => page,
                Err(err) => {
                    let message = err.to_string();
                    return Ok(self.into_outcome(
                        TerminationReason::Error,
                        pages_fetched,
                        start_len,
                        Some(message),
                    ));
                }
            };
            pages_fetched += 1;

            if page.records.is_empty() {
                self.finish_archive(TerminationReason::Exhausted, self.cursor.offset);
                self.checkpoint()?;
                println!("no more matches for {}", self.player);
                return Ok(self.into_outcome(
                    TerminationReason::Exhausted,
                    pages_fetched,
                    start_len,
                    None,
                ));
            }

            let fetched = page.records.len();
            let newest = page.records[0].start_date().to_string();
            let oldest = page.records[fetched - 1].start_date().to_string();

            let split = match split_page(page.records, self.target_year, self.cursor.offset) {
                Ok(split) => split,
                Err(err) => {
                    // The page is discarded whole: its year split cannot be
                    // trusted, and the checkpoint still points at its start.
                    let message = err.to_string();
                    return Ok(self.into_outcome(
                        TerminationReason::Error,
                        pages_fetched,
                        start_len,
                        Some(message),
                    ));
                }
            };
            let kept = split.in_scope.len();
            self.archive.matches.extend(split.in_scope);

            println!(
                "offset {}: {} .. {}, kept {kept}/{fetched} (total {}, rate remaining {})",
                self.cursor.offset,
                newest,
                oldest,
                self.archive.matches.len(),
                page.rate
                    .remaining
                    .map_or_else(|| "?".to_string(), |n| n.to_string()),
            );

            if split.boundary_hit {
                self.finish_archive(
                    TerminationReason::YearBoundary,
                    self.cursor.offset + fetched as u32,
                );
                self.checkpoint()?;
                println!("hit a match before {}, stopping", self.target_year);
                return Ok(self.into_outcome(
                    TerminationReason::YearBoundary,
                    pages_fetched,
                    start_len,
                    None,
                ));
            }

            if fetched < self.cursor.page_size as usize {
                self.finish_archive(
                    TerminationReason::Exhausted,
                    self.cursor.offset + fetched as u32,
                );
                self.checkpoint()?;
                println!("last page reached");
                return Ok(self.into_outcome(
                    TerminationReason::Exhausted,
                    pages_fetched,
                    start_len,
                    None,
                ));
            }

            self.cursor.advance();
            self.archive.next_offset = self.cursor.offset;
            self.checkpoint()?;

            let pause = self.policy.pause_after_page(&page.rate);
            if pause >= self.policy.cooldown && !self.policy.cooldown.is_zero() {
                println!("rate budget low, cooling down {}s", pause.as_secs());
            }
            thread::sleep(pause);
        }
    }

    fn checkpoint(&self) -> Result<()> {
        archive::write_archive(&self.archive_path, &self.archive)
    }

    fn finish_archive(&mut self, reason: TerminationReason, next_offset: u32) {
        self.archive.terminated = true;
        self.archive.termination_reason = Some(reason);
        self.archive.next_offset = next_offset;
    }

    fn into_outcome(
        self,
        reason: TerminationReason,
        pages_fetched: u32,
        start_len: usize,
        error: Option<String>,
    ) -> FetchOutcome {
        let next_offset = match reason {
            // The failing page was never consumed.
            TerminationReason::Error => self.cursor.offset,
            _ => self.archive.next_offset,
        };
        FetchOutcome {
            added: self.archive.matches.len().saturating_sub(start_len),
            matches: self.archive.matches,
            reason,
            pages_fetched,
            next_offset,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{RatePolicy, split_page};
    use crate::api::RateLimitInfo;
    use crate::model::MatchRecord;

    fn rec(id: &str, started_at: &str) -> MatchRecord {
        serde_json::from_value(serde_json::json!({
            "metadata": { "match_id": id, "started_at": started_at }
        }))
        .expect("minimal record should parse")
    }

    fn remaining(n: u64) -> RateLimitInfo {
        RateLimitInfo {
            limit: Some(30),
            remaining: Some(n),
            reset_secs: Some(42),
        }
    }

    #[test]
    fn governor_cools_down_near_the_watermark() {
        let policy = RatePolicy::default();
        assert_eq!(policy.pause_after_page(&remaining(5)), policy.cooldown);
        assert_eq!(policy.pause_after_page(&remaining(10)), policy.cooldown);
        assert_eq!(policy.pause_after_page(&remaining(11)), policy.page_delay);
        assert_eq!(policy.pause_after_page(&remaining(50)), policy.page_delay);
        assert_eq!(policy.cooldown, Duration::from_secs(65));
        assert_eq!(policy.page_delay, Duration::from_secs(1));
    }

    #[test]
    fn governor_treats_missing_remaining_as_exhausted() {
        let policy = RatePolicy::default();
        assert_eq!(
            policy.pause_after_page(&RateLimitInfo::default()),
            policy.cooldown
        );
    }

    #[test]
    fn split_keeps_target_year_until_the_boundary() {
        let page = vec![
            rec("a", "2025-06-04T10:00:00Z"),
            rec("b", "2025-06-03T10:00:00Z"),
            rec("c", "2024-12-30T10:00:00Z"),
            rec("d", "2025-01-02T10:00:00Z"),
        ];
        let split = split_page(page, 2025, 0).expect("split should succeed");
        assert!(split.boundary_hit);
        assert_eq!(split.in_scope.len(), 2);
        assert_eq!(split.in_scope[0].metadata.match_id, "a");
        assert_eq!(split.in_scope[1].metadata.match_id, "b");
    }

    #[test]
    fn split_drops_later_years_silently() {
        let page = vec![
            rec("next-year", "2026-01-01T00:10:00Z"),
            rec("kept", "2025-12-31T23:00:00Z"),
        ];
        let split = split_page(page, 2025, 0).expect("split should succeed");
        assert!(!split.boundary_hit);
        assert_eq!(split.in_scope.len(), 1);
        assert_eq!(split.in_scope[0].metadata.match_id, "kept");
    }

    #[test]
    fn split_rejects_ascending_pages() {
        let page = vec![
            rec("older", "2025-06-01T10:00:00Z"),
            rec("newer", "2025-06-05T10:00:00Z"),
        ];
        let err = split_page(page, 2025, 30).expect_err("ascending page must abort");
        let message = err.to_string();
        assert!(message.contains("offset 30"), "got: {message}");
    }

    #[test]
    fn split_rejects_unparseable_timestamps() {
        let page = vec![rec("bad", "yesterday")];
        let err = split_page(page, 2025, 0).expect_err("bad timestamp must abort");
        assert!(err.to_string().contains("bad"), "got: {err}");
    }
}
