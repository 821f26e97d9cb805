//! Client for the HenrikDev Valorant API: page request planning, the
//! match-history page source, rate-limit header extraction, and the one-shot
//! account lookup.

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, USER_AGENT};
use serde::Deserialize;

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::fetch::MatchSource;
use crate::http_client::APP_USER_AGENT;
use crate::model::MatchRecord;

const API_BASE: &str = "https://api.henrikdev.xyz/valorant";

/// Service-side maximum page size.
pub const PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub offset: u32,
    pub page_size: u32,
}

impl PaginationState {
    pub fn starting_at(offset: u32) -> Self {
        Self {
            offset,
            page_size: PAGE_SIZE,
        }
    }

    pub fn advance(&mut self) {
        self.offset += self.page_size;
    }
}

/// The parameters of one page request. Building one has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub size: u32,
    pub mode: Option<String>,
    pub map: Option<String>,
}

impl PageRequest {
    pub fn next(cursor: PaginationState, mode: Option<&str>, map: Option<&str>) -> Self {
        Self {
            offset: cursor.offset,
            size: cursor.page_size,
            mode: mode.map(|s| s.to_string()),
            map: map.map(|s| s.to_string()),
        }
    }

    /// Query parameters in the service's vocabulary (`start`, `size`).
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("size", self.size.to_string()),
            ("start", self.offset.to_string()),
        ];
        if let Some(mode) = &self.mode {
            query.push(("mode", mode.clone()));
        }
        if let Some(map) = &self.map {
            query.push(("map", map.clone()));
        }
        query
    }
}

/// Budget metadata from the most recent response. Absent headers stay `None`;
/// the governor treats a missing `remaining` as an exhausted budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_secs: Option<u64>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_u64(headers, "x-ratelimit-limit"),
            remaining: header_u64(headers, "x-ratelimit-remaining"),
            reset_secs: header_u64(headers, "x-ratelimit-reset"),
        }
    }
}

#[derive(Debug)]
pub struct MatchPage {
    pub records: Vec<MatchRecord>,
    pub rate: RateLimitInfo,
}

/// Blocking page source over the v4 match-history endpoint.
pub struct HttpMatchSource<'a> {
    client: &'a Client,
    cfg: &'a FetchConfig,
    name: &'a str,
    tag: &'a str,
}

impl<'a> HttpMatchSource<'a> {
    pub fn new(client: &'a Client, cfg: &'a FetchConfig, name: &'a str, tag: &'a str) -> Self {
        Self {
            client,
            cfg,
            name,
            tag,
        }
    }

    fn history_url(&self) -> String {
        format!(
            "{API_BASE}/v4/matches/{}/{}/{}/{}",
            self.cfg.region, self.cfg.platform, self.name, self.tag
        )
    }
}

impl MatchSource for HttpMatchSource<'_> {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<MatchPage, FetchError> {
        let mut req = self
            .client
            .get(self.history_url())
            .header(USER_AGENT, APP_USER_AGENT)
            .query(&request.query());
        if let Some(token) = &self.cfg.api_token {
            req = req.header(AUTHORIZATION, token.as_str());
        }

        let resp = req.send()?;
        let status = resp.status();
        let rate = RateLimitInfo::from_headers(resp.headers());
        let body = resp.text()?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: snippet(&body),
            });
        }

        let records = parse_history_page(&body)?;
        Ok(MatchPage { records, rate })
    }
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    data: Vec<MatchRecord>,
}

pub fn parse_history_page(body: &str) -> Result<Vec<MatchRecord>, FetchError> {
    let envelope: HistoryEnvelope = serde_json::from_str(body)?;
    Ok(envelope.data)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountCard {
    #[serde(default)]
    pub puuid: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub account_level: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    data: AccountCard,
}

/// One-shot lookup against the v2 account endpoint. Not part of the fetch
/// loop; the fetch binary offers it as an opt-in preflight.
pub fn fetch_account(
    client: &Client,
    cfg: &FetchConfig,
    name: &str,
    tag: &str,
) -> Result<AccountCard, FetchError> {
    let url = format!("{API_BASE}/v2/account/{name}/{tag}");
    let mut req = client.get(url).header(USER_AGENT, APP_USER_AGENT);
    if let Some(token) = &cfg.api_token {
        req = req.header(AUTHORIZATION, token);
    }

    let resp = req.send()?;
    let status = resp.status();
    let body = resp.text()?;
    if !status.is_success() {
        return Err(FetchError::Status {
            status,
            body: snippet(&body),
        });
    }
    parse_account_json(&body)
}

pub fn parse_account_json(body: &str) -> Result<AccountCard, FetchError> {
    let envelope: AccountEnvelope = serde_json::from_str(body)?;
    Ok(envelope.data)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace('\n', " ")
        .replace('\r', " ")
        .chars()
        .take(220)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{PAGE_SIZE, PageRequest, PaginationState, RateLimitInfo};
    use reqwest::header::HeaderMap;

    #[test]
    fn page_request_carries_cursor_and_filters() {
        let mut cursor = PaginationState::starting_at(0);
        cursor.advance();
        let req = PageRequest::next(cursor, Some("competitive"), None);
        assert_eq!(req.offset, PAGE_SIZE);
        assert_eq!(req.size, PAGE_SIZE);
        let query = req.query();
        assert!(query.contains(&("start", "10".to_string())));
        assert!(query.contains(&("size", "10".to_string())));
        assert!(query.contains(&("mode", "competitive".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "map"));
    }

    #[test]
    fn rate_limit_headers_parse_and_default_to_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", "30".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "7".parse().unwrap());
        let rate = RateLimitInfo::from_headers(&headers);
        assert_eq!(rate.limit, Some(30));
        assert_eq!(rate.remaining, Some(7));
        assert_eq!(rate.reset_secs, None);

        let empty = RateLimitInfo::from_headers(&HeaderMap::new());
        assert_eq!(empty.remaining, None);
    }

    #[test]
    fn history_page_with_no_data_is_empty() {
        let records = super::parse_history_page(r#"{"status":200,"data":[]}"#).expect("parses");
        assert!(records.is_empty());
    }
}
