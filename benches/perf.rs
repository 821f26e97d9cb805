use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use valo_recap::config::PlayerRef;
use valo_recap::fetch::split_page;
use valo_recap::model::MatchRecord;
use valo_recap::summary::summarize_player;

fn sample_match(day: u32, slot: u32) -> MatchRecord {
    serde_json::from_value(serde_json::json!({
        "metadata": {
            "match_id": format!("m-{day}-{slot}"),
            "started_at": format!("2025-06-{day:02}T{:02}:15:00.000Z", 21 - slot),
            "map": { "name": "Ascent" }
        },
        "players": [{
            "name": "BenchPlayer",
            "tag": "BNC",
            "team_id": "Red",
            "agent": { "name": "Jett" },
            "stats": { "kills": 18, "deaths": 12, "assists": 4,
                       "headshots": 11, "bodyshots": 22, "legshots": 1 }
        }],
        "kills": [{
            "round": 0,
            "time_in_round_in_ms": 4200,
            "killer": { "name": "BenchPlayer", "tag": "BNC" },
            "victim": { "name": "Other", "tag": "OT1" },
            "weapon": { "type": "Rifle", "name": "Vandal" }
        }],
        "teams": [
            { "team_id": "Red", "rounds": { "won": 13, "lost": 9 } },
            { "team_id": "Blue", "rounds": { "won": 9, "lost": 13 } }
        ]
    }))
    .expect("valid sample json")
}

fn bench_split_page(c: &mut Criterion) {
    let page: Vec<MatchRecord> = (0..10).map(|slot| sample_match(15, slot)).collect();
    c.bench_function("split_page_full", |b| {
        b.iter(|| {
            let split = split_page(black_box(page.clone()), 2025, 0).unwrap();
            black_box(split.in_scope.len());
        })
    });
}

fn bench_summarize_player(c: &mut Criterion) {
    let matches: Vec<MatchRecord> = (1..=28)
        .flat_map(|day| (0..8).map(move |slot| sample_match(day, slot)))
        .collect();
    let who = PlayerRef {
        name: "BenchPlayer".to_string(),
        tag: Some("BNC".to_string()),
    };
    c.bench_function("summarize_player_season", |b| {
        b.iter(|| {
            let summary = summarize_player(black_box(&matches), &who);
            black_box(summary.total_kills);
        })
    });
}

criterion_group!(benches, bench_split_page, bench_summarize_player);
criterion_main!(benches);
