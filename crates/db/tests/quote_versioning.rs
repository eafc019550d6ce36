use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use rately_core::domain::lookup::{ConfidenceLevel, EffortLevel, Priority, QuoteCreator};
use rately_core::domain::quote::{Quote, QuoteId};
use rately_core::domain::ticket::TicketId;
use rately_db::repositories::{QuoteRepository, SqlQuoteRepository};
use rately_db::{connect_with_settings, migrations};

fn draft_quote(id: &str, ticket_id: &str) -> Quote {
    Quote {
        id: QuoteId(id.to_string()),
        ticket_id: TicketId(ticket_id.to_string()),
        version: 1,
        estimated_hours_minimum: Decimal::new(4, 0),
        estimated_hours_maximum: Decimal::new(8, 0),
        estimated_resolution_time: Decimal::new(6, 0),
        hourly_rate: Decimal::new(10_000, 2),
        estimated_cost: Decimal::new(90_000, 2),
        fixed_cost: None,
        final_cost: None,
        confidence_level: ConfidenceLevel::Medium,
        approval_id: None,
        suggested_priority: Priority::P2,
        effort_level: EffortLevel::Medium,
        created_by: QuoteCreator::System,
        created_at: Utc::now(),
    }
}

/// Concurrent inserts for the same ticket must come out as a gapless
/// sequence: the unique (ticket_id, version) index serializes allocation.
#[tokio::test]
async fn concurrent_inserts_allocate_a_gapless_version_sequence() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let repo = Arc::new(SqlQuoteRepository::new(pool));

    let mut handles = Vec::new();
    for index in 0..8u32 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.insert_quote(draft_quote(&format!("q-{index}"), "t-race")).await
        }));
    }

    let mut versions = Vec::new();
    for handle in handles {
        let stored = handle.await.expect("join").expect("insert");
        versions.push(stored.version);
    }
    versions.sort_unstable();

    assert_eq!(versions, (1..=8).collect::<Vec<u32>>());
}

#[tokio::test]
async fn listing_preserves_version_order_across_tickets() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let repo = SqlQuoteRepository::new(pool);

    for index in 0..3u32 {
        repo.insert_quote(draft_quote(&format!("qa-{index}"), "t-a")).await.expect("insert a");
    }
    repo.insert_quote(draft_quote("qb-0", "t-b")).await.expect("insert b");

    let listed = repo.list_for_ticket(&TicketId("t-a".to_string())).await.expect("list");
    let versions: Vec<u32> = listed.iter().map(|quote| quote.version).collect();

    assert_eq!(versions, vec![1, 2, 3]);
    assert!(listed.iter().all(|quote| quote.ticket_id.0 == "t-a"));
}
