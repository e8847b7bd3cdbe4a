mod common;

use cascade_filters::{
    gather_all_pages, gather_first_and_last, run_chains, GateConfig, PageSpan, Selections,
};
use common::{geography, record, FakePage};
use std::time::Duration;

fn chain(country: &str, region: &str, city: &str) -> Selections {
    Selections::new()
        .with("country", country)
        .with("region", region)
        .with("city", city)
}

#[tokio::test(start_paused = true)]
async fn gathers_first_and_last_page_without_duplicates() {
    let la = record("US", "CA", "LA");
    let sf = record("US", "CA", "SF");
    let sd = record("US", "CA", "SD");
    let page = FakePage::new().with_pages(vec![
        vec![la.clone(), sf.clone()],
        vec![record("US", "NY", "NYC")],
        vec![sf.clone(), sd.clone()],
    ]);

    let records = gather_first_and_last(&page, &GateConfig::default())
        .await
        .unwrap();

    assert_eq!(records, vec![la, sf, sd]);
    assert_eq!(
        page.calls_matching("read:"),
        vec!["read:0", "read:2"]
    );
}

#[tokio::test(start_paused = true)]
async fn single_page_is_read_once() {
    let page = FakePage::new().with_pages(vec![vec![record("FR", "IDF", "Paris")]]);

    let records = gather_first_and_last(&page, &GateConfig::default())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(page.calls_matching("read:").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn gathers_every_page_in_order() {
    let la = record("US", "CA", "LA");
    let sf = record("US", "CA", "SF");
    let nyc = record("US", "NY", "NYC");
    let page = FakePage::new().with_pages(vec![
        vec![la.clone()],
        vec![sf.clone(), la.clone()],
        vec![nyc.clone()],
    ]);

    let records = gather_all_pages(&page, &GateConfig::default())
        .await
        .unwrap();

    assert_eq!(records, vec![la, sf, nyc]);
    assert_eq!(page.calls_matching("read:"), vec!["read:0", "read:1", "read:2"]);
    assert_eq!(page.calls_matching("next-page").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn all_pages_stops_when_a_page_repeats() {
    let la = record("US", "CA", "LA");
    let sf = record("US", "CA", "SF");
    let page = FakePage::new().with_pages(vec![
        vec![la.clone()],
        vec![sf.clone()],
        vec![sf.clone()],
        vec![record("US", "NY", "NYC")],
    ]);

    let records = gather_all_pages(&page, &GateConfig::default())
        .await
        .unwrap();

    assert_eq!(records, vec![la, sf]);
    assert_eq!(page.calls_matching("read:"), vec!["read:0", "read:1", "read:2"]);
}

#[tokio::test(start_paused = true)]
async fn run_can_verify_every_page() {
    let page = geography().with_pages(vec![
        vec![record("US", "NY", "NYC")],
        vec![record("US", "NY", "NYC Midtown")],
        vec![record("US", "CA", "LA")],
    ]);

    let report = run_chains(
        &page,
        &[chain("US", "NY", "NYC")],
        PageSpan::All,
        &GateConfig::default(),
    )
    .await
    .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.record_count, 3);
    assert_eq!(outcome.verification.invalid_records.len(), 1);
    assert!(page.calls_matching("last-page").is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_verifies_applied_chains_and_skips_stale_ones() {
    let page = geography().with_pages(vec![vec![
        record("US", "CA", "LA"),
        record("US", "CA", "LA Downtown"),
    ]]);
    let chains = vec![
        chain("US", "CA", "LA"),
        chain("US", "NY", "NYC"),
        chain("US", "TX", "Austin"),
    ];

    let report = run_chains(&page, &chains, PageSpan::FirstAndLast, &GateConfig::default())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes[0].passed());
    assert_eq!(report.outcomes[0].record_count, 2);
    assert!(!report.outcomes[1].passed());
    assert_eq!(report.outcomes[1].verification.invalid_records.len(), 2);
    assert_eq!(report.skipped, vec![chain("US", "TX", "Austin")]);

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.passed, 1);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 1);
    assert!((report.summary.success_rate - 50.0).abs() < f64::EPSILON);
    assert_eq!(report.failures().count(), 1);
}

#[tokio::test(start_paused = true)]
async fn run_stops_on_gate_timeout() {
    let page = geography().with_busy(".loading", usize::MAX);
    let gate = GateConfig::new([".loading"]).with_timeout(Duration::from_secs(2));

    let err = run_chains(&page, &[chain("US", "CA", "LA")], PageSpan::FirstAndLast, &gate)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn report_serialises_for_json_output() {
    let page = geography().with_pages(vec![vec![record("FR", "IDF", "Paris")]]);

    let report = run_chains(
        &page,
        &[chain("FR", "IDF", "Paris")],
        PageSpan::FirstAndLast,
        &GateConfig::default(),
    )
    .await
    .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["summary"]["passed"], 1);
    assert_eq!(json["outcomes"][0]["chain"]["city"], "Paris");
    assert_eq!(json["outcomes"][0]["verification"]["compliance"][0]["level"], "country");
}
