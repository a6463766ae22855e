mod helpers;

use std::sync::Arc;

use glint_core::{PageSession, PageSignal, observers::SectionEntry};
use helpers::*;

fn start(h: &Harness) -> PageSession {
    PageSession::start(
        h.tracker.clone(),
        h.env.clone(),
        Arc::new(h.clock.clone()),
        &h.config,
    )
}

#[tokio::test(start_paused = true)]
async fn first_page_view_starts_a_new_session() {
    let h = harness();
    let _page = start(&h);

    h.tracker.flush_and_wait().await;
    let event = &h.transport.batches()[0].events[0];
    assert_eq!(event.event_type, "session_start");
    assert_eq!(event.metadata["is_new_session"], true);
    assert_eq!(event.metadata["landing_page"], "/?utm_source=instagram#hero");
}

#[tokio::test(start_paused = true)]
async fn page_hide_reports_depth_and_dwell_then_flushes() {
    let h = harness();
    let mut page = start(&h);

    page.handle(PageSignal::Intersections {
        entries: vec![SectionEntry::visible("hero", 0.8)],
    })
    .await;
    for top in [400.0, 1200.0, 300.0] {
        page.handle(PageSignal::Scroll {
            scroll_top: top,
            scroll_height: 2_500.0,
            viewport_height: 900.0,
        })
        .await;
    }
    h.clock.advance(2_000);
    page.handle(PageSignal::Intersections {
        entries: vec![
            SectionEntry::visible("hero", 0.4),
            SectionEntry::visible("about", 0.6),
        ],
    })
    .await;
    page.handle(PageSignal::Click {
        target: "cta-book".into(),
        label: Some("Book a detail".into()),
    })
    .await;

    let outcome = page.handle(PageSignal::PageHide).await;
    assert!(outcome.is_some());
    assert_eq!(h.tracker.queued_len(), 0);

    let types = h.transport.event_types(0);
    assert_eq!(
        types,
        vec![
            "session_start",
            "section_enter",
            "section_time",
            "section_transition",
            "section_enter",
            "click",
            "scroll_depth",
            "section_time",
        ]
    );

    let events = &h.transport.batches()[0].events;
    assert_eq!(events[2].metadata["section"], "hero");
    assert_eq!(events[2].metadata["ms"], 2_000);
    assert_eq!(events[5].metadata["label"], "Book a detail");
    assert_eq!(events[6].metadata["max_depth"], 75);
    assert_eq!(events[6].metadata["reason"], "pagehide");
    assert_eq!(events[7].metadata["section"], "about");
    assert_eq!(events[7].metadata["reason"], "pagehide");
}

#[tokio::test(start_paused = true)]
async fn tab_switch_flushes_and_resumes() {
    let h = harness();
    let mut page = start(&h);

    page.handle(PageSignal::Intersections {
        entries: vec![SectionEntry::visible("faq", 0.8)],
    })
    .await;
    h.clock.advance(1_500);
    page.handle(PageSignal::VisibilityChange { hidden: true }).await;
    h.clock.advance(30_000);
    page.handle(PageSignal::VisibilityChange { hidden: false }).await;
    h.clock.advance(500);
    page.handle(PageSignal::PageHide).await;

    let hidden_batch = &h.transport.batches()[0].events;
    let dwell = hidden_batch.iter().find(|e| e.event_type == "section_time").unwrap();
    assert_eq!(dwell.metadata["ms"], 1_500);
    assert_eq!(dwell.metadata["reason"], "visibility");

    let final_batch = &h.transport.batches()[1].events;
    let dwell = final_batch.iter().find(|e| e.event_type == "section_time").unwrap();
    assert_eq!(dwell.metadata["ms"], 500);
}

#[tokio::test(start_paused = true)]
async fn navigation_updates_page_envelope() {
    let h = harness();
    let mut page = start(&h);

    page.handle(PageSignal::Navigate {
        url: "https://shine.example/gallery?utm_source=tiktok".into(),
    })
    .await;
    page.handle(PageSignal::Custom {
        event_type: "gallery_open".into(),
        metadata: seq(1),
    })
    .await;
    h.tracker.flush_and_wait().await;

    let events = &h.transport.batches()[0].events;
    let custom = events.iter().find(|e| e.event_type == "gallery_open").unwrap();
    assert_eq!(custom.metadata["page"], "/gallery");
    assert_eq!(custom.metadata["utm_source"], "tiktok");
    // Landing page is pinned to the first visit.
    assert_eq!(custom.metadata["landing_page"], "/?utm_source=instagram#hero");
    assert_eq!(page.page_path(), "/gallery");
}
