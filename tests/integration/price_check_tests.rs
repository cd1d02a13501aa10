use super::*;
use price_watcher::engine::AlertKind;
use price_watcher::models::HISTORY_CAPACITY;
use price_watcher::notifier::NotificationEvent;
use price_watcher::{SkipReason, Trigger};

#[tokio::test]
async fn test_drop_below_target() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("5000", Some("6000")));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "4,999", Some("6,500"))));

    let outcome = harness.orchestrator.run_cycle(Trigger::Alarm).await?;

    assert!(outcome.verdict.notify);
    assert_eq!(outcome.verdict.kind, AlertKind::Drop);
    assert_eq!(
        outcome.verdict.message,
        "The price of \"Samsung Galaxy A15\" has dropped to KSh 4999, which is at or below your \
         target price of KSh 5000. You save KSh 1501 (was KSh 6500)."
    );

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Price Drop Alert!");
    assert_eq!(sent[0].priority, 2);
    assert_eq!(sent[0].image_url.as_deref(), Some("https://www.jumia.co.ke/images/a15.jpg"));
    assert_eq!(sent[0].buttons[0].title, "View Product");
    Ok(())
}

#[tokio::test]
async fn test_price_equal_to_target_is_a_drop() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("5000", None));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "5,000", None)));

    let outcome = harness.orchestrator.run_cycle(Trigger::Manual).await?;

    assert_eq!(outcome.verdict.kind, AlertKind::Drop);
    assert!(!outcome.verdict.message.contains("You save"));
    assert_eq!(harness.notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_increase_above_threshold() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("5000", Some("6000")));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "6,600", None)));

    let outcome = harness.orchestrator.run_cycle(Trigger::Alarm).await?;

    assert_eq!(outcome.verdict.kind, AlertKind::Increase);
    assert_eq!(
        outcome.verdict.message,
        "The price of \"Samsung Galaxy A15\" went up by KSh 600, from KSh 6000 to KSh 6600."
    );
    assert_eq!(harness.notifier.sent()[0].title, "Price Increase Alert!");
    Ok(())
}

#[tokio::test]
async fn test_small_increase_is_silent() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("5000", Some("5100")));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "5,200", None)));

    let outcome = harness.orchestrator.run_cycle(Trigger::Alarm).await?;

    assert!(!outcome.verdict.notify);
    assert!(harness.notifier.sent().is_empty());
    // The observation is still recorded.
    assert_eq!(harness.stored().await.last_price.as_deref(), Some("5200"));
    Ok(())
}

#[tokio::test]
async fn test_no_target_skips_before_extraction() -> anyhow::Result<()> {
    let mut values = configured_values("5000", Some("6000"));
    values.remove("targetPrice");
    let harness = TestHarness::new(values);
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "4,000", None)));
    let before = harness.raw_values().await;

    let result = harness.orchestrator.run_cycle(Trigger::Alarm).await;

    assert_eq!(result.unwrap_err(), SkipReason::NotConfigured);
    assert_eq!(harness.pages.extractions(), 0);
    assert_eq!(harness.raw_values().await, before);
    assert!(harness.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_skipped_cycles_are_logged_not_raised() {
    let harness = TestHarness::new(configured_values("5000", None));
    harness.pages.add_page("https://www.kilimall.co.ke/phone.html", Some("<p></p>"));

    assert!(harness.orchestrator.run_cycle_logged(Trigger::Alarm).await.is_none());
    assert_eq!(harness.pages.extractions(), 0);
}

#[tokio::test]
async fn test_history_keeps_last_ten_observations() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("100", None));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "18,999", None)));

    for _ in 0..12 {
        harness.orchestrator.run_cycle(Trigger::Alarm).await?;
    }

    let history = harness.stored().await.price_history;
    assert_eq!(history.len(), HISTORY_CAPACITY);
    let timestamps: Vec<&str> = history.iter().map(|e| e.timestamp.as_str()).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
    assert!(history.iter().all(|e| e.price == 18999));
    Ok(())
}

#[tokio::test]
async fn test_consecutive_cycles_grow_history() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("1000", None));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "18,999", None)));

    for _ in 0..3 {
        harness.orchestrator.run_cycle(Trigger::Alarm).await?;
    }

    let state = harness.stored().await;
    assert_eq!(state.price_history.len(), 3);
    assert_eq!(state.last_product_url.as_deref(), Some(PRODUCT_URL));
    assert_eq!(state.target_price.as_deref(), Some("1000"));
    Ok(())
}

#[tokio::test]
async fn test_notification_click_opens_product() -> anyhow::Result<()> {
    let harness = TestHarness::new(configured_values("5000", Some("6000")));
    harness
        .pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "4,500", None)));

    let outcome = harness.orchestrator.run_cycle(Trigger::Alarm).await?;
    let id = outcome.notification_id.expect("drop should notify");

    harness
        .orchestrator
        .handle_notification_event(NotificationEvent::ButtonClicked { id, button_index: 0 })
        .await?;

    assert_eq!(harness.pages.opened_pages(), vec![PRODUCT_URL]);
    Ok(())
}
