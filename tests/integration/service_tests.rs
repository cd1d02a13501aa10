use super::*;
use price_watcher::app::App;
use price_watcher::messaging::{Request, Response};
use price_watcher::notifier::NotificationEvent;
use tokio::sync::oneshot;

struct RunningApp {
    bus: price_watcher::MessageBus,
    popup: price_watcher::popup::Popup,
    store: MemoryStore,
    pages: Arc<CountingPages>,
    stop: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<price_watcher::Result<()>>,
}

impl RunningApp {
    async fn start(values: StoredValues) -> anyhow::Result<Self> {
        let store = MemoryStore::with_values(values);
        let pages = Arc::new(CountingPages::new());
        let app = App::with_parts(AppConfig::default(), Arc::new(store.clone()), pages.clone()).await?;

        let bus = app.bus();
        let popup = app.popup();
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(app.run_until(async move {
            let _ = stopped.await;
        }));

        Ok(Self {
            bus,
            popup,
            store,
            pages,
            stop,
            handle,
        })
    }

    async fn shutdown(self) -> anyhow::Result<()> {
        let _ = self.stop.send(());
        self.handle.await??;
        Ok(())
    }
}

#[tokio::test]
async fn test_manual_check_over_the_bus() -> anyhow::Result<()> {
    let app = RunningApp::start(configured_values("20000", Some("21000"))).await?;
    app.pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "19,999", None)));

    let reply = app.bus.send(Request::ManualPriceCheck).await?;
    assert_eq!(reply, Response::Status("Price check completed".to_string()));

    let state = PersistedState::from_values(&app.store.snapshot().await);
    assert_eq!(state.last_price.as_deref(), Some("19999"));
    assert_eq!(state.price_history.len(), 1);

    app.shutdown().await
}

#[tokio::test]
async fn test_manual_check_reports_completion_even_when_skipped() -> anyhow::Result<()> {
    let app = RunningApp::start(StoredValues::new()).await?;

    assert_eq!(app.popup.check_now().await, "Price check completed");
    assert_eq!(app.pages.extractions(), 0);

    app.shutdown().await
}

#[tokio::test]
async fn test_popup_configures_the_watcher() -> anyhow::Result<()> {
    let app = RunningApp::start(StoredValues::new()).await?;
    app.pages
        .add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "18,500", None)));

    // Before the popup has seen the product, cycles are skipped.
    app.popup.save_target("18000").await?;
    app.popup.check_now().await;
    assert!(PersistedState::from_values(&app.store.snapshot().await).price_history.is_empty());

    let view = app.popup.refresh().await?;
    assert_eq!(view.title, "Samsung Galaxy A15");
    assert_eq!(view.price, "KSh 18500");
    assert_eq!(view.target_price.as_deref(), Some("KSh 18000"));

    app.popup.check_now().await;
    let state = PersistedState::from_values(&app.store.snapshot().await);
    assert_eq!(state.price_history.len(), 1);
    assert_eq!(state.last_image_url.as_deref(), Some("https://www.jumia.co.ke/images/a15.jpg"));

    app.shutdown().await
}

#[tokio::test]
async fn test_interval_change_is_persisted() -> anyhow::Result<()> {
    let app = RunningApp::start(StoredValues::new()).await?;

    let reply = app.bus.send(Request::SetCheckInterval { minutes: 30 }).await?;
    assert!(matches!(reply, Response::Status(_)));
    let state = PersistedState::from_values(&app.store.snapshot().await);
    assert_eq!(state.check_interval_minutes, 30);

    let rejected = app.bus.send(Request::SetCheckInterval { minutes: 0 }).await?;
    assert!(matches!(rejected, Response::Error(_)));

    app.shutdown().await
}

#[tokio::test]
async fn test_click_event_reaches_the_page_source() -> anyhow::Result<()> {
    let mut values = configured_values("5000", None);
    values.insert(keys::LAST_PRODUCT_URL.to_string(), serde_json::json!(PRODUCT_URL));
    let store = MemoryStore::with_values(values);
    let pages = Arc::new(CountingPages::new());
    let app = App::with_parts(AppConfig::default(), Arc::new(store), pages.clone()).await?;

    let events = app.web_state().events;
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(app.run_service_until(async move {
        let _ = stopped.await;
    }));

    events
        .send(NotificationEvent::Clicked { id: uuid::Uuid::new_v4() })
        .await?;
    let watched = pages.clone();
    let opened = wait_for_condition(
        move || {
            let pages = watched.clone();
            async move { !pages.opened_pages().is_empty() }
        },
        5,
    )
    .await;
    assert!(opened);
    assert_eq!(pages.opened_pages(), vec![PRODUCT_URL]);

    let _ = stop.send(());
    handle.await??;
    Ok(())
}
