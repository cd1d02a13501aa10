use super::*;
use axum::http::StatusCode;
use price_watcher::app::App;
use price_watcher::web::create_router;
use serde_json::json;
use tokio::sync::oneshot;

/// Router over a running service, plus what the tests inspect.
async fn test_app(
    values: StoredValues,
) -> anyhow::Result<(axum::Router, MemoryStore, Arc<CountingPages>, oneshot::Sender<()>)> {
    let store = MemoryStore::with_values(values);
    let pages = Arc::new(CountingPages::new());
    let app = App::with_parts(AppConfig::default(), Arc::new(store.clone()), pages.clone()).await?;

    let router = create_router(app.web_state());
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(app.run_service_until(async move {
        let _ = stopped.await;
    }));

    Ok((router, store, pages, stop))
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let (app, _store, _pages, _stop) = test_app(StoredValues::new()).await?;

    let (status, body) = make_request(app, Method::GET, "/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "price-watcher");
    Ok(())
}

#[tokio::test]
async fn test_product_view() -> anyhow::Result<()> {
    let (app, store, pages, _stop) = test_app(PersistedState::target_values("15000")).await?;
    pages.add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "16,299", None)));

    let (status, body) = make_request(app, Method::GET, "/api/product", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], "Samsung Galaxy A15");
    assert_eq!(body["data"]["price"], "KSh 16299");
    assert_eq!(body["data"]["targetPrice"], "KSh 15000");

    let state = PersistedState::from_values(&store.snapshot().await);
    assert_eq!(state.last_title.as_deref(), Some("Samsung Galaxy A15"));
    Ok(())
}

#[tokio::test]
async fn test_product_view_without_page() -> anyhow::Result<()> {
    let (app, _store, _pages, _stop) = test_app(StoredValues::new()).await?;

    let (status, body) = make_request(app, Method::GET, "/api/product", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "No product detected");
    assert_eq!(body["data"]["status"], "Please navigate to a Jumia product page.");
    Ok(())
}

#[tokio::test]
async fn test_check_now() -> anyhow::Result<()> {
    let (app, store, pages, _stop) = test_app(configured_values("5000", Some("6000"))).await?;
    pages.add_page(PRODUCT_URL, Some(&product_page("Samsung Galaxy A15", "4,999", None)));

    let (status, body) = make_request(app, Method::POST, "/api/check", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Price check completed");
    let state = PersistedState::from_values(&store.snapshot().await);
    assert_eq!(state.last_price.as_deref(), Some("4999"));
    Ok(())
}

#[tokio::test]
async fn test_state_and_target() -> anyhow::Result<()> {
    let (app, store, _pages, _stop) = test_app(StoredValues::new()).await?;

    let (status, body) =
        make_request(app.clone(), Method::PUT, "/api/target", Some(json!({ "price": "7500" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Target price saved: KSh 7500");

    let (status, body) = make_request(app.clone(), Method::GET, "/api/state", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["targetPrice"], "7500");
    assert_eq!(body["data"]["checkIntervalMinutes"], 15);

    let (status, body) =
        make_request(app, Method::PUT, "/api/target", Some(json!({ "price": "  " }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let state = PersistedState::from_values(&store.snapshot().await);
    assert_eq!(state.target_price.as_deref(), Some("7500"));
    Ok(())
}

#[tokio::test]
async fn test_interval() -> anyhow::Result<()> {
    let (app, store, _pages, _stop) = test_app(StoredValues::new()).await?;

    let (status, _) =
        make_request(app.clone(), Method::PUT, "/api/interval", Some(json!({ "minutes": 60 }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(PersistedState::from_values(&store.snapshot().await).check_interval_minutes, 60);

    let (status, body) =
        make_request(app.clone(), Method::PUT, "/api/interval", Some(json!({ "minutes": 0 }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    for minutes in [u64::MAX / 30, u64::MAX / 120] {
        let (status, body) =
            make_request(app.clone(), Method::PUT, "/api/interval", Some(json!({ "minutes": minutes }))).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    // The service is still answering after the rejected values.
    let (status, _) =
        make_request(app, Method::PUT, "/api/interval", Some(json!({ "minutes": 20 }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(PersistedState::from_values(&store.snapshot().await).check_interval_minutes, 20);
    Ok(())
}

#[tokio::test]
async fn test_notification_click_opens_product() -> anyhow::Result<()> {
    let mut values = configured_values("5000", None);
    values.insert(keys::LAST_PRODUCT_URL.to_string(), json!(PRODUCT_URL));
    let (app, _store, pages, _stop) = test_app(values).await?;

    let uri = format!("/api/notifications/{}/click", uuid::Uuid::new_v4());
    let (status, _) = make_request(app, Method::POST, &uri, None).await?;
    assert_eq!(status, StatusCode::ACCEPTED);

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
    Ok(())
}

#[tokio::test]
async fn test_bad_notification_id() -> anyhow::Result<()> {
    let (app, _store, _pages, _stop) = test_app(StoredValues::new()).await?;

    let (status, body) =
        make_request(app.clone(), Method::POST, "/api/notifications/not-a-uuid/click", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let uri = format!("/api/notifications/{}/buttons/first", uuid::Uuid::new_v4());
    let (status, body) = make_request(app, Method::POST, &uri, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() -> anyhow::Result<()> {
    let (app, _store, _pages, _stop) = test_app(StoredValues::new()).await?;

    let (status, body) =
        make_request(app, Method::PUT, "/api/interval", Some(json!({ "minutes": "often" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"]["message"].is_string());
    Ok(())
}
