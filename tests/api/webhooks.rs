use crate::helpers::TestApp;
use lead_capture::domain::subscriber_status::SubscriberStatus;

fn event(event: &str, email: &str) -> String {
    serde_json::json!({
        "event": event,
        "email": email,
        "campaign_id": 42,
        "subject": "Weekly digest",
        "reason": "mailbox full"
    })
    .to_string()
}

#[tokio::test]
async fn unsubscribing_events_unsubscribe_the_subscriber() {
    let test_app = TestApp::spawn_app().await;

    for (index, event_name) in ["unsubscribed", "hard_bounce", "bounce", "spam"]
        .iter()
        .enumerate()
    {
        let email = format!("user{}@example.com", index);
        test_app.create_confirmed_subscriber(&email).await;

        let response = test_app.post_webhook("brevo", event(event_name, &email)).await;

        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "received": true }));

        let subscriber = test_app.find_subscriber(&email).await.unwrap();
        assert_eq!(
            subscriber.status,
            SubscriberStatus::Unsubscribed,
            "The subscriber was not unsubscribed after a {} event.",
            event_name
        );
    }
}

#[tokio::test]
async fn other_events_only_get_logged() {
    let test_app = TestApp::spawn_app().await;
    test_app.create_confirmed_subscriber("ann@example.com").await;

    for event_name in ["delivered", "opened", "click"] {
        test_app
            .post_webhook("brevo", event(event_name, "ann@example.com"))
            .await;
    }

    let subscriber = test_app.find_subscriber("ann@example.com").await.unwrap();
    assert_eq!(subscriber.status, SubscriberStatus::Confirmed);

    let logged: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT source, subscriber_email, metadata FROM analytics_events WHERE event_type = 'email_event' ORDER BY id",
    )
    .fetch_all(&test_app.db_pool)
    .await
    .unwrap();
    assert_eq!(logged.len(), 3);
    assert!(logged
        .iter()
        .all(|(source, email, _)| source == "brevo_webhook" && email == "ann@example.com"));

    let metadata: serde_json::Value = serde_json::from_str(&logged[0].2).unwrap();
    assert_eq!(
        metadata,
        serde_json::json!({
            "event": "delivered",
            "campaign_id": 42,
            "subject": "Weekly digest",
            "reason": "mailbox full"
        })
    );
}

#[tokio::test]
async fn events_for_unknown_emails_are_acknowledged() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_webhook("brevo", event("hard_bounce", "nobody@example.com"))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["received"], true);
    assert!(test_app.find_subscriber("nobody@example.com").await.is_none());
}

#[tokio::test]
async fn unparseable_payloads_are_acknowledged_but_not_received() {
    let test_app = TestApp::spawn_app().await;

    for payload in ["not json", "{}", r#"{"event": "spam"}"#] {
        let response = test_app.post_webhook("brevo", payload.to_string()).await;

        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "received": false }));
    }

    let stats = test_app.get_analytics().await;
    assert_eq!(stats["bySource"], serde_json::json!([]));
}

#[tokio::test]
async fn webhook_sources_show_up_with_zero_funnel_counts() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_webhook("brevo", event("opened", "ann@example.com"))
        .await;

    let stats = test_app.get_analytics().await;
    assert_eq!(
        stats["bySource"],
        serde_json::json!([{ "source": "brevo_webhook", "views": 0, "submissions": 0, "conversions": 0 }])
    );
}
