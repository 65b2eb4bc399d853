use crate::helpers::{mount_email_api, subscription_body, TestApp};

#[tokio::test]
async fn tracking_a_valid_event_returns_200() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_analytics(&serde_json::json!({
            "event_type": "form_view",
            "source": "popup",
            "variant": "A",
            "metadata": { "page": "/pricing" }
        }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "success": true }));
}

#[tokio::test]
async fn invalid_events_are_rejected_with_400() {
    let test_app = TestApp::spawn_app().await;
    let test_cases = vec![
        (
            serde_json::json!({ "event_type": "email_event", "source": "popup" }),
            "a server-only event type",
        ),
        (
            serde_json::json!({ "event_type": "click", "source": "popup" }),
            "an unknown event type",
        ),
        (
            serde_json::json!({ "event_type": "form_view", "source": "" }),
            "an empty source",
        ),
        (
            serde_json::json!({ "event_type": "form_view", "source": "popup", "subscriber_email": "nope" }),
            "a malformed email",
        ),
        (
            serde_json::json!({ "event_type": "form_view", "source": "popup", "metadata": "text" }),
            "non-object metadata",
        ),
        (serde_json::json!({ "source": "popup" }), "no event type"),
    ];

    for (body, description) in test_cases {
        let response = test_app.post_analytics(&body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );
    }

    let stats = test_app.get_analytics().await;
    assert_eq!(stats["bySource"], serde_json::json!([]));
}

#[tokio::test]
async fn analytics_starts_empty() {
    let test_app = TestApp::spawn_app().await;

    let stats = test_app.get_analytics().await;

    assert_eq!(
        stats,
        serde_json::json!({
            "bySource": [],
            "byVariant": [],
            "totalSubscribers": 0,
            "subscribersBySource": []
        })
    );
}

#[tokio::test]
async fn analytics_aggregates_the_funnel_per_source_and_variant() {
    let test_app = TestApp::spawn_app().await;

    for (event_type, source, variant) in [
        ("form_view", "popup", "A"),
        ("form_view", "popup", "A"),
        ("form_view", "popup", "B"),
        ("form_submit", "popup", "A"),
        ("conversion", "popup", "A"),
        ("form_view", "exit_intent", "A"),
    ] {
        test_app
            .post_analytics(&serde_json::json!({
                "event_type": event_type,
                "source": source,
                "variant": variant
            }))
            .await
            .error_for_status()
            .unwrap();
    }
    test_app
        .post_analytics(&serde_json::json!({ "event_type": "form_view", "source": "footer" }))
        .await
        .error_for_status()
        .unwrap();

    let stats = test_app.get_analytics().await;

    assert_eq!(
        stats["bySource"],
        serde_json::json!([
            { "source": "exit_intent", "views": 1, "submissions": 0, "conversions": 0 },
            { "source": "footer", "views": 1, "submissions": 0, "conversions": 0 },
            { "source": "popup", "views": 3, "submissions": 1, "conversions": 1 }
        ])
    );
    assert_eq!(
        stats["byVariant"],
        serde_json::json!([
            { "source": "exit_intent", "variant": "A", "views": 1, "submissions": 0, "conversions": 0 },
            { "source": "popup", "variant": "A", "views": 2, "submissions": 1, "conversions": 1 },
            { "source": "popup", "variant": "B", "views": 1, "submissions": 0, "conversions": 0 }
        ])
    );
}

#[tokio::test]
async fn subscribers_are_counted_by_source_once_confirmed() {
    let test_app = TestApp::spawn_app().await;

    test_app.create_confirmed_subscriber("ann@example.com").await;
    mount_email_api(&test_app.email_server).await;
    let mut body = subscription_body("bob@example.com");
    body["source"] = serde_json::json!("popup");
    test_app
        .post_subscription(&body)
        .await
        .error_for_status()
        .unwrap();

    let stats = test_app.get_analytics().await;

    assert_eq!(stats["totalSubscribers"], 1);
    assert_eq!(
        stats["subscribersBySource"],
        serde_json::json!([{ "source": "main_form", "count": 1 }])
    );
}

#[tokio::test]
async fn capture_confirm_and_unsubscribe_end_to_end() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_analytics(&serde_json::json!({ "event_type": "form_view", "source": "main_form" }))
        .await
        .error_for_status()
        .unwrap();
    let preference_token = test_app.create_confirmed_subscriber("ann@example.com").await;

    let stats = test_app.get_analytics().await;
    assert_eq!(
        stats["bySource"],
        serde_json::json!([{ "source": "main_form", "views": 1, "submissions": 1, "conversions": 1 }])
    );
    assert_eq!(test_app.get_subscriber_count().await["count"], 1);

    test_app
        .post_preferences(&serde_json::json!({ "token": preference_token, "unsubscribe": true }))
        .await
        .error_for_status()
        .unwrap();

    assert_eq!(test_app.get_subscriber_count().await["count"], 0);
    assert_eq!(test_app.get_analytics().await["totalSubscribers"], 0);
}
