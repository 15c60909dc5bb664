// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use herald_broadcast::{BroadcastDefaults, BroadcastRequest, BroadcastResponse, Broadcaster};
use herald_core::{AudienceTag, ButtonAction, DeliveryOutcome, RunJournal};
use herald_test_utils::{MemoryStore, MockTransport};

fn broadcaster(store: Arc<MemoryStore>, transport: Arc<MockTransport>) -> Broadcaster {
    Broadcaster::new(
        store.clone(),
        store.clone(),
        store,
        transport,
        BroadcastDefaults::default(),
    )
}

fn store() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_audience(AudienceTag::All, None, [1, 2, 3])
            .with_audience(AudienceTag::Cluster, Some("eu"), [1, 2])
            .with_audience(AudienceTag::Trial, None, []),
    )
}

async fn rejection(request: BroadcastRequest) -> String {
    let transport = Arc::new(MockTransport::always_ok());
    let err = broadcaster(store(), transport.clone())
        .run(request)
        .await
        .unwrap_err();
    assert!(err.is_invalid_request());
    assert_eq!(transport.call_count().await, 0, "nothing may be dispatched");
    err.to_string()
}

#[tokio::test(start_paused = true)]
async fn cluster_without_name_is_rejected() {
    let detail = rejection(BroadcastRequest::new(AudienceTag::Cluster, "Maintenance tonight")).await;
    assert_eq!(detail, "Cluster name is required for cluster broadcast");

    let mut blank = BroadcastRequest::new(AudienceTag::Cluster, "Maintenance tonight");
    blank.cluster_name = Some("   ".into());
    assert_eq!(
        rejection(blank).await,
        "Cluster name is required for cluster broadcast"
    );
}

#[tokio::test(start_paused = true)]
async fn cluster_name_outside_cluster_audience_is_rejected() {
    let mut request = BroadcastRequest::new(AudienceTag::All, "Hi");
    request.cluster_name = Some("eu".into());
    assert!(rejection(request).await.contains("cluster broadcast"));
}

#[tokio::test(start_paused = true)]
async fn empty_text_is_rejected() {
    assert_eq!(
        rejection(BroadcastRequest::new(AudienceTag::All, "  \n ")).await,
        "Text cannot be empty"
    );
    let only_buttons = "BUTTONS:\n{\"text\":\"A\",\"callback\":\"a\"}";
    assert_eq!(
        rejection(BroadcastRequest::new(AudienceTag::All, only_buttons)).await,
        "Text cannot be empty"
    );
}

#[tokio::test(start_paused = true)]
async fn length_limit_depends_on_image() {
    let caption = "é".repeat(1025);
    let mut with_photo = BroadcastRequest::new(AudienceTag::All, caption.clone());
    with_photo.image_ref = Some("AgACAgIAAxkBAAI".into());
    assert_eq!(
        rejection(with_photo).await,
        "Message is too long: 1025 characters, limit 1024"
    );

    let store = store();
    let transport = Arc::new(MockTransport::always_ok());
    let response = broadcaster(store, transport)
        .run(BroadcastRequest::new(AudienceTag::All, caption))
        .await
        .unwrap();
    assert!(matches!(response, BroadcastResponse::Completed { .. }));

    let long = "a".repeat(4097);
    assert_eq!(
        rejection(BroadcastRequest::new(AudienceTag::All, long)).await,
        "Message is too long: 4097 characters, limit 4096"
    );
}

#[tokio::test(start_paused = true)]
async fn empty_audience_sends_nothing() {
    let transport = Arc::new(MockTransport::always_ok());
    let response = broadcaster(store(), transport.clone())
        .run(BroadcastRequest::new(AudienceTag::Trial, "Try us"))
        .await
        .unwrap();
    assert_eq!(response, BroadcastResponse::NoRecipients);
    assert_eq!(transport.call_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cluster_broadcast_delivers_parsed_message() {
    let store = store();
    let transport = Arc::new(MockTransport::always_ok());
    let mut request = BroadcastRequest::new(
        AudienceTag::Cluster,
        "Node upgrade <b>BUTTONS:</b>\n{\"text\":\"Status\",\"url\":\"https://status.example\"}",
    );
    request.cluster_name = Some(" eu ".into());
    request.workers = Some(100);
    request.rate = Some(-5);

    let response = broadcaster(store.clone(), transport.clone())
        .run(request)
        .await
        .unwrap();

    let BroadcastResponse::Completed { recipients, stats } = response else {
        panic!("expected a completed run");
    };
    assert_eq!(recipients, 2);
    assert_eq!(stats.success_count, 2);
    assert_eq!(transport.calls_for(1).await, 1);
    assert_eq!(transport.calls_for(3).await, 0);

    let runs = store.recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].audience, AudienceTag::Cluster);
    assert_eq!(runs[0].cluster_name.as_deref(), Some("eu"));
    assert_eq!(runs[0].recipients, 2);
}

#[tokio::test(start_paused = true)]
async fn messages_carry_text_image_and_buttons() {
    use std::sync::Mutex;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let capture = seen.clone();
    let transport = Arc::new(MockTransport::scripted(move |m| {
        capture.lock().unwrap().push(m.clone());
        DeliveryOutcome::Ok
    }));
    let mut request = BroadcastRequest::new(
        AudienceTag::All,
        "Renew now BUTTONS:\n{\"text\":\"Renew\",\"callback\":\"renew\"}",
    );
    request.image_ref = Some("AgACphoto".into());

    broadcaster(store(), transport).run(request).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    for message in seen.iter() {
        assert_eq!(message.text, "Renew now");
        assert_eq!(message.image_ref.as_deref(), Some("AgACphoto"));
        let grid = message.buttons.as_ref().unwrap();
        assert_eq!(grid[0][0].action, ButtonAction::Callback("renew".into()));
    }
}

#[tokio::test(start_paused = true)]
async fn dead_recipients_drop_out_of_later_runs() {
    let store = store();
    let transport = Arc::new(MockTransport::scripted(|m| {
        if m.recipient_id == 2 {
            DeliveryOutcome::DeadRecipient
        } else {
            DeliveryOutcome::Ok
        }
    }));
    let broadcaster = broadcaster(store.clone(), transport.clone());

    let first = broadcaster
        .run(BroadcastRequest::new(AudienceTag::All, "One"))
        .await
        .unwrap();
    assert_eq!(first.stats().blocked_users, 1);

    let second = broadcaster
        .run(BroadcastRequest::new(AudienceTag::All, "Two"))
        .await
        .unwrap();
    let BroadcastResponse::Completed { recipients, .. } = second else {
        panic!("expected a completed run");
    };
    assert_eq!(recipients, 2);
    assert_eq!(transport.calls_for(2).await, 1);
}
