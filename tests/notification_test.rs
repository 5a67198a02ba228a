mod common;

use async_trait::async_trait;
use mockall::mock;
use std::sync::{Arc, Mutex};

use common::Harness;
use hiring_pipeline::config::PipelineConfig;
use hiring_pipeline::database::MemoryStore;
use hiring_pipeline::models::application::ApplicationStatus;
use hiring_pipeline::models::event::PipelineEvent;
use hiring_pipeline::services::notification_service::NotificationDispatcher;

mock! {
    pub Dispatcher {}

    #[async_trait]
    impl NotificationDispatcher for Dispatcher {
        async fn dispatch(&self, event: &PipelineEvent) -> anyhow::Result<()>;
    }
}

#[tokio::test]
async fn dispatcher_failures_do_not_fail_operations() {
    let mut dispatcher = MockDispatcher::new();
    dispatcher
        .expect_dispatch()
        .times(2)
        .returning(|_| Err(anyhow::anyhow!("webhook endpoint unreachable")));

    let h = Harness::build(
        Arc::new(MemoryStore::new()),
        Arc::new(dispatcher),
        PipelineConfig::default(),
    );
    let application = h.submit().await;
    let reviewed = h.move_to(&application, ApplicationStatus::UnderReview).await;
    assert_eq!(reviewed.status, ApplicationStatus::UnderReview);
}

#[tokio::test]
async fn scheduling_emits_events_in_write_order() {
    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let mut dispatcher = MockDispatcher::new();
    dispatcher.expect_dispatch().returning(move |event| {
        recorder.lock().unwrap().push(event.event_type());
        Ok(())
    });

    let h = Harness::build(
        Arc::new(MemoryStore::new()),
        Arc::new(dispatcher),
        PipelineConfig::default(),
    );
    let application = h.submit().await;
    h.schedule(&application).await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "application_status_changed",
            "interview_scheduled",
            "application_status_changed",
            "application_status_changed",
        ]
    );
}
