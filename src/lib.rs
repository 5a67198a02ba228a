pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::database::store::PipelineStore;
use crate::services::{
    feedback_service::{FavorableFeedbackPolicy, FeedbackService},
    ledger_service::LedgerService,
    lifecycle_service::LifecycleService,
    notification_service::{NotificationDispatcher, Notifier},
    scheduler_service::SchedulerService,
};
use crate::utils::time::Clock;

#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerService,
    pub lifecycle: LifecycleService,
    pub scheduler: SchedulerService,
    pub feedback: FeedbackService,
    pub pipeline: Arc<PipelineConfig>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        pipeline: PipelineConfig,
        clock: Arc<dyn Clock>,
        jwt_secret: &str,
    ) -> Self {
        let pipeline = Arc::new(pipeline);
        let notifier = Notifier::new(dispatcher);
        let ledger = LedgerService::new(store.clone(), clock.clone());
        let feedback = FeedbackService::new(store.clone(), notifier.clone(), clock.clone());

        let mut lifecycle = LifecycleService::new(
            store.clone(),
            ledger.clone(),
            notifier.clone(),
            pipeline.clone(),
            clock.clone(),
        );
        if pipeline.require_favorable_feedback_for_offer {
            lifecycle = lifecycle.with_policy(Arc::new(FavorableFeedbackPolicy::new(feedback.clone())));
        }

        let scheduler = SchedulerService::new(
            store,
            ledger.clone(),
            lifecycle.clone(),
            notifier,
            pipeline.clone(),
            clock,
        );

        Self {
            ledger,
            lifecycle,
            scheduler,
            feedback,
            pipeline,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
