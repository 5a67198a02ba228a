pub mod feedback_service;
pub mod ledger_service;
pub mod lifecycle_service;
pub mod notification_service;
pub mod scheduler_service;
pub mod transition_table;
