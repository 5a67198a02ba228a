pub mod application;
pub mod event;
pub mod feedback;
pub mod interview;
pub mod outcome;
