pub mod application_dto;
pub mod feedback_dto;
pub mod interview_dto;
