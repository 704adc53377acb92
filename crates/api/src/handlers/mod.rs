pub mod admin;
pub mod questionnaire;
