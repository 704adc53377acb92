//! Questionnaire response entity model.

use serde::Serialize;
use sqlx::FromRow;
use srs_core::questionnaire::QuestionnaireState;
use srs_core::types::{DbId, Timestamp};

/// A row from the `questionnaire_responses` table.
///
/// At most one live row exists per `(client_id, questionnaire_id)` pairing;
/// upserts overwrite in place.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionnaireResponse {
    pub id: DbId,
    pub client_id: String,
    pub questionnaire_id: String,
    pub answers: serde_json::Value,
    pub current_question_index: i32,
    pub current_module_index: i32,
    pub points: i32,
    pub streak: i32,
    pub combo: i32,
    pub shown_milestones: Vec<i32>,
    pub completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl QuestionnaireResponse {
    /// Convert the row back into the client-side state shape.
    ///
    /// Unreadable `answers` JSON (schema drift, manual edits) degrades to an
    /// empty map rather than failing the read.
    pub fn to_state(&self) -> QuestionnaireState {
        QuestionnaireState {
            answers: serde_json::from_value(self.answers.clone()).unwrap_or_default(),
            current_question_index: self.current_question_index.max(0) as u32,
            current_module_index: self.current_module_index.max(0) as u32,
            points: self.points.max(0) as u32,
            streak: self.streak.max(0) as u32,
            combo: self.combo.max(0) as u32,
            shown_milestones: self
                .shown_milestones
                .iter()
                .filter(|&&m| m >= 0)
                .map(|&m| m as u32)
                .collect(),
            completed: self.completed,
        }
    }
}
