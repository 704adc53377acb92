//! Repository for the `questionnaire_responses` table.

use sqlx::PgPool;
use srs_core::questionnaire::QuestionnaireState;

use crate::models::response::QuestionnaireResponse;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, questionnaire_id, answers, \
    current_question_index, current_module_index, points, streak, combo, \
    shown_milestones, completed, created_at, updated_at";

/// Provides read/upsert operations on questionnaire responses.
pub struct ResponseRepo;

impl ResponseRepo {
    /// Fetch the live response for a client/questionnaire pairing.
    pub async fn find(
        pool: &PgPool,
        client_id: &str,
        questionnaire_id: &str,
    ) -> Result<Option<QuestionnaireResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM questionnaire_responses
             WHERE client_id = $1 AND questionnaire_id = $2"
        );
        sqlx::query_as::<_, QuestionnaireResponse>(&query)
            .bind(client_id)
            .bind(questionnaire_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or overwrite the single live row for the pairing.
    pub async fn upsert(
        pool: &PgPool,
        client_id: &str,
        questionnaire_id: &str,
        state: &QuestionnaireState,
    ) -> Result<QuestionnaireResponse, sqlx::Error> {
        let answers =
            serde_json::to_value(&state.answers).unwrap_or_else(|_| serde_json::json!({}));
        let milestones: Vec<i32> = state.shown_milestones.iter().map(|&m| m as i32).collect();

        let query = format!(
            "INSERT INTO questionnaire_responses
                (client_id, questionnaire_id, answers, current_question_index,
                 current_module_index, points, streak, combo, shown_milestones, completed)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (client_id, questionnaire_id) DO UPDATE SET
                answers = EXCLUDED.answers,
                current_question_index = EXCLUDED.current_question_index,
                current_module_index = EXCLUDED.current_module_index,
                points = EXCLUDED.points,
                streak = EXCLUDED.streak,
                combo = EXCLUDED.combo,
                shown_milestones = EXCLUDED.shown_milestones,
                completed = EXCLUDED.completed,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QuestionnaireResponse>(&query)
            .bind(client_id)
            .bind(questionnaire_id)
            .bind(answers)
            .bind(state.current_question_index as i32)
            .bind(state.current_module_index as i32)
            .bind(state.points as i32)
            .bind(state.streak as i32)
            .bind(state.combo as i32)
            .bind(milestones)
            .bind(state.completed)
            .fetch_one(pool)
            .await
    }
}
