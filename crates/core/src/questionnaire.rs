//! Questionnaire state, partial updates, and the progress comparator.
//!
//! [`QuestionnaireState`] is the authoritative in-memory shape owned by one
//! client session at a time. The sync engine mutates it only through
//! [`StatePatch::apply_to`], and reconciliation between a local and a remote
//! copy is decided by [`has_more_progress`] / [`merge`] — a whole-state pick,
//! never a field-level merge of divergent answer sets.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identifier::validate_identifier;

// ---------------------------------------------------------------------------
// Payload limits
// ---------------------------------------------------------------------------

/// Maximum number of answer keys in one state payload.
pub const MAX_ANSWER_KEYS: usize = 500;

/// Maximum length of a single text answer.
pub const MAX_TEXT_ANSWER_LEN: usize = 10_000;

/// Maximum number of elements in a list answer.
pub const MAX_LIST_ANSWER_ITEMS: usize = 100;

/// Maximum length of a single list-answer element.
pub const MAX_LIST_ITEM_LEN: usize = 1_000;

/// Maximum number of entries in a percentage-breakdown answer.
pub const MAX_BREAKDOWN_ENTRIES: usize = 50;

/// Upper bound on module/question indices and milestone thresholds.
pub const MAX_INDEX: u32 = 10_000;

// ---------------------------------------------------------------------------
// Answer values
// ---------------------------------------------------------------------------

/// A single answer: free text, a number, a multi-select list, or a
/// percentage breakdown keyed by category.
///
/// Serialized untagged so the wire format is the plain JSON value the
/// questionnaire UI produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
    Breakdown(HashMap<String, f64>),
}

impl AnswerValue {
    /// An answer counts as given when it carries any content.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Number(_) => false,
            AnswerValue::List(items) => items.is_empty(),
            AnswerValue::Breakdown(entries) => entries.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Questionnaire state
// ---------------------------------------------------------------------------

/// In-progress questionnaire state for one `(client, questionnaire)` pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireState {
    /// Answers keyed by question identifier.
    pub answers: HashMap<String, AnswerValue>,
    /// Pointer into the questionnaire's ordered question sequence.
    pub current_question_index: u32,
    /// Pointer into the questionnaire's ordered module sequence.
    pub current_module_index: u32,
    /// Gamification counters.
    pub points: u32,
    pub streak: u32,
    pub combo: u32,
    /// Milestone thresholds already shown to the user; grows monotonically.
    pub shown_milestones: BTreeSet<u32>,
    /// True once all required modules have valid answers.
    pub completed: bool,
}

impl Default for QuestionnaireState {
    fn default() -> Self {
        Self {
            answers: HashMap::new(),
            current_question_index: 0,
            current_module_index: 0,
            points: 0,
            streak: 0,
            combo: 0,
            shown_milestones: BTreeSet::new(),
            completed: false,
        }
    }
}

impl QuestionnaireState {
    /// Number of answered questions; the primary progress signal.
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Validate a full state payload against the shape/size limits.
    ///
    /// Called at the API boundary before any state reaches the store.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.answers.len() > MAX_ANSWER_KEYS {
            return Err(CoreError::Validation(format!(
                "answers may contain at most {MAX_ANSWER_KEYS} entries"
            )));
        }
        for (key, value) in &self.answers {
            validate_identifier(key, "answer key")?;
            validate_answer(key, value)?;
        }
        if self.current_question_index > MAX_INDEX || self.current_module_index > MAX_INDEX {
            return Err(CoreError::Validation(
                "question/module index out of range".to_string(),
            ));
        }
        if let Some(&highest) = self.shown_milestones.iter().next_back() {
            if highest > MAX_INDEX {
                return Err(CoreError::Validation(
                    "milestone threshold out of range".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Validate one answer value against the per-type size caps.
fn validate_answer(key: &str, value: &AnswerValue) -> Result<(), CoreError> {
    match value {
        AnswerValue::Text(s) => {
            if s.len() > MAX_TEXT_ANSWER_LEN {
                return Err(CoreError::Validation(format!(
                    "answer '{key}' exceeds {MAX_TEXT_ANSWER_LEN} characters"
                )));
            }
        }
        AnswerValue::Number(n) => {
            if !n.is_finite() {
                return Err(CoreError::Validation(format!(
                    "answer '{key}' must be a finite number"
                )));
            }
        }
        AnswerValue::List(items) => {
            if items.len() > MAX_LIST_ANSWER_ITEMS {
                return Err(CoreError::Validation(format!(
                    "answer '{key}' exceeds {MAX_LIST_ANSWER_ITEMS} elements"
                )));
            }
            if items.iter().any(|item| item.len() > MAX_LIST_ITEM_LEN) {
                return Err(CoreError::Validation(format!(
                    "answer '{key}' has an element exceeding {MAX_LIST_ITEM_LEN} characters"
                )));
            }
        }
        AnswerValue::Breakdown(entries) => {
            if entries.len() > MAX_BREAKDOWN_ENTRIES {
                return Err(CoreError::Validation(format!(
                    "answer '{key}' exceeds {MAX_BREAKDOWN_ENTRIES} breakdown entries"
                )));
            }
            if entries.values().any(|v| !v.is_finite()) {
                return Err(CoreError::Validation(format!(
                    "answer '{key}' breakdown values must be finite numbers"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

/// A partial state update from the UI. Every field is optional; `answers`
/// entries merge into the existing map and `shown_milestones` accumulate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatePatch {
    pub answers: Option<HashMap<String, AnswerValue>>,
    pub current_question_index: Option<u32>,
    pub current_module_index: Option<u32>,
    pub points: Option<u32>,
    pub streak: Option<u32>,
    pub combo: Option<u32>,
    pub shown_milestones: Option<BTreeSet<u32>>,
    pub completed: Option<bool>,
}

impl StatePatch {
    /// Shallow-merge this patch into `state`.
    pub fn apply_to(&self, state: &mut QuestionnaireState) {
        if let Some(answers) = &self.answers {
            state.answers.extend(answers.clone());
        }
        if let Some(i) = self.current_question_index {
            state.current_question_index = i;
        }
        if let Some(i) = self.current_module_index {
            state.current_module_index = i;
        }
        if let Some(p) = self.points {
            state.points = p;
        }
        if let Some(s) = self.streak {
            state.streak = s;
        }
        if let Some(c) = self.combo {
            state.combo = c;
        }
        if let Some(milestones) = &self.shown_milestones {
            state.shown_milestones.extend(milestones.iter().copied());
        }
        if let Some(done) = self.completed {
            state.completed = done;
        }
    }
}

// ---------------------------------------------------------------------------
// Progress comparator
// ---------------------------------------------------------------------------

/// Whether `a` has strictly more progress than `b`.
///
/// Answer count dominates; points break a tie in answers; question index
/// breaks a tie in points. This ordering is what keeps load-time
/// reconciliation from oscillating between two divergent copies.
pub fn has_more_progress(a: &QuestionnaireState, b: &QuestionnaireState) -> bool {
    if a.answer_count() != b.answer_count() {
        return a.answer_count() > b.answer_count();
    }
    if a.points != b.points {
        return a.points > b.points;
    }
    a.current_question_index > b.current_question_index
}

/// Pick the authoritative side between a local snapshot and the remote copy.
///
/// Whole-state pick: the winner is adopted as-is. With no local snapshot the
/// remote copy wins by default.
pub fn merge(local: Option<&QuestionnaireState>, remote: &QuestionnaireState) -> QuestionnaireState {
    match local {
        Some(local) if has_more_progress(local, remote) => local.clone(),
        _ => remote.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
