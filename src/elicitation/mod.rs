//! Elicitation state machine.
//!
//! A session-keyed Q&A engine that qualifies a research request across
//! multiple MCP calls: `initial → workflow → advanced → complete`. Each
//! non-terminal state has a fixed question set; each call merges the
//! delivered answers and advances one state. Once complete, the manager
//! emits a validated [`ResearchConfig`].
//!
//! Coercion is deliberately forgiving: numbers arrive as integers or
//! floats, missing required answers fall back to documented defaults, and
//! unknown keys are ignored. The design trades strictness for
//! conversational robustness.

mod questions;

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::{Question, ResearchConfig};
use crate::core::research::{OutputFormat, PriorityLevel, ResearchDepth};
use crate::error::ElicitationError;

pub use questions::{advanced_questions, initial_questions, workflow_questions};

/// Sessions idle longer than this are eligible for eviction.
const SESSION_TTL_HOURS: i64 = 1;

/// States of the elicitation machine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElicitState {
    Initial,
    Workflow,
    Advanced,
    Complete,
}

struct ElicitationSession {
    state: ElicitState,
    answers: Map<String, Value>,
    start_time: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

/// Per-session Q&A state machine manager.
///
/// The lock covers only the session map; question-set construction and
/// config assembly happen on owned data.
pub struct ElicitationManager {
    sessions: Mutex<HashMap<String, ElicitationSession>>,
}

impl Default for ElicitationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ElicitationManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates a new session at the `initial` state and returns its id.
    ///
    /// Stale sessions are swept opportunistically here rather than by a
    /// dedicated timer.
    pub async fn create_session(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut sessions = self.sessions.lock().await;
        let cutoff = now - ChronoDuration::hours(SESSION_TTL_HOURS);
        sessions.retain(|_, s| s.last_updated > cutoff);

        sessions.insert(
            session_id.clone(),
            ElicitationSession {
                state: ElicitState::Initial,
                answers: Map::new(),
                start_time: now,
                last_updated: now,
            },
        );

        session_id
    }

    /// Whether the manager currently tracks `session_id`.
    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    /// Merges `answers` into the session, advances one state, and returns
    /// the next question set plus a completion flag.
    ///
    /// Submitting answers after `complete` is a no-op that reports the
    /// completed state.
    ///
    /// # Errors
    ///
    /// Returns [`ElicitationError::UnknownSession`] when the id is not
    /// tracked (for example after eviction); the caller starts over.
    pub async fn process_answers(
        &self,
        session_id: &str,
        answers: &Map<String, Value>,
    ) -> Result<(Vec<Question>, bool), ElicitationError> {
        let mut sessions = self.sessions.lock().await;
        let session =
            sessions
                .get_mut(session_id)
                .ok_or_else(|| ElicitationError::UnknownSession {
                    session_id: session_id.to_string(),
                })?;

        if session.state == ElicitState::Complete {
            return Ok((Vec::new(), true));
        }

        for (key, value) in answers {
            session.answers.insert(key.clone(), value.clone());
        }
        session.last_updated = Utc::now();

        match session.state {
            ElicitState::Initial => {
                session.state = ElicitState::Workflow;
                Ok((workflow_questions(), false))
            }
            ElicitState::Workflow => {
                session.state = ElicitState::Advanced;
                let topic = get_string(&session.answers, "research_topic");
                Ok((advanced_questions(topic.as_deref()), false))
            }
            ElicitState::Advanced => {
                session.state = ElicitState::Complete;
                Ok((Vec::new(), true))
            }
            ElicitState::Complete => unreachable!("handled above"),
        }
    }

    /// Builds the research configuration for a completed session.
    ///
    /// Returns `None` until the session reaches `complete`.
    pub async fn research_config(&self, session_id: &str) -> Option<ResearchConfig> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(session_id)?;
        if session.state != ElicitState::Complete {
            return None;
        }

        let answers = &session.answers;
        Some(ResearchConfig {
            session_id: session_id.to_string(),
            topic: get_string(answers, "research_topic").unwrap_or_default(),
            researcher_count: get_u32(answers, "researcher_count").unwrap_or(10),
            research_depth: get_string(answers, "research_depth")
                .map(|s| ResearchDepth::parse(&s))
                .unwrap_or_default(),
            output_format: get_string(answers, "output_format")
                .map(|s| OutputFormat::parse(&s))
                .unwrap_or_default(),
            timeout_minutes: get_u32(answers, "timeout_minutes").unwrap_or(60),
            priority_level: get_string(answers, "priority_level")
                .map(|s| PriorityLevel::parse(&s))
                .unwrap_or_default(),
            workflow_templates: get_string(answers, "workflow_templates")
                .filter(|s| !s.is_empty()),
            specific_sources: get_string(answers, "specific_sources").filter(|s| !s.is_empty()),
            created_at: session.start_time,
        })
    }

    #[cfg(test)]
    async fn age_session(&self, session_id: &str, hours: i64) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.last_updated -= ChronoDuration::hours(hours);
        }
    }
}

fn get_string(answers: &Map<String, Value>, key: &str) -> Option<String> {
    answers
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Integers may arrive as either integer or floating-point JSON values.
fn get_u32(answers: &Map<String, Value>, key: &str) -> Option<u32> {
    let value = answers.get(key)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = value.as_f64() {
        if f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX) {
            return Some(f as u32);
        }
    }
    None
}
