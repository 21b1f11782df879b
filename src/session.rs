// src/session.rs

//! Assessment-taking state machine.
//!
//! A session starts in `InProgress { index: 0 }` with an empty answer buffer
//! sized to the assessment. Navigation and answer selection mutate it until
//! `submit` scores the attempt and moves it to `Completed`. `retake` is the
//! only way back.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, Question},
        result::{AnswerRecord, AssessmentResult, QuestionReview},
        user::GUEST_USER_ID,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Please select an answer before proceeding.")]
    AnswerRequired,

    #[error("Please answer all questions before submitting ({unanswered} unanswered).")]
    Incomplete { unanswered: usize },

    #[error("This assessment has already been submitted.")]
    AlreadyCompleted,

    #[error("This assessment has not been submitted yet.")]
    NotCompleted,

    #[error("Assessment has no questions.")]
    EmptyAssessment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    InProgress { index: usize },
    Completed(AssessmentResult),
}

/// Outcome of `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    /// Already on the last question; the caller should submit instead.
    AtLastQuestion,
}

#[derive(Debug, Clone)]
pub struct AssessmentSession {
    assessment: Arc<Assessment>,
    user_id: String,
    answers: Vec<Option<String>>,
    state: SessionState,
    last_completed_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    pub fn new(assessment: Arc<Assessment>, user_id: impl Into<String>) -> Result<Self, SessionError> {
        if assessment.questions.is_empty() {
            return Err(SessionError::EmptyAssessment);
        }
        let answers = vec![None; assessment.questions.len()];
        Ok(Self {
            assessment,
            user_id: user_id.into(),
            answers,
            state: SessionState::InProgress { index: 0 },
            last_completed_at: None,
        })
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn question_count(&self) -> usize {
        self.assessment.questions.len()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, SessionState::Completed(_))
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        match &self.state {
            SessionState::Completed(result) => Some(result),
            SessionState::InProgress { .. } => None,
        }
    }

    fn index(&self) -> Result<usize, SessionError> {
        match self.state {
            SessionState::InProgress { index } => Ok(index),
            SessionState::Completed(_) => Err(SessionError::AlreadyCompleted),
        }
    }

    /// Index of the question being shown.
    pub fn current_index(&self) -> Result<usize, SessionError> {
        self.index()
    }

    pub fn current_question(&self) -> Result<&Question, SessionError> {
        let index = self.index()?;
        Ok(&self.assessment.questions[index])
    }

    pub fn is_last_question(&self) -> bool {
        matches!(self.state, SessionState::InProgress { index } if index + 1 == self.question_count())
    }

    /// Writes `option` into the current slot, replacing any earlier choice.
    ///
    /// The option is not checked against the question's declared options.
    pub fn select_answer(&mut self, option: impl Into<String>) -> Result<(), SessionError> {
        let index = self.index()?;
        self.answers[index] = Some(option.into());
        Ok(())
    }

    pub fn next(&mut self) -> Result<Advance, SessionError> {
        let index = self.index()?;
        if self.answers[index].is_none() {
            return Err(SessionError::AnswerRequired);
        }
        if index + 1 < self.question_count() {
            self.state = SessionState::InProgress { index: index + 1 };
            Ok(Advance::Moved(index + 1))
        } else {
            Ok(Advance::AtLastQuestion)
        }
    }

    /// Steps back one question. Never requires the current slot to be answered.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        let index = self.index()?;
        let index = index.saturating_sub(1);
        self.state = SessionState::InProgress { index };
        Ok(index)
    }

    /// Scores the attempt at the current wall-clock time.
    pub fn submit(&mut self) -> Result<&AssessmentResult, SessionError> {
        self.submit_at(Utc::now())
    }

    /// Scores the attempt and moves to `Completed`.
    ///
    /// `completedAt` is forced strictly after the previous attempt's, so a
    /// retake never reuses a timestamp even on a coarse clock.
    pub fn submit_at(&mut self, now: DateTime<Utc>) -> Result<&AssessmentResult, SessionError> {
        self.index()?;
        let unanswered = self.answers.iter().filter(|a| a.is_none()).count();
        if unanswered > 0 {
            return Err(SessionError::Incomplete { unanswered });
        }

        let questions = &self.assessment.questions;
        let answers: Vec<AnswerRecord> = questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| AnswerRecord {
                question_id: q.id.clone(),
                selected_answer: a.clone().unwrap_or_default(),
            })
            .collect();
        let correct = self.correct_count();

        let completed_at = match self.last_completed_at {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_completed_at = Some(completed_at);

        let result = AssessmentResult {
            assessment_id: self.assessment.id.clone(),
            assessment_title: self.assessment.title.clone(),
            category: self.assessment.category,
            user_id: self.user_id.clone(),
            score_percentage: score_percentage(correct, questions.len()),
            answers,
            completed_at,
        };
        self.state = SessionState::Completed(result);
        self.result().ok_or(SessionError::NotCompleted)
    }

    /// Resets a completed session to its first question with an empty buffer.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        if !self.is_completed() {
            return Err(SessionError::NotCompleted);
        }
        self.answers = vec![None; self.question_count()];
        self.state = SessionState::InProgress { index: 0 };
        Ok(())
    }

    pub fn correct_count(&self) -> usize {
        self.assessment
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| a.as_deref() == Some(q.correct_answer.as_str()))
            .count()
    }

    /// Per-question comparison for the results screen. Empty until completed.
    pub fn review(&self) -> Vec<QuestionReview> {
        let Some(result) = self.result() else {
            return Vec::new();
        };
        self.assessment
            .questions
            .iter()
            .zip(&result.answers)
            .map(|(q, a)| QuestionReview {
                question_id: q.id.clone(),
                question_text: q.question_text.clone(),
                selected_answer: a.selected_answer.clone(),
                correct_answer: q.correct_answer.clone(),
                is_correct: a.selected_answer == q.correct_answer,
            })
            .collect()
    }
}

/// `round(100 * correct / total)`, rounding halves up.
pub fn score_percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    // floor(100c/t + 1/2) == floor((200c + t) / 2t)
    ((200 * correct + total) / (2 * total)) as u8
}

/// Idle time after which an untouched session is dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Open sessions kept per user; opening another drops the least recently used.
pub const DEFAULT_SESSIONS_PER_USER: usize = 8;

#[derive(Debug)]
struct Entry {
    session: AssessmentSession,
    last_touched: Instant,
}

/// Open sessions, keyed by id. Each session belongs to one user.
///
/// Sessions idle for longer than the TTL are evicted whenever a session is
/// opened and on every `evict_idle` sweep.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
    max_per_user: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_SESSIONS_PER_USER)
    }
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration, max_per_user: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_per_user: max_per_user.max(1),
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Entry>>, AppError> {
        self.sessions
            .lock()
            .map_err(|_| AppError::InternalServerError("session registry poisoned".to_string()))
    }

    pub fn open(&self, session: AssessmentSession) -> Result<Uuid, AppError> {
        self.open_at(session, Instant::now())
    }

    /// Stores a session, first evicting idle ones and the owner's oldest
    /// sessions beyond the per-user cap.
    pub fn open_at(&self, session: AssessmentSession, now: Instant) -> Result<Uuid, AppError> {
        let mut sessions = self.lock()?;
        evict_idle(&mut sessions, now, self.idle_ttl);

        let mut owned: Vec<(Uuid, Instant)> = sessions
            .iter()
            .filter(|(_, e)| e.session.user_id() == session.user_id())
            .map(|(id, e)| (*id, e.last_touched))
            .collect();
        // Guests share one subject, so only the TTL bounds their sessions.
        if session.user_id() != GUEST_USER_ID && owned.len() >= self.max_per_user {
            owned.sort_by_key(|(_, touched)| *touched);
            let excess = owned.len() + 1 - self.max_per_user;
            for (id, _) in owned.into_iter().take(excess) {
                sessions.remove(&id);
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            Entry {
                session,
                last_touched: now,
            },
        );
        Ok(id)
    }

    /// Runs `f` against the caller's session and marks it as used.
    ///
    /// The lock is held only for the duration of `f`, which must not block.
    pub fn with_session<R>(
        &self,
        id: Uuid,
        user_id: &str,
        f: impl FnOnce(&mut AssessmentSession) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut sessions = self.lock()?;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if entry.session.user_id() != user_id {
            return Err(AppError::Forbidden(
                "Session belongs to another user".to_string(),
            ));
        }
        entry.last_touched = Instant::now();
        f(&mut entry.session)
    }

    pub fn discard(&self, id: Uuid, user_id: &str) -> Result<(), AppError> {
        let mut sessions = self.lock()?;
        match sessions.get(&id) {
            None => Err(AppError::NotFound("Session not found".to_string())),
            Some(e) if e.session.user_id() != user_id => Err(AppError::Forbidden(
                "Session belongs to another user".to_string(),
            )),
            Some(_) => {
                sessions.remove(&id);
                Ok(())
            }
        }
    }

    /// Drops every session idle for longer than the TTL. Returns how many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        match self.lock() {
            Ok(mut sessions) => evict_idle(&mut sessions, now, self.idle_ttl),
            Err(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_idle(sessions: &mut HashMap<Uuid, Entry>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, e| now.saturating_duration_since(e.last_touched) <= ttl);
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessment::{AssessmentCategory, QuestionKind};

    fn question(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            question_text: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: correct.to_string(),
            kind: QuestionKind::MultipleChoice,
        }
    }

    fn assessment(n: usize) -> Arc<Assessment> {
        Arc::new(Assessment {
            id: "test".to_string(),
            title: "Test Assessment".to_string(),
            category: AssessmentCategory::DataStructures,
            description: "For tests".to_string(),
            questions: (0..n).map(|i| question(&format!("q{}", i), "A")).collect(),
            duration_minutes: None,
            created_at: Utc::now(),
            upvotes: 0,
            downvotes: 0,
            is_predefined: false,
        })
    }

    fn answer_all(session: &mut AssessmentSession, answers: &[&str]) {
        for (i, a) in answers.iter().enumerate() {
            session.select_answer(*a).unwrap();
            if i + 1 < answers.len() {
                assert_eq!(session.next().unwrap(), Advance::Moved(i + 1));
            }
        }
    }

    #[test]
    fn starts_at_first_question_with_empty_buffer() {
        let s = AssessmentSession::new(assessment(3), "u1").unwrap();
        assert_eq!(s.current_index().unwrap(), 0);
        assert_eq!(s.answers(), &[None, None, None]);
        assert!(!s.is_completed());
    }

    #[test]
    fn empty_assessment_is_rejected() {
        let err = AssessmentSession::new(assessment(0), "u1").unwrap_err();
        assert_eq!(err, SessionError::EmptyAssessment);
    }

    #[test]
    fn next_requires_an_answer() {
        let mut s = AssessmentSession::new(assessment(2), "u1").unwrap();
        assert_eq!(s.next().unwrap_err(), SessionError::AnswerRequired);
        assert_eq!(s.current_index().unwrap(), 0);

        s.select_answer("B").unwrap();
        assert_eq!(s.next().unwrap(), Advance::Moved(1));
    }

    #[test]
    fn next_on_last_question_is_a_no_op() {
        let mut s = AssessmentSession::new(assessment(1), "u1").unwrap();
        s.select_answer("A").unwrap();
        assert!(s.is_last_question());
        assert_eq!(s.next().unwrap(), Advance::AtLastQuestion);
        assert_eq!(s.current_index().unwrap(), 0);
    }

    #[test]
    fn previous_does_not_require_an_answer_and_stops_at_zero() {
        let mut s = AssessmentSession::new(assessment(3), "u1").unwrap();
        s.select_answer("A").unwrap();
        s.next().unwrap();
        assert_eq!(s.previous().unwrap(), 0);
        assert_eq!(s.previous().unwrap(), 0);
    }

    #[test]
    fn select_answer_overwrites_previous_choice() {
        let mut s = AssessmentSession::new(assessment(2), "u1").unwrap();
        s.select_answer("A").unwrap();
        s.select_answer("C").unwrap();
        assert_eq!(s.answers()[0].as_deref(), Some("C"));
    }

    #[test]
    fn select_answer_accepts_option_outside_declared_set() {
        // Deliberately loose: answers are not checked against the options.
        let mut s = AssessmentSession::new(assessment(1), "u1").unwrap();
        s.select_answer("not an option").unwrap();
        let result = s.submit().unwrap();
        assert_eq!(result.answers[0].selected_answer, "not an option");
        assert_eq!(result.score_percentage, 0);
    }

    #[test]
    fn submit_requires_every_slot() {
        let mut s = AssessmentSession::new(assessment(3), "u1").unwrap();
        s.select_answer("A").unwrap();
        assert_eq!(
            s.submit().unwrap_err(),
            SessionError::Incomplete { unanswered: 2 }
        );
        assert!(!s.is_completed());
    }

    #[test]
    fn submit_scores_and_covers_every_question() {
        let mut s = AssessmentSession::new(assessment(5), "u1").unwrap();
        answer_all(&mut s, &["A", "A", "A", "B", "C"]);

        let result = s.submit().unwrap().clone();
        assert_eq!(result.score_percentage, 60);
        assert_eq!(result.answers.len(), 5);
        assert_eq!(result.answers[3].question_id, "q3");
        assert_eq!(result.user_id, "u1");
        assert_eq!(result.assessment_title, "Test Assessment");
        assert!(s.is_completed());
    }

    #[test]
    fn two_of_three_rounds_up_to_67() {
        let mut s = AssessmentSession::new(assessment(3), "u1").unwrap();
        answer_all(&mut s, &["A", "A", "B"]);
        assert_eq!(s.submit().unwrap().score_percentage, 67);
    }

    #[test]
    fn score_rounding() {
        assert_eq!(score_percentage(3, 5), 60);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(1, 8), 13); // 12.5 rounds up
        assert_eq!(score_percentage(0, 4), 0);
        assert_eq!(score_percentage(4, 4), 100);
    }

    #[test]
    fn completed_session_rejects_mutation() {
        let mut s = AssessmentSession::new(assessment(1), "u1").unwrap();
        s.select_answer("A").unwrap();
        s.submit().unwrap();

        assert_eq!(s.select_answer("B").unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.next().unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.previous().unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.submit().unwrap_err(), SessionError::AlreadyCompleted);
        assert_eq!(s.result().unwrap().answers[0].selected_answer, "A");
    }

    #[test]
    fn retake_only_from_completed() {
        let mut s = AssessmentSession::new(assessment(2), "u1").unwrap();
        assert_eq!(s.retake().unwrap_err(), SessionError::NotCompleted);
    }

    #[test]
    fn retake_then_perfect_submit_gets_fresh_timestamp() {
        let mut s = AssessmentSession::new(assessment(2), "u1").unwrap();
        let t0 = Utc::now();
        answer_all(&mut s, &["B", "B"]);
        let first = s.submit_at(t0).unwrap().clone();
        assert_eq!(first.score_percentage, 0);

        s.retake().unwrap();
        assert_eq!(s.current_index().unwrap(), 0);
        assert_eq!(s.answers(), &[None, None]);

        answer_all(&mut s, &["A", "A"]);
        // Same instant as before: the timestamp must still move forward.
        let second = s.submit_at(t0).unwrap().clone();
        assert_eq!(second.score_percentage, 100);
        assert!(second.completed_at > first.completed_at);
    }

    #[test]
    fn review_marks_correct_and_incorrect() {
        let mut s = AssessmentSession::new(assessment(2), "u1").unwrap();
        assert!(s.review().is_empty());
        answer_all(&mut s, &["A", "C"]);
        s.submit().unwrap();

        let review = s.review();
        assert!(review[0].is_correct);
        assert!(!review[1].is_correct);
        assert_eq!(review[1].correct_answer, "A");
    }

    #[test]
    fn registry_enforces_ownership() {
        let registry = SessionRegistry::default();
        let id = registry
            .open(AssessmentSession::new(assessment(1), "owner").unwrap())
            .unwrap();

        let err = registry
            .with_session(id, "intruder", |s| Ok(s.question_count()))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let count = registry.with_session(id, "owner", |s| Ok(s.question_count())).unwrap();
        assert_eq!(count, 1);

        assert!(matches!(
            registry.discard(id, "intruder"),
            Err(AppError::Forbidden(_))
        ));
        registry.discard(id, "owner").unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.with_session(id, "owner", |_| Ok(())),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 8);
        let t0 = Instant::now();
        let stale = registry
            .open_at(AssessmentSession::new(assessment(1), "u1").unwrap(), t0)
            .unwrap();

        assert_eq!(registry.evict_idle(t0 + Duration::from_secs(30)), 0);
        assert_eq!(registry.len(), 1);

        // Opening another session well past the TTL sweeps the stale one.
        let fresh = registry
            .open_at(
                AssessmentSession::new(assessment(1), "u2").unwrap(),
                t0 + Duration::from_secs(120),
            )
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(matches!(
            registry.with_session(stale, "u1", |_| Ok(())),
            Err(AppError::NotFound(_))
        ));
        assert!(registry.with_session(fresh, "u2", |_| Ok(())).is_ok());
    }

    #[test]
    fn per_user_cap_drops_least_recently_used() {
        let registry = SessionRegistry::new(Duration::from_secs(3600), 2);
        let t0 = Instant::now();
        let open = |user: &str, secs: u64| {
            registry
                .open_at(
                    AssessmentSession::new(assessment(1), user).unwrap(),
                    t0 + Duration::from_secs(secs),
                )
                .unwrap()
        };

        let first = open("u1", 0);
        let second = open("u1", 1);
        let other = open("u2", 2);
        let third = open("u1", 3);

        assert_eq!(registry.len(), 3);
        assert!(matches!(
            registry.with_session(first, "u1", |_| Ok(())),
            Err(AppError::NotFound(_))
        ));
        for (id, user) in [(second, "u1"), (third, "u1"), (other, "u2")] {
            assert!(registry.with_session(id, user, |_| Ok(())).is_ok());
        }
    }

    #[test]
    fn guest_sessions_are_not_capped() {
        let registry = SessionRegistry::new(Duration::from_secs(3600), 1);
        for _ in 0..3 {
            registry
                .open(AssessmentSession::new(assessment(1), GUEST_USER_ID).unwrap())
                .unwrap();
        }
        assert_eq!(registry.len(), 3);
    }
}
