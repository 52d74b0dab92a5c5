//! Phase controller: owns the session registry and orchestrates the
//! external stores.
//!
//! Locking discipline: every operation takes the registry write lock,
//! validates and marks the session in-flight, clones what the remote call
//! needs, and releases the lock across the await. The outcome is applied
//! only if the session still exists and its epoch is unchanged; a result
//! that resolves against a torn-down or gone-back session is discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use vouch_common::{Identity, Phase, Testimonial, TestimonialDraft, VouchError};

use crate::stores::{CodeStore, SubmissionStore};

use super::session::{rating_or_default, ContentFields, FlowStatus, Session};

/// The verified-submission flow engine
pub struct FlowEngine {
    code_store: Arc<dyn CodeStore>,
    submissions: Arc<dyn SubmissionStore>,
    sessions: RwLock<HashMap<String, Session>>,
    /// Seconds a resend stays disabled after a successful dispatch
    cooldown_secs: u32,
}

impl FlowEngine {
    pub fn new(
        code_store: Arc<dyn CodeStore>,
        submissions: Arc<dyn SubmissionStore>,
        cooldown_secs: u32,
    ) -> Self {
        Self {
            code_store,
            submissions,
            sessions: RwLock::new(HashMap::new()),
            cooldown_secs,
        }
    }

    /// Open a fresh flow and return its session id
    pub async fn start(&self) -> String {
        let id = generate_session_id();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Session::new());

        tracing::debug!(session_id = %id, "Flow started");

        id
    }

    /// Client-visible snapshot of a session
    pub async fn status(&self, id: &str) -> Result<FlowStatus, VouchError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id).ok_or(VouchError::UnknownSession)?;
        Ok(session.status())
    }

    /// Phase 1 submit: capture identity and dispatch a code.
    ///
    /// On success the session moves to `Verifying`, any stale code entry is
    /// cleared and the resend cooldown starts. On dispatch failure the
    /// session stays in `Identity` and the cooldown is untouched.
    pub async fn submit_identity(
        &self,
        id: &str,
        name: &str,
        email: &str,
    ) -> Result<(), VouchError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(VouchError::Validation("name is required".to_string()));
        }
        if email.is_empty() {
            return Err(VouchError::Validation("email is required".to_string()));
        }

        {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
            require_phase(session, Phase::Identity)?;
            require_idle(session)?;

            session.identity = Some(Identity {
                name: name.to_string(),
                email: email.to_string(),
            });
            session.in_flight = true;
            session.touch();
        }

        let result = self.code_store.dispatch(name, email).await;

        let mut sessions = self.sessions.write().await;
        let session = match sessions.get_mut(id) {
            Some(s) => s,
            None => return discard_stale(id, result),
        };
        session.in_flight = false;

        match result {
            Ok(()) => {
                session.code.clear();
                session.cooldown.start(self.cooldown_secs);
                session.phase = Phase::Verifying;
                session.touch();
                tracing::info!(session_id = %id, "Code dispatched, entering verification");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Code dispatch failed");
                Err(e)
            }
        }
    }

    /// Write one digit into the focused code cell
    pub async fn enter_digit(&self, id: &str, digit: char) -> Result<FlowStatus, VouchError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
        require_phase(session, Phase::Verifying)?;

        if !session.code.enter(digit) {
            return Err(VouchError::Validation(
                "only single digits are accepted".to_string(),
            ));
        }
        session.touch();
        Ok(session.status())
    }

    /// Backspace in the code row (clears the focused cell or steps back)
    pub async fn backspace(&self, id: &str) -> Result<FlowStatus, VouchError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
        require_phase(session, Phase::Verifying)?;

        session.code.backspace();
        session.touch();
        Ok(session.status())
    }

    /// Bulk paste into the code row (always fills from cell 0)
    pub async fn paste(&self, id: &str, text: &str) -> Result<FlowStatus, VouchError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
        require_phase(session, Phase::Verifying)?;

        session.code.paste(text);
        session.touch();
        Ok(session.status())
    }

    /// Phase 2 submit: verify the fully populated code.
    ///
    /// On success the session moves to `Content` and the code is discarded.
    /// On failure all cells are cleared (full re-entry required) and the
    /// session stays in `Verifying`.
    pub async fn submit_code(&self, id: &str) -> Result<(), VouchError> {
        let (email, code, epoch) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
            require_phase(session, Phase::Verifying)?;
            require_idle(session)?;

            let code = session
                .code
                .value()
                .ok_or_else(|| VouchError::Validation("code is incomplete".to_string()))?;
            let email = session
                .identity
                .as_ref()
                .ok_or_else(|| VouchError::Internal("identity missing".to_string()))?
                .email
                .clone();

            session.in_flight = true;
            session.touch();
            (email, code, session.epoch)
        };

        let result = self.code_store.verify(&email, &code).await;

        let mut sessions = self.sessions.write().await;
        let session = match sessions.get_mut(id) {
            Some(s) => s,
            None => return discard_stale(id, result),
        };
        session.in_flight = false;

        if session.epoch != epoch || session.phase != Phase::Verifying {
            // The user went back while the call was pending
            return discard_stale(id, result);
        }

        match result {
            Ok(()) => {
                // The code has served its purpose; nothing retains it
                session.code.clear();
                session.cooldown.stop();
                session.phase = Phase::Content;
                session.touch();
                tracing::info!(session_id = %id, "Email verified, entering content phase");
                Ok(())
            }
            Err(e) => {
                session.code.clear();
                session.touch();
                tracing::debug!(session_id = %id, error = %e, "Code verification failed");
                Err(e)
            }
        }
    }

    /// Re-dispatch a code. Only permitted in `Verifying` once the cooldown
    /// has reached 0; resets the code row and restarts the cooldown, phase
    /// unchanged.
    pub async fn resend(&self, id: &str) -> Result<(), VouchError> {
        let (name, email, epoch) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
            require_phase(session, Phase::Verifying)?;
            require_idle(session)?;

            if !session.cooldown.is_ready() {
                return Err(VouchError::CooldownActive(session.cooldown.remaining()));
            }

            let identity = session
                .identity
                .as_ref()
                .ok_or_else(|| VouchError::Internal("identity missing".to_string()))?;
            let name = identity.name.clone();
            let email = identity.email.clone();

            session.in_flight = true;
            session.touch();
            (name, email, session.epoch)
        };

        let result = self.code_store.dispatch(&name, &email).await;

        let mut sessions = self.sessions.write().await;
        let session = match sessions.get_mut(id) {
            Some(s) => s,
            None => return discard_stale(id, result),
        };
        session.in_flight = false;

        if session.epoch != epoch || session.phase != Phase::Verifying {
            return discard_stale(id, result);
        }

        match result {
            Ok(()) => {
                session.code.clear();
                session.cooldown.start(self.cooldown_secs);
                session.touch();
                tracing::info!(session_id = %id, "Code re-dispatched");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Code re-dispatch failed");
                Err(e)
            }
        }
    }

    /// The "wrong email, go back" escape hatch: `Verifying` back to
    /// `Identity`, discarding the code and cooldown. The identity stays
    /// pre-filled for correction. Available even while a verify call is
    /// pending; the epoch bump makes that call's outcome stale.
    pub async fn edit_identity(&self, id: &str) -> Result<FlowStatus, VouchError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
        require_phase(session, Phase::Verifying)?;

        session.phase = Phase::Identity;
        session.code.clear();
        session.cooldown.stop();
        session.payload = None;
        session.epoch += 1;
        session.touch();

        tracing::debug!(session_id = %id, "Returned to identity phase");

        Ok(session.status())
    }

    /// Phase 3 submit: persist the finished testimonial.
    ///
    /// On success the stored record is handed back for immediate list
    /// insertion and the session is discarded. On failure the payload is
    /// preserved so an unchanged resubmission can retry.
    pub async fn submit_content(
        &self,
        id: &str,
        fields: ContentFields,
    ) -> Result<Testimonial, VouchError> {
        if fields.content.trim().is_empty() {
            return Err(VouchError::Validation("content is required".to_string()));
        }

        let (draft, epoch) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions.get_mut(id).ok_or(VouchError::UnknownSession)?;
            require_phase(session, Phase::Content)?;
            require_idle(session)?;

            let identity = session
                .identity
                .as_ref()
                .ok_or_else(|| VouchError::Internal("identity missing".to_string()))?;

            let draft = TestimonialDraft {
                name: identity.name.clone(),
                email: identity.email.clone(),
                content: fields.content.trim().to_string(),
                rating: rating_or_default(fields.rating),
                role: fields.role.clone().filter(|s| !s.trim().is_empty()),
                company: fields.company.clone().filter(|s| !s.trim().is_empty()),
                phone: fields.phone.clone().filter(|s| !s.trim().is_empty()),
            };

            session.payload = Some(fields);
            session.in_flight = true;
            session.touch();
            (draft, session.epoch)
        };

        let result = self.submissions.create(draft).await;

        let mut sessions = self.sessions.write().await;
        let session = match sessions.get_mut(id) {
            Some(s) => s,
            None => return discard_stale(id, result),
        };
        session.in_flight = false;

        if session.epoch != epoch || session.phase != Phase::Content {
            return discard_stale(id, result);
        }

        match result {
            Ok(record) => {
                // Terminal success: the whole session is discarded
                sessions.remove(id);
                tracing::info!(
                    session_id = %id,
                    record_id = %record.id,
                    "Testimonial submitted, flow closed"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Testimonial create failed");
                Err(e)
            }
        }
    }

    /// Cancel the flow at any phase, discarding all session state and
    /// stopping the cooldown task.
    pub async fn cancel(&self, id: &str) -> Result<(), VouchError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).ok_or(VouchError::UnknownSession)?;
        tracing::debug!(session_id = %id, "Flow cancelled");
        Ok(())
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Evict sessions idle for longer than `max_idle`. In-flight sessions
    /// are left alone; their apply step handles teardown racing anyway.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.in_flight || s.last_active.elapsed() <= max_idle);
        before - sessions.len()
    }
}

/// Run the idle-session reaper until shutdown
pub async fn session_reaper(
    engine: Arc<FlowEngine>,
    max_idle: Duration,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let evicted = engine.sweep_idle(max_idle).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Swept idle sessions");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Session reaper shutting down");
                break;
            }
        }
    }
}

fn require_phase(session: &Session, expected: Phase) -> Result<(), VouchError> {
    if session.phase != expected {
        return Err(VouchError::PhaseMismatch(session.phase.name()));
    }
    Ok(())
}

fn require_idle(session: &Session) -> Result<(), VouchError> {
    if session.in_flight {
        return Err(VouchError::Busy);
    }
    Ok(())
}

/// A remote call resolved against a session that no longer wants it
/// (torn down or gone back). The outcome is never applied to stale state.
fn discard_stale<T>(id: &str, result: Result<T, VouchError>) -> Result<T, VouchError> {
    match result {
        Ok(_) => {
            tracing::debug!(session_id = %id, "Discarding remote result for stale session");
            Err(VouchError::UnknownSession)
        }
        Err(e) => Err(e),
    }
}

/// Generate a cryptographically random session identifier
fn generate_session_id() -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use rand::Rng;

    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct MockCodeStore {
        dispatch_ok: AtomicBool,
        verify_ok: AtomicBool,
        delay: Option<Duration>,
        dispatched: Mutex<Vec<(String, String)>>,
        verified: Mutex<Vec<(String, String)>>,
    }

    impl MockCodeStore {
        fn new() -> Self {
            Self {
                dispatch_ok: AtomicBool::new(true),
                verify_ok: AtomicBool::new(true),
                delay: None,
                dispatched: Mutex::new(Vec::new()),
                verified: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }

        fn dispatch_count(&self) -> usize {
            self.dispatched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CodeStore for MockCodeStore {
        async fn dispatch(&self, name: &str, email: &str) -> Result<(), VouchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if !self.dispatch_ok.load(Ordering::SeqCst) {
                return Err(VouchError::Dispatch("mail relay down".to_string()));
            }
            self.dispatched
                .lock()
                .unwrap()
                .push((name.to_string(), email.to_string()));
            Ok(())
        }

        async fn verify(&self, email: &str, code: &str) -> Result<(), VouchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.verified
                .lock()
                .unwrap()
                .push((email.to_string(), code.to_string()));
            if !self.verify_ok.load(Ordering::SeqCst) {
                return Err(VouchError::CodeMismatch);
            }
            Ok(())
        }
    }

    struct MockSubmissionStore {
        create_ok: AtomicBool,
    }

    impl MockSubmissionStore {
        fn new() -> Self {
            Self {
                create_ok: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl SubmissionStore for MockSubmissionStore {
        async fn create(&self, draft: TestimonialDraft) -> Result<Testimonial, VouchError> {
            if !self.create_ok.load(Ordering::SeqCst) {
                return Err(VouchError::Submission("store down".to_string()));
            }
            Ok(Testimonial::from_draft("t-0001".to_string(), draft))
        }
    }

    fn engine_with(
        codes: Arc<MockCodeStore>,
        subs: Arc<MockSubmissionStore>,
        cooldown_secs: u32,
    ) -> Arc<FlowEngine> {
        Arc::new(FlowEngine::new(codes, subs, cooldown_secs))
    }

    fn fields(content: &str, rating: Option<u8>) -> ContentFields {
        ContentFields {
            content: content.to_string(),
            rating,
            role: None,
            company: None,
            phone: None,
        }
    }

    async fn start_verifying(engine: &FlowEngine) -> String {
        let id = engine.start().await;
        engine
            .submit_identity(&id, "Ada", "ada@example.com")
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_dispatch_success_enters_verifying_with_cooldown() {
        let engine = engine_with(
            Arc::new(MockCodeStore::new()),
            Arc::new(MockSubmissionStore::new()),
            60,
        );
        let id = engine.start().await;

        engine
            .submit_identity(&id, "Ada", "ada@example.com")
            .await
            .unwrap();

        let status = engine.status(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Verifying);
        assert_eq!(status.cooldown_secs, 60);
        assert!(!status.resend_ready);
    }

    #[tokio::test]
    async fn test_dispatch_failure_stays_in_identity() {
        let codes = Arc::new(MockCodeStore::new());
        codes.dispatch_ok.store(false, Ordering::SeqCst);
        let engine = engine_with(codes, Arc::new(MockSubmissionStore::new()), 60);
        let id = engine.start().await;

        let err = engine
            .submit_identity(&id, "Ada", "ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, VouchError::Dispatch(_)));

        let status = engine.status(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Identity);
        assert_eq!(status.cooldown_secs, 0);
    }

    #[tokio::test]
    async fn test_missing_fields_never_reach_the_store() {
        let codes = Arc::new(MockCodeStore::new());
        let engine = engine_with(codes.clone(), Arc::new(MockSubmissionStore::new()), 60);
        let id = engine.start().await;

        let err = engine
            .submit_identity(&id, "  ", "ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, VouchError::Validation(_)));
        let err = engine.submit_identity(&id, "Ada", "").await.unwrap_err();
        assert!(matches!(err, VouchError::Validation(_)));

        assert_eq!(codes.dispatch_count(), 0);
        assert_eq!(engine.status(&id).await.unwrap().phase, Phase::Identity);
    }

    #[tokio::test]
    async fn test_incomplete_code_is_rejected_locally() {
        let codes = Arc::new(MockCodeStore::new());
        let engine = engine_with(codes.clone(), Arc::new(MockSubmissionStore::new()), 60);
        let id = start_verifying(&engine).await;

        engine.enter_digit(&id, '4').await.unwrap();
        let err = engine.submit_code(&id).await.unwrap_err();
        assert!(matches!(err, VouchError::Validation(_)));
        assert!(codes.verified.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_failure_clears_cells_and_stays() {
        let codes = Arc::new(MockCodeStore::new());
        codes.verify_ok.store(false, Ordering::SeqCst);
        let engine = engine_with(codes, Arc::new(MockSubmissionStore::new()), 60);
        let id = start_verifying(&engine).await;

        engine.paste(&id, "482913").await.unwrap();
        let err = engine.submit_code(&id).await.unwrap_err();
        assert!(matches!(err, VouchError::CodeMismatch));

        let status = engine.status(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Verifying);
        assert_eq!(status.code_filled, 0);
        assert_eq!(status.code_focus, 0);
    }

    #[tokio::test]
    async fn test_verify_success_enters_content_and_discards_code() {
        let codes = Arc::new(MockCodeStore::new());
        let engine = engine_with(codes.clone(), Arc::new(MockSubmissionStore::new()), 60);
        let id = start_verifying(&engine).await;

        engine.paste(&id, "482913").await.unwrap();
        engine.submit_code(&id).await.unwrap();

        let status = engine.status(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Content);
        assert_eq!(status.code_filled, 0);

        let verified = codes.verified.lock().unwrap();
        assert_eq!(
            verified.as_slice(),
            &[("ada@example.com".to_string(), "482913".to_string())]
        );
    }

    #[tokio::test]
    async fn test_resend_blocked_while_cooldown_running() {
        let engine = engine_with(
            Arc::new(MockCodeStore::new()),
            Arc::new(MockSubmissionStore::new()),
            60,
        );
        let id = start_verifying(&engine).await;

        let err = engine.resend(&id).await.unwrap_err();
        assert!(matches!(err, VouchError::CooldownActive(secs) if secs > 0));
    }

    #[tokio::test]
    async fn test_resend_at_zero_clears_code_and_restarts_cooldown() {
        let codes = Arc::new(MockCodeStore::new());
        // Cooldown of 0: ready immediately after dispatch
        let engine = engine_with(codes.clone(), Arc::new(MockSubmissionStore::new()), 0);
        let id = start_verifying(&engine).await;

        engine.enter_digit(&id, '1').await.unwrap();
        engine.resend(&id).await.unwrap();

        let status = engine.status(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Verifying);
        assert_eq!(status.code_filled, 0);
        assert_eq!(codes.dispatch_count(), 2);
    }

    #[tokio::test]
    async fn test_go_back_discards_code_and_cooldown_keeps_identity() {
        let codes = Arc::new(MockCodeStore::new());
        let engine = engine_with(codes.clone(), Arc::new(MockSubmissionStore::new()), 60);
        let id = start_verifying(&engine).await;
        engine.paste(&id, "123").await.unwrap();

        let status = engine.edit_identity(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Identity);
        assert_eq!(status.code_filled, 0);
        assert_eq!(status.cooldown_secs, 0);

        // Identity is editable again; a corrected submit dispatches anew
        engine
            .submit_identity(&id, "Ada", "ada@corrected.example.com")
            .await
            .unwrap();
        assert_eq!(codes.dispatch_count(), 2);
        assert_eq!(
            codes.dispatched.lock().unwrap()[1].1,
            "ada@corrected.example.com"
        );
    }

    #[tokio::test]
    async fn test_create_failure_preserves_payload_for_retry() {
        let subs = Arc::new(MockSubmissionStore::new());
        subs.create_ok.store(false, Ordering::SeqCst);
        let engine = engine_with(Arc::new(MockCodeStore::new()), subs.clone(), 60);
        let id = start_verifying(&engine).await;
        engine.paste(&id, "482913").await.unwrap();
        engine.submit_code(&id).await.unwrap();

        let err = engine
            .submit_content(&id, fields("Great work", Some(4)))
            .await
            .unwrap_err();
        assert!(matches!(err, VouchError::Submission(_)));
        assert_eq!(engine.status(&id).await.unwrap().phase, Phase::Content);

        // Unchanged resubmission succeeds once the store recovers
        subs.create_ok.store(true, Ordering::SeqCst);
        let record = engine
            .submit_content(&id, fields("Great work", Some(4)))
            .await
            .unwrap();
        assert_eq!(record.content, "Great work");
    }

    #[tokio::test]
    async fn test_untouched_rating_defaults_to_five() {
        let engine = engine_with(
            Arc::new(MockCodeStore::new()),
            Arc::new(MockSubmissionStore::new()),
            60,
        );
        let id = start_verifying(&engine).await;
        engine.paste(&id, "482913").await.unwrap();
        engine.submit_code(&id).await.unwrap();

        let record = engine
            .submit_content(&id, fields("Solid", None))
            .await
            .unwrap();
        assert_eq!(record.rating.value(), 5);
    }

    #[tokio::test]
    async fn test_end_to_end_happy_path() {
        let engine = engine_with(
            Arc::new(MockCodeStore::new()),
            Arc::new(MockSubmissionStore::new()),
            60,
        );
        let id = engine.start().await;

        engine
            .submit_identity(&id, "Ada", "ada@example.com")
            .await
            .unwrap();
        for digit in "482913".chars() {
            engine.enter_digit(&id, digit).await.unwrap();
        }
        engine.submit_code(&id).await.unwrap();

        let record = engine
            .submit_content(&id, fields("Great work", Some(4)))
            .await
            .unwrap();

        assert_eq!(record.name, "Ada");
        assert_eq!(record.email, "ada@example.com");
        assert_eq!(record.rating.value(), 4);
        assert!(!record.id.is_empty());

        // Flow closed: nothing survives
        assert_eq!(engine.session_count().await, 0);
        assert!(matches!(
            engine.status(&id).await.unwrap_err(),
            VouchError::UnknownSession
        ));
    }

    #[tokio::test]
    async fn test_cancel_discards_everything() {
        let engine = engine_with(
            Arc::new(MockCodeStore::new()),
            Arc::new(MockSubmissionStore::new()),
            60,
        );
        let id = start_verifying(&engine).await;
        engine.paste(&id, "12").await.unwrap();

        engine.cancel(&id).await.unwrap();
        assert_eq!(engine.session_count().await, 0);
        assert!(matches!(
            engine.status(&id).await.unwrap_err(),
            VouchError::UnknownSession
        ));
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let codes = Arc::new(MockCodeStore::with_delay(Duration::from_millis(100)));
        let engine = engine_with(codes, Arc::new(MockSubmissionStore::new()), 60);
        let id = engine.start().await;

        let first = {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move { engine.submit_identity(&id, "Ada", "ada@example.com").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = engine
            .submit_identity(&id, "Ada", "ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, VouchError::Busy));

        first.await.unwrap().unwrap();
        assert_eq!(engine.status(&id).await.unwrap().phase, Phase::Verifying);
    }

    #[tokio::test]
    async fn test_result_after_teardown_is_discarded() {
        let codes = Arc::new(MockCodeStore::with_delay(Duration::from_millis(100)));
        let engine = engine_with(codes, Arc::new(MockSubmissionStore::new()), 60);
        let id = engine.start().await;

        let pending = {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move { engine.submit_identity(&id, "Ada", "ada@example.com").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.cancel(&id).await.unwrap();

        let outcome = pending.await.unwrap();
        assert!(matches!(outcome.unwrap_err(), VouchError::UnknownSession));
        assert_eq!(engine.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_go_back_makes_pending_verify_stale() {
        let codes = Arc::new(MockCodeStore::with_delay(Duration::from_millis(100)));
        let engine = engine_with(codes, Arc::new(MockSubmissionStore::new()), 60);
        let id = engine.start().await;
        engine
            .submit_identity(&id, "Ada", "ada@example.com")
            .await
            .unwrap();
        engine.paste(&id, "482913").await.unwrap();

        let pending = {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move { engine.submit_code(&id).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.edit_identity(&id).await.unwrap();

        // The verify resolved against a gone-back session: not applied
        assert!(pending.await.unwrap().is_err());
        let status = engine.status(&id).await.unwrap();
        assert_eq!(status.phase, Phase::Identity);
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_sessions() {
        let engine = engine_with(
            Arc::new(MockCodeStore::new()),
            Arc::new(MockSubmissionStore::new()),
            60,
        );
        engine.start().await;
        engine.start().await;

        tokio::time::sleep(Duration::from_millis(10)).await;
        let evicted = engine.sweep_idle(Duration::from_millis(1)).await;
        assert_eq!(evicted, 2);
        assert_eq!(engine.session_count().await, 0);
    }
}
