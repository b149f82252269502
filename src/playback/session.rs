use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One playback or capture session.
///
/// Owns the session cancellation token and the single "currently speaking"
/// slot. Starting an utterance cancels whatever occupied the slot before.
#[derive(Debug)]
pub struct SpeechSession {
    id: Uuid,
    cancel: CancellationToken,
    active: Mutex<Option<CancellationToken>>,
}

impl Default for SpeechSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            active: Mutex::new(None),
        }
    }

    /// A session that is also cancelled when `parent` is
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: parent.child_token(),
            active: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the session is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Cancel the session and stop the active utterance. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.cancel.cancel();
        if let Some(active) = self.active.lock().take() {
            active.cancel();
        }
    }

    /// Claim the speaking slot for a new utterance.
    ///
    /// The returned token is cancelled when the session is cancelled or when
    /// the next utterance begins.
    pub fn begin_utterance(&self) -> CancellationToken {
        let token = self.cancel.child_token();
        if let Some(previous) = self.active.lock().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Whether an utterance currently holds the slot
    pub fn has_active_utterance(&self) -> bool {
        self.active.lock().as_ref().is_some_and(|token| !token.is_cancelled())
    }
}
