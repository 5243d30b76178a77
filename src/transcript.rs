use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Message {
    pub(crate) role: Role,
    pub(crate) content: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TranscriptError {
    #[error("user submission must not be empty")]
    EmptySubmission,
    #[error("no assistant message is open for appending")]
    NoOpenMessage,
}

/// Ordered message log for one conversation. The single source of truth the
/// renderer reads from; every mutation bumps `revision` so the presentation
/// layer knows to rebuild its cached lines.
///
/// At most one message is open for appending at any time: the assistant
/// placeholder created by the latest `append_turn`, until it is closed or a
/// new turn starts.
#[derive(Debug, Default)]
pub(crate) struct Transcript {
    messages: Vec<Message>,
    open_idx: Option<usize>,
    revision: u64,
}

impl Transcript {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Monotonic change counter; bumped by every successful mutation.
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    /// Index of the assistant message currently accepting fragments, if any.
    pub(crate) fn open_index(&self) -> Option<usize> {
        self.open_idx
    }

    pub(crate) fn reset(&mut self) {
        self.messages.clear();
        self.open_idx = None;
        self.bump();
    }

    /// Appends a user message followed by an empty assistant placeholder and
    /// marks the placeholder open. Returns the placeholder's index. A turn
    /// started while another assistant message is still open closes it first.
    pub(crate) fn append_turn(&mut self, user_text: &str) -> Result<usize, TranscriptError> {
        if user_text.is_empty() {
            return Err(TranscriptError::EmptySubmission);
        }
        self.messages.push(Message {
            role: Role::User,
            content: user_text.to_string(),
        });
        self.messages.push(Message {
            role: Role::Assistant,
            content: String::new(),
        });
        let idx = self.messages.len() - 1;
        self.open_idx = Some(idx);
        self.bump();
        Ok(idx)
    }

    /// Appends a fragment to the open assistant message. Leaves the transcript
    /// untouched when nothing is open; the caller decides whether to log and
    /// drop or surface the error.
    pub(crate) fn append_to_open(&mut self, fragment: &str) -> Result<(), TranscriptError> {
        let idx = self.open_idx.ok_or(TranscriptError::NoOpenMessage)?;
        let entry = self
            .messages
            .get_mut(idx)
            .ok_or(TranscriptError::NoOpenMessage)?;
        entry.content.push_str(fragment);
        self.bump();
        Ok(())
    }

    /// Marks that no message accepts fragments anymore. Idempotent.
    pub(crate) fn close_open(&mut self) {
        if self.open_idx.take().is_some() {
            self.bump();
        }
    }

    pub(crate) fn open_content(&self) -> Option<&str> {
        self.open_idx
            .and_then(|idx| self.messages.get(idx))
            .map(|m| m.content.as_str())
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
