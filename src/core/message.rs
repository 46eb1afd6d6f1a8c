use std::fmt;
use std::sync::Arc;

/// A broadcast message: a monotonic sequence number and an immutable payload.
///
/// Cloning is cheap and every clone is an independent logical copy; the payload
/// is never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    seq: u64,
    payload: Arc<str>,
}

impl Message {
    /// Creates a message.
    pub fn new(seq: u64, payload: impl Into<Arc<str>>) -> Self {
        Self {
            seq,
            payload: payload.into(),
        }
    }

    /// Dispatch sequence number (1-based).
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Message content.
    #[inline]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub(crate) fn payload_arc(&self) -> Arc<str> {
        Arc::clone(&self.payload)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)
    }
}
