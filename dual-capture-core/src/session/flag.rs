use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-writer, multi-reader "recording" signal shared with capture threads.
///
/// The control thread raises it once at start and lowers it once at stop;
/// capture loops only read it. Transitions use compare-and-swap so a second
/// raise or lower is observable as a no-op.
#[derive(Debug, Clone, Default)]
pub struct RecordingFlag {
    inner: Arc<AtomicBool>,
}

impl RecordingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_raised(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Raise the flag. Returns `false` if it was already raised.
    pub fn try_raise(&self) -> bool {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Lower the flag. Returns `false` if it was already down.
    pub fn try_lower(&self) -> bool {
        self.inner
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_one_shot() {
        let flag = RecordingFlag::new();
        assert!(!flag.is_raised());
        assert!(!flag.try_lower());

        assert!(flag.try_raise());
        assert!(!flag.try_raise());
        assert!(flag.is_raised());

        assert!(flag.try_lower());
        assert!(!flag.is_raised());
    }

    #[test]
    fn clones_share_state() {
        let flag = RecordingFlag::new();
        let reader = flag.clone();
        flag.try_raise();
        assert!(reader.is_raised());
    }
}
