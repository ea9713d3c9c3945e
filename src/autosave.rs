// ⏱️ Autosave - Debounced snapshot writes
//
// Each mutation bumps a generation counter and schedules a save after the
// debounce delay. When the delay expires, only the task holding the latest
// generation writes; older ones see they were superseded and bail out, so a
// burst of edits produces a single write.
//
// This type holds no timers. The caller sleeps for `delay()` on whatever
// runtime it uses, then asks `begin` whether it may still write.

use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    /// Stored snapshot matches memory
    Clean,
    /// Edits waiting for the debounce window
    Dirty,
    /// A write is in progress
    Saving,
    /// Last write failed; the next edit retries
    Error,
}

#[derive(Debug, Clone)]
pub struct Autosave {
    delay: Duration,
    generation: u64,
    state: SaveState,
    last_error: Option<String>,
}

impl Autosave {
    pub fn new(delay: Duration) -> Self {
        Autosave {
            delay,
            generation: 0,
            state: SaveState::Clean,
            last_error: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record an edit; returns the generation the scheduled save must hold
    pub fn mark_dirty(&mut self) -> u64 {
        self.generation += 1;
        self.state = SaveState::Dirty;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Claim the write for `generation`. False when a newer edit superseded it.
    pub fn begin(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.state = SaveState::Saving;
        true
    }

    /// Report the write outcome. A newer edit made meanwhile keeps the
    /// state dirty so its own save still runs.
    pub fn finish(&mut self, generation: u64, result: Result<(), String>) {
        match result {
            Ok(()) => {
                self.last_error = None;
                if self.is_current(generation) {
                    self.state = SaveState::Clean;
                }
            }
            Err(message) => {
                tracing::warn!(generation, error = %message, "autosave failed");
                self.last_error = Some(message);
                if self.is_current(generation) {
                    self.state = SaveState::Error;
                }
            }
        }
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_of_edits_saves_once() {
        let mut autosave = Autosave::default();

        let first = autosave.mark_dirty();
        let second = autosave.mark_dirty();
        let third = autosave.mark_dirty();

        assert!(!autosave.begin(first));
        assert!(!autosave.begin(second));
        assert!(autosave.begin(third));
        assert_eq!(autosave.state(), SaveState::Saving);

        autosave.finish(third, Ok(()));
        assert_eq!(autosave.state(), SaveState::Clean);
    }

    #[test]
    fn test_edit_during_save_stays_dirty() {
        let mut autosave = Autosave::new(Duration::from_millis(10));

        let generation = autosave.mark_dirty();
        assert!(autosave.begin(generation));
        let newer = autosave.mark_dirty();
        autosave.finish(generation, Ok(()));

        assert_eq!(autosave.state(), SaveState::Dirty);
        assert!(autosave.begin(newer));
    }

    #[test]
    fn test_failed_save_is_reported() {
        let mut autosave = Autosave::default();
        let generation = autosave.mark_dirty();
        assert!(autosave.begin(generation));

        autosave.finish(generation, Err("disk full".to_string()));
        assert_eq!(autosave.state(), SaveState::Error);
        assert_eq!(autosave.last_error(), Some("disk full"));

        let retry = autosave.mark_dirty();
        assert!(autosave.begin(retry));
        autosave.finish(retry, Ok(()));
        assert_eq!(autosave.state(), SaveState::Clean);
        assert_eq!(autosave.last_error(), None);
    }

    #[test]
    fn test_default_delay() {
        assert_eq!(Autosave::default().delay(), Duration::from_millis(1500));
    }
}
