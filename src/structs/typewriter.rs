use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug)]
struct Shared {
    /// Bumped on every restart and on cancel. A tick only writes while its generation is current.
    generation: Mutex<u64>,
    text: watch::Sender<String>,
}

/// Reveals an already complete string one character at a time.
///
/// Only one reveal runs at a time. Starting a new one, calling `cancel`, or
/// dropping the typewriter stops the previous timer before it can write again.
#[derive(Debug)]
pub struct Typewriter {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Typewriter {
    pub fn new() -> Self {
        let (text, _) = watch::channel(String::new());
        Self {
            shared: Arc::new(Shared {
                generation: Mutex::new(0),
                text,
            }),
            task: None,
        }
    }

    /// Receiver that sees every update of the displayed text.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.shared.text.subscribe()
    }

    pub fn displayed(&self) -> String {
        self.shared.text.borrow().clone()
    }

    /// True while characters are still being revealed.
    pub fn is_revealing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Clears the display and reveals `target`, one character per `delay`.
    ///
    /// Characters are extended grapheme clusters, so emoji are never split.
    /// Must be called from within a Tokio runtime.
    pub fn reveal(&mut self, target: impl Into<String>, delay: Duration) {
        let target = target.into();
        let generation = self.restart();

        let ends: Vec<usize> = target
            .grapheme_indices(true)
            .map(|(start, grapheme)| start + grapheme.len())
            .collect();

        trace!(generation, characters = ends.len(), "Starting reveal");

        let shared = Arc::clone(&self.shared);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(delay.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            for end in ends {
                ticker.tick().await;

                let current = shared
                    .generation
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if *current != generation {
                    return;
                }
                shared.text.send_replace(target[..end].to_string());
            }
        }));
    }

    /// Stops the running reveal, leaving the text as far as it got.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        *self.generation() += 1;
    }

    /// Cancels any running reveal and clears the text. Returns the new generation.
    fn restart(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let mut generation = self.generation();
        *generation += 1;
        self.shared.text.send_replace(String::new());
        *generation
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.shared
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.cancel();
    }
}
