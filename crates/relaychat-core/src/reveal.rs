//! Typewriter reveal.
//!
//! A reply that has already been received in full is shown one word at a
//! time.  [`Typewriter`] is the pure state machine; [`spawn_reveal`] drives it
//! from a `tokio` interval and reports each visible state over a channel.
//!
//! ```text
//!            first tick             no words left
//!   Idle ───────────────> Revealing ──────────────> Done
//!                            │ ▲
//!                            │ └── next word
//!                            │
//!                            └── cancel ──> Cancelled
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default pace of the reveal.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(40);

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Lifecycle of one reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Revealing,
    Done,
    Cancelled,
}

/// Result of advancing the reveal by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// One more word became visible.
    Word,
    /// Every word is visible; the reveal is over.
    Done,
    /// The reveal had already stopped; nothing changed.
    Stopped,
}

/// Word-by-word reveal of a fixed string.
#[derive(Debug, Clone)]
pub struct Typewriter {
    words: Vec<String>,
    next: usize,
    visible: String,
    state: RevealState,
}

impl Typewriter {
    /// Prepare a reveal of `text`, split on single spaces.
    pub fn new(text: &str) -> Self {
        Self {
            words: text.split(' ').map(str::to_owned).collect(),
            next: 0,
            visible: String::with_capacity(text.len()),
            state: RevealState::Idle,
        }
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> Tick {
        match self.state {
            RevealState::Done | RevealState::Cancelled => return Tick::Stopped,
            RevealState::Idle => self.state = RevealState::Revealing,
            RevealState::Revealing => {}
        }

        match self.words.get(self.next) {
            Some(word) => {
                if self.next > 0 {
                    self.visible.push(' ');
                }
                self.visible.push_str(word);
                self.next += 1;
                Tick::Word
            }
            None => {
                self.state = RevealState::Done;
                Tick::Done
            }
        }
    }

    /// Stop the reveal, keeping what is already visible.
    ///
    /// Returns `false` when the reveal had already finished or stopped.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            RevealState::Done | RevealState::Cancelled => false,
            RevealState::Idle | RevealState::Revealing => {
                self.state = RevealState::Cancelled;
                true
            }
        }
    }

    /// Text revealed so far.
    pub fn visible(&self) -> &str {
        &self.visible
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    /// Number of words not yet shown.
    pub fn remaining(&self) -> usize {
        self.words.len() - self.next
    }
}

// ---------------------------------------------------------------------------
// Timer-driven reveal
// ---------------------------------------------------------------------------

/// What the reveal task reports to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    /// New visible text; the view should update and scroll to the bottom.
    Frame { reveal_id: u64, visible: String },
    /// All words shown; clear the in-progress flag.
    Done { reveal_id: u64 },
    /// Stopped early; `visible` is what stays on screen.
    Cancelled { reveal_id: u64, visible: String },
}

impl RevealEvent {
    pub fn reveal_id(&self) -> u64 {
        match self {
            Self::Frame { reveal_id, .. }
            | Self::Done { reveal_id }
            | Self::Cancelled { reveal_id, .. } => *reveal_id,
        }
    }
}

/// Handle to a running reveal.  Dropping it stops the reveal, so replacing
/// the handle held by a view never leaves two reveals writing to it.
#[derive(Debug)]
pub struct RevealHandle {
    id: u64,
    cancel: CancellationToken,
}

impl RevealHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the reveal; a final [`RevealEvent::Cancelled`] is emitted unless
    /// the reveal had already completed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Reveal `text` one word every `interval`, sending events to `tx`.
///
/// The first word appears one interval after the call.  Each tick does a
/// constant amount of work and yields back to the runtime.
pub fn spawn_reveal(
    reveal_id: u64,
    text: String,
    interval: Duration,
    tx: mpsc::UnboundedSender<RevealEvent>,
) -> RevealHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        let mut typewriter = Typewriter::new(&text);
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    if typewriter.cancel() {
                        let _ = tx.send(RevealEvent::Cancelled {
                            reveal_id,
                            visible: typewriter.visible().to_owned(),
                        });
                    }
                    break;
                }
                _ = ticker.tick() => match typewriter.tick() {
                    Tick::Word => {
                        let frame = RevealEvent::Frame {
                            reveal_id,
                            visible: typewriter.visible().to_owned(),
                        };
                        if tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Tick::Done | Tick::Stopped => {
                        let _ = tx.send(RevealEvent::Done { reveal_id });
                        break;
                    }
                },
            }
        }

        tracing::trace!(reveal_id, state = ?typewriter.state(), "reveal finished");
    });

    RevealHandle {
        id: reveal_id,
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_word_by_word() {
        let mut tw = Typewriter::new("alpha beta gamma");
        assert_eq!(tw.state(), RevealState::Idle);

        let mut frames = Vec::new();
        while tw.tick() == Tick::Word {
            frames.push(tw.visible().to_owned());
            assert_eq!(tw.state(), RevealState::Revealing);
        }

        assert_eq!(frames, ["alpha", "alpha beta", "alpha beta gamma"]);
        assert_eq!(tw.state(), RevealState::Done);
        assert_eq!(tw.tick(), Tick::Stopped);
    }

    #[test]
    fn cancel_keeps_partial_text() {
        let mut tw = Typewriter::new("one two three");
        tw.tick();
        tw.tick();
        assert!(tw.cancel());
        assert_eq!(tw.state(), RevealState::Cancelled);
        assert_eq!(tw.visible(), "one two");
        assert_eq!(tw.remaining(), 1);
        assert_eq!(tw.tick(), Tick::Stopped);
        assert!(!tw.cancel());
    }

    #[test]
    fn cancel_after_done_is_noop() {
        let mut tw = Typewriter::new("x");
        while tw.tick() != Tick::Done {}
        assert!(!tw.cancel());
        assert_eq!(tw.state(), RevealState::Done);
    }

    #[test]
    fn multiple_spaces_are_preserved() {
        let mut tw = Typewriter::new("a  b");
        while tw.tick() == Tick::Word {}
        assert_eq!(tw.visible(), "a  b");
    }

    #[tokio::test(start_paused = true)]
    async fn timed_reveal_emits_three_frames_then_done() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = tokio::time::Instant::now();
        let _handle = spawn_reveal(7, "alpha beta gamma".into(), DEFAULT_REVEAL_INTERVAL, tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, RevealEvent::Done { .. });
            events.push(event);
            if done {
                break;
            }
        }

        assert_eq!(
            events,
            vec![
                RevealEvent::Frame { reveal_id: 7, visible: "alpha".into() },
                RevealEvent::Frame { reveal_id: 7, visible: "alpha beta".into() },
                RevealEvent::Frame { reveal_id: 7, visible: "alpha beta gamma".into() },
                RevealEvent::Done { reveal_id: 7 },
            ]
        );
        assert!(started.elapsed() >= Duration::from_millis(160));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_mid_reveal_reports_partial_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_reveal(1, "one two three four".into(), Duration::from_millis(40), tx);

        let first = rx.recv().await.unwrap();
        assert_eq!(first, RevealEvent::Frame { reveal_id: 1, visible: "one".into() });

        handle.cancel();
        let last = rx.recv().await.unwrap();
        assert_eq!(last, RevealEvent::Cancelled { reveal_id: 1, visible: "one".into() });
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_reveal() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_reveal(2, "a b c d e f".into(), Duration::from_millis(40), tx);
        drop(handle);

        let mut frames = 0;
        while let Some(event) = rx.recv().await {
            match event {
                RevealEvent::Frame { .. } => frames += 1,
                RevealEvent::Cancelled { visible, .. } => assert!(visible.is_empty()),
                RevealEvent::Done { .. } => panic!("dropped reveal must not complete"),
            }
        }
        assert_eq!(frames, 0);
    }
}
