//! Sequential audio playback queue.
//!
//! A strict FIFO of audio references with ownership of the one and only
//! in-flight playback. The previous generation of this code mutated a single
//! shared audio handle from several call sites; here every start, settle,
//! and cancel goes through the queue.

use super::event::EngineEvent;
use super::model::AudioHandle;
use crate::error::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Plays one audio reference to completion.
///
/// Implementations resolve the handle's URL to an audible stream. `play`
/// returns when the clip ends; `stop` silences any in-flight clip
/// immediately, causing its `play` call to return early.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, audio: &AudioHandle) -> Result<()>;
    fn stop(&self);
}

/// FIFO of audio references with at most one entry playing at any instant.
///
/// Entries settle in enqueue order. A playback error is logged and settles
/// exactly like normal completion: audio is best-effort and a broken clip
/// must not stall the conversation.
pub struct PlaybackQueue {
    entries: VecDeque<AudioHandle>,
    playing: bool,
    sink: Arc<dyn AudioSink>,
    events: mpsc::UnboundedSender<EngineEvent>,
    cancel: CancellationToken,
}

impl PlaybackQueue {
    pub fn new(sink: Arc<dyn AudioSink>, events: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self {
            entries: VecDeque::new(),
            playing: false,
            sink,
            events,
            cancel: CancellationToken::new(),
        }
    }

    /// Appends an audio reference. Playback starts immediately only when
    /// nothing was queued or playing beforehand; otherwise the entry waits
    /// its turn.
    pub fn enqueue(&mut self, audio: AudioHandle, epoch: u64) {
        self.entries.push_back(audio);
        if !self.playing {
            self.start_head(epoch);
        }
    }

    /// Settles the currently playing head: dequeues it and starts the next
    /// entry, if any. Returns `true` when the queue drained completely.
    ///
    /// Called by the engine in response to `PlaybackSettled`; the event and
    /// this call are the only path by which entries leave the queue outside
    /// of [`clear`].
    ///
    /// [`clear`]: PlaybackQueue::clear
    pub fn settle_head(&mut self, epoch: u64) -> bool {
        self.playing = false;
        self.entries.pop_front();
        if self.entries.is_empty() {
            true
        } else {
            self.start_head(epoch);
            false
        }
    }

    /// Cancels any in-flight playback and empties the queue without
    /// emitting settle events.
    pub fn clear(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.sink.stop();
        self.entries.clear();
        self.playing = false;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn start_head(&mut self, epoch: u64) {
        let Some(head) = self.entries.front().cloned() else {
            return;
        };
        self.playing = true;

        let sink = Arc::clone(&self.sink);
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("playback cancelled before settling");
                }
                result = sink.play(&head) => {
                    if let Err(err) = result {
                        warn!(error = %err, url = %head.url, "audio playback failed, skipping clip");
                    }
                    let _ = events.send(EngineEvent::PlaybackSettled { epoch });
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BanterError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink that records play order and resolves when told to.
    struct RecordingSink {
        played: Mutex<Vec<String>>,
        concurrent: AtomicUsize,
        max_concurrent: AtomicUsize,
        release: tokio::sync::Notify,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                played: Mutex::new(Vec::new()),
                concurrent: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
                release: tokio::sync::Notify::new(),
                fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl AudioSink for RecordingSink {
        async fn play(&self, audio: &AudioHandle) -> crate::error::Result<()> {
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);
            self.played.lock().unwrap().push(audio.url.clone());

            self.release.notified().await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(BanterError::playback("decoder choked"))
            } else {
                Ok(())
            }
        }

        fn stop(&self) {}
    }

    fn handle(url: &str) -> AudioHandle {
        AudioHandle::new(url, None)
    }

    #[tokio::test]
    async fn test_entries_settle_in_fifo_order_one_at_a_time() {
        let sink = RecordingSink::new(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut queue = PlaybackQueue::new(sink.clone(), tx);

        queue.enqueue(handle("a"), 0);
        queue.enqueue(handle("b"), 0);
        queue.enqueue(handle("c"), 0);
        assert!(queue.is_playing());

        for expected_remaining in [2usize, 1, 0] {
            sink.release.notify_one();
            match rx.recv().await {
                Some(EngineEvent::PlaybackSettled { .. }) => {}
                other => panic!("expected PlaybackSettled, got {:?}", other),
            }
            queue.settle_head(0);
            assert_eq!(queue.len(), expected_remaining);
        }

        assert_eq!(
            *sink.played.lock().unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(sink.max_concurrent.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
        assert!(!queue.is_playing());
    }

    #[tokio::test]
    async fn test_playback_error_settles_like_completion() {
        let sink = RecordingSink::new(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut queue = PlaybackQueue::new(sink.clone(), tx);

        queue.enqueue(handle("broken"), 3);
        sink.release.notify_one();

        match rx.recv().await {
            Some(EngineEvent::PlaybackSettled { epoch }) => assert_eq!(epoch, 3),
            other => panic!("expected PlaybackSettled, got {:?}", other),
        }
        assert!(queue.settle_head(3));
    }

    #[tokio::test]
    async fn test_clear_suppresses_settle_events() {
        let sink = RecordingSink::new(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut queue = PlaybackQueue::new(sink.clone(), tx);

        queue.enqueue(handle("a"), 0);
        queue.enqueue(handle("b"), 0);
        queue.clear();

        assert!(queue.is_empty());
        assert!(!queue.is_playing());

        // Let the cancelled task run to its select arm.
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
