use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// A producer can run ahead of its consumer by a single chunk.
pub const CHANNEL_CAPACITY: usize = 1;

/// Item travelling from a synthesizer to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioChunk {
    /// One mixed bar of mono samples
    Samples(Vec<f32>),
    /// No more audio will follow
    EndOfStream,
}

impl AudioChunk {
    pub const fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    pub fn sample_count(&self) -> usize {
        match self {
            Self::Samples(samples) => samples.len(),
            Self::EndOfStream => 0,
        }
    }
}

/// Single slot handoff channel, used through blocking calls from plain threads
pub fn audio_channel() -> (Sender<AudioChunk>, Receiver<AudioChunk>) {
    tokio::sync::mpsc::channel(CHANNEL_CAPACITY)
}

/// Progress of a synthesis run, observable from other threads.
#[derive(Debug, Default)]
pub struct SynthesizerStatus {
    started: AtomicBool,
    finished: AtomicBool,
}

impl SynthesizerStatus {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub(crate) fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

/// Stops a running synthesis at the next note or chunk.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        log::info!("Interrupting synthesis");
        self.0.store(true, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sends the end of stream marker and marks the run finished when dropped,
/// whichever way the run exits.
pub(crate) struct StreamCloser {
    sender: Sender<AudioChunk>,
    status: Arc<SynthesizerStatus>,
}

impl StreamCloser {
    pub(crate) fn new(sender: Sender<AudioChunk>, status: Arc<SynthesizerStatus>) -> Self {
        Self { sender, status }
    }
}

impl Drop for StreamCloser {
    fn drop(&mut self) {
        log::debug!("Serving end of stream");
        if self.sender.blocking_send(AudioChunk::EndOfStream).is_err() {
            log::debug!("End of stream not delivered, receiver is gone");
        }
        self.status.mark_finished();
    }
}
