use crate::audio::audio_params::AudioParams;
use crate::audio::channel::{audio_channel, AudioChunk, InterruptHandle, SynthesizerStatus};
use crate::audio::synthesizer::{SynthesisReport, Synthesizer};
use crate::parser::sheet_parser::SimpleSheet;
use crate::BeepError;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{Receiver, Sender};

/// Synthesizer of one subsheet, running on its own thread.
struct RunningSynthesizer {
    index: usize,
    receiver: Receiver<AudioChunk>,
    status: Arc<SynthesizerStatus>,
    worker: Option<JoinHandle<Result<SynthesisReport, BeepError>>>,
}

impl RunningSynthesizer {
    fn name(&self) -> String {
        format!("synthesizer-{}", self.index)
    }

    /// Spawned but its end of stream not yet delivered
    fn is_pending(&self) -> bool {
        self.worker.is_some() && !self.status.finished()
    }

    fn join(&mut self) -> Result<Option<SynthesisReport>, BeepError> {
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        let report = worker
            .join()
            .map_err(|_| BeepError::WorkerPanicked(self.name()))??;
        Ok(Some(report))
    }

    /// Discard chunks until the end of stream so the worker never blocks on a full channel.
    fn drain(&mut self) {
        log::debug!("Synthesizer {} has not finished. Draining it", self.index);
        while let Some(chunk) = self.receiver.blocking_recv() {
            if chunk.is_end_of_stream() {
                break;
            }
        }
    }
}

/// Plays several sheets one after the other through a single output channel.
pub struct SynthesizerHub {
    sheets: Vec<Arc<SimpleSheet>>,
    params: AudioParams,
    sender: Sender<AudioChunk>,
    interrupt: InterruptHandle,
}

impl SynthesizerHub {
    /// Returns the hub along with the receiving end of its output channel.
    pub fn new(
        sheets: Vec<Arc<SimpleSheet>>,
        params: AudioParams,
    ) -> (Self, Receiver<AudioChunk>) {
        let (sender, receiver) = audio_channel();
        let hub = Self {
            sheets,
            params,
            sender,
            interrupt: InterruptHandle::new(),
        };
        (hub, receiver)
    }

    /// Handle shared with every synthesizer started by the hub.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Synthesize every sheet in order, relaying their output.
    ///
    /// The hub always ends its own stream and drains the synthesizers left behind,
    /// including when relaying fails.
    /// Must run on a plain thread: blocking channel calls panic inside a tokio runtime.
    pub fn synthesize(self) -> Result<Vec<SynthesisReport>, BeepError> {
        let mut running = Vec::with_capacity(self.sheets.len());
        let result = self.start_synthesizers_and_relay(&mut running);
        if let Err(err) = &result {
            log::error!("Stopping synthesizer hub: {err}");
        }
        self.serve_end_of_stream();
        Self::drain_all_synthesizers(&mut running);
        result
    }

    fn start_synthesizers_and_relay(
        &self,
        running: &mut Vec<RunningSynthesizer>,
    ) -> Result<Vec<SynthesisReport>, BeepError> {
        let mut reports = Vec::with_capacity(self.sheets.len());
        for (index, sheet) in self.sheets.iter().enumerate() {
            let (synthesizer, receiver) = Synthesizer::new(Arc::clone(sheet), self.params);
            let synthesizer = synthesizer.with_interrupt(self.interrupt.clone());
            let status = synthesizer.status();
            log::info!("Starting subsheet {index}");
            let worker = thread::Builder::new()
                .name(format!("synthesizer-{index}"))
                .spawn(move || synthesizer.synthesize())?;
            running.push(RunningSynthesizer {
                index,
                receiver,
                status,
                worker: Some(worker),
            });
            let current = &mut running[index];
            self.relay(current)?;
            if let Some(report) = current.join()? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Forward chunks until the synthesizer ends its stream.
    fn relay(&self, synthesizer: &mut RunningSynthesizer) -> Result<(), BeepError> {
        loop {
            let chunk = synthesizer.receiver.blocking_recv().ok_or_else(|| {
                BeepError::ChannelClosed(format!(
                    "{} stopped without end of stream",
                    synthesizer.name()
                ))
            })?;
            if chunk.is_end_of_stream() {
                return Ok(());
            }
            if self.interrupt.is_interrupted() {
                return Err(BeepError::Interrupted);
            }
            self.sender.blocking_send(chunk).map_err(|_| {
                BeepError::ChannelClosed("hub output is no longer consumed".to_string())
            })?;
        }
    }

    fn serve_end_of_stream(&self) {
        log::debug!("Serving end of stream");
        if self.sender.blocking_send(AudioChunk::EndOfStream).is_err() {
            log::debug!("End of stream not delivered, receiver is gone");
        }
    }

    fn drain_all_synthesizers(running: &mut [RunningSynthesizer]) {
        for synthesizer in running.iter_mut() {
            if synthesizer.is_pending() {
                synthesizer.drain();
            }
            if let Err(err) = synthesizer.join() {
                log::debug!("{} stopped with: {err}", synthesizer.name());
            }
        }
    }
}
