use crate::audio::audio_params::AudioParams;
use crate::audio::channel::{AudioChunk, InterruptHandle};
use crate::audio::synthesizer::Synthesizer;
use crate::audio::synthesizer_hub::SynthesizerHub;
use crate::parser::sheet_parser::Sheet;
use crate::BeepError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

/// Destination of the synthesized audio.
pub trait AudioSink {
    /// Write mono samples, may block until the device catches up.
    fn write(&mut self, samples: &[f32]) -> Result<(), BeepError>;

    /// Called once the end of stream has been received.
    fn finish(&mut self) -> Result<(), BeepError> {
        Ok(())
    }
}

/// Collects everything written, mostly useful without an audio device.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub samples: Vec<f32>,
    pub writes: usize,
    pub finished: bool,
}

impl AudioSink for MemorySink {
    fn write(&mut self, samples: &[f32]) -> Result<(), BeepError> {
        self.samples.extend_from_slice(samples);
        self.writes += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BeepError> {
        self.finished = true;
        Ok(())
    }
}

// poll interval while waiting for the device to consume queued samples
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default output device through `cpal`.
pub struct CpalSink {
    stream: cpal::Stream, // Stream is not Send & Sync
    queue: Arc<Mutex<VecDeque<f32>>>,
    low_watermark: usize,
}

impl CpalSink {
    pub fn new(params: AudioParams) -> Result<Self, BeepError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| BeepError::AudioError("No output device available".to_string()))?;
        let default_config = device
            .default_output_config()
            .map_err(|err| BeepError::AudioError(err.to_string()))?;
        let channels_count = default_config.channels() as usize;
        let stream_config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(params.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };
        log::debug!(
            "Opening output stream with {} channels at {} Hz",
            channels_count,
            params.sample_rate()
        );

        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let device_queue = Arc::clone(&queue);
        let err_fn = |err| log::error!("an error occurred on stream: {err}");
        let stream = device
            .build_output_stream(
                &stream_config,
                move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut queue = device_queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    // mono source duplicated on every device channel
                    for frame in output.chunks_mut(channels_count) {
                        let sample = queue.pop_front().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                err_fn,
                None, // blocking stream
            )
            .map_err(|err| BeepError::AudioError(err.to_string()))?;
        stream
            .play()
            .map_err(|err| BeepError::AudioError(err.to_string()))?;

        Ok(Self {
            stream,
            queue,
            // keep a tenth of a second queued
            low_watermark: params.sample_count(0.1),
        })
    }

    fn queued(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn wait_until_queued_below(&self, limit: usize) {
        while self.queued() > limit {
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, samples: &[f32]) -> Result<(), BeepError> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(samples.iter().copied());
        self.wait_until_queued_below(self.low_watermark);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BeepError> {
        self.wait_until_queued_below(0);
        // let the device play its last buffer
        thread::sleep(POLL_INTERVAL * 10);
        self.stream
            .pause()
            .map_err(|err| BeepError::AudioError(err.to_string()))
    }
}

/// Synthesizer behind a player
enum Producer {
    Single(Synthesizer),
    Hub(SynthesizerHub),
}

impl Producer {
    fn run(self) -> Result<(), BeepError> {
        match self {
            Self::Single(synthesizer) => synthesizer.synthesize().map(|_| ()),
            Self::Hub(hub) => hub.synthesize().map(|_| ()),
        }
    }
}

/// Plays a sheet: synthesis on a worker thread, output on the calling thread.
pub struct Player {
    producer: Producer,
    receiver: Receiver<AudioChunk>,
    params: AudioParams,
    interrupt: InterruptHandle,
}

impl Player {
    pub fn new(sheet: Sheet, params: AudioParams) -> Self {
        let (producer, receiver, interrupt) = match sheet {
            Sheet::Simple(sheet) => {
                let (synthesizer, receiver) = Synthesizer::new(sheet, params);
                let interrupt = synthesizer.interrupt_handle();
                (Producer::Single(synthesizer), receiver, interrupt)
            }
            Sheet::Composite(subsheets) => {
                let (hub, receiver) = SynthesizerHub::new(subsheets, params);
                let interrupt = hub.interrupt_handle();
                (Producer::Hub(hub), receiver, interrupt)
            }
        };
        Self {
            producer,
            receiver,
            params,
            interrupt,
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Play until the end of stream, returns the first error of either side.
    ///
    /// Blocks the calling thread, which must not be a tokio runtime worker.
    pub fn play<S: AudioSink>(self, sink: &mut S) -> Result<(), BeepError> {
        let Self {
            producer,
            mut receiver,
            params,
            ..
        } = self;
        let worker = thread::Builder::new()
            .name("synthesizer".to_string())
            .spawn(move || producer.run())?;

        let consumed = consume(&mut receiver, sink, &params);
        // unblocks the producer if the sink failed
        drop(receiver);
        let produced = worker
            .join()
            .map_err(|_| BeepError::WorkerPanicked("synthesizer".to_string()))?;
        consumed.and(produced)
    }
}

fn consume<S: AudioSink>(
    receiver: &mut Receiver<AudioChunk>,
    sink: &mut S,
    params: &AudioParams,
) -> Result<(), BeepError> {
    while let Some(chunk) = receiver.blocking_recv() {
        match chunk {
            AudioChunk::Samples(samples) => {
                log::debug!(
                    "Got {} samples ({:.3}s)",
                    samples.len(),
                    params.duration_secs(samples.len())
                );
                sink.write(&samples)?;
            }
            AudioChunk::EndOfStream => {
                log::debug!("End of stream");
                break;
            }
        }
    }
    sink.finish()
}
