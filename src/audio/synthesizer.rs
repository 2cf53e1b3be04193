use crate::audio::audio_params::AudioParams;
use crate::audio::channel::{
    audio_channel, AudioChunk, InterruptHandle, StreamCloser, SynthesizerStatus,
};
use crate::audio::synthesizer_buffer::SynthesizerBuffer;
use crate::parser::note_parser::{NoteEvent, Notes, Track};
use crate::parser::sheet_parser::SimpleSheet;
use crate::BeepError;
use std::f64::consts::TAU;
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// Sine wave at `frequency` fading out exponentially over `duration` seconds.
/// A frequency of 0 renders silence of the same length.
pub fn render_tone(frequency: f64, duration: f64, params: &AudioParams) -> Vec<f32> {
    let sample_count = params.sample_count(duration);
    if sample_count == 0 {
        return Vec::new();
    }
    let amplitude = f64::from(params.amplitude());
    let step = duration / sample_count as f64;
    (0..sample_count)
        .map(|i| {
            let t = i as f64 * step;
            let fade = (-t).exp();
            (amplitude * (TAU * frequency * t).sin() * fade) as f32
        })
        .collect()
}

/// Summary of a finished synthesis run
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisReport {
    /// Total note value per track, a quarter note being 0.25
    pub note_value_totals: Vec<f64>,
}

impl SynthesisReport {
    pub fn is_matching(&self) -> bool {
        self.note_value_totals
            .windows(2)
            .all(|pair| pair[0] == pair[1])
    }

    /// Warning lines for tracks of unequal length, empty when they all match.
    pub fn mismatch_warning(&self) -> Vec<String> {
        if self.is_matching() {
            return Vec::new();
        }
        let mut lines = Vec::with_capacity(self.note_value_totals.len() + 1);
        lines.push("Total note value of each track not matching!".to_string());
        for (track, value) in self.note_value_totals.iter().enumerate() {
            lines.push(format!("Track {track}: {value:?}"));
        }
        lines
    }
}

/// Synthesizes the tracks of one sheet bar by bar.
pub struct Synthesizer {
    sheet: Arc<SimpleSheet>,
    params: AudioParams,
    buffer: SynthesizerBuffer,
    sender: Sender<AudioChunk>,
    status: Arc<SynthesizerStatus>,
    interrupt: InterruptHandle,
    note_value_totals: Vec<f64>,
}

impl Synthesizer {
    /// Returns the synthesizer along with the receiving end of its output channel.
    pub fn new(sheet: Arc<SimpleSheet>, params: AudioParams) -> (Self, Receiver<AudioChunk>) {
        let track_count = sheet.tracks.len();
        let buffer = SynthesizerBuffer::new(track_count, sheet.bar_duration(), &params);
        let (sender, receiver) = audio_channel();
        let synthesizer = Self {
            sheet,
            params,
            buffer,
            sender,
            status: Arc::new(SynthesizerStatus::default()),
            interrupt: InterruptHandle::new(),
            note_value_totals: vec![0.0; track_count],
        };
        (synthesizer, receiver)
    }

    /// Share an interrupt handle with other components.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptHandle) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn status(&self) -> Arc<SynthesizerStatus> {
        Arc::clone(&self.status)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Synthesize the whole sheet, blocking on every bar until the consumer takes it.
    ///
    /// The end of stream marker is sent on every exit path.
    /// Must run on a plain thread: blocking sends panic inside a tokio runtime.
    pub fn synthesize(mut self) -> Result<SynthesisReport, BeepError> {
        let _closer = StreamCloser::new(self.sender.clone(), self.status());
        self.status.mark_started();
        log::debug!(
            "Synthesizing {} tracks at {} bpm ({}/{})",
            self.sheet.tracks.len(),
            self.sheet.bpm,
            self.sheet.numerator,
            self.sheet.denominator
        );
        self.synthesize_and_serve()?;
        self.serve_remaining_buffer()?;
        let report = SynthesisReport {
            note_value_totals: self.note_value_totals.clone(),
        };
        for line in report.mismatch_warning() {
            log::warn!("{line}");
        }
        Ok(report)
    }

    /// Fill the tracks one after the other until the bar is complete, then serve it.
    /// Stops as soon as the last track runs out of notes.
    fn synthesize_and_serve(&mut self) -> Result<(), BeepError> {
        let sheet = Arc::clone(&self.sheet);
        let mut track_notes: Vec<Notes<'_>> = sheet.tracks.iter().map(Track::iter).collect();
        if track_notes.is_empty() {
            return Ok(());
        }
        let last_track = track_notes.len().saturating_sub(1);
        let mut exhausted = vec![false; track_notes.len()];
        loop {
            for (idx, notes) in track_notes.iter_mut().enumerate() {
                if exhausted[idx] || self.buffer.is_track_full(idx) {
                    continue;
                }
                loop {
                    if self.interrupt.is_interrupted() {
                        return Err(BeepError::Interrupted);
                    }
                    let Some(note) = notes.next() else {
                        log::debug!("No more notes in track {idx}");
                        if idx == last_track {
                            return Ok(());
                        }
                        exhausted[idx] = true;
                        break;
                    };
                    let note = note?;
                    self.note_value_totals[idx] += note.value;
                    log::debug!("Synthesizing {} {} (track {idx})", note.pitch, note.value);
                    let samples = self.synthesize_note(&note);
                    if self.buffer.append(idx, &samples)? {
                        break;
                    }
                }
            }
            // tracks out of notes stay silent while the others keep playing
            for (idx, _) in exhausted.iter().enumerate().filter(|(_, done)| **done) {
                self.buffer.fill_silence(idx)?;
            }
            log::debug!("Serving buffer");
            let mixed = self.buffer.flush()?;
            self.serve(AudioChunk::Samples(mixed))?;
        }
    }

    fn synthesize_note(&self, note: &NoteEvent) -> Vec<f32> {
        let beats = note.value * f64::from(self.sheet.denominator);
        let duration = beats * self.sheet.beat_duration();
        render_tone(note.pitch.frequency(), duration, &self.params)
    }

    fn serve_remaining_buffer(&mut self) -> Result<(), BeepError> {
        if !self.buffer.is_empty() {
            log::debug!("Serving the remainder of buffer");
            let remainder = self.buffer.force_flush();
            self.serve(AudioChunk::Samples(remainder))?;
        }
        Ok(())
    }

    fn serve(&self, chunk: AudioChunk) -> Result<(), BeepError> {
        self.sender.blocking_send(chunk).map_err(|_| {
            BeepError::ChannelClosed("synthesizer output is no longer consumed".to_string())
        })
    }
}
