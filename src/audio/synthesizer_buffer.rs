use crate::audio::audio_params::AudioParams;
use crate::BeepError;

/// Samples accumulated for a single track during the current bar.
#[derive(Debug)]
struct TrackBuffer {
    samples: Vec<f32>,          // always `capacity` long
    written: usize,             // exclusive end of the written samples
    overflow: Option<Vec<f32>>, // audio exceeding the bar, kept for the next one
}

impl TrackBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            written: 0,
            overflow: None,
        }
    }

    fn capacity(&self) -> usize {
        self.samples.len()
    }

    fn available(&self) -> usize {
        self.capacity() - self.written
    }

    fn is_full(&self) -> bool {
        self.overflow.is_some() || self.available() == 0
    }

    /// Copy as much as fits, keeping the rest as overflow
    fn push(&mut self, data: &[f32]) {
        let available = self.available();
        let start = self.written;
        if data.len() <= available {
            self.samples[start..start + data.len()].copy_from_slice(data);
            self.written += data.len();
        } else {
            self.samples[start..].copy_from_slice(&data[..available]);
            self.written = self.capacity();
            self.overflow = Some(data[available..].to_vec());
        }
    }

    /// Start a new bar with the overflow of the previous one
    fn reset(&mut self) {
        self.written = 0;
        if let Some(mut overflow) = self.overflow.take() {
            let capacity = self.capacity();
            if overflow.len() > capacity {
                let rest = overflow.split_off(capacity);
                self.overflow = Some(rest);
            }
            self.push(&overflow);
        }
    }
}

/// Accumulates the samples of every track until all of them cover a full bar.
#[derive(Debug)]
pub struct SynthesizerBuffer {
    capacity: usize,
    tracks: Vec<TrackBuffer>,
}

impl SynthesizerBuffer {
    /// Buffer holding `bar_duration` seconds per track
    pub fn new(track_count: usize, bar_duration: f64, params: &AudioParams) -> Self {
        Self::with_capacity(track_count, params.sample_count(bar_duration))
    }

    pub fn with_capacity(track_count: usize, capacity: usize) -> Self {
        // at least one sample per bar
        let capacity = capacity.max(1);
        let tracks = (0..track_count).map(|_| TrackBuffer::new(capacity)).collect();
        Self { capacity, tracks }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn track_mut(&mut self, track: usize) -> Result<&mut TrackBuffer, BeepError> {
        let track_count = self.tracks.len();
        self.tracks.get_mut(track).ok_or_else(|| {
            BeepError::InvalidBufferOperation(format!(
                "Track {track} out of bounds ({track_count} tracks)"
            ))
        })
    }

    /// Append samples to a track, returns whether the track is now full.
    pub fn append(&mut self, track: usize, data: &[f32]) -> Result<bool, BeepError> {
        let track_buffer = self.track_mut(track)?;
        if track_buffer.is_full() {
            return Err(BeepError::InvalidBufferOperation(format!(
                "Buffer of track {track} already full"
            )));
        }
        track_buffer.push(data);
        Ok(track_buffer.is_full())
    }

    /// Fill the rest of the bar of a track with silence.
    pub fn fill_silence(&mut self, track: usize) -> Result<(), BeepError> {
        let track_buffer = self.track_mut(track)?;
        if !track_buffer.is_full() {
            let written = track_buffer.written;
            track_buffer.samples[written..].fill(0.0);
            track_buffer.written = track_buffer.capacity();
        }
        Ok(())
    }

    /// Mix a complete bar, all tracks must be full.
    pub fn flush(&mut self) -> Result<Vec<f32>, BeepError> {
        if let Some(track) = self.tracks.iter().position(|t| !t.is_full()) {
            return Err(BeepError::InvalidBufferOperation(format!(
                "Not ready to be flushed, track {track} is not full"
            )));
        }
        let mixed = self.mix();
        self.reset();
        Ok(mixed)
    }

    /// Mix whatever has been written so far.
    ///
    /// Unwritten parts are treated as silence and trailing silence is trimmed
    /// unless every track is full.
    pub fn force_flush(&mut self) -> Vec<f32> {
        let mixed = if self.is_full() {
            self.mix()
        } else {
            for track in &mut self.tracks {
                let written = track.written;
                track.samples[written..].fill(0.0);
            }
            let mut mixed = self.mix();
            let len = mixed.iter().rposition(|s| *s != 0.0).map_or(0, |last| last + 1);
            mixed.truncate(len);
            mixed
        };
        self.reset();
        mixed
    }

    pub fn is_track_full(&self, track: usize) -> bool {
        self.tracks.get(track).is_some_and(TrackBuffer::is_full)
    }

    pub fn is_full(&self) -> bool {
        self.tracks.iter().all(TrackBuffer::is_full)
    }

    /// Nothing written to any track for the current bar
    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(|t| t.written == 0)
    }

    fn mix(&self) -> Vec<f32> {
        let mut mixed = vec![0.0; self.capacity];
        for track in &self.tracks {
            for (out, sample) in mixed.iter_mut().zip(&track.samples) {
                *out += *sample;
            }
        }
        mixed
    }

    fn reset(&mut self) {
        for track in &mut self.tracks {
            track.reset();
        }
    }
}
