/// Number of samples per second
pub const SAMPLE_RATE: u32 = 44100;
/// Output is mono
pub const CHANNELS: u16 = 1;
pub const DEFAULT_AMPLITUDE: f32 = 0.07;

/// Audio settings shared by the synthesizers and the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioParams {
    sample_rate: u32,
    channels: u16,
    amplitude: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

impl AudioParams {
    #[must_use]
    pub const fn with_amplitude(self, amplitude: f32) -> Self {
        Self { amplitude, ..self }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    pub const fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Number of whole samples covering `seconds`
    pub fn sample_count(&self, seconds: f64) -> usize {
        (seconds * f64::from(self.sample_rate)) as usize
    }

    pub fn duration_secs(&self, sample_count: usize) -> f64 {
        sample_count as f64 / f64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = AudioParams::default();
        assert_eq!(params.sample_rate(), 44100);
        assert_eq!(params.channels(), 1);
        assert_eq!(params.amplitude(), 0.07);
        assert_eq!(params.with_amplitude(0.5).amplitude(), 0.5);
    }

    #[test]
    fn test_sample_count() {
        let params = AudioParams::default();
        assert_eq!(params.sample_count(2.0), 88200);
        assert_eq!(params.sample_count(0.25), 11025);
        assert_eq!(params.duration_secs(22050), 0.5);
    }
}
