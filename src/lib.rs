//! text2beep - plaintext sheet music to beeps
//!
//! This library provides:
//! - Parsing of the plaintext note notation and of JSON sheets
//! - Bar by bar synthesis of multi-track sheets into mono samples
//! - Sequential playback of composite sheets through a single stream
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use text2beep::{AudioParams, CpalSink, Player, Sheet};
//!
//! let sheet = Sheet::from_path(Path::new("song.json")).unwrap();
//! let params = AudioParams::default();
//! let mut sink = CpalSink::new(params).unwrap();
//! Player::new(sheet, params).play(&mut sink).unwrap();
//! ```

pub mod audio;
pub mod error;
pub mod parser;

// Re-export main types for convenience
pub use audio::{
    audio_params::{AudioParams, CHANNELS, DEFAULT_AMPLITUDE, SAMPLE_RATE},
    channel::{AudioChunk, InterruptHandle, SynthesizerStatus, CHANNEL_CAPACITY},
    player::{AudioSink, CpalSink, MemorySink, Player},
    synthesizer::{render_tone, SynthesisReport, Synthesizer},
    synthesizer_buffer::SynthesizerBuffer,
    synthesizer_hub::SynthesizerHub,
};
pub use error::BeepError;
pub use parser::{
    note_parser::{NoteEvent, Notes, Track},
    pitch::Pitch,
    sheet_parser::{parse_time_signature, Sheet, SimpleSheet},
};
