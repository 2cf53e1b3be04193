pub mod audio_params;
pub mod channel;
pub mod player;
pub mod synthesizer;
pub mod synthesizer_buffer;
pub mod synthesizer_hub;
