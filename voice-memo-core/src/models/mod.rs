pub mod audio_models;
pub mod config;
pub mod error;
pub mod folder;
pub mod recording_record;
pub mod state;
