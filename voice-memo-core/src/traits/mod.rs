pub mod audio_files;
pub mod capture_device;
pub mod clock;
pub mod location_provider;
pub mod permission_gate;
pub mod playback_device;
pub mod recording_store;
pub mod session_observer;
