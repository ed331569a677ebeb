pub mod manager;
pub mod playback;
pub mod recording;
pub mod timer;
