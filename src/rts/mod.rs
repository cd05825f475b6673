//! Runtime pieces that talk to the sound system

pub mod daemon;
pub mod hardware;
