// Host-platform collaborators the engine consults but does not own.

pub mod clock;
pub mod device;
pub mod hooks;
pub mod network;
