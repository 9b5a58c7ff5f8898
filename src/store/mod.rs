// Persistent key-value contract: the only state that survives a restart.

pub mod file;
pub mod memory;
pub mod traits;
