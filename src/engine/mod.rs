// Resolution engine: entry gates and mode strategies feeding the published display decision.

pub mod access;
pub mod publisher;
pub mod resolver;
