// Content source probing over HTTP, plus redirect tracking and the manifest format.

pub mod http_source;
pub mod manifest;
pub mod redirect;
pub mod traits;
