pub mod router_api;
pub mod simple;
