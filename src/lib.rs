pub mod analysis;
pub mod api;
pub mod core;
pub mod dosing;
pub mod server;
