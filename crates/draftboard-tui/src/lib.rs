// Library root: the board client's modules, exposed for integration tests.

pub mod app;
pub mod client;
pub mod protocol;
pub mod stats;
pub mod tui;
