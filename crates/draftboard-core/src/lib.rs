// Library root: draft model, turn order, pick clock, and the draft session
// shared by the service and the board client.

pub mod config;
pub mod export;
pub mod model;
pub mod protocol;
pub mod session;
pub mod timer;
pub mod turn;
