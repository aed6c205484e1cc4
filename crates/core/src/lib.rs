pub mod commands;
pub mod gsi;

pub use commands::{LedCommand, ParseLedCommandError, BOMB_PLANTED_LINE, DEVICE_ACK, SMOKE_SEQUENCE};
pub use gsi::{bomb_planted, is_truthy, PayloadShapeError};
