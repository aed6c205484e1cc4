use std::fmt;
use std::str::FromStr;

/// Line written to the serial device when the game reports a planted bomb.
pub const BOMB_PLANTED_LINE: &str = "bombe_plantee\n";

/// Text the LED device sends back for every frame it receives.
pub const DEVICE_ACK: &str = "OK";

/// Text commands understood by the LED device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
    Toggle,
}

// Order matters: the smoke test switches the LED on, then off.
pub const SMOKE_SEQUENCE: [LedCommand; 2] = [LedCommand::On, LedCommand::Off];

impl LedCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            LedCommand::On => "LED_ON",
            LedCommand::Off => "LED_OFF",
            LedCommand::Toggle => "LED_TOGGLE",
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown LED command: {0:?}")]
pub struct ParseLedCommandError(pub String);

impl FromStr for LedCommand {
    type Err = ParseLedCommandError;

    // The device compares frames byte for byte, so no trimming or case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LED_ON" => Ok(LedCommand::On),
            "LED_OFF" => Ok(LedCommand::Off),
            "LED_TOGGLE" => Ok(LedCommand::Toggle),
            other => Err(ParseLedCommandError(other.to_string())),
        }
    }
}
