use std::fmt;
use std::str::FromStr;

use crate::DeviceError;
use crate::Direction;
use crate::Error;
use crate::SignalId;

/// RS-232 control and data lines, numbered as the serial transport expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SerialSignal {
    Txd,
    Rxd,
    Rts,
    Dtr,
    Cts,
    Dsr,
    Dcd,
}

impl SerialSignal {
    pub const ALL: [SerialSignal; 7] = [
        SerialSignal::Txd,
        SerialSignal::Rxd,
        SerialSignal::Rts,
        SerialSignal::Dtr,
        SerialSignal::Cts,
        SerialSignal::Dsr,
        SerialSignal::Dcd,
    ];

    pub fn id(self) -> SignalId {
        match self {
            SerialSignal::Txd => 0,
            SerialSignal::Rxd => 1,
            SerialSignal::Rts => 2,
            SerialSignal::Dtr => 3,
            SerialSignal::Cts => 4,
            SerialSignal::Dsr => 5,
            SerialSignal::Dcd => 6,
        }
    }

    pub fn from_id(id: SignalId) -> Option<Self> {
        Self::ALL.into_iter().find(|signal| signal.id() == id)
    }

    /// Lines driven by the remote end
    pub fn is_input(self) -> bool {
        matches!(
            self,
            SerialSignal::Rxd | SerialSignal::Cts | SerialSignal::Dsr | SerialSignal::Dcd
        )
    }

    /// Lines driven by this end
    pub fn is_output(self) -> bool {
        !self.is_input()
    }

    pub fn direction(self) -> Direction {
        if self.is_input() {
            Direction::Input
        } else {
            Direction::Output
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SerialSignal::Txd => "TXD",
            SerialSignal::Rxd => "RXD",
            SerialSignal::Rts => "RTS",
            SerialSignal::Dtr => "DTR",
            SerialSignal::Cts => "CTS",
            SerialSignal::Dsr => "DSR",
            SerialSignal::Dcd => "DCD",
        }
    }
}

impl fmt::Display for SerialSignal {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SerialSignal {
    type Err = Error;

    /// Case-insensitive line name, e.g. `"cts"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|signal| signal.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DeviceError::UnknownSignal(s.to_string()).into())
    }
}
