#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Measurement requested for a kind that was never activated
    SensorInactive,
    /// Sensor did not pull the data line low after a command byte
    NoAcknowledge,
    /// No finished conversion of the requested kind to read out
    NotReady,
    /// GPIO access failed
    Pin,
    /// Transport refused the datagram
    Transport,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SensorInactive => write!(f, "sensor not activated"),
            Self::NoAcknowledge => write!(f, "sensor did not acknowledge"),
            Self::NotReady => write!(f, "no measurement ready"),
            Self::Pin => write!(f, "gpio error"),
            Self::Transport => write!(f, "transport error"),
        }
    }
}

impl core::error::Error for Error {}
