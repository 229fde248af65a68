use std::fmt;

/// Lifecycle of a sync endpoint. Transitions only move forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EndpointState {
    Open,
    /// Close message is being sent
    Closing,
    /// Terminal
    Closed,
}

impl EndpointState {
    pub fn is_open(&self) -> bool {
        matches!(self, EndpointState::Open)
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndpointState::Open => "open",
            EndpointState::Closing => "closing",
            EndpointState::Closed => "closed",
        };
        f.write_str(name)
    }
}
