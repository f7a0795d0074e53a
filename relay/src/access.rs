use crate::error::{RelayError, RelayResult};

/// Shared-secret token check guarding every mutating or informational action.
/// An empty configured token disables the gate.
#[derive(Debug, Clone)]
pub struct AccessGate {
    token: String,
}

impl AccessGate {
    pub fn new(token: impl Into<String>) -> Self {
        AccessGate {
            token: token.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn check(&self, provided: Option<&str>) -> RelayResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        match provided {
            Some(provided) if constant_time_eq(provided, &self.token) => Ok(()),
            _ => Err(RelayError::AccessDenied),
        }
    }
}

// Length leaks, content does not.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
