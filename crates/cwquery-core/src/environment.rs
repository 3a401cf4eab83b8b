//! Upstream environment selection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which upstream endpoint set a request targets.
///
/// Every query, download, and patient registration call names one of these;
/// the server resolves it to the base URLs and allowed hostname configured
/// for that environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Pre-production integration environment.
    Integration,
    /// Production environment.
    Production,
}

impl Environment {
    /// Returns the environment tag as stored in history records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integration => "integration",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_serde_roundtrip() {
        let json = serde_json::to_string(&Environment::Integration).unwrap();
        assert_eq!(json, "\"integration\"");

        let env: Environment = serde_json::from_str("\"production\"").unwrap();
        assert_eq!(env, Environment::Production);
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let result: Result<Environment, _> = serde_json::from_str("\"staging\"");
        assert!(result.is_err());
    }
}
