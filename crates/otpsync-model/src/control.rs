//! Protocol control model.

use serde::{Deserialize, Serialize};

/// A request control as handed over by the directory front end.
///
/// The pipeline only ever borrows controls; it never keeps them past the
/// operation that carried them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolControl {
    /// Control type OID.
    pub oid: String,
    /// Raw control value, if the client sent one.
    pub value: Option<Vec<u8>>,
    /// Criticality flag.
    pub critical: bool,
}

impl ProtocolControl {
    /// Creates a non-critical control with a value.
    #[must_use]
    pub fn new(oid: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            oid: oid.into(),
            value: Some(value),
            critical: false,
        }
    }

    /// Creates a non-critical control without a value.
    #[must_use]
    pub fn without_value(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            value: None,
            critical: false,
        }
    }

    /// Marks the control as critical.
    #[must_use]
    pub const fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Returns the value bytes, empty when no value was sent.
    #[must_use]
    pub fn value_bytes(&self) -> &[u8] {
        self.value.as_deref().unwrap_or_default()
    }

    /// Checks whether the control carries the given OID.
    #[must_use]
    pub fn is(&self, oid: &str) -> bool {
        self.oid == oid
    }
}

#[cfg(feature = "ldap3")]
impl From<ldap3::controls::RawControl> for ProtocolControl {
    fn from(raw: ldap3::controls::RawControl) -> Self {
        Self {
            oid: raw.ctype,
            value: raw.val,
            critical: raw.crit,
        }
    }
}
