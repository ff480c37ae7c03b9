use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when adopting a wire token that is not valid base64.
#[derive(Debug, Error)]
#[error("Invalid version token: {0}")]
pub struct VersionFormatError(#[from] base64::DecodeError);

/// Opaque optimistic-concurrency token carried by every aggregate root.
///
/// The store assigns the byte content when a row is written; callers treat it
/// as opaque. On the wire the token travels as a base64 string (the ETag in
/// an `If-Match`-style precondition), and a client-supplied token is adopted
/// back onto a loaded aggregate with [`EntityVersion::set_base64`] before an
/// update. The update succeeds only if the adopted token still matches the
/// store's current row version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityVersion(Vec<u8>);

impl EntityVersion {
    /// Creates a version from raw store bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Creates a version from its base64 wire form.
    pub fn from_base64(s: &str) -> Result<Self, VersionFormatError> {
        Ok(Self(general_purpose::STANDARD.decode(s)?))
    }

    /// Returns the canonical raw representation, as written to the store.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the base64 wire form used as the ETag.
    pub fn as_str(&self) -> String {
        general_purpose::STANDARD.encode(&self.0)
    }

    /// Replaces the token's value with raw bytes.
    pub fn set_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.0 = bytes.into();
    }

    /// Replaces the token's value from a base64 wire string.
    ///
    /// Fails without mutating the token if the input is not valid base64.
    pub fn set_base64(&mut self, s: &str) -> Result<(), VersionFormatError> {
        self.0 = general_purpose::STANDARD.decode(s)?;
        Ok(())
    }

    /// Returns true if no store version has been assigned yet.
    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EntityVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let bytes = vec![0u8, 1, 2, 250, 255];
        let version = EntityVersion::from_bytes(bytes.clone());
        assert_eq!(version.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn base64_roundtrip() {
        let mut version = EntityVersion::from_bytes(vec![9, 9, 9]);
        let wire = EntityVersion::from_bytes(vec![1, 2, 3, 4]).as_str();

        version.set_base64(&wire).unwrap();
        assert_eq!(version.as_str(), wire);
        assert_eq!(version.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn invalid_base64_fails_and_leaves_token_unchanged() {
        let mut version = EntityVersion::from_bytes(vec![7, 7]);
        let result = version.set_base64("not//valid==base64!!");

        assert!(result.is_err());
        assert_eq!(version.as_bytes(), &[7, 7]);
    }

    #[test]
    fn equality_is_structural() {
        let a = EntityVersion::from_bytes(vec![1, 2, 3]);
        let b = EntityVersion::from_base64(&a.as_str()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn default_is_unset() {
        let version = EntityVersion::default();
        assert!(version.is_unset());
        assert_eq!(version.as_str(), "");
    }

    #[test]
    fn serde_roundtrip() {
        let version = EntityVersion::from_bytes(vec![0, 0, 0, 0, 0, 0, 0, 42]);
        let json = serde_json::to_string(&version).unwrap();
        let restored: EntityVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(version, restored);
    }
}
