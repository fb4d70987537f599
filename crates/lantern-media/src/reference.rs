//! Content-addressed media reference tokens.
//!
//! A token stands in for binary content inside event payloads:
//! `@@@lanternMedia:type=image/png|id=xxRr5...|source=base64_data_uri@@@`.
//! The id is derived from the content bytes, so identical bytes always
//! produce the same token and deduplicate on both sides of the wire.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use lantern_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Characters allowed in a content id after url-safe base64 truncation.
pub const CONTENT_ID_LEN: usize = 22;

pub(crate) const TOKEN_PATTERN: &str =
    r"@@@lanternMedia:type=([^|@]+)\|id=([^|@]+)\|source=([^|@]+)@@@";

/// Unanchored matcher for tokens embedded in string leaves.
pub(crate) static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TOKEN_PATTERN).unwrap());

/// Anchored matcher for parsing a standalone token.
static EXACT_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{TOKEN_PATTERN}$")).unwrap());

/// How the content entered the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    Base64DataUri,
    Bytes,
}

impl MediaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSource::Base64DataUri => "base64_data_uri",
            MediaSource::Bytes => "bytes",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "base64_data_uri" => Ok(MediaSource::Base64DataUri),
            "bytes" => Ok(MediaSource::Bytes),
            other => Err(Error::media(format!("unknown media source '{other}'"))),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed or freshly derived media reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub content_type: String,
    pub content_id: String,
    pub source: MediaSource,
}

impl MediaReference {
    /// Derives a reference from raw content bytes.
    ///
    /// The id is the SHA-256 of the bytes, url-safe base64 encoded and
    /// truncated to 22 characters.
    pub fn from_bytes(
        bytes: &[u8],
        content_type: impl Into<String>,
        source: MediaSource,
    ) -> Self {
        let digest = Sha256::digest(bytes);
        let mut content_id = URL_SAFE_NO_PAD.encode(digest);
        content_id.truncate(CONTENT_ID_LEN);
        Self {
            content_type: content_type.into(),
            content_id,
            source,
        }
    }

    /// Parses a standalone token string. Fails unless the entire input is
    /// one well-formed token.
    pub fn parse(token: &str) -> Result<Self> {
        let caps = EXACT_TOKEN_RE
            .captures(token)
            .ok_or_else(|| Error::media(format!("not a media reference token: {token}")))?;
        Ok(Self {
            content_type: caps[1].to_string(),
            content_id: caps[2].to_string(),
            source: MediaSource::parse(&caps[3])?,
        })
    }

    /// Renders the token form substituted into event payloads.
    pub fn token(&self) -> String {
        format!(
            "@@@lanternMedia:type={}|id={}|source={}@@@",
            self.content_type, self.content_id, self.source
        )
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// SHA-256 of the bytes in standard (padded) base64, the form the upload
/// endpoint and the `x-amz-checksum-sha256` header expect.
pub fn sha256_standard_base64(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_stable_and_url_safe() {
        let a = MediaReference::from_bytes(b"hello", "text/plain", MediaSource::Bytes);
        let b = MediaReference::from_bytes(b"hello", "text/plain", MediaSource::Bytes);

        assert_eq!(a.content_id, "LPJNul-wow4m6Dsqxbninh");
        assert_eq!(a.content_id, b.content_id);
        assert_eq!(a.content_id.len(), CONTENT_ID_LEN);
        assert!(a
            .content_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_different_bytes_yield_different_ids() {
        let a = MediaReference::from_bytes(b"hello", "text/plain", MediaSource::Bytes);
        let b = MediaReference::from_bytes(b"hello!", "text/plain", MediaSource::Bytes);
        assert_ne!(a.content_id, b.content_id);
    }

    #[test]
    fn test_sha256_standard_base64_known_vector() {
        assert_eq!(
            sha256_standard_base64(b"hello"),
            "LPJNul+wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ="
        );
    }

    #[test]
    fn test_token_parse_round_trip() {
        let reference =
            MediaReference::from_bytes(&[1, 2, 3], "image/png", MediaSource::Base64DataUri);
        let parsed = MediaReference::parse(&reference.token()).unwrap();
        assert_eq!(parsed, reference);
    }

    #[test]
    fn test_parse_rejects_garbage_and_embedded_tokens() {
        assert!(MediaReference::parse("not a token").is_err());
        assert!(MediaReference::parse(
            "@@@lanternMedia:type=image/png|id=abc|source=carrier_pigeon@@@"
        )
        .is_err());

        let reference = MediaReference::from_bytes(&[1], "image/png", MediaSource::Bytes);
        let embedded = format!("prefix {} suffix", reference.token());
        assert!(MediaReference::parse(&embedded).is_err());
    }
}
