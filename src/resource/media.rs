//! Photo blob parsing.
//!
//! The backend stores listing photos as one XML blob per row with a flat
//! sequence of `<URL>...</URL>` elements. Each URL becomes a `Media` entry
//! keyed by a hash prefix of the URL, ordered as found in the document.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

const OPEN: &str = "<URL>";
const CLOSE: &str = "</URL>";

/// First 16 hex characters of the URL's SHA-256.
fn media_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..16].to_string()
}

pub fn parse_media(xml: &str, resource_record_key: &str) -> Vec<Value> {
    let mut entries = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else { break };
        let url = &after[..end];

        entries.push(json!({
            "MediaKey": media_key(url),
            "ResourceRecordKey": resource_record_key,
            "MediaURL": url,
            "Order": entries.len() + 1,
        }));

        rest = &after[end + CLOSE.len()..];
    }

    entries
}
