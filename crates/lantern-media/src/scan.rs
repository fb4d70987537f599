//! Payload scanning: swap base64 data URIs out for reference tokens before
//! events ship, and swap tokens back for data URIs on retrieval.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::reference::{MediaReference, MediaSource, TOKEN_RE};
use crate::transport::MediaTransport;

/// Nesting bound for payload traversal; subtrees deeper than this pass
/// through untouched.
pub const DEFAULT_MAX_DEPTH: usize = 10;

static DATA_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data:([\w.+-]+/[\w.+-]+);base64,([A-Za-z0-9+/]+={0,2})").unwrap());

/// Content pulled out of a payload during a scan, ready for upload.
#[derive(Debug, Clone)]
pub struct ScannedMedia {
    pub reference: MediaReference,
    pub bytes: Vec<u8>,
}

/// Finds base64 data URIs in JSON payloads and replaces them with
/// reference tokens.
pub struct MediaScanner {
    max_depth: usize,
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl MediaScanner {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Returns a rewritten copy of `value` plus the media to upload, one
    /// entry per unique content id. The input is never mutated. Strings
    /// may contain data URIs either as the whole value or embedded in
    /// surrounding text; both forms are replaced in place.
    pub fn scan_and_replace(&self, value: &Value) -> (Value, Vec<ScannedMedia>) {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let replaced = self.walk(value, 0, &mut found, &mut seen);
        (replaced, found)
    }

    fn walk(
        &self,
        value: &Value,
        depth: usize,
        found: &mut Vec<ScannedMedia>,
        seen: &mut HashSet<String>,
    ) -> Value {
        if depth > self.max_depth {
            return value.clone();
        }
        match value {
            Value::String(s) => Value::String(self.replace_in_str(s, found, seen)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.walk(item, depth + 1, found, seen))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.walk(item, depth + 1, found, seen)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn replace_in_str(
        &self,
        s: &str,
        found: &mut Vec<ScannedMedia>,
        seen: &mut HashSet<String>,
    ) -> String {
        DATA_URI_RE
            .replace_all(s, |caps: &regex::Captures<'_>| {
                match STANDARD.decode(&caps[2]) {
                    Ok(bytes) => {
                        let reference = MediaReference::from_bytes(
                            &bytes,
                            &caps[1],
                            MediaSource::Base64DataUri,
                        );
                        let token = reference.token();
                        if seen.insert(reference.content_id.clone()) {
                            found.push(ScannedMedia { reference, bytes });
                        }
                        token
                    }
                    // Looks like a data URI but the payload is not valid
                    // base64; leave the original text alone.
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Replaces reference tokens in a payload with re-encoded data URIs,
/// fetching each unique content id once.
pub struct MediaResolver {
    transport: Arc<dyn MediaTransport>,
    max_depth: usize,
}

impl MediaResolver {
    pub fn new(transport: Arc<dyn MediaTransport>, max_depth: usize) -> Self {
        Self {
            transport,
            max_depth,
        }
    }

    /// Returns a copy of `value` with every resolvable token replaced by
    /// `data:<mime>;base64,<payload>`. Tokens whose content cannot be
    /// fetched stay in place; the traversal itself never fails.
    pub async fn resolve_references(&self, value: &Value) -> Value {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        collect_ids(value, 0, self.max_depth, &mut ids, &mut seen);
        if ids.is_empty() {
            return value.clone();
        }

        let results =
            futures::future::join_all(ids.iter().map(|id| self.transport.fetch_media(id))).await;

        let mut fetched: HashMap<String, Option<Vec<u8>>> = HashMap::new();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(payload) => {
                    fetched.insert(id, Some(payload.bytes));
                }
                Err(e) => {
                    tracing::warn!("failed to resolve media {}: {}", id, e);
                    fetched.insert(id, None);
                }
            }
        }

        substitute(value, 0, self.max_depth, &fetched)
    }
}

fn collect_ids(
    value: &Value,
    depth: usize,
    max_depth: usize,
    ids: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    if depth > max_depth {
        return;
    }
    match value {
        Value::String(s) => {
            for caps in TOKEN_RE.captures_iter(s) {
                let id = caps[2].to_string();
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ids(item, depth + 1, max_depth, ids, seen);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_ids(item, depth + 1, max_depth, ids, seen);
            }
        }
        _ => {}
    }
}

fn substitute(
    value: &Value,
    depth: usize,
    max_depth: usize,
    fetched: &HashMap<String, Option<Vec<u8>>>,
) -> Value {
    if depth > max_depth {
        return value.clone();
    }
    match value {
        Value::String(s) => {
            let replaced = TOKEN_RE.replace_all(s, |caps: &regex::Captures<'_>| {
                match fetched.get(&caps[2]) {
                    Some(Some(bytes)) => {
                        format!("data:{};base64,{}", &caps[1], STANDARD.encode(bytes))
                    }
                    _ => caps[0].to_string(),
                }
            });
            Value::String(replaced.into_owned())
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, depth + 1, max_depth, fetched))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), substitute(item, depth + 1, max_depth, fetched)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MediaPayload, UploadStatusPatch, UploadUrlRequest, UploadUrlResponse};
    use async_trait::async_trait;
    use lantern_core::{Error, Result};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PNG_URI: &str = "data:image/png;base64,AQID";
    const PNG_ID: &str = "A5BYxvLAy0ksUzsKTRTvd8";

    fn png_token() -> String {
        format!("@@@lanternMedia:type=image/png|id={PNG_ID}|source=base64_data_uri@@@")
    }

    #[test]
    fn test_scan_replaces_data_uri_and_collects_bytes() {
        let original = json!({"input": {"image": PNG_URI}});
        let (replaced, media) = MediaScanner::default().scan_and_replace(&original);

        assert_eq!(media.len(), 1);
        assert_eq!(media[0].bytes, vec![1, 2, 3]);
        assert_eq!(media[0].reference.content_id, PNG_ID);
        assert_eq!(replaced["input"]["image"], json!(png_token()));
        // Input untouched.
        assert_eq!(original["input"]["image"], json!(PNG_URI));
    }

    #[test]
    fn test_scan_dedups_identical_content() {
        let original = json!({"a": PNG_URI, "b": [PNG_URI]});
        let (replaced, media) = MediaScanner::default().scan_and_replace(&original);

        assert_eq!(media.len(), 1);
        assert_eq!(replaced["a"], replaced["b"][0]);
    }

    #[test]
    fn test_scan_replaces_embedded_uri() {
        let original = json!({"text": format!("before {PNG_URI} after")});
        let (replaced, media) = MediaScanner::default().scan_and_replace(&original);

        assert_eq!(media.len(), 1);
        assert_eq!(
            replaced["text"],
            json!(format!("before {} after", png_token()))
        );
    }

    #[test]
    fn test_scan_respects_depth_limit() {
        let mut nested = json!(PNG_URI);
        for _ in 0..12 {
            nested = json!({"nested": nested});
        }

        let (replaced, media) = MediaScanner::default().scan_and_replace(&nested);
        assert!(media.is_empty());
        assert_eq!(replaced, nested);
    }

    #[test]
    fn test_scan_leaves_invalid_base64_alone() {
        let original = json!({"text": "data:image/png;base64,A"});
        let (replaced, media) = MediaScanner::default().scan_and_replace(&original);

        assert!(media.is_empty());
        assert_eq!(replaced, original);
    }

    #[test]
    fn test_scan_passes_scalars_through() {
        let original = json!({"n": 42, "flag": true, "none": null});
        let (replaced, media) = MediaScanner::default().scan_and_replace(&original);

        assert!(media.is_empty());
        assert_eq!(replaced, original);
    }

    struct StoreTransport {
        store: Mutex<HashMap<String, (String, Vec<u8>)>>,
        fetches: AtomicUsize,
    }

    impl StoreTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                store: Mutex::new(HashMap::new()),
                fetches: AtomicUsize::new(0),
            })
        }

        fn put(&self, id: &str, content_type: &str, bytes: Vec<u8>) {
            self.store
                .lock()
                .unwrap()
                .insert(id.to_string(), (content_type.to_string(), bytes));
        }
    }

    #[async_trait]
    impl MediaTransport for StoreTransport {
        async fn request_upload(&self, _: &UploadUrlRequest) -> Result<UploadUrlResponse> {
            Err(Error::media("unexpected request_upload call"))
        }

        async fn put_bytes(&self, _: &str, _: &str, _: &str, _: &[u8]) -> Result<u16> {
            Err(Error::media("unexpected put_bytes call"))
        }

        async fn report_status(&self, _: &str, _: &UploadStatusPatch) -> Result<()> {
            Err(Error::media("unexpected report_status call"))
        }

        async fn fetch_media(&self, media_id: &str) -> Result<MediaPayload> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let store = self.store.lock().unwrap();
            let (content_type, bytes) = store
                .get(media_id)
                .cloned()
                .ok_or_else(|| Error::api(404, "media not found"))?;
            Ok(MediaPayload {
                content_type,
                bytes,
            })
        }
    }

    #[tokio::test]
    async fn test_resolve_restores_original_data_uri() {
        let original = json!({"input": {"image": PNG_URI}, "note": "plain"});
        let (replaced, media) = MediaScanner::default().scan_and_replace(&original);

        let transport = StoreTransport::new();
        for item in &media {
            transport.put(
                &item.reference.content_id,
                &item.reference.content_type,
                item.bytes.clone(),
            );
        }

        let resolver = MediaResolver::new(transport, DEFAULT_MAX_DEPTH);
        let resolved = resolver.resolve_references(&replaced).await;
        assert_eq!(resolved, original);
    }

    #[tokio::test]
    async fn test_resolve_fetches_each_id_once() {
        let doc = json!({"a": png_token(), "b": png_token()});
        let transport = StoreTransport::new();
        transport.put(PNG_ID, "image/png", vec![1, 2, 3]);

        let resolver = MediaResolver::new(transport.clone(), DEFAULT_MAX_DEPTH);
        let resolved = resolver.resolve_references(&doc).await;

        assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(resolved["a"], json!(PNG_URI));
        assert_eq!(resolved["b"], json!(PNG_URI));
    }

    #[tokio::test]
    async fn test_resolve_leaves_unfetchable_token_in_place() {
        let doc = json!({"image": png_token()});
        let resolver = MediaResolver::new(StoreTransport::new(), DEFAULT_MAX_DEPTH);

        let resolved = resolver.resolve_references(&doc).await;
        assert_eq!(resolved, doc);
    }
}
