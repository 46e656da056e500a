//! HMAC-signed share records with a fixed lifetime.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use stillwater_common::ShareView;

use super::StoreError;
use crate::clock::{Clock, millis};
use crate::config::StoreConfig;
use crate::sanitize::{normalize, sanitize_html, strip_invisible};
use crate::signing::Signer;

/// Random bytes behind a share id
const SHARE_ID_BYTES: usize = 32;

/// Length of a base64url-encoded share id
const SHARE_ID_LEN: usize = 43;

/// Unguessable share identifier (32 random bytes, base64url)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareId(String);

impl ShareId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; SHARE_ID_BYTES];
        rand::rng().fill(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Shape check only; says nothing about whether the share exists
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let well_formed = raw.len() == SHARE_ID_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(StoreError::MalformedId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored question/answer pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub question: String,
    pub answer: String,
    /// Creation time (Unix epoch milliseconds)
    pub timestamp: i64,
    /// Hex HMAC-SHA256 over the canonical encoding
    pub tag: String,
}

impl From<ShareRecord> for ShareView {
    fn from(record: ShareRecord) -> Self {
        Self {
            question: record.question,
            answer: record.answer,
            timestamp: record.timestamp,
        }
    }
}

/// Field order is fixed, which makes the JSON encoding canonical
#[derive(Serialize)]
struct Canonical<'a> {
    question: &'a str,
    answer: &'a str,
    timestamp: i64,
}

fn canonical(question: &str, answer: &str, timestamp: i64) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&Canonical {
        question,
        answer,
        timestamp,
    })
    .map_err(|e| StoreError::Encoding(e.to_string()))
}

/// Signed share store
pub struct SecureStore {
    signer: Signer,
    clock: Arc<dyn Clock>,
    max_age: Duration,
    max_question_chars: usize,
    max_answer_chars: usize,
    records: Mutex<HashMap<ShareId, ShareRecord>>,
}

impl SecureStore {
    pub fn new(config: &StoreConfig, signer: Signer, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            clock,
            max_age: config.max_age(),
            max_question_chars: config.max_question_chars,
            max_answer_chars: config.max_answer_chars,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Validate, sanitise, sign and store a question/answer pair
    pub fn create(&self, question: &str, answer: &str) -> Result<ShareId, StoreError> {
        let question = clean_field("Question", question, self.max_question_chars)?;
        let answer = clean_field("Answer", answer, self.max_answer_chars)?;
        let timestamp = self.clock.now_ms();

        let tag = self.signer.sign(&canonical(&question, &answer, timestamp)?);
        let id = ShareId::generate();

        self.records.lock().insert(
            id.clone(),
            ShareRecord {
                question,
                answer,
                timestamp,
                tag,
            },
        );

        tracing::debug!(share = %id, "Share created");
        Ok(id)
    }

    /// Return a record that is both fresh and intact.
    ///
    /// A record failing either check is removed before the error is
    /// returned. When both fail the error is `Expired`.
    pub fn read(&self, id: &ShareId) -> Result<ShareRecord, StoreError> {
        let now = self.clock.now_ms();
        let mut records = self.records.lock();

        let Entry::Occupied(entry) = records.entry(id.clone()) else {
            return Err(StoreError::NotFound);
        };

        let record = entry.get();
        let expired = now - record.timestamp > millis(self.max_age);
        let intact = canonical(&record.question, &record.answer, record.timestamp)
            .map(|payload| self.signer.verify(&payload, &record.tag))
            .unwrap_or(false);

        if expired {
            entry.remove();
            return Err(StoreError::Expired);
        }
        if !intact {
            entry.remove();
            tracing::warn!(share = %id, "Share integrity check failed, record discarded");
            return Err(StoreError::Tampered);
        }

        Ok(entry.get().clone())
    }

    /// Delete records older than the max age
    pub fn sweep(&self) -> usize {
        let cutoff = self.clock.now_ms() - millis(self.max_age);
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| r.timestamp >= cutoff);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn with_record<F: FnOnce(&mut ShareRecord)>(&self, id: &ShareId, f: F) {
        if let Some(record) = self.records.lock().get_mut(id) {
            f(record);
        }
    }
}

/// Trim, bound, normalise, drop invisible characters and HTML-sanitise one field
fn clean_field(name: &str, raw: &str, max_chars: usize) -> Result<String, StoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{name} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(StoreError::Validation(format!(
            "{name} too long (maximum {max_chars} characters)"
        )));
    }

    let visible = strip_invisible(&normalize(trimmed));
    let visible = visible.trim();
    if visible.is_empty() {
        return Err(StoreError::Validation(format!(
            "{name} is empty after sanitization"
        )));
    }

    let sanitized = sanitize_html(visible);
    if sanitized.trim().is_empty() {
        return Err(StoreError::Validation(format!(
            "{name} is empty after sanitization"
        )));
    }
    Ok(sanitized)
}
