//! Append-only transition log
//!
//! Every committed status change is recorded with a SHA-256 link to the
//! previous entry, so a tampered or truncated history fails verification.

use crate::error::LogError;
use crate::types::{SectionId, WorkflowStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub section: Option<SectionId>,
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
    pub revision_count: u32,
    pub detail: String,
    #[serde(with = "hex_bytes")]
    pub prev_hash: [u8; 32],
    #[serde(with = "hex_bytes")]
    pub hash: [u8; 32],
}

impl TransitionEvent {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        section: Option<SectionId>,
        from: WorkflowStatus,
        to: WorkflowStatus,
        revision_count: u32,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            section,
            from,
            to,
            revision_count,
            detail: detail.into(),
            prev_hash: [0u8; 32],
            hash: [0u8; 32],
        }
    }
}

#[derive(Debug, Default)]
pub struct TransitionLog {
    inner: Mutex<Vec<TransitionEvent>>,
}

impl TransitionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain and append an event, returning its id
    pub fn append(&self, mut event: TransitionEvent) -> Uuid {
        let mut guard = self.inner.lock();
        event.prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);
        event.hash = compute_hash(&event);
        let id = event.event_id;
        guard.push(event);
        id
    }

    #[must_use]
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn verify_integrity(&self) -> Result<(), LogError> {
        verify_chain(&self.inner.lock())
    }
}

/// Verify a detached copy of a log, e.g. one read back from disk
pub fn verify_chain(events: &[TransitionEvent]) -> Result<(), LogError> {
    let mut prev = [0u8; 32];
    for (index, e) in events.iter().enumerate() {
        if e.prev_hash != prev || e.hash != compute_hash(e) {
            return Err(LogError::IntegrityViolation { index });
        }
        prev = e.hash;
    }
    Ok(())
}

fn compute_hash(event: &TransitionEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.event_id.as_bytes());
    hasher.update(event.timestamp.timestamp_micros().to_le_bytes());
    hasher.update(event.session_id.as_bytes());
    hasher.update([0]);
    if let Some(section) = &event.section {
        hasher.update(section.as_str().as_bytes());
    }
    hasher.update([0]);
    hasher.update(event.from.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(event.to.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(event.revision_count.to_le_bytes());
    hasher.update(event.detail.as_bytes());
    hasher.update([0]);
    hasher.update(event.prev_hash);
    hasher.finalize().into()
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let raw = String::deserialize(d)?;
        let mut out = [0u8; 32];
        hex::decode_to_slice(raw, &mut out).map_err(serde::de::Error::custom)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(session: &str, to: WorkflowStatus) -> TransitionEvent {
        TransitionEvent::new(session, Some(SectionId::from("a")), WorkflowStatus::Pending, to, 0, "")
    }

    #[test]
    fn chain_links_consecutive_events() {
        let log = TransitionLog::new();
        log.append(event("s1", WorkflowStatus::Writing));
        log.append(event("s2", WorkflowStatus::Writing));

        let events = log.events();
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert!(log.verify_integrity().is_ok());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn tampering_is_detected() {
        let log = TransitionLog::new();
        log.append(event("s1", WorkflowStatus::Writing));
        log.append(event("s1", WorkflowStatus::Reviewing));

        let mut events = log.events();
        events[0].detail = "rewritten".to_string();

        assert_eq!(
            verify_chain(&events),
            Err(LogError::IntegrityViolation { index: 0 })
        );
    }

    #[test]
    fn survives_json_round_trip() {
        let log = TransitionLog::new();
        log.append(event("s1", WorkflowStatus::Writing));

        let json = serde_json::to_string(&log.events()).unwrap();
        let back: Vec<TransitionEvent> = serde_json::from_str(&json).unwrap();
        assert!(verify_chain(&back).is_ok());
    }
}
