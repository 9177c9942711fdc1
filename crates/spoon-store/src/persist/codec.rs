//! CBOR snapshot codec.
//!
//! CBOR maps keep field names on the wire, so the format is self-describing
//! and tolerant of fields added by later versions.

use crate::{SNAPSHOT_VERSION, Snapshot};

use super::SnapshotError;

/// Encode a snapshot to CBOR bytes.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotError> {
    let mut bytes = Vec::with_capacity(4096);
    ciborium::into_writer(snapshot, &mut bytes).map_err(|e| SnapshotError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Decode a snapshot from CBOR bytes.
///
/// Empty input is a decode error: a zero-length file must never be read back
/// as a valid empty state.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
    if bytes.is_empty() {
        return Err(SnapshotError::Decode("empty snapshot".to_string()));
    }

    let snapshot: Snapshot =
        ciborium::from_reader(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))?;

    if snapshot.version > SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            supported: SNAPSHOT_VERSION,
        });
    }

    Ok(snapshot)
}
