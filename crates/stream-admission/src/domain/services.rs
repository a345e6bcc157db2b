//! Domain services for stream admission.

use crate::config::StorageType;

/// Estimates the bytes a message occupies once stored.
///
/// File storage adds a per-record envelope (length, sequence, timestamp,
/// subject length, checksum) and a 4-byte header length prefix when headers
/// are present. Memory storage adds a fixed 16 bytes.
pub fn stored_size(
    storage: StorageType,
    subject_len: usize,
    header_len: usize,
    payload_len: usize,
) -> u64 {
    let (subject_len, header_len, payload_len) =
        (subject_len as u64, header_len as u64, payload_len as u64);
    match storage {
        StorageType::File => {
            let header = if header_len > 0 { 4 + header_len } else { 0 };
            22 + subject_len + header + payload_len + 8
        }
        StorageType::Memory => subject_len + header_len + payload_len + 16,
    }
}
