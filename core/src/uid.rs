//! Generation of DICOM unique identifiers.
use rand::RngCore;

/// The UID root used for identifiers generated by this implementation,
/// under the Medical Connections org tree.
pub const UID_ROOT: &str = "1.2.826.0.1.3680043.10.1453";

/// Generate a DICOM-compatible unique identifier under the given root:
/// `<root>.<epoch milliseconds>.<32-bit random>`.
///
/// The result stays within the 64-character limit of the UI value
/// representation for any root up to 39 characters.
pub fn generate_uid(root: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}.{}.{}", root, millis, u32::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_uids_are_valid_ui_values() {
        let uid = generate_uid(UID_ROOT);
        assert!(uid.len() <= 64);
        assert!(uid
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.'));
        assert!(uid.starts_with(UID_ROOT));
    }

    #[test]
    fn generated_uids_differ() {
        let a = generate_uid(UID_ROOT);
        let b = generate_uid(UID_ROOT);
        assert_ne!(a, b);
    }
}
