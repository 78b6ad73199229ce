use uuid::Uuid;

/// Root for UIDs derived from a UUID (DICOM PS3.5 B.2)
pub const UUID_UID_ROOT: &str = "2.25";

/// New globally unique DICOM UID
pub fn generate_uid() -> String {
    format!("{}.{}", UUID_UID_ROOT, Uuid::new_v4().as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uid_shape() {
        let uid = generate_uid();
        assert!(uid.starts_with("2.25."));
        assert!(uid.len() <= 64);
        let suffix = &uid["2.25.".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        assert!(!suffix.starts_with('0'));
    }

    #[test]
    fn test_generated_uids_differ() {
        assert_ne!(generate_uid(), generate_uid());
    }
}
