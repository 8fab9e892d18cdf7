use chrono::{DateTime, Utc};

/// Generates a fresh external transaction id: 32 hex characters of randomness. The id is assigned
/// before any provider call and anchors callback matching, so it must never be reused; the unique
/// constraint on the transactions table backs this up.
pub fn new_external_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// The payment reference a payer sees on their statement, e.g. `RENT-A1-20260801`.
pub fn payment_reference(unit_label: &str, now: DateTime<Utc>) -> String {
    format!("RENT-{}-{}", unit_label, now.format("%Y%m%d"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn external_ids_are_unique_and_fixed_width() {
        let a = new_external_id();
        let b = new_external_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reference_format() {
        let ts = DateTime::parse_from_rfc3339("2026-08-01T09:30:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(payment_reference("A1", ts), "RENT-A1-20260801");
    }
}
