/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Normalise a phone number for comparisons and provider calls: strip spaces and dashes.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn phone_normalisation() {
        assert_eq!(normalize_phone("+256 772 123 456"), "+256772123456");
        assert_eq!(normalize_phone("0772-123-456"), "0772123456");
        assert_eq!(normalize_phone("0772123456"), "0772123456");
    }
}
