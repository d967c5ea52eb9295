use crate::error::{ClientError, Result};

const MAX_NAME_LEN: usize = 128;

/// Normalized key for a station display name.
///
/// Lower-cases the name and replaces `.` with `#`. Names can never contain
/// `#` (see [`validate_name`]), so distinct display names never collide
/// after folding dots.
pub fn internal_station_name(name: &str) -> String {
    name.to_lowercase().replace('.', "#")
}

/// Check a station or producer name.
///
/// Accepts ASCII letters, digits, `-`, `_` and `.`, starting and ending with
/// a letter or digit, at most 128 bytes.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    let invalid = |reason| ClientError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("longer than 128 bytes"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(invalid("only letters, digits, '-', '_' and '.' are allowed"));
    }

    let first = name.as_bytes()[0];
    let last = name.as_bytes()[name.len() - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid("must start and end with a letter or digit"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_name_folds_case_and_dots() {
        assert_eq!(internal_station_name("Orders"), "orders");
        assert_eq!(internal_station_name("eu.Orders.v2"), "eu#orders#v2");
        assert_eq!(
            internal_station_name("eu.orders"),
            internal_station_name("EU.ORDERS")
        );
        assert_ne!(
            internal_station_name("eu.orders"),
            internal_station_name("eu_orders")
        );
    }

    #[test]
    fn accepts_valid_names() {
        for name in ["orders", "Orders-2", "eu.orders_v1", "a"] {
            assert!(validate_name("station", name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        let too_long = "x".repeat(129);
        for name in [
            "",
            "-orders",
            "orders.",
            "or ders",
            "or#ders",
            too_long.as_str(),
        ] {
            assert!(
                matches!(
                    validate_name("station", name),
                    Err(ClientError::InvalidName { kind: "station", .. })
                ),
                "{name}"
            );
        }
    }
}
