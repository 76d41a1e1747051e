//! Supply rail classification.
//!
//! Rails are recognized from net names alone: `+3V3`, `+12V`, `P1V8_CORE`,
//! `GND`, and friends. The classifier is a pure function the netlist loader
//! runs on every signal as it is introduced; the `RAIL` driver directive can
//! still override the result afterwards.

/// Classify a signal name as a supply rail.
///
/// Returns the rail voltage, or `None` when the name does not look like a
/// rail. Rules, applied in order:
///
/// 1. Names starting with `+` are rails; the voltage is read from the rest
///    of the name.
/// 2. Names starting with `P` followed by a digit are rails when a `V`
///    eventually terminates the digit run (`P3V3_DMD` qualifies through its
///    `P3V` head); the voltage is read after the `P`.
/// 3. Names starting with `GND` are 0 V rails.
///
/// Voltage extraction consumes digits, with the first `V` acting as a
/// decimal point (`3V3` reads as 3.3) and any other character ending the
/// number. A name that qualifies as a rail but yields no parseable number
/// still classifies, at 0.0.
pub fn classify_rail(name: &str) -> Option<f64> {
    if let Some(rest) = name.strip_prefix('+') {
        return Some(extract_voltage(rest));
    }
    if let Some(rest) = name.strip_prefix('P') {
        if p_rail_shape(rest) {
            return Some(extract_voltage(rest));
        }
    }
    if name.starts_with("GND") {
        return Some(0.0);
    }
    None
}

/// `P`-form rails need a digit right after the `P` and a `V` somewhere
/// after at least one digit.
fn p_rail_shape(rest: &str) -> bool {
    let mut chars = rest.chars();
    if !chars.next().map_or(false, |c| c.is_ascii_digit()) {
        return false;
    }
    let mut seen_digit = true;
    for c in chars {
        if c.is_ascii_digit() {
            seen_digit = true;
        } else if c.eq_ignore_ascii_case(&'V') {
            return seen_digit;
        }
    }
    false
}

fn extract_voltage(rest: &str) -> f64 {
    let mut num = String::new();
    let mut seen_v = false;
    for c in rest.chars() {
        if c.is_ascii_digit() {
            num.push(c);
        } else if !seen_v && c.eq_ignore_ascii_case(&'V') {
            num.push('.');
            seen_v = true;
        } else {
            break;
        }
    }
    num.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_rails() {
        assert_eq!(classify_rail("+3V3"), Some(3.3));
        assert_eq!(classify_rail("+12V"), Some(12.0));
        assert_eq!(classify_rail("+5VSB"), Some(5.0));
        assert_eq!(classify_rail("+1V05"), Some(1.05));
    }

    #[test]
    fn test_p_rails() {
        assert_eq!(classify_rail("P3V3"), Some(3.3));
        assert_eq!(classify_rail("P3V3_DMD"), Some(3.3));
        assert_eq!(classify_rail("P12V_IN"), Some(12.0));
        assert_eq!(classify_rail("P1V05"), Some(1.05));
    }

    #[test]
    fn test_p_needs_trailing_v() {
        // A P-prefixed name with no V after the digits is a signal, not a
        // rail (PCLK, P3_RESET, ...).
        assert_eq!(classify_rail("PCLK"), None);
        assert_eq!(classify_rail("P3R3"), None);
    }

    #[test]
    fn test_ground_rails() {
        assert_eq!(classify_rail("GND"), Some(0.0));
        assert_eq!(classify_rail("GNDA"), Some(0.0));
        assert_eq!(classify_rail("GND_SHIELD"), Some(0.0));
    }

    #[test]
    fn test_non_rails() {
        assert_eq!(classify_rail("SPI_MISO"), None);
        assert_eq!(classify_rail("3V3"), None);
        assert_eq!(classify_rail(""), None);
    }

    #[test]
    fn test_unparseable_plus_rail_defaults_to_zero() {
        // Still a rail, just with no recoverable voltage.
        assert_eq!(classify_rail("+HV_SUPPLY"), Some(0.0));
    }
}
