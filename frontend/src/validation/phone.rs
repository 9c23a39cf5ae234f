/// Digits of the input, with an 11-digit number starting with 8 read as a +7 number.
pub fn phone_digits(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 && digits.starts_with('8') {
        digits.replace_range(0..1, "7");
    }
    digits
}

fn longest_run(digits: &str) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut previous = None;
    for c in digits.chars() {
        if Some(c) == previous {
            current += 1;
        } else {
            current = 1;
            previous = Some(c);
        }
        best = best.max(current);
    }
    best
}

/// Numbers people type to get past a required field: `70000000000`, `79999999999`,
/// or anything with seven of the same digit in a row.
pub fn is_placeholder(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let subscriber = if digits.len() == 11 { &digits[1..] } else { digits };
    let mut chars = subscriber.chars();
    let all_same = match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    };
    all_same || longest_run(digits) >= 7
}

/// Strict mode wants a Russian mobile number (11 digits, leading 7);
/// lenient mode takes any 10 to 15 digits.
pub fn is_plausible_phone(raw: &str, strict: bool) -> bool {
    let digits = phone_digits(raw);
    if is_placeholder(&digits) {
        return false;
    }
    if strict {
        digits.len() == 11 && digits.starts_with('7')
    } else {
        (10..=15).contains(&digits.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_numbers_are_rejected() {
        assert!(!is_plausible_phone("70000000000", true));
        assert!(!is_plausible_phone("80000000000", true));
        assert!(!is_plausible_phone("+7 (000) 000-00-00", false));
        assert!(!is_plausible_phone("7 999 1111111", false));
    }

    #[test]
    fn real_numbers_pass_strict_mode() {
        assert!(is_plausible_phone("79991234567", true));
        assert!(is_plausible_phone("8 (999) 123-45-67", true));
        assert_eq!(phone_digits("8 (999) 123-45-67"), "79991234567");
    }

    #[test]
    fn lenient_mode_accepts_foreign_lengths() {
        assert!(is_plausible_phone("+44 20 7946 0958", false));
        assert!(!is_plausible_phone("+44 20 7946 0958", true));
        assert!(!is_plausible_phone("12345", false));
        assert!(!is_plausible_phone("1234567890123456", false));
    }
}
