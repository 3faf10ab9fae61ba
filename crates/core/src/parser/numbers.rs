#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Integer {
    Value(i128),
    /// Magnitude beyond `i128`.
    TooLarge,
}

/// Parses an integer literal: optional sign, digits with single underscores
/// between them, and (when `allow_prefix`) a `0x`/`0o`/`0b` radix prefix.
///
/// With a prefix enabled, decimal literals may not carry leading zeros unless
/// every digit is zero. The numeral itself is not range-limited; callers
/// check bounds and report the value as written.
pub(super) fn parse_integer(text: &str, allow_prefix: bool) -> Option<Integer> {
    let text = text.trim();
    let (negative, unsigned) = if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    };

    let (radix, digits) = if allow_prefix {
        split_radix(unsigned)
    } else {
        (10, unsigned)
    };

    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let cleaned: String = digits.chars().filter(|ch| *ch != '_').collect();
    if !cleaned.chars().all(|ch| ch.is_digit(radix)) {
        return None;
    }
    let leading_zero = cleaned.starts_with('0') && cleaned.bytes().any(|b| b != b'0');
    if allow_prefix && radix == 10 && leading_zero {
        return None;
    }

    Some(match i128::from_str_radix(&cleaned, radix) {
        Ok(magnitude) if negative => Integer::Value(-magnitude),
        Ok(magnitude) => Integer::Value(magnitude),
        Err(_) => Integer::TooLarge,
    })
}

fn split_radix(text: &str) -> (u32, &str) {
    let prefix = text.get(..2).map(|prefix| prefix.to_ascii_lowercase());
    let radix = match prefix.as_deref() {
        Some("0x") => 16,
        Some("0o") => 8,
        Some("0b") => 2,
        _ => return (10, text),
    };
    let digits = &text[2..];
    // A single underscore may directly follow the prefix.
    let digits = match digits.strip_prefix('_') {
        Some(rest) if !rest.starts_with('_') => rest,
        _ => digits,
    };
    (radix, digits)
}
