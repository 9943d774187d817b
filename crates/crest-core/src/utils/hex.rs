/// Parses a JSON-RPC hex quantity such as `"0x1b4"` into a `u64`.
///
/// The `0x` prefix is optional. Returns `None` for empty input, non-hex digits, or
/// values that do not fit in 64 bits.
#[inline]
#[must_use]
pub fn parse_hex_quantity(value: &str) -> Option<u64> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
