//! Phone number normalization to international (+254) form.

/// Kenyan country code.
pub const COUNTRY_CODE: &str = "254";

/// Normalize a phone number to `+<digits>`.
///
/// All non-digits are stripped first. Numbers already carrying `254` get a
/// `+`; a leading trunk `0` is replaced by `+254`; bare local mobile
/// numbers starting with `7` or `1` get `+254`; anything else is prefixed
/// with `+` verbatim.
pub fn normalize_phone(phone: &str) -> String {
    let cleaned: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if cleaned.starts_with(COUNTRY_CODE) {
        format!("+{cleaned}")
    } else if let Some(local) = cleaned.strip_prefix('0') {
        format!("+{COUNTRY_CODE}{local}")
    } else if cleaned.starts_with('7') || cleaned.starts_with('1') {
        format!("+{COUNTRY_CODE}{cleaned}")
    } else {
        format!("+{cleaned}")
    }
}
