//! Filename sanitization utilities

/// Name used when nothing survives sanitization
const FALLBACK_NAME: &str = "Untitled";

/// Sanitize a title for use as a file or folder name
///
/// Keeps ASCII letters, digits and whitespace; everything else is dropped.
/// Surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("Don't Stop (Live)"), "Dont Stop Live");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(sanitize_filename("Don't Stop (Live)"), "Dont Stop Live");
        assert_eq!(sanitize_filename("AC/DC: Back in Black"), "ACDC Back in Black");
    }

    #[test]
    fn test_strips_non_ascii_letters() {
        assert_eq!(sanitize_filename("Café del Mar"), "Caf del Mar");
    }

    #[test]
    fn test_keeps_inner_whitespace() {
        assert_eq!(sanitize_filename("Track  01"), "Track  01");
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(sanitize_filename("Normal Album Name"), "Normal Album Name");
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(sanitize_filename("  Album Name  "), "Album Name");
    }

    #[test]
    fn test_nothing_left() {
        assert_eq!(sanitize_filename("!!!"), "Untitled");
        assert_eq!(sanitize_filename("ユーロビート"), "Untitled");
    }
}
