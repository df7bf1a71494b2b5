//! Masking of personal data in published text.
//!
//! Provider output occasionally contains contact details scraped from the
//! web. Emails and international phone numbers are replaced with fixed
//! placeholders before anything is written to the report. The placeholders
//! themselves match (email) or cannot match (phone) the patterns in a way
//! that leaves them unchanged, so masking is idempotent as long as masked
//! addresses are separated by a character outside the email pattern.
//! Addresses that run together (`a@b.cc.x@y.zz`) become adjacent
//! placeholders, and masking that output again merges them.

use regex::{NoExpand, Regex};
use std::sync::LazyLock;

/// Replacement for every email address.
pub const EMAIL_PLACEHOLDER: &str = "private@email.com";
/// Replacement for every phone number.
pub const PHONE_PLACEHOLDER: &str = "+1 XXX-XXX-XXXX";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email pattern")
});

// ASCII digits only; `\d` would also match other Unicode digit classes.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+[0-9]{1,3}[\s.-]?\(?[0-9]{3}\)?[\s.-]?[0-9]{3}[\s.-]?[0-9]{4}")
        .expect("valid phone pattern")
});

/// Replace emails and phone numbers in `text` with placeholders.
pub fn mask_private_data(text: &str) -> String {
    let masked = EMAIL.replace_all(text, NoExpand(EMAIL_PLACEHOLDER));
    PHONE
        .replace_all(&masked, NoExpand(PHONE_PLACEHOLDER))
        .into_owned()
}

/// Returns true if `text` still contains an email or phone number.
pub fn contains_private_data(text: &str) -> bool {
    EMAIL.is_match(text) || PHONE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_email_and_phone() {
        let text = "contact me at a@b.com or +1 415-555-1234";
        assert_eq!(
            mask_private_data(text),
            "contact me at private@email.com or +1 XXX-XXX-XXXX"
        );
    }

    #[test]
    fn test_phone_variants() {
        assert_eq!(mask_private_data("+44 (020) 555 1234"), PHONE_PLACEHOLDER);
        assert_eq!(mask_private_data("+33.612.345.6789"), PHONE_PLACEHOLDER);
        assert_eq!(mask_private_data("+14155551234"), PHONE_PLACEHOLDER);
    }

    #[test]
    fn test_masking_is_idempotent() {
        let text = "Reach jane.doe+sales@corp.example.org, +49 151-234-5678 or ops@x.io";
        let once = mask_private_data(text);
        assert_eq!(mask_private_data(&once), once);
        assert!(!contains_private_data(&once.replace(EMAIL_PLACEHOLDER, "")));
    }

    #[test]
    fn test_adjacent_addresses_are_not_idempotent() {
        let once = mask_private_data("a@b.cc.x@y.zz");
        assert_eq!(once, "private@email.comprivate@email.com");
        assert_eq!(mask_private_data(&once), "private@email.com@email.com");
    }

    #[test]
    fn test_text_without_matches_is_untouched() {
        let texts = [
            "",
            "BTC price is $67,000 as of 2024-05-01",
            "call 415-555-1234 (no country code)",
            "user@localhost has no tld",
            "+1 415-555-12",
            "résumé: ünïcödé @ text",
        ];
        for text in texts {
            assert_eq!(mask_private_data(text), text);
            assert!(!contains_private_data(text));
        }
    }

    #[test]
    fn test_partial_match_preserves_surroundings() {
        let text = "[{\"email\":\"ceo@startup.co\",\"phone\":\"+1 (415) 555-0000\"}]";
        assert_eq!(
            mask_private_data(text),
            "[{\"email\":\"private@email.com\",\"phone\":\"+1 XXX-XXX-XXXX\"}]"
        );
    }
}
