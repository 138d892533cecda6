// Text composition for certificate lines

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use crate::traits::CertificateText;

/// Capitalize the first letter of every word and lowercase the rest
///
/// Words are runs of ASCII word characters (`[A-Za-z0-9_]`); everything else
/// is a separator and is copied through untouched.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_word = false;

    for c in input.chars() {
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && !in_word {
            out.push(c.to_ascii_uppercase());
        } else if is_word {
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
        in_word = is_word;
    }

    out
}

/// `June 1, 2024`
pub fn long_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%B %-d, %Y").to_string()
}

/// `1st of June 2024`
pub fn ordinal_long_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset);
    format!(
        "{}{} of {}",
        local.day(),
        ordinal_suffix(local.day()),
        local.format("%B %Y")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// The four dynamic lines, top to bottom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateLines {
    pub name: String,
    pub title: String,
    pub held_on: String,
    pub given: String,
}

impl CertificateLines {
    pub fn compose(text: &CertificateText, offset: FixedOffset) -> Self {
        Self {
            name: text.recipient_name.clone(),
            title: format!("\"{}\"", title_case(&text.event_title)),
            held_on: format!("Held on {}", long_date(text.event_start, offset)),
            given: format!(
                "Given this {},",
                ordinal_long_date(text.distributed_at, offset)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("tech talk"), "Tech Talk");
        assert_eq!(title_case("AN EXPO"), "An Expo");
        assert_eq!(title_case("rock-n-roll night"), "Rock-N-Roll Night");
        assert_eq!(title_case("  spaced   out "), "  Spaced   Out ");
        assert_eq!(title_case("web3_summit 2024"), "Web3_summit 2024");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_long_date() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(long_date(at, utc()), "June 1, 2024");
    }

    #[test]
    fn test_long_date_respects_offset() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
        let manila = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(long_date(at, manila), "June 2, 2024");
    }

    #[test]
    fn test_ordinal_long_date() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (23, "23rd"),
            (31, "31st"),
        ];
        for (day, expected) in cases {
            let at = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
            assert_eq!(
                ordinal_long_date(at, utc()),
                format!("{expected} of March 2024")
            );
        }
    }

    #[test]
    fn test_compose_lines() {
        let text = CertificateText {
            recipient_name: "Jane Doe".into(),
            event_title: "tech TALK".into(),
            event_start: Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            distributed_at: Utc.with_ymd_and_hms(2024, 6, 5, 9, 0, 0).unwrap(),
        };
        let lines = CertificateLines::compose(&text, utc());
        assert_eq!(lines.name, "Jane Doe");
        assert_eq!(lines.title, "\"Tech Talk\"");
        assert_eq!(lines.held_on, "Held on June 1, 2024");
        assert_eq!(lines.given, "Given this 5th of June 2024,");
    }
}
