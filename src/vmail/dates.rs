use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%a %b %e %H:%M:%S %z %Y",
    "%a %b %e %I:%M:%S %p %z %Y",
];

const NAIVE_FORMATS: &[&str] = &[
    "%a %b %e %I:%M:%S %p %Y",
    "%a %b %e %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Offsets for the zone abbreviations Asterisk writes into `origdate`.
fn abbreviation_offset(abbr: &str) -> Option<FixedOffset> {
    let hours = match abbr {
        "UTC" | "GMT" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

fn looks_like_zone_token(token: &str) -> bool {
    token.len() >= 3 && token.len() <= 5 && token.bytes().all(|b| b.is_ascii_uppercase())
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Parses an `origdate` value, interpreting offset-less values in `zone`.
///
/// Accepts epoch seconds, RFC 3339, RFC 2822, Asterisk's
/// `Tue Jun  9 09:48:02 PM UTC 2009` layout, and a handful of plain
/// date-time layouts. Returns `None` when nothing matches.
pub fn parse_origdate(raw: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        return None;
    }

    if text.bytes().all(|b| b.is_ascii_digit()) {
        let secs = text.parse::<i64>().ok()?;
        return DateTime::from_timestamp(secs, 0);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(&text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(&text, fmt) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    let mut offset = None;
    let mut kept = Vec::new();
    for token in text.split(' ') {
        if offset.is_none() && looks_like_zone_token(token) {
            offset = Some(abbreviation_offset(token));
            continue;
        }
        kept.push(token);
    }
    let naive = parse_naive(&kept.join(" "))?;

    match offset {
        Some(Some(fixed)) => fixed
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => zone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("valid date")
    }

    #[test]
    fn parses_asterisk_layout_with_known_abbreviation() {
        let got = parse_origdate("Tue Jun  9 09:48:02 PM EDT 2009", Tz::UTC);
        assert_eq!(got, Some(utc(2009, 6, 10, 1, 48, 2)));
    }

    #[test]
    fn parses_asterisk_24_hour_layout_in_configured_zone() {
        let got = parse_origdate("Mon Jan  5 10:00:00 2015", Tz::America__New_York);
        assert_eq!(got, Some(utc(2015, 1, 5, 15, 0, 0)));
    }

    #[test]
    fn gmt_abbreviation_ignores_configured_zone() {
        let got = parse_origdate("Mon Jan  5 10:00:00 AM GMT 2015", Tz::America__New_York);
        assert_eq!(got, Some(utc(2015, 1, 5, 10, 0, 0)));
    }

    #[test]
    fn unknown_abbreviation_falls_back_to_configured_zone() {
        let got = parse_origdate("Mon Jan  5 10:00:00 AM XYZ 2015", Tz::UTC);
        assert_eq!(got, Some(utc(2015, 1, 5, 10, 0, 0)));
    }

    #[test]
    fn parses_offset_and_iso_layouts() {
        assert_eq!(
            parse_origdate("2026-09-16 12:00:00 +0000", Tz::UTC),
            Some(utc(2026, 9, 16, 12, 0, 0))
        );
        assert_eq!(
            parse_origdate("2026-09-16T12:00:00-04:00", Tz::UTC),
            Some(utc(2026, 9, 16, 16, 0, 0))
        );
        assert_eq!(
            parse_origdate("Wed, 16 Sep 2026 12:00:00 +0000", Tz::UTC),
            Some(utc(2026, 9, 16, 12, 0, 0))
        );
    }

    #[test]
    fn parses_epoch_seconds() {
        assert_eq!(
            parse_origdate("1244496482", Tz::UTC),
            Some(utc(2009, 6, 8, 21, 28, 2))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_origdate("", Tz::UTC), None);
        assert_eq!(parse_origdate("yesterday-ish", Tz::UTC), None);
    }
}
