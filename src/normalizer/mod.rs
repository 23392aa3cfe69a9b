//! RSS parsing and text clean-up.
//!
//! Feeds frequently double-encode entities (`&amp;amp;`), so text fields are
//! run through an HTML entity decoder after the XML parser has done its own
//! pass. Publication dates are kept as raw strings here and interpreted by
//! [`parse_pub_date`].

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use html_escape::decode_html_entities;
use rss::Channel;

use crate::app::{GatorError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedItem {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Publication date exactly as it appeared in the feed.
    pub pub_date: String,
}

pub fn parse_feed(body: &[u8]) -> Result<ParsedFeed> {
    let channel = Channel::read_from(body).map_err(|e| GatorError::Parse(e.to_string()))?;

    let items = channel
        .items()
        .iter()
        .map(|item| ParsedItem {
            title: unescape(item.title().unwrap_or_default()),
            description: unescape(item.description().unwrap_or_default()),
            link: item.link().unwrap_or_default().to_string(),
            pub_date: item.pub_date().unwrap_or_default().to_string(),
        })
        .collect();

    Ok(ParsedFeed {
        title: unescape(channel.title()),
        description: unescape(channel.description()),
        link: channel.link().to_string(),
        items,
    })
}

fn unescape(text: &str) -> String {
    decode_html_entities(text).into_owned()
}

/// `02 Jan 2006 15:04:05 -0700`, after the weekday has been stripped.
const RFC1123_NUMERIC_ZONE: &str = "%d %b %Y %H:%M:%S %z";

/// `02 Jan 2006 15:04:05` followed by a zone abbreviation.
const RFC1123_NO_ZONE: &str = "%d %b %Y %H:%M:%S";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parse an item publication date.
///
/// Tries RFC 1123 with a numeric zone first, then RFC 1123 with a named zone.
/// The leading weekday must be a day name but is not checked against the
/// date. Returns `None` when neither form matches.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let stamp = strip_weekday(raw.trim())?;

    if let Ok(dt) = DateTime::parse_from_str(stamp, RFC1123_NUMERIC_ZONE) {
        return Some(dt.with_timezone(&Utc));
    }

    parse_named_zone(stamp)
}

fn strip_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(", ")?;
    WEEKDAYS
        .iter()
        .any(|name| name.eq_ignore_ascii_case(day))
        .then_some(rest)
}

fn parse_named_zone(stamp: &str) -> Option<DateTime<Utc>> {
    let (stamp, zone) = stamp.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(stamp, RFC1123_NO_ZONE).ok()?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

/// Offsets for the zone names RFC 822 defines. Any other alphabetic
/// abbreviation is read as UTC.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <description>A test feed</description>
    <item>
      <title>Test Item 1</title>
      <link>https://example.com/item1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description>This is item 1</description>
    </item>
    <item>
      <title>Test Item 2</title>
      <link>https://example.com/item2</link>
      <description>This is item 2</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss() {
        let feed = parse_feed(RSS_SAMPLE.as_bytes()).unwrap();

        assert_eq!(feed.title, "Test Feed");
        assert_eq!(feed.description, "A test feed");
        assert_eq!(feed.link, "https://example.com");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "Test Item 1");
        assert_eq!(feed.items[0].link, "https://example.com/item1");
        assert_eq!(feed.items[0].pub_date, "Mon, 01 Jan 2024 00:00:00 +0000");
        assert_eq!(feed.items[1].pub_date, "");
    }

    #[test]
    fn test_double_encoded_entities_are_unescaped() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Tom &amp;amp; Jerry</title>
    <link>https://example.com</link>
    <description>Caf&amp;eacute; news</description>
    <item>
      <title>Q&amp;amp;A &amp;#8211; part 1</title>
      <link>https://example.com/qa?a=1&amp;b=2</link>
      <description>&amp;lt;p&amp;gt;Hello&amp;lt;/p&amp;gt;</description>
    </item>
  </channel>
</rss>"#;

        let feed = parse_feed(xml.as_bytes()).unwrap();

        assert_eq!(feed.title, "Tom & Jerry");
        assert_eq!(feed.description, "Café news");
        assert_eq!(feed.items[0].title, "Q&A \u{2013} part 1");
        assert_eq!(feed.items[0].description, "<p>Hello</p>");
        assert_eq!(feed.items[0].link, "https://example.com/qa?a=1&b=2");
    }

    #[test]
    fn test_item_order_preserved() {
        let feed = parse_feed(RSS_SAMPLE.as_bytes()).unwrap();
        let links: Vec<&str> = feed.items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://example.com/item1", "https://example.com/item2"]
        );
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = parse_feed(b"<rss><channel><title>broken").unwrap_err();
        assert!(matches!(err, GatorError::Parse(_)));
    }

    #[test]
    fn test_non_rss_document_is_parse_error() {
        let err = parse_feed(b"<html><body>hi</body></html>").unwrap_err();
        assert!(matches!(err, GatorError::Parse(_)));
    }

    #[test]
    fn test_pub_date_numeric_zone() {
        let dt = parse_pub_date("Mon, 01 Jan 2024 23:00:00 -0500").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-02T04:00:00+00:00");
    }

    #[test]
    fn test_pub_date_named_zone() {
        let gmt = parse_pub_date("Mon, 01 Jan 2024 12:00:00 GMT").unwrap();
        assert_eq!(gmt.to_rfc3339(), "2024-01-01T12:00:00+00:00");

        let pst = parse_pub_date("Mon, 01 Jan 2024 12:00:00 PST").unwrap();
        assert_eq!(pst.to_rfc3339(), "2024-01-01T20:00:00+00:00");
    }

    #[test]
    fn test_pub_date_unknown_abbreviation_is_utc() {
        let dt = parse_pub_date("Mon, 01 Jan 2024 12:00:00 CET").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_pub_date_ignores_mismatched_weekday() {
        let numeric = parse_pub_date("Tue, 01 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(numeric.to_rfc3339(), "2024-01-01T10:00:00+00:00");

        let named = parse_pub_date("Tue, 01 Jan 2024 10:00:00 GMT").unwrap();
        assert_eq!(named, numeric);
    }

    #[test]
    fn test_pub_date_requires_weekday_name() {
        assert!(parse_pub_date("Xyz, 01 Jan 2024 10:00:00 +0000").is_none());
        assert!(parse_pub_date("01 Jan 2024 10:00:00 +0000").is_none());
    }

    #[test]
    fn test_pub_date_rejects_other_formats() {
        assert!(parse_pub_date("").is_none());
        assert!(parse_pub_date("2024-01-01T00:00:00Z").is_none());
        assert!(parse_pub_date("yesterday").is_none());
        assert!(parse_pub_date("Mon, 01 Jan 2024 12:00:00").is_none());
    }
}
