//! MWS-specific response headers.

use chrono::{DateTime, Utc};

use crate::transport::ResponseEnvelope;

/// Rate-limit window reported with each response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Requests allowed in the window.
    pub max: u32,
    /// Requests left in the window.
    pub remaining: u32,
    /// When the window resets.
    pub resets_on: DateTime<Utc>,
}

/// Typed access to the `x-mws-*` headers.
///
/// Implementors only provide [`header`](Self::header); the accessors are derived from it.
/// Missing or malformed headers yield `None`.
pub trait MwsHeaders {
    /// Returns a raw header value, matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// Quota window, when all three quota headers are present and well-formed.
    fn quota(&self) -> Option<Quota> {
        let max = parse_count(self.header("x-mws-quota-max")?)?;
        let remaining = parse_count(self.header("x-mws-quota-remaining")?)?;
        let resets_on = parse_time(self.header("x-mws-quota-resetsOn")?)?;
        Some(Quota { max, remaining, resets_on })
    }

    /// Request id assigned by the service.
    fn request_id(&self) -> Option<&str> {
        self.header("x-mws-request-id")
    }

    /// Server timestamp of the response.
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_time(self.header("x-mws-timestamp")?)
    }

    /// Opaque response context.
    fn response_context(&self) -> Option<&str> {
        self.header("x-mws-response-context")
    }
}

/// Quota counts arrive as decimals (`200.0`); only the whole part matters.
fn parse_count(value: &str) -> Option<u32> {
    let value = value.trim();
    let whole = value.split_once('.').map_or(value, |(whole, _)| whole);
    whole.parse().ok()
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim()).ok().map(|t| t.with_timezone(&Utc))
}

impl MwsHeaders for ResponseEnvelope {
    fn header(&self, name: &str) -> Option<&str> {
        ResponseEnvelope::header(self, name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn envelope(headers: &[(&str, &str)]) -> ResponseEnvelope {
        ResponseEnvelope {
            status: 200,
            headers: headers.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
            body: None,
        }
    }

    #[test]
    fn test_quota_parsed() {
        let expected = Some(Quota {
            max: 200,
            remaining: 199,
            resets_on: Utc.with_ymd_and_hms(2015, 1, 1, 1, 0, 0).unwrap(),
        });

        let decimal = envelope(&[
            ("x-mws-quota-max", "200.0"),
            ("x-mws-quota-remaining", "199.0"),
            ("x-mws-quota-resetson", "2015-01-01T01:00:00.000Z"),
        ]);
        assert_eq!(decimal.quota(), expected);

        let whole = envelope(&[
            ("x-mws-quota-max", "200"),
            ("x-mws-quota-remaining", " 199 "),
            ("x-mws-quota-resetsOn", "2015-01-01T01:00:00.000Z"),
        ]);
        assert_eq!(whole.quota(), expected);

        let garbled = envelope(&[
            ("x-mws-quota-max", "lots"),
            ("x-mws-quota-remaining", "-1.0"),
            ("x-mws-quota-resetsOn", "2015-01-01T01:00:00.000Z"),
        ]);
        assert_eq!(garbled.quota(), None);
    }

    #[test]
    fn test_quota_absent_without_headers() {
        assert_eq!(envelope(&[]).quota(), None);
    }

    #[test]
    fn test_request_metadata() {
        let response = envelope(&[
            ("x-mws-request-id", "f4a3a7c1-0000-4a0e-9a53-2d3e4c5b6a7f"),
            ("x-mws-timestamp", "2015-01-01T00:00:05.123Z"),
            ("x-mws-response-context", "ctx=="),
        ]);

        assert_eq!(response.request_id(), Some("f4a3a7c1-0000-4a0e-9a53-2d3e4c5b6a7f"));
        assert_eq!(response.response_context(), Some("ctx=="));
        assert_eq!(
            response.timestamp().map(|t| t.timestamp()),
            Some(Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 5).unwrap().timestamp())
        );
    }

    #[test]
    fn test_malformed_timestamp_is_none() {
        assert_eq!(envelope(&[("x-mws-timestamp", "yesterday")]).timestamp(), None);
    }
}
