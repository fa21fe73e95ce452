//! Marketplace registry.
//!
//! Maps a marketplace identifier (or its country code) to the MWS host that serves it and to
//! the text encoding the service uses for that marketplace's flat files. The table is static
//! and immutable, so lookups are safe from any number of threads without synchronization.
//!
//! # Examples
//!
//! ```
//! use mws_client::marketplace::{Marketplace, TextEncoding};
//!
//! let us = Marketplace::resolve(Some("ATVPDKIKX0DER"))?;
//! assert_eq!(us.country_code, "US");
//! assert_eq!(us.host, "mws.amazonservices.com");
//!
//! let uk = Marketplace::resolve(Some("uk"))?;
//! assert_eq!(uk.country_code, "GB");
//! assert_eq!(uk.encoding(), TextEncoding::Windows1252);
//! # Ok::<(), mws_client::MwsError>(())
//! ```

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::{MwsError, Result};

/// A regional storefront with its own host and flat-file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marketplace {
    /// Opaque marketplace identifier (e.g. `ATVPDKIKX0DER`).
    pub id: &'static str,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: &'static str,
    /// MWS host serving the marketplace.
    pub host: &'static str,
}

// https://docs.developer.amazonservices.com/en_US/dev_guide/DG_Endpoints.html
static MARKETPLACES: &[Marketplace] = &[
    Marketplace { id: "A2EUQ1WTGCTBG2", country_code: "CA", host: "mws.amazonservices.ca" },
    Marketplace { id: "A1AM78C64UM0Y8", country_code: "MX", host: "mws.amazonservices.com.mx" },
    Marketplace { id: "ATVPDKIKX0DER", country_code: "US", host: "mws.amazonservices.com" },
    Marketplace { id: "A2Q3Y263D00KWC", country_code: "BR", host: "mws.amazonservices.com" },
    Marketplace { id: "A2VIGQ35RCS4UG", country_code: "AE", host: "mws.amazonservices.ae" },
    Marketplace { id: "A1PA6795UKMFR9", country_code: "DE", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "ARBP9OOSHTCHU", country_code: "EG", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A1RKKUPIHCS9HS", country_code: "ES", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A13V1IB3VIYZZH", country_code: "FR", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A1F83G8C2ARO7P", country_code: "GB", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A21TJRUUN4KGV", country_code: "IN", host: "mws.amazonservices.in" },
    Marketplace { id: "APJ6JRA9NG5V4", country_code: "IT", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A1805IZSGTT6HS", country_code: "NL", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A1C3SOZRARQ6R3", country_code: "PL", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A17E79C6D8DWNP", country_code: "SA", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A2NODRKZP88ZB9", country_code: "SE", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A33AVAJ2PDY3EV", country_code: "TR", host: "mws-eu.amazonservices.com" },
    Marketplace { id: "A19VAU5U5O7RUS", country_code: "SG", host: "mws-fe.amazonservices.com" },
    Marketplace { id: "A39IBJ37TRP1C6", country_code: "AU", host: "mws.amazonservices.com.au" },
    Marketplace { id: "A1VC38T7YXB528", country_code: "JP", host: "mws.amazonservices.jp" },
    Marketplace { id: "AAHKV2X7AFYLW", country_code: "CN", host: "mws.amazonservices.com.cn" },
];

impl Marketplace {
    /// Returns every known marketplace.
    #[must_use]
    pub fn all() -> &'static [Self] {
        MARKETPLACES
    }

    /// Resolves a marketplace from its identifier or its country code.
    ///
    /// Identifiers are matched exactly. Country codes are matched case-insensitively, and the
    /// legacy `UK` alias resolves to `GB`.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::InvalidMarketplace`] with message `missing marketplace` when the
    /// input is absent or blank, and `"<input>" is not a valid marketplace` when nothing
    /// matches.
    pub fn resolve(input: Option<&str>) -> Result<&'static Self> {
        let input = match input.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return Err(MwsError::InvalidMarketplace("missing marketplace".to_owned())),
        };

        Self::find_by_id(input).or_else(|| Self::find_by_country_code(input)).ok_or_else(|| {
            MwsError::InvalidMarketplace(format!("\"{input}\" is not a valid marketplace"))
        })
    }

    /// Finds a marketplace by its exact identifier.
    #[must_use]
    pub fn find_by_id(id: &str) -> Option<&'static Self> {
        MARKETPLACES.iter().find(|m| m.id == id)
    }

    /// Finds a marketplace by country code, accepting `UK` for `GB`.
    #[must_use]
    pub fn find_by_country_code(country_code: &str) -> Option<&'static Self> {
        let normalized = country_code.to_ascii_uppercase();
        let normalized = if normalized == "UK" { "GB" } else { normalized.as_str() };
        MARKETPLACES.iter().find(|m| m.country_code == normalized)
    }

    /// Text encoding the service uses for this marketplace's flat files.
    ///
    /// Superset encodings are chosen on purpose: the service emits characters that the strict
    /// Shift_JIS and ISO-8859-1 repertoires cannot represent.
    #[must_use]
    pub fn encoding(&self) -> TextEncoding {
        match self.country_code {
            "JP" => TextEncoding::Windows31J,
            "CN" => TextEncoding::Utf16,
            _ => TextEncoding::Windows1252,
        }
    }

    /// Endpoint URL for an API path on this marketplace's host.
    #[must_use]
    pub fn endpoint(&self, scheme: &str, path: &str) -> String {
        format!("{scheme}://{}{path}", self.host)
    }
}

/// Text encoding of flat-file bodies exchanged with a marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Microsoft's Shift_JIS superset (code page 932).
    Windows31J,
    /// 16-bit Unicode.
    Utf16,
    /// Microsoft's ISO-8859-1 superset (code page 1252).
    Windows1252,
}

impl TextEncoding {
    /// Charset label sent in `Content-Type` headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Windows31J => "Windows-31J",
            Self::Utf16 => "UTF-16",
            Self::Windows1252 => "CP1252",
        }
    }

    /// The `encoding_rs` codec backing this encoding.
    ///
    /// UTF-16 maps to the little-endian codec; decoding sniffs byte-order marks, so
    /// big-endian bodies carrying a BOM decode correctly too.
    #[must_use]
    pub fn codec(self) -> &'static Encoding {
        match self {
            Self::Windows31J => encoding_rs::SHIFT_JIS,
            Self::Utf16 => encoding_rs::UTF_16LE,
            Self::Windows1252 => encoding_rs::WINDOWS_1252,
        }
    }

    /// Encodes outgoing text into this encoding.
    ///
    /// Characters the encoding cannot represent become numeric character references, which
    /// is how `encoding_rs` reports unmappable input. UTF-16 output is big-endian and starts
    /// with a byte-order mark.
    #[must_use]
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            Self::Utf16 => {
                let mut bytes = Vec::with_capacity(2 + text.len() * 2);
                bytes.extend_from_slice(&[0xFE, 0xFF]);
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
                Cow::Owned(bytes)
            }
            Self::Windows31J | Self::Windows1252 => {
                let (bytes, _, _) = self.codec().encode(text);
                bytes
            }
        }
    }

    /// Decodes incoming bytes, replacing malformed or unmapped sequences with U+FFFD.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        let (text, _, _) = self.codec().decode(bytes);
        text
    }
}
