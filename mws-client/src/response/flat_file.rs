//! Flat-file (tab-separated) response decoding.
//!
//! Reports and feed processing results arrive as tab-separated text in the marketplace's
//! encoding, optionally preceded by a summary block and a blank line:
//!
//! ```text
//! Feed Processing Summary:
//! 	Number of records processed		5
//! 	Number of records successful		5
//!
//! original-record-number	sku	error-code
//! ```

use base64::{Engine, engine::general_purpose::STANDARD};
use encoding_rs::Encoding;
use indexmap::IndexMap;
use md5::{Digest, Md5};
use tracing::{debug, instrument};

use super::headers::MwsHeaders;
use crate::{error::Result, marketplace::TextEncoding, transport::ResponseEnvelope};

/// One data row keyed by column header.
pub type FlatFileRow = IndexMap<String, String>;

/// A decoded flat-file response.
///
/// # Examples
///
/// ```
/// use mws_client::{marketplace::TextEncoding, response::FlatFileResponse, transport::ResponseEnvelope};
///
/// let body = "Summary line 1\n\tProcessed\t\t5\n\tSuccessful\t\t5\n\nh1\th2\nv1\tv2\n";
/// let envelope = ResponseEnvelope { status: 200, headers: vec![], body: Some(body.as_bytes().to_vec()) };
/// let response = FlatFileResponse::new(envelope, TextEncoding::Windows1252);
///
/// let counts = response.records_count().unwrap();
/// assert_eq!(counts["Processed"], "5");
/// assert_eq!(counts["Successful"], "5");
///
/// let rows = response.parse()?;
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0]["h2"], "v2");
/// # Ok::<(), mws_client::MwsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatFileResponse {
    envelope: ResponseEnvelope,
    content: String,
    summary: Option<String>,
}

impl FlatFileResponse {
    /// Decodes the envelope's body.
    ///
    /// A body declared as UTF-8 in its `Content-Type` charset is read as UTF-8. Any other
    /// body is taken to be in `encoding`, whatever its label says. Malformed sequences become
    /// U+FFFD; decoding never fails.
    #[instrument(skip_all, fields(status = envelope.status, bytes = envelope.body_bytes().len(), encoding = encoding.label()))]
    pub fn new(envelope: ResponseEnvelope, encoding: TextEncoding) -> Self {
        let text = if declares_utf8(&envelope) {
            String::from_utf8_lossy(envelope.body_bytes()).into_owned()
        } else {
            encoding.decode(envelope.body_bytes()).into_owned()
        };

        let (summary, content) = match text.split_once("\n\n") {
            Some((summary, content)) => (Some(summary.to_owned()), content.to_owned()),
            None => (None, text),
        };
        debug!(has_summary = summary.is_some(), "flat file decoded");

        Self { envelope, content, summary }
    }

    /// Decoded tab-separated content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Text before the first blank line, when there is one.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Processed and successful record counts from the summary.
    ///
    /// Takes the second and third summary lines, each of the form `\tLabel\t\tValue`, and
    /// returns them as label to value. Lines without the double-tab separator are skipped.
    #[must_use]
    pub fn records_count(&self) -> Option<IndexMap<String, String>> {
        let summary = self.summary.as_deref()?;
        Some(
            summary
                .split("\n\t")
                .skip(1)
                .take(2)
                .filter_map(|line| line.split_once("\t\t"))
                .map(|(label, value)| (label.to_owned(), value.trim_end().to_owned()))
                .collect(),
        )
    }

    /// Column headers of the content.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::FlatFileError`](crate::MwsError::FlatFileError) if the header row
    /// cannot be read.
    pub fn headers(&self) -> Result<Vec<String>> {
        Ok(self.reader().headers()?.iter().map(str::to_owned).collect())
    }

    /// Reads every row into memory.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::FlatFileError`](crate::MwsError::FlatFileError) if a row cannot be
    /// read.
    pub fn parse(&self) -> Result<Vec<FlatFileRow>> {
        let mut rows = Vec::new();
        self.parse_each(|row| rows.push(row))?;
        Ok(rows)
    }

    /// Streams rows to `on_row` one at a time without keeping the table.
    ///
    /// Quoting is disabled: quote characters are literal data. Short rows yield only the
    /// columns they have; extra fields past the last header are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::FlatFileError`](crate::MwsError::FlatFileError) if a row cannot be
    /// read.
    pub fn parse_each<F>(&self, mut on_row: F) -> Result<()>
    where
        F: FnMut(FlatFileRow),
    {
        let mut reader = self.reader();
        let headers = reader.headers()?.clone();
        for record in reader.records() {
            let record = record?;
            let row = headers
                .iter()
                .zip(record.iter())
                .map(|(header, field)| (header.to_owned(), field.to_owned()))
                .collect();
            on_row(row);
        }
        Ok(())
    }

    /// Returns true when the base64 MD5 of the raw body equals the `Content-MD5` header.
    ///
    /// The checksum covers the bytes as received, before decoding. A missing header yields
    /// false.
    #[must_use]
    pub fn valid(&self) -> bool {
        let digest = STANDARD.encode(Md5::digest(self.envelope.body_bytes()));
        self.envelope.header("Content-MD5").is_some_and(|expected| expected.trim() == digest)
    }

    /// The response this view was decoded from.
    #[must_use]
    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    /// Returns the underlying response.
    #[must_use]
    pub fn into_envelope(self) -> ResponseEnvelope {
        self.envelope
    }

    fn reader(&self) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .has_headers(true)
            .flexible(true)
            .from_reader(self.content.as_bytes())
    }
}

impl MwsHeaders for FlatFileResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.envelope.header(name)
    }
}

fn declares_utf8(envelope: &ResponseEnvelope) -> bool {
    envelope
        .content_type()
        .and_then(|ct| {
            ct.split(';')
                .skip(1)
                .filter_map(|param| param.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
                .map(|(_, value)| value.trim().trim_matches('"').to_owned())
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .is_some_and(|encoding| encoding == encoding_rs::UTF_8)
}
