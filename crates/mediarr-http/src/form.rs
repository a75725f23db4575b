//! Form parts and request body encoding

use web_time::{SystemTime, UNIX_EPOCH};

use crate::uri::escape_data_string;

/// Payloads above this size force a multipart body
pub const MULTIPART_THRESHOLD: usize = 1024;

const BOUNDARY_PREFIX: &str = "-----------------------------";

/// 100ns ticks between 0001-01-01 and the unix epoch
const TICKS_AT_UNIX_EPOCH: u128 = 621_355_968_000_000_000;

/// Keeps the tick count to 14 hex digits
const TICK_MASK: u128 = 0xFF_FFFF_FFFF_FFFF;

/// A single named entry of a form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// Plain `name=value` entry
    Value {
        /// Field name
        name: String,
        /// UTF-8 encoded value
        value: Vec<u8>,
    },
    /// File upload
    File {
        /// Field name
        name: String,
        /// File name sent in `Content-Disposition`
        filename: String,
        /// Media type of the payload
        content_type: String,
        /// Raw payload
        data: Vec<u8>,
    },
}

impl FormPart {
    /// Create a value part
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Value {
            name: name.into(),
            value: value.into().into_bytes(),
        }
    }

    /// Create a file part
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        match self {
            FormPart::Value { name, .. } | FormPart::File { name, .. } => name,
        }
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        match self {
            FormPart::Value { value, .. } => value,
            FormPart::File { data, .. } => data,
        }
    }

    fn requires_multipart(&self) -> bool {
        match self {
            FormPart::Value { value, .. } => value.len() > MULTIPART_THRESHOLD,
            FormPart::File {
                filename,
                content_type,
                data,
                ..
            } => {
                !filename.trim().is_empty()
                    || !content_type.trim().is_empty()
                    || data.len() > MULTIPART_THRESHOLD
            }
        }
    }

    fn summary(&self) -> String {
        match self {
            FormPart::Value { name, value } => {
                format!("{}={}", name, String::from_utf8_lossy(value))
            }
            FormPart::File {
                name,
                filename,
                data,
                ..
            } => format!("{}={} ({} bytes)", name, filename, data.len()),
        }
    }
}

/// An encoded form body ready to be attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedForm {
    /// Value for the `Content-Type` header
    pub content_type: String,
    /// Body bytes
    pub body: Vec<u8>,
    /// Human readable rendering of the parts
    pub summary: String,
}

/// Encode `parts` as one body.
///
/// The whole form goes out as `multipart/form-data` as soon as one part has a
/// file name, a content type or more than [`MULTIPART_THRESHOLD`] bytes;
/// otherwise it is `application/x-www-form-urlencoded`.
pub fn encode(parts: &[FormPart]) -> EncodedForm {
    if parts.iter().any(FormPart::requires_multipart) {
        encode_multipart(parts, &generate_boundary())
    } else {
        encode_urlencoded(parts)
    }
}

/// Boundary token: a fixed prefix followed by 14 hex digits of a tick clock
pub fn generate_boundary() -> String {
    let ticks = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() / 100)
        .unwrap_or_default()
        + TICKS_AT_UNIX_EPOCH;
    let ticks = ticks & TICK_MASK;

    format!("{BOUNDARY_PREFIX}{ticks:014x}")
}

/// Encode parts as `multipart/form-data` using `boundary`
pub fn encode_multipart(parts: &[FormPart], boundary: &str) -> EncodedForm {
    let mut body = Vec::new();
    let mut summary = String::new();

    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data");

        if !part.name().trim().is_empty() {
            body.extend_from_slice(format!("; name=\"{}\"", part.name()).as_bytes());
        }

        if let FormPart::File {
            filename,
            content_type,
            ..
        } = part
        {
            if !filename.trim().is_empty() {
                body.extend_from_slice(format!("; filename=\"{filename}\"").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            if !content_type.trim().is_empty() {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
        } else {
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.payload());
        body.extend_from_slice(b"\r\n");

        summary.push_str("\r\n");
        summary.push_str(&part.summary());
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    EncodedForm {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body,
        summary,
    }
}

/// Encode parts as `application/x-www-form-urlencoded`
pub fn encode_urlencoded(parts: &[FormPart]) -> EncodedForm {
    let encoded = parts
        .iter()
        .map(|part| {
            format!(
                "{}={}",
                escape_data_string(part.name()),
                escape_data_string(&String::from_utf8_lossy(part.payload()))
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    EncodedForm {
        content_type: "application/x-www-form-urlencoded".to_string(),
        body: encoded.clone().into_bytes(),
        summary: encoded,
    }
}
