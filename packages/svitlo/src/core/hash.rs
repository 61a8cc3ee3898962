//! Content hashing for change detection.
//!
//! The hash is taken over JSON laid out like Python's
//! `json.dumps(data, sort_keys=True, ensure_ascii=False)`, so documents
//! published by earlier tooling compare equal when their data is equal.

use std::io;

use serde::Serialize;
use serde_json::{Serializer, Value, ser::Formatter};
use sha2::{Digest, Sha256};

/// SHA-256 of `content`, lowercase hex.
pub fn calculate_checksum(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    hex::encode(hasher.finalize())
}

/// Hash of `data` with every object's keys sorted, written with `", "` and
/// `": "` separators and non-ASCII text left unescaped.
pub fn content_hash<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    let canonical = sort_keys(serde_json::to_value(data)?);
    let mut buf = Vec::new();
    canonical.serialize(&mut Serializer::with_formatter(&mut buf, SpacedFormatter))?;
    Ok(calculate_checksum(buf))
}

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
