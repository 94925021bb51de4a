//! Canonical msgpack for transactions.
//!
//! Only the subset transactions use: maps with string keys, unsigned
//! integers, strings and byte strings. Encoding is canonical: map keys are
//! written in sorted order and every length or integer takes its shortest
//! form, so equal values always produce equal bytes. Leaving out zero and
//! empty fields is up to the caller (see [`MapBuilder`]).

use thiserror::Error;

/// Maps nest at most this deep (a signed transaction needs two).
const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsgpackError {
    #[error("input ended early")]
    Truncated,

    #[error("unsupported msgpack marker 0x{0:02x}")]
    Unsupported(u8),

    #[error("map key is not a string")]
    NonStringKey,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("maps nested too deeply")]
    TooDeep,

    #[error("{0} bytes left after the value")]
    Trailing(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(u64),
    Str(String),
    Bin(Vec<u8>),
    Map(Vec<(String, Value)>),
}

/// Collects map entries, dropping zero and empty values.
#[derive(Default)]
pub struct MapBuilder {
    entries: Vec<(String, Value)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uint(mut self, key: &str, value: u64) -> Self {
        if value != 0 {
            self.entries.push((key.to_string(), Value::Uint(value)));
        }
        self
    }

    pub fn str(mut self, key: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.entries.push((key.to_string(), Value::Str(value.to_string())));
        }
        self
    }

    /// Byte strings that are empty or all zero are dropped.
    pub fn bin(mut self, key: &str, value: &[u8]) -> Self {
        if value.iter().any(|&b| b != 0) {
            self.entries.push((key.to_string(), Value::Bin(value.to_vec())));
        }
        self
    }

    pub fn map(mut self, key: &str, value: Value) -> Self {
        self.entries.push((key.to_string(), value));
        self
    }

    pub fn build(self) -> Value {
        Value::Map(self.entries)
    }
}

impl Value {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Value::Uint(n) => write_uint(out, *n),
            Value::Str(s) => {
                write_len(out, s.len(), Some(0xa0), [0xd9, 0xda, 0xdb]);
                out.extend_from_slice(s.as_bytes());
            }
            Value::Bin(b) => {
                write_len(out, b.len(), None, [0xc4, 0xc5, 0xc6]);
                out.extend_from_slice(b);
            }
            Value::Map(entries) => {
                let mut sorted: Vec<&(String, Value)> = entries.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                if sorted.len() < 16 {
                    out.push(0x80 | sorted.len() as u8);
                } else if sorted.len() <= u16::MAX as usize {
                    out.push(0xde);
                    out.extend_from_slice(&(sorted.len() as u16).to_be_bytes());
                } else {
                    out.push(0xdf);
                    out.extend_from_slice(&(sorted.len() as u32).to_be_bytes());
                }
                for (key, value) in sorted {
                    Value::Str(key.clone()).write(out);
                    value.write(out);
                }
            }
        }
    }

    /// Decode exactly one value spanning all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Value, MsgpackError> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.value(0)?;
        match bytes.len() - reader.pos {
            0 => Ok(value),
            left => Err(MsgpackError::Trailing(left)),
        }
    }

    /// Look up `key` in a map; `None` for absent keys and non-maps.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let entries: &[(String, Value)] = match self {
            Value::Map(entries) => entries.as_slice(),
            _ => &[],
        };
        entries.iter().map(|(k, _)| k.as_str())
    }
}

fn write_uint(out: &mut Vec<u8>, n: u64) {
    if n < 0x80 {
        out.push(n as u8);
    } else if n <= u8::MAX as u64 {
        out.push(0xcc);
        out.push(n as u8);
    } else if n <= u16::MAX as u64 {
        out.push(0xcd);
        out.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= u32::MAX as u64 {
        out.push(0xce);
        out.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        out.push(0xcf);
        out.extend_from_slice(&n.to_be_bytes());
    }
}

/// Length header: a fix form below 32 when there is one, then 8/16/32-bit.
fn write_len(out: &mut Vec<u8>, len: usize, fix: Option<u8>, markers: [u8; 3]) {
    match fix {
        Some(base) if len < 32 => out.push(base | len as u8),
        _ if len <= u8::MAX as usize => {
            out.push(markers[0]);
            out.push(len as u8);
        }
        _ if len <= u16::MAX as usize => {
            out.push(markers[1]);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            out.push(markers[2]);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MsgpackError> {
        let end = self.pos.checked_add(n).ok_or(MsgpackError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(MsgpackError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn be(&mut self, n: usize) -> Result<u64, MsgpackError> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    fn value(&mut self, depth: usize) -> Result<Value, MsgpackError> {
        let marker = self.take(1)?[0];
        match marker {
            0x00..=0x7f => Ok(Value::Uint(u64::from(marker))),
            0xcc => Ok(Value::Uint(self.be(1)?)),
            0xcd => Ok(Value::Uint(self.be(2)?)),
            0xce => Ok(Value::Uint(self.be(4)?)),
            0xcf => Ok(Value::Uint(self.be(8)?)),
            0xa0..=0xbf => self.str((marker & 0x1f) as usize),
            0xd9 => {
                let len = self.be(1)? as usize;
                self.str(len)
            }
            0xda => {
                let len = self.be(2)? as usize;
                self.str(len)
            }
            0xdb => {
                let len = self.be(4)? as usize;
                self.str(len)
            }
            0xc4 => {
                let len = self.be(1)? as usize;
                self.bin(len)
            }
            0xc5 => {
                let len = self.be(2)? as usize;
                self.bin(len)
            }
            0xc6 => {
                let len = self.be(4)? as usize;
                self.bin(len)
            }
            0x80..=0x8f => self.map((marker & 0x0f) as usize, depth),
            0xde => {
                let len = self.be(2)? as usize;
                self.map(len, depth)
            }
            0xdf => {
                let len = self.be(4)? as usize;
                self.map(len, depth)
            }
            other => Err(MsgpackError::Unsupported(other)),
        }
    }

    fn str(&mut self, len: usize) -> Result<Value, MsgpackError> {
        let raw = self.take(len)?;
        let s = std::str::from_utf8(raw).map_err(|_| MsgpackError::InvalidUtf8)?;
        Ok(Value::Str(s.to_string()))
    }

    fn bin(&mut self, len: usize) -> Result<Value, MsgpackError> {
        Ok(Value::Bin(self.take(len)?.to_vec()))
    }

    fn map(&mut self, len: usize, depth: usize) -> Result<Value, MsgpackError> {
        if depth >= MAX_DEPTH {
            return Err(MsgpackError::TooDeep);
        }
        // Each entry needs at least two bytes; don't trust the header for the reservation.
        let mut entries = Vec::with_capacity(len.min(self.bytes.len() / 2));
        for _ in 0..len {
            let key = match self.value(depth + 1)? {
                Value::Str(key) => key,
                _ => return Err(MsgpackError::NonStringKey),
            };
            let value = self.value(depth + 1)?;
            entries.push((key, value));
        }
        Ok(Value::Map(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_take_shortest_form() {
        assert_eq!(Value::Uint(0).encode(), [0x00]);
        assert_eq!(Value::Uint(127).encode(), [0x7f]);
        assert_eq!(Value::Uint(128).encode(), [0xcc, 0x80]);
        assert_eq!(Value::Uint(1000).encode(), [0xcd, 0x03, 0xe8]);
        assert_eq!(Value::Uint(70_000).encode(), [0xce, 0x00, 0x01, 0x11, 0x70]);
        assert_eq!(Value::Uint(u64::MAX).encode()[0], 0xcf);
    }

    #[test]
    fn strings_and_bytes_use_their_own_headers() {
        assert_eq!(Value::Str("pay".into()).encode(), [0xa3, b'p', b'a', b'y']);
        let bin = Value::Bin(vec![7u8; 32]).encode();
        assert_eq!(&bin[..2], &[0xc4, 32]);
        assert_eq!(bin.len(), 34);
        let long = Value::Str("x".repeat(40)).encode();
        assert_eq!(&long[..2], &[0xd9, 40]);
    }

    #[test]
    fn map_keys_are_sorted_and_empties_dropped() {
        let value = MapBuilder::new()
            .str("type", "pay")
            .uint("amt", 0)
            .uint("fee", 1000)
            .bin("note", &[])
            .build();
        let encoded = value.encode();
        let mut expected = vec![0x82, 0xa3, b'f', b'e', b'e', 0xcd, 0x03, 0xe8];
        expected.extend_from_slice(&[0xa4, b't', b'y', b'p', b'e', 0xa3, b'p', b'a', b'y']);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn decode_reads_back_nested_maps() {
        let inner = MapBuilder::new().uint("fv", 300).str("gen", "net").build();
        let outer = MapBuilder::new()
            .bin("sig", &[9u8; 64])
            .map("txn", inner)
            .build();
        let decoded = Value::decode(&outer.encode()).unwrap();
        assert_eq!(decoded.get("txn").and_then(|t| t.get("fv")), Some(&Value::Uint(300)));
        assert_eq!(decoded.get("sig"), Some(&Value::Bin(vec![9u8; 64])));
        assert_eq!(decoded.keys().collect::<Vec<_>>(), ["sig", "txn"]);
    }

    #[test]
    fn malformed_input_rejected() {
        assert_eq!(Value::decode(&[]), Err(MsgpackError::Truncated));
        assert_eq!(Value::decode(&[0xc4, 5, 1]), Err(MsgpackError::Truncated));
        assert_eq!(Value::decode(&[0xc0]), Err(MsgpackError::Unsupported(0xc0)));
        assert_eq!(Value::decode(&[0x81, 0x01, 0x01]), Err(MsgpackError::NonStringKey));
        assert_eq!(Value::decode(&[0x01, 0x02]), Err(MsgpackError::Trailing(1)));
        assert_eq!(
            Value::decode(&[0x81, 0xa1, b'a', 0x81, 0xa1, b'b', 0x81, 0xa1, b'c', 0x81, 0xa1, b'd', 0x80]),
            Err(MsgpackError::TooDeep)
        );
        let huge_map = [0xdf, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(Value::decode(&huge_map), Err(MsgpackError::Truncated));
    }
}
