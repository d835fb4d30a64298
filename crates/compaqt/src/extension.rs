//! The 32-slot extension (custom type) registry (spec §4.3).
//!
//! Distinct from the mainline metadata codec in §4.1: an extension item's
//! length field is always the two-byte "width byte + width bytes" form,
//! never the short-inline 0..15 form — a genuine format quirk the spec
//! calls out explicitly, preserved here exactly.

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::{Error, Result};
use crate::metadata::{read_long_bytes, width_for};
use crate::reader::ByteReader;
use crate::value::{tag, CustomValue, Value};

const SLOTS: usize = 32;

fn range_check(index: u8) -> Result<()> {
    if index as usize >= SLOTS {
        return Err(Error::usage(format!(
            "custom type index out of range: got {index}, max is {}",
            SLOTS - 1
        )));
    }
    Ok(())
}

/// The encode-side table: maps a registered Rust type to its extension
/// index and serializer.
type Serializer = Box<dyn Fn(&dyn Any) -> Result<Vec<u8>>>;

pub struct CustomWriteTypes {
    by_type: std::collections::HashMap<TypeId, u8>,
    serializers: Vec<Option<Serializer>>,
}

impl fmt::Debug for CustomWriteTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomWriteTypes")
            .field("registered", &self.by_type.len())
            .finish()
    }
}

impl Default for CustomWriteTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomWriteTypes {
    pub fn new() -> Self {
        Self {
            by_type: std::collections::HashMap::new(),
            serializers: (0..SLOTS).map(|_| None).collect(),
        }
    }

    /// Registers a serializer for `T` at `index` (0..=31). Validated
    /// eagerly, matching the original's constructor-time `range_check`
    /// rather than deferring to the first encode.
    pub fn register<T, F>(&mut self, index: u8, serializer: F) -> Result<()>
    where
        T: CustomValue,
        F: Fn(&T) -> Result<Vec<u8>> + 'static,
    {
        range_check(index)?;
        self.by_type.insert(TypeId::of::<T>(), index);
        self.serializers[index as usize] = Some(Box::new(move |any: &dyn Any| {
            let typed = any.downcast_ref::<T>().ok_or_else(|| {
                Error::encoding(format!(
                    "extension index {index} is registered for '{}', but the value carried a different type",
                    std::any::type_name::<T>()
                ))
            })?;
            serializer(typed)
        }));
        Ok(())
    }

    /// Wraps a value of a registered type into a [`Value::Extension`]
    /// carrying its registered index, ready to be handed to `encode`.
    pub fn wrap<T: CustomValue>(&self, value: T) -> Result<Value> {
        let index = *self.by_type.get(&TypeId::of::<T>()).ok_or_else(|| {
            Error::encoding(format!(
                "received an invalid datatype: no extension registered for '{}'",
                std::any::type_name::<T>()
            ))
        })?;
        Ok(Value::Extension(index, Box::new(value)))
    }

    pub(crate) fn encode(&self, index: u8, payload: &dyn CustomValue, buf: &mut Vec<u8>) -> Result<()> {
        let serializer = self
            .serializers
            .get(index as usize)
            .and_then(|s| s.as_ref())
            .ok_or_else(|| Error::encoding(format!("no serializer registered for extension index {index}")))?;
        let bytes = serializer(payload.as_any())?;
        write_extension(buf, index, &bytes);
        Ok(())
    }
}

/// The decode-side table: 32 optional deserializers indexed by extension
/// index.
type Deserializer = Box<dyn Fn(&[u8]) -> Result<Box<dyn CustomValue>>>;

pub struct CustomReadTypes {
    deserializers: Vec<Option<Deserializer>>,
}

impl fmt::Debug for CustomReadTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self.deserializers.iter().filter(|d| d.is_some()).count();
        f.debug_struct("CustomReadTypes").field("registered", &registered).finish()
    }
}

impl Default for CustomReadTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomReadTypes {
    pub fn new() -> Self {
        Self {
            deserializers: (0..SLOTS).map(|_| None).collect(),
        }
    }

    pub fn register<T, F>(&mut self, index: u8, deserializer: F) -> Result<()>
    where
        T: CustomValue,
        F: Fn(&[u8]) -> Result<T> + 'static,
    {
        range_check(index)?;
        self.deserializers[index as usize] = Some(Box::new(move |payload: &[u8]| {
            let value = deserializer(payload)?;
            Ok(Box::new(value) as Box<dyn CustomValue>)
        }));
        Ok(())
    }

    pub(crate) fn decode(&self, index: u8, payload: &[u8]) -> Result<Box<dyn CustomValue>> {
        let deserializer = self
            .deserializers
            .get(index as usize)
            .and_then(|d| d.as_ref())
            .ok_or_else(|| {
                Error::decoding(format!(
                    "could not find a valid function on ID {index}. Did you use the same custom type IDs as when encoding?"
                ))
            })?;
        deserializer(payload)
    }
}

/// Writes the extension tag byte plus its distinct length framing.
///
/// The source carries a dead-code fallback (`msg.append(0)`) for empty
/// payloads; the intended (and implemented) behavior is `width_byte = 0`
/// and no length bytes at all for a zero-length payload (spec §9).
pub(crate) fn write_extension(buf: &mut Vec<u8>, index: u8, payload: &[u8]) {
    buf.push(tag::EXTENSION | (index << 3));
    if payload.is_empty() {
        buf.push(0);
    } else {
        let num_bytes = width_for(payload.len() as u64);
        buf.push(num_bytes);
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes()[..num_bytes as usize]);
        buf.extend_from_slice(payload);
    }
}

/// Reads an extension item's header and payload, given the reader is
/// positioned at its tag byte.
pub(crate) fn read_extension(reader: &mut dyn ByteReader) -> Result<(u8, Vec<u8>)> {
    reader.ensure(2)?;
    let first = reader.read_u8()?;
    let index = (first >> 3) & 0x1F;
    let width = reader.read_u8()?;
    let length = if width == 0 {
        0
    } else {
        read_long_bytes(reader, width)? as usize
    };
    reader.ensure(length)?;
    let payload = reader.read_bytes(length)?;
    Ok((index, payload))
}

/// Structural walk of an extension item without materializing its
/// payload, used by the validator (spec §9: "a complete implementation
/// SHOULD validate them structurally using the framing of §4.3").
pub(crate) fn skip_extension(reader: &mut dyn ByteReader) -> Result<()> {
    reader.ensure(2)?;
    reader.advance(1); // tag + index byte
    let width = reader.read_u8()?;
    let length = if width == 0 {
        0
    } else {
        read_long_bytes(reader, width)? as usize
    };
    reader.ensure(length)?;
    reader.advance(length);
    Ok(())
}
