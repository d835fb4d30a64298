//! A compact, self-describing binary serializer with streaming support.
//!
//! An encoded value carries its own type and length in a packed header,
//! so decoding never needs an external schema. See [`Value`] for the
//! value universe, [`encode`]/[`decode`] for the one-shot API, and
//! [`StreamEncoder`]/[`StreamDecoder`] for append-only file streaming.

mod codec;
mod engine;
mod error;
mod extension;
mod metadata;
mod reader;
mod scalar;
mod source;
mod stream_decoder;
mod stream_encoder;
mod validate;
mod value;

pub use codec::{decode, encode, encode_to_file, EncodeOptions};
pub use error::{DecodingError, EncodingError, Error, Result, UsageError, ValidationError};
pub use extension::{CustomReadTypes, CustomWriteTypes};
pub use source::Source;
pub use stream_decoder::StreamDecoder;
pub use stream_encoder::{ContainerType, StreamEncoder, StreamMode};
pub use validate::{validate, ValidateOptions};
pub use value::{CustomValue, Value};
