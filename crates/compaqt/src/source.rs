//! The input source shared by `decode` and `validate`.

use std::path::Path;

/// Replaces the source API's "exactly one of `encoded`/`file_name`" pair
/// of optional arguments with a type that makes the invalid "both or
/// neither" state unrepresentable (spec.md §9's license to prefer a
/// native idiom over literal transliteration).
pub enum Source<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}
