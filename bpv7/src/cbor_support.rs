//! Small helpers layered on top of `bp7_cbor` for parsing the fixed-shape
//! arrays that make up most of the bundle wire format.

use crate::error::Error;
use bp7_cbor::decode::{self, Value};

/// Parses a single CBOR item from `data`, requiring it to be an array, and
/// hands the array cursor to `f`. Returns the value produced by `f`, whether
/// the outer array used canonical (definite-length) form, and the number of
/// bytes consumed.
pub(crate) fn parse_array<T, F>(data: &[u8], f: F) -> Result<(T, bool, usize), Error>
where
    F: FnOnce(&mut decode::Array) -> Result<T, Error>,
{
    let mut shortest = true;
    let (v, len) = decode::parse_value(data, |value, s, tags| {
        shortest = s && tags.is_empty();
        match value {
            Value::Array(a) => {
                let definite = a.is_definite();
                let r = f(a)?;
                shortest = shortest && definite;
                Ok(r)
            }
            v => Err(Error::Unsupported(format!(
                "expected an array, found {}",
                v.type_name(!tags.is_empty())
            ))),
        }
    })?;
    Ok((v, shortest, len))
}

pub(crate) fn incorrect_type(what: impl std::fmt::Display) -> Error {
    Error::Unsupported(format!("malformed {what}"))
}
