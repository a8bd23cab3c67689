//! A canonical CBOR (RFC 8949) encoder/decoder.
//!
//! The encoder always produces definite-length, shortest-form output.
//! The decoder accepts both definite and indefinite-length items and
//! reports whether the input was itself in canonical shortest form,
//! which the bundle layer uses to detect non-canonical bundles.

pub mod decode;
pub mod encode;

mod decode_seq;

#[cfg(test)]
mod decode_tests;

#[cfg(test)]
mod encode_tests;
