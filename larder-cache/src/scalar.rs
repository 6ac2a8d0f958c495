//! Raw scalar detection.
//!
//! [`CacheClient::set`](crate::CacheClient::set) stores primitive values
//! verbatim and encodes everything else with the resolved
//! [`Serialization`]. The decision is made once per value by walking its
//! serde representation with [`Scalar::classify`]:
//!
//! | serde data model            | stored as                    |
//! |-----------------------------|------------------------------|
//! | `bool`                      | `1` / `0`                    |
//! | `i8`..`i64`, `u8`..`u64`    | decimal text                 |
//! | `i128`, `u128` within 64 bits | decimal text               |
//! | `f32`, `f64`                | shortest round-trip text; `inf`, `-inf`, `nan` as Redis writes them |
//! | `char`, `str`               | UTF-8 text                   |
//! | bytes (`serialize_bytes`)   | the bytes themselves         |
//! | anything else               | encoded by the strategy      |
//!
//! `Vec<u8>` serializes as a sequence and is therefore encoded; wrap raw
//! bytes in `bytes::Bytes` or use
//! [`CacheClient::set_bytes`](crate::CacheClient::set_bytes).

use crate::error::CacheResult;
use crate::serialize::Serialization;
use serde::Serialize;
use serde::ser::{self, Impossible, Serializer};
use std::fmt;

/// A primitive value stored without serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Scalar {
    /// Return the scalar form of `value`, or `None` for structured values.
    pub fn classify<T: Serialize + ?Sized>(value: &T) -> Option<Scalar> {
        value.serialize(ScalarProbe).ok()
    }

    /// The bytes written to the store for this scalar.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Scalar::Str(s) => s.into_bytes(),
            Scalar::Bool(b) => if b { b"1".to_vec() } else { b"0".to_vec() },
            Scalar::Int(i) => i.to_string().into_bytes(),
            Scalar::UInt(u) => u.to_string().into_bytes(),
            Scalar::Float(f) => float_text(f).into_bytes(),
            Scalar::Bytes(bytes) => bytes,
        }
    }
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        f.to_string()
    }
}

/// Bytes to store for `value`: verbatim for scalars, encoded otherwise.
pub fn stored_bytes<T: Serialize + ?Sized>(
    value: &T,
    strategy: Serialization,
) -> CacheResult<Vec<u8>> {
    match Scalar::classify(value) {
        Some(scalar) => Ok(scalar.into_bytes()),
        None => strategy.encode(value),
    }
}

#[derive(Debug)]
struct NotScalar;

impl fmt::Display for NotScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a scalar")
    }
}

impl std::error::Error for NotScalar {}

impl ser::Error for NotScalar {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        NotScalar
    }
}

struct ScalarProbe;

type Rejected = Impossible<Scalar, NotScalar>;

impl Serializer for ScalarProbe {
    type Ok = Scalar;
    type Error = NotScalar;
    type SerializeSeq = Rejected;
    type SerializeTuple = Rejected;
    type SerializeTupleStruct = Rejected;
    type SerializeTupleVariant = Rejected;
    type SerializeMap = Rejected;
    type SerializeStruct = Rejected;
    type SerializeStructVariant = Rejected;

    fn serialize_bool(self, v: bool) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Scalar, NotScalar> {
        i64::try_from(v).map(Scalar::Int).map_err(|_| NotScalar)
    }

    fn serialize_u8(self, v: u8) -> Result<Scalar, NotScalar> {
        Ok(Scalar::UInt(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Scalar, NotScalar> {
        Ok(Scalar::UInt(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Scalar, NotScalar> {
        Ok(Scalar::UInt(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Scalar, NotScalar> {
        Ok(Scalar::UInt(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Scalar, NotScalar> {
        u64::try_from(v).map(Scalar::UInt).map_err(|_| NotScalar)
    }

    fn serialize_f32(self, v: f32) -> Result<Scalar, NotScalar> {
        // Widening directly would print the f32 rounding error (0.1 -> 0.10000000149...).
        v.to_string()
            .parse::<f64>()
            .map(Scalar::Float)
            .map_err(|_| NotScalar)
    }

    fn serialize_f64(self, v: f64) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Str(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Scalar, NotScalar> {
        Ok(Scalar::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_unit(self) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Scalar, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Rejected, NotScalar> {
        Err(NotScalar)
    }
}
