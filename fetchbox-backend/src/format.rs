//! Value serialization formats.
//!
//! Stores only see bytes. A [`Format`] turns typed values into those bytes
//! and back; it is object safe so a backend can hand out `&dyn Format`.
//! [`FormatExt`] adds the generic `deserialize` helper on top.

use std::fmt::Debug;

use bytes::Bytes;
use fetchbox_core::Raw;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Error raised while encoding or decoding a stored value.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Value could not be encoded.
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// Stored bytes could not be decoded.
    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Object-safe value format.
pub trait Format: Debug + Send + Sync {
    /// Encodes any serializable value.
    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError>;

    /// Runs `f` with a deserializer reading from `data`.
    fn with_deserializer(
        &self,
        data: &[u8],
        f: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Typed helpers for any [`Format`].
pub trait FormatExt: Format {
    /// Decodes `data` into `T`.
    fn deserialize<T>(&self, data: &[u8]) -> Result<T, FormatError>
    where
        T: DeserializeOwned,
    {
        let mut decoded = None;
        self.with_deserializer(data, &mut |deserializer| {
            let value = erased_serde::deserialize::<T>(deserializer)
                .map_err(|error| FormatError::Deserialize(Box::new(error)))?;
            decoded = Some(value);
            Ok(())
        })?;
        decoded.ok_or_else(|| {
            FormatError::Deserialize(Box::new(std::io::Error::other(
                "deserialization produced no result",
            )))
        })
    }
}

impl<F: Format + ?Sized> FormatExt for F {}

/// JSON format (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::new(&mut buf);
        erased_serde::serialize(value, &mut ser)
            .map_err(|error| FormatError::Serialize(Box::new(error)))?;
        Ok(Bytes::from(buf))
    }

    fn with_deserializer(
        &self,
        data: &[u8],
        f: &mut dyn FnMut(&mut dyn erased_serde::Deserializer<'_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        let mut deser = serde_json::Deserializer::from_slice(data);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deser);
        f(&mut erased)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
