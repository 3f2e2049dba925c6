//! `bincode`-backed binary snapshot for `ItemMemory`/`ContinuousItemMemory` —
//! a faster alternative to CSV for large D, scoped to these two types since
//! this core is not a general persistence engine (spec §1 non-goals).

use std::io::{Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::IoError;
use crate::vsa::memory::{ContinuousItemMemory, ItemMemory, PrecomputedItemMemory};

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, IoError> {
    bincode::serialize(value).map_err(|e| IoError::BincodeDecode { message: e.to_string() })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, IoError> {
    bincode::deserialize(bytes).map_err(|e| IoError::BincodeDecode { message: e.to_string() })
}

pub fn write_item_memory<W: Write>(writer: &mut W, im: &ItemMemory) -> Result<(), IoError> {
    writer
        .write_all(&encode(im)?)
        .map_err(|source| IoError::Io { source })
}

pub fn read_item_memory<R: Read>(mut reader: R) -> Result<ItemMemory, IoError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|source| IoError::Io { source })?;
    decode(&bytes)
}

pub fn write_continuous_item_memory<W: Write>(
    writer: &mut W,
    cim: &ContinuousItemMemory,
) -> Result<(), IoError> {
    writer
        .write_all(&encode(cim)?)
        .map_err(|source| IoError::Io { source })
}

pub fn read_continuous_item_memory<R: Read>(mut reader: R) -> Result<ContinuousItemMemory, IoError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|source| IoError::Io { source })?;
    decode(&bytes)
}

pub fn write_precomputed_item_memory<W: Write>(
    writer: &mut W,
    pim: &PrecomputedItemMemory,
) -> Result<(), IoError> {
    writer
        .write_all(&encode(pim)?)
        .map_err(|source| IoError::Io { source })
}

pub fn read_precomputed_item_memory<R: Read>(mut reader: R) -> Result<PrecomputedItemMemory, IoError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|source| IoError::Io { source })?;
    decode(&bytes)
}
