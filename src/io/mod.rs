//! Model persistence: a length-prefixed binary container.
//!
//! The container layout is 8 magic bytes, a little-endian `u32` format
//! version, a little-endian `u64` payload length, then the bincode-encoded
//! model payload. Leaf values travel inside the payload as one flat stream
//! and are re-chunked per tree on load; fields absent from a payload default
//! to empty containers.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::constants::{MODEL_FILE_MAGIC, MODEL_FORMAT_VERSION};
use crate::core::error::{OblivTreeError, Result};
use crate::model::FullModel;

/// Serialize a model to an in-memory byte container.
pub fn serialize_model(model: &FullModel) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_model_stream(model, &mut buffer)?;
    Ok(buffer)
}

/// Deserialize a model from an in-memory byte container. See
/// [`FullModel::load`] for the state of the returned model.
pub fn deserialize_model(data: &[u8]) -> Result<FullModel> {
    let mut reader = data;
    read_model_stream(&mut reader)
}

/// Write a model container to a file.
pub fn output_model<P: AsRef<Path>>(model: &FullModel, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_model_stream(model, &mut writer)?;
    writer.flush()?;
    log::info!(
        "wrote model with {} trees to {}",
        model.tree_count(),
        path.display(),
    );
    Ok(())
}

/// Read a model container from a file.
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<FullModel> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let model = read_model_stream(&mut reader)?;
    log::info!(
        "read model with {} trees from {}",
        model.tree_count(),
        path.display(),
    );
    Ok(model)
}

/// Pretty-printed JSON dump of the model information map, for debugging and
/// reporting.
pub fn model_info_to_json(model: &FullModel) -> Result<String> {
    Ok(serde_json::to_string_pretty(&model.model_info)?)
}

pub(crate) fn write_model_stream<W: Write>(model: &FullModel, writer: &mut W) -> Result<()> {
    let payload = bincode::serialize(model)?;
    writer.write_all(&MODEL_FILE_MAGIC)?;
    writer.write_all(&MODEL_FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(payload.len() as u64).to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

pub(crate) fn read_model_stream<R: Read>(reader: &mut R) -> Result<FullModel> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if magic != MODEL_FILE_MAGIC {
        return Err(OblivTreeError::serialization(format!(
            "unrecognized container magic {:02x?}",
            magic,
        )));
    }
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != MODEL_FORMAT_VERSION {
        return Err(OblivTreeError::VersionMismatch {
            expected: MODEL_FORMAT_VERSION,
            found: version,
        });
    }
    let mut payload_len = [0u8; 8];
    reader.read_exact(&mut payload_len)?;
    let payload_len = u64::from_le_bytes(payload_len) as usize;
    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload)?;

    let mut model: FullModel = bincode::deserialize(&payload)?;
    model.oblivious_trees.update_metadata();
    log::debug!(
        "deserialized model: {} trees, {} binary features",
        model.tree_count(),
        model.oblivious_trees.binary_features_full_count(),
    );
    Ok(model)
}
