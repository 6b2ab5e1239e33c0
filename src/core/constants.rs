//! Capacity limits and layout constants for the oblivtree engine.

/// Maximum number of split thresholds a single binary-feature bucket may
/// hold. Bucket values and split positions are stored as one byte each, so a
/// feature with more distinct splits cannot be represented.
pub const MAX_BUCKET_SPLIT_COUNT: usize = 255;

/// Number of objects binarized and evaluated per block.
///
/// Bucket values for a block are computed once and reused by every tree,
/// which keeps the working set of the evaluation loop inside the cache.
pub const EVALUATION_BLOCK_SIZE: usize = 128;

/// Maximum supported tree depth. Leaf indexes are accumulated in a `usize`,
/// one bit per level.
pub const MAX_TREE_DEPTH: usize = usize::BITS as usize - 1;

/// Magic bytes opening a serialized model container.
pub const MODEL_FILE_MAGIC: [u8; 8] = *b"OBLVTREE";

/// Version of the serialized model container format.
pub const MODEL_FORMAT_VERSION: u32 = 1;
