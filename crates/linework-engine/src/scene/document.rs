use core::fmt;
use core::ops::Range;

use serde::Deserialize;

use super::BatchKey;
use crate::coords::{Bounds, Vec2};
use crate::paint::Rgb;

/// Output of a scene parser: one drawing, ready to be batched.
///
/// Owned by a single load cycle. The viewer moves `buffers` into a shared
/// arena when the load starts and drops it on the next clear.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    /// Coordinates in the buffers are relative to this point.
    #[serde(default)]
    pub origin: Vec2,
    /// Absolute drawing extents. `None` for an empty drawing.
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
    #[serde(default)]
    pub batches: Vec<BatchDescriptor>,
    #[serde(flatten)]
    pub buffers: SceneBuffers,
    /// Some text glyphs could not be resolved by the parser's fonts.
    #[serde(default)]
    pub has_missing_chars: bool,
    /// Point-instance markers also draw a dot at every placement.
    #[serde(default)]
    pub point_shape_has_dot: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub color: Rgb,
}

impl LayerDescriptor {
    pub fn new(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            color,
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Geometry slice of an indexed batch. Indices are local to the chunk's vertices.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDescriptor {
    pub vertices_offset: usize,
    pub vertices_size: usize,
    pub indices_offset: usize,
    pub indices_size: usize,
}

impl ChunkDescriptor {
    #[inline]
    pub fn vertices(&self) -> BufferRange {
        BufferRange::new(self.vertices_offset, self.vertices_size)
    }

    #[inline]
    pub fn indices(&self) -> BufferRange {
        BufferRange::new(self.indices_offset, self.indices_size)
    }
}

/// One batch as described by the parser.
///
/// Unindexed geometry uses `vertices_offset`/`vertices_size`; indexed
/// geometry uses `chunks`. Instance batches carry `transforms_*`.
/// Offsets and sizes count elements, not bytes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDescriptor {
    pub key: BatchKey,
    #[serde(default)]
    pub vertices_offset: Option<usize>,
    #[serde(default)]
    pub vertices_size: Option<usize>,
    #[serde(default)]
    pub chunks: Vec<ChunkDescriptor>,
    #[serde(default)]
    pub transforms_offset: Option<usize>,
    #[serde(default)]
    pub transforms_size: Option<usize>,
    #[serde(default)]
    pub lineweight: Option<i32>,
}

impl BatchDescriptor {
    pub fn new(key: BatchKey) -> Self {
        Self {
            key,
            vertices_offset: None,
            vertices_size: None,
            chunks: Vec::new(),
            transforms_offset: None,
            transforms_size: None,
            lineweight: None,
        }
    }

    pub fn with_vertices(mut self, offset: usize, size: usize) -> Self {
        self.vertices_offset = Some(offset);
        self.vertices_size = Some(size);
        self
    }

    pub fn with_chunk(mut self, chunk: ChunkDescriptor) -> Self {
        self.chunks.push(chunk);
        self
    }

    pub fn with_transforms(mut self, offset: usize, size: usize) -> Self {
        self.transforms_offset = Some(offset);
        self.transforms_size = Some(size);
        self
    }

    pub fn with_lineweight(mut self, lineweight: i32) -> Self {
        self.lineweight = Some(lineweight);
        self
    }

    /// Direct vertex slice, if the descriptor declares one.
    pub fn vertices(&self) -> Option<BufferRange> {
        match (self.vertices_offset, self.vertices_size) {
            (Some(offset), Some(size)) => Some(BufferRange::new(offset, size)),
            _ => None,
        }
    }

    pub fn transforms(&self) -> Option<BufferRange> {
        match (self.transforms_offset, self.transforms_size) {
            (Some(offset), Some(size)) => Some(BufferRange::new(offset, size)),
            _ => None,
        }
    }
}

/// Element range into one of the shared scene buffers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BufferRange {
    pub offset: usize,
    pub len: usize,
}

impl BufferRange {
    #[inline]
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_range(self) -> Option<Range<usize>> {
        let end = self.offset.checked_add(self.len)?;
        Some(self.offset..end)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertices,
    Indices,
    Transforms,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertices => "vertices",
            Self::Indices => "indices",
            Self::Transforms => "transforms",
        })
    }
}

/// A range that does not fit its buffer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RangeError {
    pub kind: BufferKind,
    pub range: BufferRange,
    pub available: usize,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} range {}+{} exceeds buffer of {} elements",
            self.kind, self.range.offset, self.range.len, self.available
        )
    }
}

impl std::error::Error for RangeError {}

/// The flat geometry arena shared by every batch of a document.
///
/// Vertices are `(x, y)` pairs relative to the document origin. Transforms
/// are packed per instance: six floats for block placements, two for points.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SceneBuffers {
    #[serde(default)]
    pub vertices: Vec<f32>,
    #[serde(default)]
    pub indices: Vec<u16>,
    #[serde(default)]
    pub transforms: Vec<f32>,
}

impl SceneBuffers {
    /// Decodes little-endian binary buffers as produced by a worker process.
    pub fn from_le_bytes(vertices: &[u8], indices: &[u8], transforms: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            vertices: decode_f32(vertices, BufferKind::Vertices)?,
            indices: decode_u16(indices)?,
            transforms: decode_f32(transforms, BufferKind::Transforms)?,
        })
    }

    /// Total size in bytes.
    pub fn byte_len(&self) -> usize {
        self.vertices.len() * size_of::<f32>()
            + self.indices.len() * size_of::<u16>()
            + self.transforms.len() * size_of::<f32>()
    }

    pub fn len_of(&self, kind: BufferKind) -> usize {
        match kind {
            BufferKind::Vertices => self.vertices.len(),
            BufferKind::Indices => self.indices.len(),
            BufferKind::Transforms => self.transforms.len(),
        }
    }

    /// Verifies that `range` lies inside the `kind` buffer.
    pub fn check(&self, kind: BufferKind, range: BufferRange) -> Result<(), RangeError> {
        let available = self.len_of(kind);
        match range.as_range() {
            Some(r) if r.end <= available => Ok(()),
            _ => Err(RangeError {
                kind,
                range,
                available,
            }),
        }
    }

    /// Empty for a range that was never checked and does not fit.
    #[inline]
    pub fn vertices(&self, range: BufferRange) -> &[f32] {
        slice(&self.vertices, range)
    }

    #[inline]
    pub fn indices(&self, range: BufferRange) -> &[u16] {
        slice(&self.indices, range)
    }

    #[inline]
    pub fn transforms(&self, range: BufferRange) -> &[f32] {
        slice(&self.transforms, range)
    }
}

fn slice<T>(buf: &[T], range: BufferRange) -> &[T] {
    range
        .as_range()
        .and_then(|r| buf.get(r))
        .unwrap_or(&[])
}

fn decode_f32(bytes: &[u8], kind: BufferKind) -> anyhow::Result<Vec<f32>> {
    let words: Vec<u32> = decode(bytes, kind)?;
    Ok(words.into_iter().map(|w| f32::from_bits(u32::from_le(w))).collect())
}

fn decode_u16(bytes: &[u8]) -> anyhow::Result<Vec<u16>> {
    let words: Vec<u16> = decode(bytes, BufferKind::Indices)?;
    Ok(words.into_iter().map(u16::from_le).collect())
}

/// Copies `bytes` into native words. The `from_le` pass in the callers is a
/// no-op on little-endian targets and byte-swaps elsewhere.
fn decode<T: bytemuck::Pod>(bytes: &[u8], kind: BufferKind) -> anyhow::Result<Vec<T>> {
    let width = size_of::<T>();
    anyhow::ensure!(
        bytes.len() % width == 0,
        "{kind} buffer length {} is not a multiple of {width}",
        bytes.len()
    );
    // Copying avoids the alignment requirement of a cast.
    Ok(bytemuck::pod_collect_to_vec(bytes))
}
