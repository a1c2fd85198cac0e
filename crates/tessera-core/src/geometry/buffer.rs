// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed attribute buffers and strided views over them.

use std::fmt;
use std::sync::Arc;

/// Element type of a raw attribute payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferElementType {
    /// 32-bit float.
    F32,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit unsigned integer.
    U16,
    /// 8-bit unsigned integer.
    U8,
}

impl BufferElementType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            BufferElementType::F32 | BufferElementType::U32 => 4,
            BufferElementType::U16 => 2,
            BufferElementType::U8 => 1,
        }
    }
}

/// An error raised while interpreting raw buffer bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The payload is not a whole number of elements.
    LengthMismatch {
        /// Payload length in bytes.
        len: usize,
        /// Element size in bytes.
        element_size: usize,
    },
    /// A view reaches past the end of its buffer.
    OutOfBounds {
        /// Attribute name.
        name: String,
        /// Highest element index the view needs.
        needed: usize,
        /// Elements available.
        available: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::LengthMismatch { len, element_size } => write!(
                f,
                "Buffer of {len} bytes is not a multiple of the {element_size}-byte element size"
            ),
            BufferError::OutOfBounds {
                name,
                needed,
                available,
            } => write!(
                f,
                "Attribute '{name}' needs element {needed} but the buffer holds {available}"
            ),
        }
    }
}

impl std::error::Error for BufferError {}

/// Typed storage of one attribute or index buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferData {
    /// 32-bit floats.
    F32(Vec<f32>),
    /// 32-bit unsigned integers.
    U32(Vec<u32>),
    /// 16-bit unsigned integers.
    U16(Vec<u16>),
    /// 8-bit unsigned integers.
    U8(Vec<u8>),
}

impl BufferData {
    /// Reinterprets a little-endian byte payload as typed elements.
    ///
    /// The payload does not need to be aligned.
    pub fn from_bytes(ty: BufferElementType, bytes: &[u8]) -> Result<Self, BufferError> {
        let element_size = ty.size();
        if bytes.len() % element_size != 0 {
            return Err(BufferError::LengthMismatch {
                len: bytes.len(),
                element_size,
            });
        }
        Ok(match ty {
            BufferElementType::F32 => BufferData::F32(bytemuck::pod_collect_to_vec(bytes)),
            BufferElementType::U32 => BufferData::U32(bytemuck::pod_collect_to_vec(bytes)),
            BufferElementType::U16 => BufferData::U16(bytemuck::pod_collect_to_vec(bytes)),
            BufferElementType::U8 => BufferData::U8(bytes.to_vec()),
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            BufferData::F32(v) => v.len(),
            BufferData::U32(v) => v.len(),
            BufferData::U16(v) => v.len(),
            BufferData::U8(v) => v.len(),
        }
    }

    /// `true` when the buffer holds no element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type.
    pub fn element_type(&self) -> BufferElementType {
        match self {
            BufferData::F32(_) => BufferElementType::F32,
            BufferData::U32(_) => BufferElementType::U32,
            BufferData::U16(_) => BufferElementType::U16,
            BufferData::U8(_) => BufferElementType::U8,
        }
    }

    /// Element `i` widened to `f32`.
    pub fn get_f32(&self, i: usize) -> Option<f32> {
        match self {
            BufferData::F32(v) => v.get(i).copied(),
            BufferData::U32(v) => v.get(i).map(|&x| x as f32),
            BufferData::U16(v) => v.get(i).map(|&x| f32::from(x)),
            BufferData::U8(v) => v.get(i).map(|&x| f32::from(x)),
        }
    }

    /// Element `i` as an index. Float buffers yield `None`.
    pub fn get_index(&self, i: usize) -> Option<u32> {
        match self {
            BufferData::F32(_) => None,
            BufferData::U32(v) => v.get(i).copied(),
            BufferData::U16(v) => v.get(i).map(|&x| u32::from(x)),
            BufferData::U8(v) => v.get(i).map(|&x| u32::from(x)),
        }
    }
}

/// A named, possibly strided view of a shared buffer.
///
/// Tight attributes have `stride == item_size` and `offset == 0`; views
/// produced by de-interleaving share the interleaved storage.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferAttribute {
    /// Attribute name (`position`, `normal`, `uv`, `color`, `extrusionAxis`, `index`...).
    pub name: String,
    /// Shared storage.
    pub data: Arc<BufferData>,
    /// Components per item.
    pub item_size: usize,
    /// Integer components are normalized to `[0, 1]` on the GPU.
    pub normalized: bool,
    /// Elements between consecutive items.
    pub stride: usize,
    /// Element offset of the first item.
    pub offset: usize,
}

impl BufferAttribute {
    /// A tightly packed attribute.
    pub fn new(name: impl Into<String>, data: BufferData, item_size: usize) -> Self {
        Self::shared(name, Arc::new(data), item_size)
    }

    /// A tightly packed attribute over shared storage.
    pub fn shared(name: impl Into<String>, data: Arc<BufferData>, item_size: usize) -> Self {
        Self {
            name: name.into(),
            data,
            item_size: item_size.max(1),
            normalized: false,
            stride: item_size.max(1),
            offset: 0,
        }
    }

    /// A float attribute from a plain vector.
    pub fn from_f32(name: impl Into<String>, values: Vec<f32>, item_size: usize) -> Self {
        Self::new(name, BufferData::F32(values), item_size)
    }

    /// A 32-bit index buffer.
    pub fn index(values: Vec<u32>) -> Self {
        Self::new("index", BufferData::U32(values), 1)
    }

    /// Number of complete items in the view.
    pub fn count(&self) -> usize {
        let len = self.data.len();
        if len < self.offset + self.item_size {
            0
        } else {
            (len - self.offset - self.item_size) / self.stride + 1
        }
    }

    /// Component `component` of item `item`.
    pub fn get(&self, item: usize, component: usize) -> Option<f32> {
        if component >= self.item_size {
            return None;
        }
        self.data
            .get_f32(self.offset + item * self.stride + component)
    }

    /// Item `item` as an index value.
    pub fn get_index(&self, item: usize) -> Option<u32> {
        self.data.get_index(self.offset + item * self.stride)
    }

    /// Verifies that `items` items fit in the buffer.
    pub fn check_items(&self, items: usize) -> Result<(), BufferError> {
        if items <= self.count() {
            Ok(())
        } else {
            Err(BufferError::OutOfBounds {
                name: self.name.clone(),
                needed: items.saturating_sub(1),
                available: self.count(),
            })
        }
    }
}

/// One attribute described inside an [`InterleavedBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavedAttribute {
    /// Attribute name.
    pub name: String,
    /// Components per item.
    pub item_size: usize,
    /// Element offset inside one interleaved record.
    pub offset: usize,
}

/// Several attributes packed record by record into one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedBuffer {
    /// Shared storage.
    pub data: Arc<BufferData>,
    /// Elements per record.
    pub stride: usize,
    /// Attributes inside each record.
    pub attributes: Vec<InterleavedAttribute>,
}

impl InterleavedBuffer {
    /// Splits the buffer into one strided view per attribute, sharing storage.
    pub fn views(&self) -> impl Iterator<Item = BufferAttribute> + '_ {
        self.attributes.iter().map(move |a| BufferAttribute {
            name: a.name.clone(),
            data: Arc::clone(&self.data),
            item_size: a.item_size.max(1),
            normalized: false,
            stride: self.stride.max(1),
            offset: a.offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_into_typed_elements() {
        let bytes: Vec<u8> = [1.5f32, -2.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        let data = BufferData::from_bytes(BufferElementType::F32, &bytes).unwrap();
        assert_eq!(data, BufferData::F32(vec![1.5, -2.0]));
    }

    #[test]
    fn unaligned_payload_is_accepted() {
        let mut bytes = vec![0u8; 9];
        bytes[1..5].copy_from_slice(&7u32.to_le_bytes());
        bytes[5..9].copy_from_slice(&9u32.to_le_bytes());
        let data = BufferData::from_bytes(BufferElementType::U32, &bytes[1..]).unwrap();
        assert_eq!(data, BufferData::U32(vec![7, 9]));
    }

    #[test]
    fn ragged_payload_is_rejected() {
        let err = BufferData::from_bytes(BufferElementType::U16, &[0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                len: 3,
                element_size: 2
            }
        );
    }

    #[test]
    fn interleaved_views_are_strided() {
        // Two records of [x, y, z, u, v].
        let buffer = InterleavedBuffer {
            data: Arc::new(BufferData::F32(vec![
                0.0, 1.0, 2.0, 0.25, 0.5, //
                3.0, 4.0, 5.0, 0.75, 1.0,
            ])),
            stride: 5,
            attributes: vec![
                InterleavedAttribute {
                    name: "position".into(),
                    item_size: 3,
                    offset: 0,
                },
                InterleavedAttribute {
                    name: "uv".into(),
                    item_size: 2,
                    offset: 3,
                },
            ],
        };
        let views: Vec<_> = buffer.views().collect();
        assert_eq!(views[0].count(), 2);
        assert_eq!(views[1].count(), 2);
        assert_eq!(views[0].get(1, 2), Some(5.0));
        assert_eq!(views[1].get(1, 0), Some(0.75));
        assert_eq!(views[1].get(0, 2), None);
        assert!(Arc::ptr_eq(&views[0].data, &views[1].data));
    }
}
