//! Type descriptors and struct layout info.
//!
//! Type descriptors form a satellite graph: function, struct and array
//! descriptors reference other descriptors by [`TypeId`], and aggregate
//! descriptors point at their flattened layout in [`StInfo`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{StInfoId, TypeId};

/// A type descriptor.
///
/// Reference fields that may be filled in after construction (because the
/// referenced descriptor is loaded later) are `Option`s; a `None` in a
/// reconstructed graph means the reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvfType {
    pub id: TypeId,
    pub byte_size: u32,
    pub single_value: bool,
    /// Descriptor of `i8`, shared by all types of a module.
    pub i8_type: Option<TypeId>,
    /// Descriptor of the opaque pointer type.
    pub ptr_type: Option<TypeId>,
    pub kind: SvfTypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvfTypeKind {
    Pointer,
    Integer {
        /// Bit width, negated for signed integers.
        sign_and_width: i16,
    },
    Function {
        ret: Option<TypeId>,
        params: Vec<TypeId>,
    },
    Struct {
        name: String,
        fields: Vec<TypeId>,
        st_info: Option<StInfoId>,
    },
    Array {
        elements: u32,
        element: Option<TypeId>,
        st_info: Option<StInfoId>,
    },
    Other {
        repr: String,
    },
}

/// Fieldless mirror of [`SvfTypeKind`], used as the persisted kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Pointer,
    Integer,
    Function,
    Struct,
    Array,
    Other,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Pointer,
        TypeTag::Integer,
        TypeTag::Function,
        TypeTag::Struct,
        TypeTag::Array,
        TypeTag::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TypeTag::Pointer => "SVFPointerType",
            TypeTag::Integer => "SVFIntegerType",
            TypeTag::Function => "SVFFunctionType",
            TypeTag::Struct => "SVFStructType",
            TypeTag::Array => "SVFArrayType",
            TypeTag::Other => "SVFOtherType",
        }
    }
}

impl SvfTypeKind {
    pub fn tag(&self) -> TypeTag {
        match self {
            SvfTypeKind::Pointer => TypeTag::Pointer,
            SvfTypeKind::Integer { .. } => TypeTag::Integer,
            SvfTypeKind::Function { .. } => TypeTag::Function,
            SvfTypeKind::Struct { .. } => TypeTag::Struct,
            SvfTypeKind::Array { .. } => TypeTag::Array,
            SvfTypeKind::Other { .. } => TypeTag::Other,
        }
    }
}

impl SvfType {
    pub fn tag(&self) -> TypeTag {
        self.kind.tag()
    }
}

/// Flattened layout of an aggregate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StInfo {
    pub id: StInfoId,
    /// Flattened field index of each source-level field.
    pub field_indices: Vec<u32>,
    /// Flattened element index of each source-level element.
    pub element_indices: Vec<u32>,
    /// Flattened field index to the type found there.
    pub field_types: BTreeMap<u32, TypeId>,
    pub finfo_types: Vec<TypeId>,
    pub flatten_element_types: Vec<TypeId>,
    pub stride: u32,
    pub flatten_elements: u32,
    pub flatten_fields: u32,
}
