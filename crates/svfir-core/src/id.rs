//! Stable ID newtypes for IR entities.
//!
//! Every namespace gets its own newtype over `u32` so that a `VarId` cannot
//! be passed where an `IcfgNodeId` is expected. Basic blocks are only unique
//! within their function, so they are addressed by [`BlockKey`].

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                $name(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

id_newtype!(
    /// Type descriptor identifier.
    TypeId
);
id_newtype!(
    /// Struct layout info identifier. Separate counter from [`TypeId`].
    StInfoId
);
id_newtype!(
    /// Program variable (PAG node) identifier.
    VarId
);
id_newtype!(
    /// Statement (PAG edge) identifier.
    StmtId
);
id_newtype!(
    /// Interprocedural control-flow graph node identifier.
    IcfgNodeId
);
id_newtype!(
    /// Call graph node identifier.
    CallGraphNodeId
);
id_newtype!(
    /// Class hierarchy node identifier.
    ChNodeId
);
id_newtype!(
    /// Basic block identifier, local to its function.
    BlockId
);

/// Globally unique address of a basic block: owning function plus local id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockKey {
    pub function: VarId,
    pub block: BlockId,
}

impl BlockKey {
    pub fn new(function: VarId, block: BlockId) -> Self {
        BlockKey { function, block }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.function, self.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(VarId(12).to_string(), "12");
        assert_eq!(TypeId::from(3), TypeId(3));
    }

    #[test]
    fn block_key_orders_by_function_first() {
        let a = BlockKey::new(VarId(1), BlockId(9));
        let b = BlockKey::new(VarId(2), BlockId(0));
        assert!(a < b);
        assert_eq!(a.to_string(), "1:9");
    }
}
