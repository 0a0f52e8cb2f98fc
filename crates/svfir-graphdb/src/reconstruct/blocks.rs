use svfir_core::{BasicBlock, BlockEdge, BlockId, BlockKey, IcfgNodeId, VarId};

use super::Built;
use crate::codec::decode_list;
use crate::error::RecordError;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Entity, EntityRef, LoadSession};

pub(super) fn build_block(record: &Record, session: &LoadSession) -> Built {
    let id = BlockId(record.uint("id")?);
    let function = VarId(record.req_id("fun_obj_var_id")?);
    let mut binder = session.binder(EntityRef::Block(BlockKey::new(function, id)));

    binder.required(Field::BlockFunction, Some(function))?;

    // Sibling blocks may load later in the same batch.
    let siblings = |key: &str| -> Result<Vec<BlockKey>, RecordError> {
        Ok(record
            .decoded(key, decode_list::<BlockId>)?
            .into_iter()
            .map(|b| BlockKey::new(function, b))
            .collect())
    };
    let succs: Vec<BlockKey> = binder.many(Field::BlockSuccs, siblings("sscc_bb_ids")?)?;
    let preds: Vec<BlockKey> = binder.many(Field::BlockPreds, siblings("pred_bb_ids")?)?;

    let block = BasicBlock {
        function,
        id,
        name: record.text("bb_name")?.to_string(),
        succs: succs.into_iter().map(|k| k.block).collect(),
        preds: preds.into_iter().map(|k| k.block).collect(),
        icfg_nodes: binder.many(
            Field::BlockIcfgNodes,
            record.decoded("all_icfg_nodes_ids", decode_list::<IcfgNodeId>)?,
        )?,
    };
    Ok((Entity::Block(block), binder.finish()))
}

pub(super) fn build_block_edge(record: &Record, session: &LoadSession) -> Built {
    let function = VarId(record.req_id("fun_obj_var_id")?);
    let src = BlockKey::new(function, BlockId(record.src()?));
    let dst = BlockKey::new(function, BlockId(record.dst()?));
    let edge = BlockEdge {
        function,
        src: src.block,
        dst: dst.block,
    };
    let mut binder = session.binder(EntityRef::BlockEdge(edge));
    binder.required(Field::BlockEdgeSrc, Some(src))?;
    binder.required(Field::BlockEdgeDst, Some(dst))?;
    Ok((Entity::BlockEdge(edge), binder.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::{block_edge_statement, block_statement};
    use crate::reconstruct::stored;
    use svfir_core::{FunObj, SvfVar, TypeId, VarKind};

    fn block(id: u32, succs: &[u32], preds: &[u32]) -> BasicBlock {
        BasicBlock {
            function: VarId(10),
            id: BlockId(id),
            name: format!("bb{}", id),
            succs: succs.iter().map(|b| BlockId(*b)).collect(),
            preds: preds.iter().map(|b| BlockId(*b)).collect(),
            icfg_nodes: vec![],
        }
    }

    fn session_with_function() -> LoadSession {
        let mut session = LoadSession::new();
        session.commit(
            Entity::Var(SvfVar {
                id: VarId(10),
                ty: TypeId(0),
                icfg_node: None,
                kind: VarKind::FunObj(Box::new(FunObj::default())),
            }),
            Vec::new(),
        );
        session
    }

    #[test]
    fn test_forward_sibling_blocks_are_kept() {
        let mut session = session_with_function();
        let first = block(0, &[1], &[]);
        let (entity, patches) = build_block(&stored(&block_statement(&first)), &session).unwrap();
        assert_eq!(entity, Entity::Block(first));
        assert_eq!(patches.len(), 1);
        session.commit(entity, patches);

        let second = block(1, &[], &[0]);
        let (entity, patches) = build_block(&stored(&block_statement(&second)), &session).unwrap();
        assert!(patches.is_empty());
        session.commit(entity, patches);
        assert_eq!(session.resolve_deferred(), 0);
    }

    #[test]
    fn test_block_of_unknown_function_rejected() {
        let session = LoadSession::new();
        let err = build_block(&stored(&block_statement(&block(0, &[], &[]))), &session).unwrap_err();
        assert!(matches!(err, RecordError::MissingReference { field: Field::BlockFunction, .. }));
    }

    #[test]
    fn test_block_edge_needs_both_blocks() {
        let mut session = session_with_function();
        let (entity, patches) = build_block(&stored(&block_statement(&block(0, &[], &[]))), &session).unwrap();
        session.commit(entity, patches);

        let edge = BlockEdge {
            function: VarId(10),
            src: BlockId(0),
            dst: BlockId(1),
        };
        let err = build_block_edge(&stored(&block_edge_statement(&edge)), &session).unwrap_err();
        assert!(matches!(err, RecordError::MissingReference { field: Field::BlockEdgeDst, .. }));
    }
}
