use svfir_core::{ChEdge, ChEdgeKind, ChNode, ChNodeId, VarId};

use super::{invalid, var_id, Built};
use crate::codec::decode_nested;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Entity, EntityRef, LoadSession};

pub(super) fn build_ch_node(record: &Record, session: &LoadSession) -> Built {
    let id = ChNodeId(record.req_id("id")?);
    let mut binder = session.binder(EntityRef::ChNode(id));

    let mut virtual_functions = Vec::new();
    for vtable in record.decoded("virtual_function_vectors", decode_nested::<VarId>)? {
        virtual_functions.push(binder.many(Field::ChVirtualFunctions, vtable)?);
    }

    let node = ChNode {
        id,
        class_name: record.text("class_name")?.to_string(),
        vtable: binder.one(Field::ChVtable, var_id(record, "vtable_id")?)?,
        flags: record.uint("flags")?,
        virtual_functions,
    };
    Ok((Entity::ChNode(node), binder.finish()))
}

pub(super) fn build_ch_edge(record: &Record, session: &LoadSession) -> Built {
    let code = record.int("edge_type")?;
    let kind = ChEdgeKind::from_code(code)
        .ok_or_else(|| invalid("edge_type", format!("unknown class edge kind {}", code)))?;
    let edge = ChEdge {
        src: ChNodeId(record.src()?),
        dst: ChNodeId(record.dst()?),
        kind,
    };
    let mut binder = session.binder(EntityRef::ChEdge(edge));
    binder.required(Field::ChEdgeSrc, Some(edge.src))?;
    binder.required(Field::ChEdgeDst, Some(edge.dst))?;
    Ok((Entity::ChEdge(edge), binder.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::{ch_edge_statement, ch_node_statement};
    use crate::reconstruct::stored;
    use svfir_core::{SvfVar, TypeId, VarKind};

    fn session_with_functions(ids: &[u32]) -> LoadSession {
        let mut session = LoadSession::new();
        for id in ids {
            session.commit(
                Entity::Var(SvfVar {
                    id: VarId(*id),
                    ty: TypeId(0),
                    icfg_node: None,
                    kind: VarKind::Val,
                }),
                Vec::new(),
            );
        }
        session
    }

    #[test]
    fn test_missing_virtual_functions_are_dropped() {
        let session = session_with_functions(&[20, 21]);
        let node = ChNode {
            id: ChNodeId(0),
            class_name: "Base".into(),
            vtable: Some(VarId(99)),
            flags: 1,
            virtual_functions: vec![vec![VarId(20), VarId(98), VarId(21)], vec![]],
        };
        let (entity, patches) = build_ch_node(&stored(&ch_node_statement(&node)), &session).unwrap();
        assert!(patches.is_empty());
        let Entity::ChNode(built) = entity else { panic!("not a class node") };
        assert_eq!(built.vtable, None);
        assert_eq!(built.virtual_functions, vec![vec![VarId(20), VarId(21)], vec![]]);
        assert_eq!(built.class_name, "Base");
    }

    #[test]
    fn test_edge_kind_and_endpoints() {
        let mut session = LoadSession::new();
        for id in [0, 1] {
            let node = ChNode {
                id: ChNodeId(id),
                class_name: format!("C{}", id),
                vtable: None,
                flags: 0,
                virtual_functions: vec![],
            };
            let (entity, patches) = build_ch_node(&stored(&ch_node_statement(&node)), &session).unwrap();
            session.commit(entity, patches);
        }
        let edge = ChEdge {
            src: ChNodeId(1),
            dst: ChNodeId(0),
            kind: ChEdgeKind::Inheritance,
        };
        let (entity, _) = build_ch_edge(&stored(&ch_edge_statement(&edge)), &session).unwrap();
        assert_eq!(entity, Entity::ChEdge(edge));

        let dangling = ChEdge { dst: ChNodeId(5), ..edge };
        assert!(build_ch_edge(&stored(&ch_edge_statement(&dangling)), &session).is_err());
    }
}
