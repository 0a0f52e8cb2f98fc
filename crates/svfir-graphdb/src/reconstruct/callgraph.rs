use std::collections::BTreeSet;

use svfir_core::{
    CallEdgeKind, CallGraphEdge, CallGraphEdgeKey, CallGraphNode, CallGraphNodeId, IcfgNodeId,
};

use super::{invalid, var_id, Built};
use crate::codec::decode_set;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Entity, EntityRef, LoadSession};

pub(super) fn build_call_graph_node(record: &Record, session: &LoadSession) -> Built {
    let id = CallGraphNodeId(record.req_id("id")?);
    let mut binder = session.binder(EntityRef::CallGraphNode(id));
    let node = CallGraphNode {
        id,
        function: binder.required(Field::CgFunction, var_id(record, "fun_obj_var_id")?)?,
        name: record.text("fun_name")?.to_string(),
        source_loc: record.text("source_loc")?.to_string(),
    };
    Ok((Entity::CallGraphNode(node), binder.finish()))
}

pub(super) fn build_call_graph_edge(record: &Record, session: &LoadSession) -> Built {
    let key = CallGraphEdgeKey {
        src: CallGraphNodeId(record.src()?),
        dst: CallGraphNodeId(record.dst()?),
        call_site_id: record.uint("csid")?,
    };
    let mut binder = session.binder(EntityRef::CallGraphEdge(key));
    binder.required(Field::CgEdgeSrc, Some(key.src))?;
    binder.required(Field::CgEdgeDst, Some(key.dst))?;

    let code = record.int("kind")?;
    let kind = CallEdgeKind::from_code(code)
        .ok_or_else(|| invalid("kind", format!("unknown call edge kind {}", code)))?;
    let direct_calls: BTreeSet<IcfgNodeId> = binder.many(
        Field::CgDirectCalls,
        record.decoded("direct_call_set", decode_set::<IcfgNodeId>)?,
    )?;
    let indirect_calls: BTreeSet<IcfgNodeId> = binder.many(
        Field::CgIndirectCalls,
        record.decoded("indirect_call_set", decode_set::<IcfgNodeId>)?,
    )?;

    let edge = CallGraphEdge {
        src: key.src,
        dst: key.dst,
        call_site_id: key.call_site_id,
        kind,
        direct_calls,
        indirect_calls,
    };
    Ok((Entity::CallGraphEdge(edge), binder.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use crate::marshal::{call_graph_edge_statement, call_graph_node_statement};
    use crate::reconstruct::stored;
    use svfir_core::{FunObj, SvfVar, TypeId, VarId, VarKind};

    fn session_with_nodes() -> LoadSession {
        let mut session = LoadSession::new();
        for (id, function) in [(0, 10), (1, 11)] {
            session.commit(
                Entity::Var(SvfVar {
                    id: VarId(function),
                    ty: TypeId(0),
                    icfg_node: None,
                    kind: VarKind::FunObj(Box::new(FunObj::default())),
                }),
                Vec::new(),
            );
            let node = CallGraphNode {
                id: CallGraphNodeId(id),
                function: VarId(function),
                name: format!("f{}", function),
                source_loc: String::new(),
            };
            let (entity, patches) =
                build_call_graph_node(&stored(&call_graph_node_statement(&node)), &session).unwrap();
            assert_eq!(entity, Entity::CallGraphNode(node));
            session.commit(entity, patches);
        }
        session
    }

    #[test]
    fn test_edge_requires_known_call_sites() {
        let session = session_with_nodes();
        let edge = CallGraphEdge {
            src: CallGraphNodeId(0),
            dst: CallGraphNodeId(1),
            call_site_id: 4,
            kind: CallEdgeKind::ThreadFork,
            direct_calls: BTreeSet::new(),
            indirect_calls: BTreeSet::new(),
        };
        let (entity, patches) =
            build_call_graph_edge(&stored(&call_graph_edge_statement(&edge)), &session).unwrap();
        assert!(patches.is_empty());
        assert_eq!(entity, Entity::CallGraphEdge(edge.clone()));

        let with_site = CallGraphEdge {
            direct_calls: [IcfgNodeId(7)].into_iter().collect(),
            ..edge
        };
        let err = build_call_graph_edge(&stored(&call_graph_edge_statement(&with_site)), &session)
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingReference { field: Field::CgDirectCalls, .. }));
    }

    #[test]
    fn test_node_of_unknown_function_rejected() {
        let session = LoadSession::new();
        let node = CallGraphNode {
            id: CallGraphNodeId(0),
            function: VarId(3),
            name: "main".into(),
            source_loc: String::new(),
        };
        assert!(build_call_graph_node(&stored(&call_graph_node_statement(&node)), &session).is_err());
    }
}
