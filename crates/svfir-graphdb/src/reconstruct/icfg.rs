use std::collections::BTreeSet;

use svfir_core::{
    BlockId, BlockKey, BranchCondition, CallSite, ChNodeId, IcfgEdge, IcfgEdgeKey, IcfgEdgeKind,
    IcfgEdgeTag, IcfgNode, IcfgNodeId, IcfgNodeKind, IcfgNodeTag, StmtId, VarId, VirtualCall,
};

use super::{narrow, type_id, var_id, Built};
use crate::codec::{decode_list, decode_set};
use crate::error::RecordError;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Binder, Entity, EntityRef, LoadSession};

/// The owning function and block every non-global node carries.
fn placement(record: &Record, binder: &mut Binder<'_>) -> Result<(VarId, BlockId), RecordError> {
    let function = binder.required(Field::IcfgFunction, var_id(record, "fun_obj_var_id")?)?;
    let block = BlockId(record.uint("bb_id")?);
    binder.required(Field::IcfgBlock, Some(BlockKey::new(function, block)))?;
    Ok((function, block))
}

fn call_site(record: &Record, binder: &mut Binder<'_>) -> Result<CallSite, RecordError> {
    let (function, block) = placement(record, binder)?;
    let virtual_call = if record.flag("is_vir_call_inst")? {
        Some(VirtualCall {
            vtable_ptr: binder.one(Field::VtablePtr, var_id(record, "vtab_ptr_node_id")?)?,
            index: narrow(record, "virtual_fun_idx")?,
            fun_name: record.text("fun_name_of_v_call")?.to_string(),
        })
    } else {
        None
    };
    Ok(CallSite {
        function,
        block,
        ty: binder.one(Field::CallSiteType, type_id(record, "svf_type_id")?)?,
        ret_node: binder.required(
            Field::CallRetNode,
            record.id("ret_icfg_node_id")?.map(IcfgNodeId),
        )?,
        callee: binder.one(Field::Callee, var_id(record, "called_fun_obj_var_id")?)?,
        actual_params: binder.many(
            Field::ActualParams,
            record.decoded("ap_nodes", decode_list::<VarId>)?,
        )?,
        is_vararg: record.flag("is_vararg")?,
        indirect_fun_ptr: binder.one(Field::IndirectFunPtr, var_id(record, "ind_fun_ptr_var_id")?)?,
        virtual_call,
        ch_nodes: binder.many(
            Field::ChNodes,
            record.decoded("chnodes_ids", decode_set::<ChNodeId>)?,
        )?,
        cha_vtables: binder.many::<_, BTreeSet<VarId>>(
            Field::ChaVtables,
            record.decoded("cha_vtbls_ids", decode_set::<VarId>)?,
        )?,
    })
}

pub(super) fn build_icfg_node(tag: IcfgNodeTag, record: &Record, session: &LoadSession) -> Built {
    let id = IcfgNodeId(record.req_id("id")?);
    let mut binder = session.binder(EntityRef::IcfgNode(id));
    let b = &mut binder;

    let kind = match tag {
        IcfgNodeTag::Global => IcfgNodeKind::Global,
        IcfgNodeTag::FunEntry => {
            let (function, block) = placement(record, b)?;
            IcfgNodeKind::FunEntry {
                function,
                block,
                formal_params: b.many(
                    Field::FormalParams,
                    record.decoded("fp_nodes", decode_list::<VarId>)?,
                )?,
            }
        }
        IcfgNodeTag::FunExit => {
            let (function, block) = placement(record, b)?;
            IcfgNodeKind::FunExit {
                function,
                block,
                formal_ret: b.one(Field::FormalRet, var_id(record, "formal_ret_node_id")?)?,
            }
        }
        IcfgNodeTag::Intra => {
            let (function, block) = placement(record, b)?;
            IcfgNodeKind::Intra {
                function,
                block,
                is_return: record.flag("is_return")?,
            }
        }
        IcfgNodeTag::Ret => {
            let (function, block) = placement(record, b)?;
            IcfgNodeKind::Ret {
                function,
                block,
                ty: b.one(Field::CallSiteType, type_id(record, "svf_type_id")?)?,
                call_node: b.one(
                    Field::RetCallNode,
                    record.id("call_block_node_id")?.map(IcfgNodeId),
                )?,
                actual_ret: b.one(Field::ActualRet, var_id(record, "actual_ret_node_id")?)?,
            }
        }
        IcfgNodeTag::Call => IcfgNodeKind::Call(Box::new(call_site(record, b)?)),
    };

    let node = IcfgNode {
        id,
        source_loc: record.text("source_loc")?.to_string(),
        stmts: binder.many(
            Field::IcfgStmts,
            record.decoded("pag_edge_ids", decode_list::<StmtId>)?,
        )?,
        kind,
    };
    Ok((Entity::IcfgNode(node), binder.finish()))
}

pub(super) fn build_icfg_edge(tag: IcfgEdgeTag, record: &Record, session: &LoadSession) -> Built {
    let key = IcfgEdgeKey {
        src: IcfgNodeId(record.src()?),
        dst: IcfgNodeId(record.dst()?),
        tag,
    };
    let mut binder = session.binder(EntityRef::IcfgEdge(key));
    binder.required(Field::IcfgEdgeSrc, Some(key.src))?;
    binder.required(Field::IcfgEdgeDst, Some(key.dst))?;

    let kind = match tag {
        IcfgEdgeTag::Intra => {
            let condition = match binder.one(Field::IntraCondition, var_id(record, "condition_var_id")?)? {
                Some(var) => Some(BranchCondition {
                    var,
                    value: record.int("branch_cond_val")?,
                }),
                None => None,
            };
            IcfgEdgeKind::Intra { condition }
        }
        IcfgEdgeTag::Call => IcfgEdgeKind::Call {
            call_pes: binder.many(
                Field::CallCfgPes,
                record.decoded("call_pe_ids", decode_list::<StmtId>)?,
            )?,
        },
        IcfgEdgeTag::Ret => IcfgEdgeKind::Ret {
            ret_pe: binder.one(Field::RetCfgPe, record.id("ret_pe_id")?.map(StmtId))?,
        },
    };

    let edge = IcfgEdge {
        src: key.src,
        dst: key.dst,
        kind,
    };
    Ok((Entity::IcfgEdge(edge), binder.finish()))
}
