use svfir_core::{EdgeLabels, IcfgNodeId, Operands, StmtId, StmtKind, StmtTag, SvfStmt, VarId};

use super::{access_path, block_key, invalid, var_id, Built};
use crate::codec::{decode_list, decode_map, decode_pairs};
use crate::error::RecordError;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Binder, Entity, EntityRef, LoadSession};

fn node(
    binder: &mut Binder<'_>,
    field: Field,
    record: &Record,
    key: &str,
) -> Result<IcfgNodeId, RecordError> {
    binder.required(field, record.id(key)?.map(IcfgNodeId))
}

fn operands(binder: &mut Binder<'_>, record: &Record) -> Result<Operands, RecordError> {
    binder.many(
        Field::Operands,
        record.decoded("op_var_node_ids", decode_list::<VarId>)?,
    )
}

fn condition(binder: &mut Binder<'_>, field: Field, record: &Record) -> Result<VarId, RecordError> {
    binder.required(field, var_id(record, "condition_svf_var_node_id")?)
}

/// Label maps may be left out entirely when empty. Entries naming a node or
/// variable that was never loaded are dropped.
fn labels(binder: &mut Binder<'_>, record: &Record) -> Result<EdgeLabels, RecordError> {
    let mut labels = EdgeLabels {
        call_edge_counter: record.uint("call_edge_label_counter")?,
        store_edge_counter: record.uint("store_edge_label_counter")?,
        multi_operand_counter: record.uint("multi_opnd_label_counter")?,
        ..EdgeLabels::default()
    };
    if record.has("inst2_label_map") {
        for (node, label) in record.decoded("inst2_label_map", decode_map::<IcfgNodeId, u32>)? {
            if binder.member(Field::StmtInstLabels, node)? {
                labels.inst_labels.insert(node, label);
            }
        }
    }
    if record.has("var2_label_map") {
        for (var, label) in record.decoded("var2_label_map", decode_map::<VarId, u32>)? {
            if binder.member(Field::StmtVarLabels, var)? {
                labels.var_labels.insert(var, label);
            }
        }
    }
    Ok(labels)
}

pub(super) fn build_stmt(tag: StmtTag, record: &Record, session: &LoadSession) -> Built {
    let id = StmtId(record.uint("edge_id")?);
    let mut binder = session.binder(EntityRef::Stmt(id));
    let b = &mut binder;

    let src = b.required(Field::StmtSrc, Some(VarId(record.src()?)))?;
    let dst = b.required(Field::StmtDst, Some(VarId(record.dst()?)))?;

    let kind = match tag {
        StmtTag::Store => StmtKind::Store,
        StmtTag::Load => StmtKind::Load,
        StmtTag::Addr => StmtKind::Addr {
            array_sizes: b.many(
                Field::AddrArraySize,
                record.decoded("arr_size", decode_list::<VarId>)?,
            )?,
        },
        StmtTag::Copy => StmtKind::Copy {
            copy_kind: record.uint("copy_kind")?,
        },
        StmtTag::Gep => StmtKind::Gep {
            access_path: access_path(record, b)?,
            variant_field: record.flag("variant_field")?,
        },
        StmtTag::Call => StmtKind::Call {
            call_site: node(b, Field::StmtCallSite, record, "call_icfg_node_id")?,
            fun_entry: node(b, Field::StmtFunEntry, record, "fun_entry_icfg_node_id")?,
        },
        StmtTag::ThreadFork => StmtKind::ThreadFork {
            call_site: node(b, Field::StmtCallSite, record, "call_icfg_node_id")?,
            fun_entry: node(b, Field::StmtFunEntry, record, "fun_entry_icfg_node_id")?,
        },
        StmtTag::Ret => StmtKind::Ret {
            call_site: node(b, Field::StmtCallSite, record, "call_icfg_node_id")?,
            fun_exit: node(b, Field::StmtFunExit, record, "fun_exit_icfg_node_id")?,
        },
        StmtTag::ThreadJoin => StmtKind::ThreadJoin {
            call_site: node(b, Field::StmtCallSite, record, "call_icfg_node_id")?,
            fun_exit: node(b, Field::StmtFunExit, record, "fun_exit_icfg_node_id")?,
        },
        StmtTag::Phi => StmtKind::Phi {
            operands: operands(b, record)?,
            op_icfg_nodes: b.many(
                Field::PhiOpIcfgNodes,
                record.decoded("op_icfg_nodes_ids", decode_list::<IcfgNodeId>)?,
            )?,
        },
        StmtTag::Select => StmtKind::Select {
            operands: operands(b, record)?,
            condition: condition(b, Field::SelectCondition, record)?,
        },
        StmtTag::Cmp => StmtKind::Cmp {
            operands: operands(b, record)?,
            predicate: record.uint("predicate")?,
        },
        StmtTag::BinaryOp => StmtKind::BinaryOp {
            operands: operands(b, record)?,
            opcode: record.uint("op_code")?,
        },
        StmtTag::UnaryOp => StmtKind::UnaryOp {
            opcode: record.uint("op_code")?,
        },
        StmtTag::Branch => {
            let mut successors = Vec::new();
            for (succ, value) in record.decoded("successors", decode_pairs::<IcfgNodeId, i32>)? {
                let value = value.ok_or_else(|| {
                    invalid("successors", format!("successor {} has no condition value", succ))
                })?;
                b.member(Field::BranchSuccessor, succ)?;
                successors.push((succ, value));
            }
            StmtKind::Branch {
                successors,
                condition: condition(b, Field::BranchCondition, record)?,
                br_inst: b.one(Field::BranchInst, var_id(record, "br_inst_svf_var_node_id")?)?,
            }
        }
    };

    let stmt = SvfStmt {
        id,
        src,
        dst,
        value: binder.one(Field::StmtValue, var_id(record, "svf_var_node_id")?)?,
        icfg_node: binder.one(Field::StmtIcfgNode, record.id("icfg_node_id")?.map(IcfgNodeId))?,
        block: binder.one(Field::StmtBlock, block_key(record, "bb_id")?)?,
        flag: record.int("edge_flag")?,
        labels: labels(&mut binder, record)?,
        kind,
    };
    Ok((Entity::Stmt(stmt), binder.finish()))
}
