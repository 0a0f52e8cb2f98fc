//! Entity to statement conversion.
//!
//! Each function turns one entity into exactly one [`Statement`] carrying
//! every field: scalars as typed properties, optional references as an id
//! or `-1`, collections through [`codec`](crate::codec). Nothing here does
//! I/O.

use svfir_core::{
    AccessPath, BasicBlock, BlockEdge, CallGraphEdge, CallGraphNode, ChEdge, ChNode, FunObj,
    IcfgEdge, IcfgEdgeKind, IcfgNode, IcfgNodeKind, ObjTypeInfo, StInfo, StmtKind, SvfIr, SvfStmt,
    SvfType, SvfTypeKind, SvfVar, VarKind,
};

use crate::codec;
use crate::kinds::{EntityKind, Store};
use crate::statement::{NodeMatch, Properties, Statement};

fn create(kind: EntityKind, properties: Properties) -> Statement {
    Statement::CreateNode {
        label: kind.label(),
        properties,
    }
}

fn obj_info(props: Properties, obj: &ObjTypeInfo) -> Properties {
    props
        .opt_id("obj_type_info_type_id", obj.ty)
        .uint("obj_type_info_flags", obj.flags)
        .uint("obj_type_info_max_offset_limit", obj.max_offset_limit)
        .uint("obj_type_info_elem_num", obj.elem_num)
        .uint("obj_type_info_byte_size", obj.byte_size)
}

fn access_path(props: Properties, path: &AccessPath) -> Properties {
    props
        .int("ap_fld_idx", path.field_index)
        .opt_id("ap_gep_pointee_type_id", path.pointee_type)
        .encoded("ap_idx_operand_pairs", codec::encode_pairs(&path.operands))
}

/// The `"fun:bb"` form of an optional block address, `""` when absent.
fn block_text(block: Option<svfir_core::BlockKey>) -> String {
    block.map(|key| key.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Type descriptors
// ---------------------------------------------------------------------------

pub fn type_statement(ty: &SvfType) -> Statement {
    let props = Properties::new()
        .uint("id", ty.id.0)
        .uint("byte_size", ty.byte_size)
        .flag("is_single_val_ty", ty.single_value)
        .opt_id("svf_i8_type_id", ty.i8_type)
        .opt_id("svf_ptr_type_id", ty.ptr_type);
    let props = match &ty.kind {
        SvfTypeKind::Pointer => props,
        SvfTypeKind::Integer { sign_and_width } => {
            props.int("single_and_width", i64::from(*sign_and_width))
        }
        SvfTypeKind::Function { ret, params } => props
            .opt_id("ret_ty_node_id", *ret)
            .list("params_types_vec", params),
        SvfTypeKind::Struct {
            name,
            fields,
            st_info,
        } => props
            .text("struct_name", name)
            .list("fields_id_vec", fields)
            .opt_id("stinfo_node_id", *st_info),
        SvfTypeKind::Array {
            elements,
            element,
            st_info,
        } => props
            .uint("num_of_element", *elements)
            .opt_id("type_of_element_node_type_id", *element)
            .opt_id("stinfo_node_id", *st_info),
        SvfTypeKind::Other { repr } => props.text("repr", repr),
    };
    create(EntityKind::Type(ty.tag()), props)
}

pub fn st_info_statement(info: &StInfo) -> Statement {
    let props = Properties::new()
        .uint("id", info.id.0)
        .list("fld_idx_vec", &info.field_indices)
        .list("elem_idx_vec", &info.element_indices)
        .encoded("fld_idx_2_type_map", codec::encode_map(&info.field_types))
        .list("finfo_types", &info.finfo_types)
        .list("flatten_element_types", &info.flatten_element_types)
        .uint("stride", info.stride)
        .uint("num_of_flatten_elements", info.flatten_elements)
        .uint("num_of_flatten_fields", info.flatten_fields);
    create(EntityKind::StInfo, props)
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

fn fun_obj(props: Properties, fun: &FunObj) -> Properties {
    obj_info(props, &fun.obj)
        .text("val_name", &fun.name)
        .flag("is_decl", fun.is_decl)
        .flag("intrinsic", fun.intrinsic)
        .flag("is_addr_taken", fun.addr_taken)
        .flag("is_uncalled", fun.uncalled)
        .flag("is_not_ret", fun.not_ret)
        .flag("sup_var_arg", fun.var_arg)
        .opt_id("fun_type_id", fun.fun_type)
        .opt_id("real_def_fun_node_id", fun.real_def)
        .opt_id("exit_bb_id", fun.exit_block)
        .list("all_args_node_ids", &fun.args)
        .list("reachable_bbs", &fun.reachable_blocks)
        .encoded("dt_bbs_map", codec::encode_map_of_sets(&fun.dom_tree))
        .encoded("pdt_bbs_map", codec::encode_map_of_sets(&fun.post_dom_tree))
        .encoded("df_bbs_map", codec::encode_map_of_sets(&fun.dom_frontier))
        .encoded("bb2_loop_map", codec::encode_map_of_lists(&fun.loops))
        .encoded("bb2_p_dom_level", codec::encode_map(&fun.post_dom_levels))
        .encoded("bb2_pi_dom", codec::encode_map(&fun.post_idom))
        .encoded("func_annotation", codec::encode_text_list(&fun.annotations))
}

pub fn var_statement(var: &SvfVar) -> Statement {
    let props = Properties::new()
        .uint("id", var.id.0)
        .uint("svf_type_id", var.ty.0)
        .opt_id("icfg_node_id", var.icfg_node);
    let props = match &var.kind {
        VarKind::Val
        | VarKind::GlobalVal
        | VarKind::ConstAggVal
        | VarKind::ConstDataVal
        | VarKind::BlackHoleVal
        | VarKind::ConstNullPtrVal
        | VarKind::DummyVal => props,
        VarKind::Obj(obj)
        | VarKind::BaseObj(obj)
        | VarKind::HeapObj(obj)
        | VarKind::StackObj(obj)
        | VarKind::ConstAggObj(obj)
        | VarKind::ConstDataObj(obj)
        | VarKind::ConstNullPtrObj(obj)
        | VarKind::DummyObj(obj) => obj_info(props, obj),
        VarKind::Arg { function, arg_no } => props
            .opt_id("fun_obj_var_id", *function)
            .uint("arg_no", *arg_no),
        VarKind::GepVal {
            base,
            gep_type,
            access_path: path,
            llvm_inst,
        } => access_path(props, path)
            .opt_id("base_val_id", *base)
            .opt_id("gep_val_svf_type_id", *gep_type)
            .int("llvm_var_inst_id", *llvm_inst),
        VarKind::GepObj { base, offset } => props
            .opt_id("base_obj_var_node_id", *base)
            .int("app_offset", *offset),
        VarKind::FunObj(fun) => fun_obj(props, fun),
        VarKind::FunVal { function }
        | VarKind::RetPn { function }
        | VarKind::VarArgPn { function } => props.opt_id("fun_obj_var_node_id", *function),
        VarKind::ConstFpVal { value } => props.float("dval", *value),
        VarKind::ConstIntVal { zext, sext } => props
            .text("zval", &zext.to_string())
            .int("sval", *sext),
        VarKind::GlobalObj { obj, name } => obj_info(props, obj).text("val_name", name),
        VarKind::ConstFpObj { obj, value } => obj_info(props, obj).float("dval", *value),
        VarKind::ConstIntObj { obj, zext, sext } => obj_info(props, obj)
            .text("zval", &zext.to_string())
            .int("sval", *sext),
    };
    create(EntityKind::Var(var.tag()), props)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

pub fn stmt_statement(stmt: &SvfStmt) -> Statement {
    let props = Properties::new()
        .int("edge_flag", stmt.flag)
        .opt_id("svf_var_node_id", stmt.value)
        .opt_id("icfg_node_id", stmt.icfg_node)
        .text("bb_id", &block_text(stmt.block))
        .encoded("inst2_label_map", codec::encode_map(&stmt.labels.inst_labels))
        .encoded("var2_label_map", codec::encode_map(&stmt.labels.var_labels))
        .uint("call_edge_label_counter", stmt.labels.call_edge_counter)
        .uint("store_edge_label_counter", stmt.labels.store_edge_counter)
        .uint("multi_opnd_label_counter", stmt.labels.multi_operand_counter);
    let props = match &stmt.kind {
        StmtKind::Store | StmtKind::Load => props,
        StmtKind::Addr { array_sizes } => props.list("arr_size", array_sizes),
        StmtKind::Copy { copy_kind } => props.uint("copy_kind", *copy_kind),
        StmtKind::Gep {
            access_path: path,
            variant_field,
        } => access_path(props, path).flag("variant_field", *variant_field),
        StmtKind::Call {
            call_site,
            fun_entry,
        }
        | StmtKind::ThreadFork {
            call_site,
            fun_entry,
        } => props
            .uint("call_icfg_node_id", call_site.0)
            .uint("fun_entry_icfg_node_id", fun_entry.0),
        StmtKind::Ret {
            call_site,
            fun_exit,
        }
        | StmtKind::ThreadJoin {
            call_site,
            fun_exit,
        } => props
            .uint("call_icfg_node_id", call_site.0)
            .uint("fun_exit_icfg_node_id", fun_exit.0),
        StmtKind::Phi {
            operands,
            op_icfg_nodes,
        } => props
            .list("op_var_node_ids", operands)
            .list("op_icfg_nodes_ids", op_icfg_nodes),
        StmtKind::Select {
            operands,
            condition,
        } => props
            .list("op_var_node_ids", operands)
            .uint("condition_svf_var_node_id", condition.0),
        StmtKind::Cmp {
            operands,
            predicate,
        } => props
            .list("op_var_node_ids", operands)
            .uint("predicate", *predicate),
        StmtKind::BinaryOp { operands, opcode } => props
            .list("op_var_node_ids", operands)
            .uint("op_code", *opcode),
        StmtKind::UnaryOp { opcode } => props.uint("op_code", *opcode),
        StmtKind::Branch {
            successors,
            condition,
            br_inst,
        } => {
            let pairs: Vec<_> = successors.iter().map(|(node, cond)| (*node, Some(*cond))).collect();
            props
                .encoded("successors", codec::encode_pairs(&pairs))
                .uint("condition_svf_var_node_id", condition.0)
                .opt_id("br_inst_svf_var_node_id", *br_inst)
        }
    };
    Statement::MergeEdge {
        label: EntityKind::Stmt(stmt.tag()).label(),
        src: NodeMatch::by_id(stmt.src.0),
        dst: NodeMatch::by_id(stmt.dst.0),
        key: Properties::new().uint("edge_id", stmt.id.0),
        properties: props,
    }
}

// ---------------------------------------------------------------------------
// Basic blocks
// ---------------------------------------------------------------------------

pub fn block_statement(block: &BasicBlock) -> Statement {
    let props = Properties::new()
        .uint("id", block.id.0)
        .uint("fun_obj_var_id", block.function.0)
        .text("bb_name", &block.name)
        .list("sscc_bb_ids", &block.succs)
        .list("pred_bb_ids", &block.preds)
        .list("all_icfg_nodes_ids", &block.icfg_nodes);
    create(EntityKind::BasicBlock, props)
}

fn block_match(function: u32, block: u32) -> NodeMatch {
    NodeMatch::labelled(
        EntityKind::BasicBlock.label(),
        Properties::new().uint("id", block).uint("fun_obj_var_id", function),
    )
}

pub fn block_edge_statement(edge: &BlockEdge) -> Statement {
    Statement::MergeEdge {
        label: EntityKind::BlockEdge.label(),
        src: block_match(edge.function.0, edge.src.0),
        dst: block_match(edge.function.0, edge.dst.0),
        key: Properties::new(),
        properties: Properties::new().uint("fun_obj_var_id", edge.function.0),
    }
}

// ---------------------------------------------------------------------------
// Class hierarchy
// ---------------------------------------------------------------------------

pub fn ch_node_statement(node: &ChNode) -> Statement {
    let props = Properties::new()
        .uint("id", node.id.0)
        .text("class_name", &node.class_name)
        .opt_id("vtable_id", node.vtable)
        .uint("flags", node.flags)
        .encoded(
            "virtual_function_vectors",
            codec::encode_nested(&node.virtual_functions),
        );
    create(EntityKind::ChNode, props)
}

pub fn ch_edge_statement(edge: &ChEdge) -> Statement {
    Statement::MergeEdge {
        label: EntityKind::ChEdge.label(),
        src: NodeMatch::by_id(edge.src.0),
        dst: NodeMatch::by_id(edge.dst.0),
        key: Properties::new().int("edge_type", edge.kind.code()),
        properties: Properties::new(),
    }
}

// ---------------------------------------------------------------------------
// ICFG
// ---------------------------------------------------------------------------

pub fn icfg_node_statement(node: &IcfgNode) -> Statement {
    let props = Properties::new()
        .uint("id", node.id.0)
        .text("source_loc", &node.source_loc)
        .list("pag_edge_ids", &node.stmts);
    let props = match &node.kind {
        IcfgNodeKind::Global => props,
        IcfgNodeKind::FunEntry {
            function,
            block,
            formal_params,
        } => props
            .uint("fun_obj_var_id", function.0)
            .uint("bb_id", block.0)
            .list("fp_nodes", formal_params),
        IcfgNodeKind::FunExit {
            function,
            block,
            formal_ret,
        } => props
            .uint("fun_obj_var_id", function.0)
            .uint("bb_id", block.0)
            .opt_id("formal_ret_node_id", *formal_ret),
        IcfgNodeKind::Intra {
            function,
            block,
            is_return,
        } => props
            .uint("fun_obj_var_id", function.0)
            .uint("bb_id", block.0)
            .flag("is_return", *is_return),
        IcfgNodeKind::Ret {
            function,
            block,
            ty,
            call_node,
            actual_ret,
        } => props
            .uint("fun_obj_var_id", function.0)
            .uint("bb_id", block.0)
            .opt_id("svf_type_id", *ty)
            .opt_id("call_block_node_id", *call_node)
            .opt_id("actual_ret_node_id", *actual_ret),
        IcfgNodeKind::Call(site) => {
            let props = props
                .uint("fun_obj_var_id", site.function.0)
                .uint("bb_id", site.block.0)
                .opt_id("svf_type_id", site.ty)
                .uint("ret_icfg_node_id", site.ret_node.0)
                .opt_id("called_fun_obj_var_id", site.callee)
                .list("ap_nodes", &site.actual_params)
                .flag("is_vararg", site.is_vararg)
                .opt_id("ind_fun_ptr_var_id", site.indirect_fun_ptr)
                .flag("is_vir_call_inst", site.virtual_call.is_some())
                .list("chnodes_ids", &site.ch_nodes)
                .list("cha_vtbls_ids", &site.cha_vtables);
            match &site.virtual_call {
                Some(call) => props
                    .opt_id("vtab_ptr_node_id", call.vtable_ptr)
                    .int("virtual_fun_idx", i64::from(call.index))
                    .text("fun_name_of_v_call", &call.fun_name),
                None => props
                    .int("vtab_ptr_node_id", -1)
                    .int("virtual_fun_idx", -1)
                    .text("fun_name_of_v_call", ""),
            }
        }
    };
    create(EntityKind::IcfgNode(node.tag()), props)
}

pub fn icfg_edge_statement(edge: &IcfgEdge) -> Statement {
    let props = match &edge.kind {
        IcfgEdgeKind::Intra { condition } => Properties::new()
            .opt_id("condition_var_id", condition.map(|c| c.var))
            .int("branch_cond_val", condition.map_or(-1, |c| c.value)),
        IcfgEdgeKind::Call { call_pes } => Properties::new().list("call_pe_ids", call_pes),
        IcfgEdgeKind::Ret { ret_pe } => Properties::new().opt_id("ret_pe_id", *ret_pe),
    };
    Statement::MergeEdge {
        label: EntityKind::IcfgEdge(edge.tag()).label(),
        src: NodeMatch::by_id(edge.src.0),
        dst: NodeMatch::by_id(edge.dst.0),
        key: Properties::new(),
        properties: props,
    }
}

// ---------------------------------------------------------------------------
// Call graph
// ---------------------------------------------------------------------------

pub fn call_graph_node_statement(node: &CallGraphNode) -> Statement {
    let props = Properties::new()
        .uint("id", node.id.0)
        .uint("fun_obj_var_id", node.function.0)
        .text("fun_name", &node.name)
        .text("source_loc", &node.source_loc);
    create(EntityKind::CallGraphNode, props)
}

pub fn call_graph_edge_statement(edge: &CallGraphEdge) -> Statement {
    Statement::MergeEdge {
        label: EntityKind::CallGraphEdge.label(),
        src: NodeMatch::by_id(edge.src.0),
        dst: NodeMatch::by_id(edge.dst.0),
        key: Properties::new().uint("csid", edge.call_site_id),
        properties: Properties::new()
            .int("kind", edge.kind.code())
            .list("direct_call_set", &edge.direct_calls)
            .list("indirect_call_set", &edge.indirect_calls),
    }
}

/// Every statement needed to persist `ir`, grouped by kind in load order,
/// nodes of a store before its edges.
pub fn statements_for(ir: &SvfIr) -> Vec<(Store, Statement)> {
    let mut out = Vec::with_capacity(ir.node_count() + ir.edge_count());
    out.extend(ir.types().map(|t| (Store::Types, type_statement(t))));
    out.extend(ir.st_infos().map(|s| (Store::Types, st_info_statement(s))));
    out.extend(ir.vars().map(|v| (Store::Pag, var_statement(v))));
    for graph in ir.block_graphs() {
        out.extend(graph.blocks().map(|b| (Store::BasicBlocks, block_statement(b))));
    }
    for graph in ir.block_graphs() {
        out.extend(graph.edges().map(|e| (Store::BasicBlocks, block_edge_statement(&e))));
    }
    out.extend(ir.ch_nodes().map(|n| (Store::ClassHierarchy, ch_node_statement(n))));
    out.extend(ir.ch_edges().map(|e| (Store::ClassHierarchy, ch_edge_statement(e))));
    out.extend(ir.icfg_nodes().map(|n| (Store::Icfg, icfg_node_statement(n))));
    out.extend(ir.icfg_edges().map(|e| (Store::Icfg, icfg_edge_statement(e))));
    out.extend(
        ir.call_graph_nodes()
            .map(|n| (Store::CallGraph, call_graph_node_statement(n))),
    );
    out.extend(
        ir.call_graph_edges()
            .map(|e| (Store::CallGraph, call_graph_edge_statement(e))),
    );
    out.extend(ir.stmts().map(|s| (Store::Pag, stmt_statement(s))));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use svfir_core::{
        BlockId, BlockKey, CallGraphNodeId, ChEdgeKind, ChNodeId, IcfgNodeId, StmtId, TypeId,
        VarId,
    };

    fn props_of(stmt: &Statement) -> &Properties {
        match stmt {
            Statement::CreateNode { properties, .. } => properties,
            Statement::MergeEdge { properties, .. } => properties,
            other => panic!("not a write statement: {:?}", other),
        }
    }

    #[test]
    fn test_struct_type_carries_all_fields() {
        let ty = SvfType {
            id: TypeId(4),
            byte_size: 16,
            single_value: false,
            i8_type: Some(TypeId(1)),
            ptr_type: None,
            kind: SvfTypeKind::Struct {
                name: "struct.Point".into(),
                fields: vec![TypeId(2), TypeId(2)],
                st_info: None,
            },
        };
        let stmt = type_statement(&ty);
        assert_eq!(stmt.label(), Some("SVFStructType"));
        assert_eq!(
            stmt.to_string(),
            "CREATE (n:SVFStructType {id: 4, byte_size: 16, is_single_val_ty: false, \
             svf_i8_type_id: 1, svf_ptr_type_id: -1, struct_name: 'struct.Point', \
             fields_id_vec: '2,2', stinfo_node_id: -1})"
        );
    }

    #[test]
    fn test_function_object_encodes_collections() {
        let mut fun = FunObj {
            name: "main".into(),
            args: vec![VarId(3), VarId(4)],
            exit_block: Some(BlockId(2)),
            annotations: vec!["noinline".into()],
            ..FunObj::default()
        };
        fun.dom_tree.insert(BlockId(0), [BlockId(1), BlockId(2)].into());
        fun.loops.insert(BlockId(1), vec![BlockId(1)]);
        let var = SvfVar {
            id: VarId(10),
            ty: TypeId(3),
            icfg_node: None,
            kind: VarKind::FunObj(Box::new(fun)),
        };
        let stmt = var_statement(&var);
        let props = props_of(&stmt);
        assert_eq!(props.get("all_args_node_ids").unwrap().to_string(), "'3,4'");
        assert_eq!(props.get("dt_bbs_map").unwrap().to_string(), "'0:{1,2}'");
        assert_eq!(props.get("bb2_loop_map").unwrap().to_string(), "'1:{1}'");
        assert_eq!(props.get("exit_bb_id").unwrap().to_string(), "2");
        assert_eq!(props.get("icfg_node_id").unwrap().to_string(), "-1");
        assert_eq!(props.get("pdt_bbs_map").unwrap().to_string(), "''");
        assert_eq!(props.get("func_annotation").unwrap().to_string(), "'[\\\"noinline\\\"]'");
    }

    #[test]
    fn test_stmt_is_merge_on_edge_id() {
        let stmt = SvfStmt {
            id: StmtId(8),
            src: VarId(1),
            dst: VarId(2),
            value: None,
            icfg_node: Some(IcfgNodeId(5)),
            block: Some(BlockKey::new(VarId(10), BlockId(0))),
            flag: 0,
            labels: Default::default(),
            kind: StmtKind::Load,
        };
        assert_eq!(
            stmt_statement(&stmt).to_string(),
            "MATCH (n {id: 1}), (m {id: 2}) MERGE (n)-[r:LoadStmt {edge_id: 8}]->(m) \
             SET r.edge_flag = 0, r.svf_var_node_id = -1, r.icfg_node_id = 5, r.bb_id = '10:0', \
             r.inst2_label_map = '', r.var2_label_map = '', r.call_edge_label_counter = 0, \
             r.store_edge_label_counter = 0, r.multi_opnd_label_counter = 0"
        );
    }

    #[test]
    fn test_stmt_labels_are_encoded_maps() {
        let mut stmt = SvfStmt {
            id: StmtId(8),
            src: VarId(1),
            dst: VarId(2),
            value: None,
            icfg_node: None,
            block: None,
            flag: 0,
            labels: Default::default(),
            kind: StmtKind::Store,
        };
        stmt.labels.inst_labels.insert(IcfgNodeId(5), 1);
        stmt.labels.inst_labels.insert(IcfgNodeId(3), 2);
        stmt.labels.var_labels.insert(VarId(9), 4);
        stmt.labels.store_edge_counter = 3;
        let Statement::MergeEdge { properties, .. } = stmt_statement(&stmt) else {
            panic!("statements are edges");
        };
        assert_eq!(properties.get("inst2_label_map").unwrap().to_string(), "'3:2,5:1'");
        assert_eq!(properties.get("var2_label_map").unwrap().to_string(), "'9:4'");
        assert_eq!(properties.get("store_edge_label_counter").unwrap().to_string(), "3");
    }

    #[test]
    fn test_block_edge_matches_by_function_and_block() {
        let edge = BlockEdge {
            function: VarId(10),
            src: BlockId(0),
            dst: BlockId(1),
        };
        assert_eq!(
            block_edge_statement(&edge).to_string(),
            "MATCH (n:SVFBasicBlock {id: 0, fun_obj_var_id: 10}), \
             (m:SVFBasicBlock {id: 1, fun_obj_var_id: 10}) \
             MERGE (n)-[r:BasicBlockEdge]->(m) SET r.fun_obj_var_id = 10"
        );
    }

    #[test]
    fn test_edges_without_properties_have_no_set_clause() {
        let edge = ChEdge {
            src: ChNodeId(1),
            dst: ChNodeId(0),
            kind: ChEdgeKind::Instance,
        };
        assert_eq!(
            ch_edge_statement(&edge).to_string(),
            "MATCH (n {id: 1}), (m {id: 0}) MERGE (n)-[r:CHEdge {edge_type: 1}]->(m)"
        );
    }

    #[test]
    fn test_call_graph_node() {
        let node = CallGraphNode {
            id: CallGraphNodeId(0),
            function: VarId(10),
            name: "main".into(),
            source_loc: "{ \"ln\": 1 }".into(),
        };
        let text = call_graph_node_statement(&node).to_string();
        assert!(text.starts_with("CREATE (n:CallGraphNode {id: 0, fun_obj_var_id: 10"));
        assert!(text.contains("source_loc: '{ \\\"ln\\\": 1 }'"));
    }
}
