use svfir_core::{BlockId, FunObj, IcfgNodeId, ObjTypeInfo, SvfVar, VarId, VarKind, VarTag};

use super::{access_path, invalid, type_id, var_id, Built};
use crate::codec::{decode_list, decode_map, decode_map_of_lists, decode_text_list};
use crate::error::RecordError;
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Binder, Entity, EntityRef, LoadSession};

fn obj_info(record: &Record, binder: &mut Binder<'_>) -> Result<ObjTypeInfo, RecordError> {
    Ok(ObjTypeInfo {
        ty: binder.one(Field::ObjType, type_id(record, "obj_type_info_type_id")?)?,
        flags: record.uint("obj_type_info_flags")?,
        max_offset_limit: record.uint("obj_type_info_max_offset_limit")?,
        elem_num: record.uint("obj_type_info_elem_num")?,
        byte_size: record.uint("obj_type_info_byte_size")?,
    })
}

fn zext(record: &Record) -> Result<u64, RecordError> {
    let text = record.text("zval")?;
    text.trim()
        .parse()
        .map_err(|_| invalid("zval", format!("'{}' is not an unsigned integer", text)))
}

fn fun_obj(record: &Record, binder: &mut Binder<'_>) -> Result<FunObj, RecordError> {
    Ok(FunObj {
        obj: obj_info(record, binder)?,
        name: record.text("val_name")?.to_string(),
        is_decl: record.flag("is_decl")?,
        intrinsic: record.flag("intrinsic")?,
        addr_taken: record.flag("is_addr_taken")?,
        uncalled: record.flag("is_uncalled")?,
        not_ret: record.flag("is_not_ret")?,
        var_arg: record.flag("sup_var_arg")?,
        fun_type: binder.one(Field::FunObjType, type_id(record, "fun_type_id")?)?,
        real_def: binder.one(Field::FunObjRealDef, var_id(record, "real_def_fun_node_id")?)?,
        exit_block: record.id("exit_bb_id")?.map(BlockId),
        args: binder.many(
            Field::FunObjArgs,
            record.decoded("all_args_node_ids", decode_list::<VarId>)?,
        )?,
        reachable_blocks: record.decoded("reachable_bbs", decode_list)?,
        dom_tree: record.decoded("dt_bbs_map", decode_map_of_lists::<BlockId, BlockId, _>)?,
        post_dom_tree: record.decoded("pdt_bbs_map", decode_map_of_lists::<BlockId, BlockId, _>)?,
        dom_frontier: record.decoded("df_bbs_map", decode_map_of_lists::<BlockId, BlockId, _>)?,
        loops: record.decoded("bb2_loop_map", decode_map_of_lists::<BlockId, BlockId, _>)?,
        post_dom_levels: record.decoded("bb2_p_dom_level", decode_map)?,
        post_idom: record.decoded("bb2_pi_dom", decode_map)?,
        annotations: record.decoded("func_annotation", decode_text_list)?,
    })
}

pub(super) fn build_var(tag: VarTag, record: &Record, session: &LoadSession) -> Built {
    let id = VarId(record.req_id("id")?);
    let mut binder = session.binder(EntityRef::Var(id));

    let ty = binder.required(Field::VarType, type_id(record, "svf_type_id")?)?;
    let icfg_node = binder.one(
        Field::VarIcfgNode,
        record.id("icfg_node_id")?.map(IcfgNodeId),
    )?;

    let b = &mut binder;
    let kind = match tag {
        VarTag::Val => VarKind::Val,
        VarTag::Obj => VarKind::Obj(obj_info(record, b)?),
        VarTag::Arg => VarKind::Arg {
            function: b.one(Field::ArgFunction, var_id(record, "fun_obj_var_id")?)?,
            arg_no: record.uint("arg_no")?,
        },
        VarTag::GepVal => VarKind::GepVal {
            access_path: access_path(record, b)?,
            base: b.one(Field::GepValBase, var_id(record, "base_val_id")?)?,
            gep_type: b.one(Field::GepValType, type_id(record, "gep_val_svf_type_id")?)?,
            llvm_inst: record.int("llvm_var_inst_id")?,
        },
        VarTag::BaseObj => VarKind::BaseObj(obj_info(record, b)?),
        VarTag::GepObj => VarKind::GepObj {
            base: b.one(Field::GepObjBase, var_id(record, "base_obj_var_node_id")?)?,
            offset: record.int("app_offset")?,
        },
        VarTag::HeapObj => VarKind::HeapObj(obj_info(record, b)?),
        VarTag::StackObj => VarKind::StackObj(obj_info(record, b)?),
        VarTag::FunObj => VarKind::FunObj(Box::new(fun_obj(record, b)?)),
        VarTag::FunVal => VarKind::FunVal {
            function: b.one(Field::FunValFunction, var_id(record, "fun_obj_var_node_id")?)?,
        },
        VarTag::GlobalVal => VarKind::GlobalVal,
        VarTag::ConstAggVal => VarKind::ConstAggVal,
        VarTag::ConstDataVal => VarKind::ConstDataVal,
        VarTag::BlackHoleVal => VarKind::BlackHoleVal,
        VarTag::ConstFpVal => VarKind::ConstFpVal {
            value: record.float("dval")?,
        },
        VarTag::ConstIntVal => VarKind::ConstIntVal {
            zext: zext(record)?,
            sext: record.int("sval")?,
        },
        VarTag::ConstNullPtrVal => VarKind::ConstNullPtrVal,
        VarTag::GlobalObj => VarKind::GlobalObj {
            obj: obj_info(record, b)?,
            name: record.text("val_name")?.to_string(),
        },
        VarTag::ConstAggObj => VarKind::ConstAggObj(obj_info(record, b)?),
        VarTag::ConstDataObj => VarKind::ConstDataObj(obj_info(record, b)?),
        VarTag::ConstFpObj => VarKind::ConstFpObj {
            obj: obj_info(record, b)?,
            value: record.float("dval")?,
        },
        VarTag::ConstIntObj => VarKind::ConstIntObj {
            obj: obj_info(record, b)?,
            zext: zext(record)?,
            sext: record.int("sval")?,
        },
        VarTag::ConstNullPtrObj => VarKind::ConstNullPtrObj(obj_info(record, b)?),
        VarTag::RetPn => VarKind::RetPn {
            function: b.one(Field::PnFunction, var_id(record, "fun_obj_var_node_id")?)?,
        },
        VarTag::VarArgPn => VarKind::VarArgPn {
            function: b.one(Field::PnFunction, var_id(record, "fun_obj_var_node_id")?)?,
        },
        VarTag::DummyVal => VarKind::DummyVal,
        VarTag::DummyObj => VarKind::DummyObj(obj_info(record, b)?),
    };

    let var = SvfVar {
        id,
        ty,
        icfg_node,
        kind,
    };
    Ok((Entity::Var(var), binder.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::var_statement;
    use crate::reconstruct::stored;
    use crate::session::{Patch, Target};
    use svfir_core::{AccessPath, SvfType, SvfTypeKind, TypeId};

    fn session_with_type() -> LoadSession {
        let mut session = LoadSession::new();
        session.commit(
            Entity::Type(SvfType {
                id: TypeId(0),
                byte_size: 8,
                single_value: true,
                i8_type: None,
                ptr_type: None,
                kind: SvfTypeKind::Pointer,
            }),
            Vec::new(),
        );
        session
    }

    fn var(id: u32, kind: VarKind) -> SvfVar {
        SvfVar {
            id: VarId(id),
            ty: TypeId(0),
            icfg_node: None,
            kind,
        }
    }

    fn rebuild(v: &SvfVar, session: &LoadSession) -> (Entity, Vec<Patch>) {
        build_var(v.tag(), &stored(&var_statement(v)), session).unwrap()
    }

    #[test]
    fn test_every_scalar_variant_rebuilds() {
        let session = session_with_type();
        let obj = ObjTypeInfo {
            ty: Some(TypeId(0)),
            flags: 3,
            max_offset_limit: 8,
            elem_num: 1,
            byte_size: 8,
        };
        for v in [
            var(1, VarKind::Val),
            var(2, VarKind::HeapObj(obj.clone())),
            var(3, VarKind::ConstFpVal { value: 2.5 }),
            var(4, VarKind::ConstIntVal { zext: u64::MAX, sext: -1 }),
            var(5, VarKind::GlobalObj { obj: obj.clone(), name: "g'name".into() }),
            var(6, VarKind::ConstIntObj { obj: obj.clone(), zext: 7, sext: 7 }),
            var(7, VarKind::BlackHoleVal),
            var(8, VarKind::DummyObj(obj.clone())),
        ] {
            let (entity, patches) = rebuild(&v, &session);
            assert_eq!(entity, Entity::Var(v));
            assert!(patches.is_empty());
        }
    }

    #[test]
    fn test_forward_function_references_are_deferred() {
        let session = session_with_type();
        let arg = SvfVar {
            icfg_node: Some(IcfgNodeId(4)),
            ..var(5, VarKind::Arg { function: Some(VarId(9)), arg_no: 0 })
        };
        let (entity, patches) = rebuild(&arg, &session);
        // Single-valued slots stay empty until the final pass assigns them.
        let Entity::Var(built) = entity else { panic!("not a var") };
        assert_eq!(built.icfg_node, None);
        assert_eq!(built.kind, VarKind::Arg { function: None, arg_no: 0 });
        let targets: Vec<_> = patches.iter().map(|p| p.target).collect();
        assert_eq!(targets, vec![Target::IcfgNode(IcfgNodeId(4)), Target::Var(VarId(9))]);
    }

    #[test]
    fn test_function_object_rebuilds() {
        let session = session_with_type();
        let mut fun = FunObj {
            name: "main".into(),
            fun_type: Some(TypeId(0)),
            exit_block: Some(BlockId(1)),
            reachable_blocks: vec![BlockId(0), BlockId(1)],
            annotations: vec!["a,b".into(), "{c}".into()],
            ..FunObj::default()
        };
        fun.dom_tree.insert(BlockId(0), [BlockId(1)].into());
        fun.loops.insert(BlockId(1), vec![BlockId(1), BlockId(0)]);
        fun.post_dom_levels.insert(BlockId(0), 2);
        fun.post_idom.insert(BlockId(0), BlockId(1));
        let v = var(10, VarKind::FunObj(Box::new(fun)));
        let (entity, patches) = rebuild(&v, &session);
        assert_eq!(entity, Entity::Var(v));
        assert!(patches.is_empty());
    }

    #[test]
    fn test_gep_operands_keep_forward_vars() {
        let session = session_with_type();
        let v = var(
            3,
            VarKind::GepVal {
                base: None,
                gep_type: Some(TypeId(0)),
                access_path: AccessPath {
                    field_index: 1,
                    pointee_type: Some(TypeId(42)),
                    operands: vec![(VarId(7), Some(TypeId(0))), (VarId(8), None)],
                },
                llvm_inst: -1,
            },
        );
        // A missing base reads back as absent.
        let (entity, patches) = rebuild(&v, &session);
        let Entity::Var(SvfVar { kind: VarKind::GepVal { base, .. }, .. }) = entity else {
            panic!("not a gep value");
        };
        assert_eq!(base, None);
        assert_eq!(patches.len(), 2);

        let v = match v.kind {
            VarKind::GepVal { gep_type, access_path, llvm_inst, .. } => var(
                3,
                VarKind::GepVal { base: Some(VarId(1)), gep_type, access_path, llvm_inst },
            ),
            _ => unreachable!(),
        };
        let (entity, patches) = rebuild(&v, &session);
        let Entity::Var(SvfVar { kind: VarKind::GepVal { access_path, .. }, .. }) = entity else {
            panic!("not a gep value");
        };
        // The unknown pointee type is optional and dropped; operand vars wait.
        assert_eq!(access_path.pointee_type, None);
        assert_eq!(access_path.operands, vec![(VarId(7), Some(TypeId(0))), (VarId(8), None)]);
        assert_eq!(patches.len(), 3);
    }

    #[test]
    fn test_missing_type_rejects_var() {
        let session = LoadSession::new();
        let err = build_var(VarTag::Val, &stored(&var_statement(&var(1, VarKind::Val))), &session)
            .unwrap_err();
        assert!(matches!(err, RecordError::MissingReference { field: Field::VarType, .. }));
    }
}
