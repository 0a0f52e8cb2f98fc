use svfir_core::{StInfo, StInfoId, SvfType, SvfTypeKind, TypeId, TypeTag};

use super::{narrow, type_id, Built};
use crate::codec::{decode_list, decode_map};
use crate::record::Record;
use crate::refs::Field;
use crate::session::{Entity, EntityRef, LoadSession};

pub(super) fn build_type(tag: TypeTag, record: &Record, session: &LoadSession) -> Built {
    let id = TypeId(record.req_id("id")?);
    let mut binder = session.binder(EntityRef::Type(id));

    let byte_size = record.uint("byte_size")?;
    let single_value = record.flag("is_single_val_ty")?;
    let i8_type = binder.one(Field::TypeI8, type_id(record, "svf_i8_type_id")?)?;
    let ptr_type = binder.one(Field::TypePtr, type_id(record, "svf_ptr_type_id")?)?;

    let kind = match tag {
        TypeTag::Pointer => SvfTypeKind::Pointer,
        TypeTag::Integer => SvfTypeKind::Integer {
            sign_and_width: narrow(record, "single_and_width")?,
        },
        TypeTag::Function => SvfTypeKind::Function {
            ret: binder.one(Field::FunctionRet, type_id(record, "ret_ty_node_id")?)?,
            params: binder.many(
                Field::FunctionParams,
                record.decoded("params_types_vec", decode_list::<TypeId>)?,
            )?,
        },
        TypeTag::Struct => SvfTypeKind::Struct {
            name: record.text("struct_name")?.to_string(),
            fields: binder.many(
                Field::StructFields,
                record.decoded("fields_id_vec", decode_list::<TypeId>)?,
            )?,
            st_info: binder.one(
                Field::StructStInfo,
                record.id("stinfo_node_id")?.map(StInfoId),
            )?,
        },
        TypeTag::Array => SvfTypeKind::Array {
            elements: record.uint("num_of_element")?,
            element: binder.one(
                Field::ArrayElement,
                type_id(record, "type_of_element_node_type_id")?,
            )?,
            st_info: binder.one(Field::ArrayStInfo, record.id("stinfo_node_id")?.map(StInfoId))?,
        },
        TypeTag::Other => SvfTypeKind::Other {
            repr: record.text("repr")?.to_string(),
        },
    };

    let ty = SvfType {
        id,
        byte_size,
        single_value,
        i8_type,
        ptr_type,
        kind,
    };
    Ok((Entity::Type(ty), binder.finish()))
}

pub(super) fn build_st_info(record: &Record, session: &LoadSession) -> Built {
    let id = StInfoId(record.req_id("id")?);
    let mut binder = session.binder(EntityRef::StInfo(id));

    let mut field_types = std::collections::BTreeMap::new();
    for (index, ty) in record.decoded("fld_idx_2_type_map", decode_map::<u32, TypeId>)? {
        if binder.member(Field::StInfoFieldTypes, ty)? {
            field_types.insert(index, ty);
        }
    }

    let info = StInfo {
        id,
        field_indices: record.decoded("fld_idx_vec", decode_list)?,
        element_indices: record.decoded("elem_idx_vec", decode_list)?,
        field_types,
        finfo_types: binder.many(
            Field::StInfoFinfo,
            record.decoded("finfo_types", decode_list::<TypeId>)?,
        )?,
        flatten_element_types: binder.many(
            Field::StInfoFlattenElements,
            record.decoded("flatten_element_types", decode_list::<TypeId>)?,
        )?,
        stride: record.uint("stride")?,
        flatten_elements: record.uint("num_of_flatten_elements")?,
        flatten_fields: record.uint("num_of_flatten_fields")?,
    };
    Ok((Entity::StInfo(info), binder.finish()))
}
