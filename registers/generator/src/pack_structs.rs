// Licensed under the Apache-2.0 license

//! Struct based register packing for C and C++.
//!
//! Every root file register gets a value struct mirroring its fields and a
//! `pack_` builder composing the register value, with the relocation data of
//! its address field when it has one. Registers declared for several hardware
//! variants additionally get a C++ dispatcher picking the builder of the
//! variant passed as a template argument.

use crate::c_defines::variant_enum;
use crate::util::{
    ctype, hex8, indices_prototype, indices_varlist, member_name, tab_to, value_mask,
};
use registers_rnndb::index::VariantGroup;
use registers_rnndb::model::{mask, Element, FieldType, Reg, RegIdx};
use registers_rnndb::variant::{parse_variants, VariantSpec};
use registers_rnndb::{Database, Index};
use std::fmt::Write;

pub fn write_pack_structs(output: &mut String, db: &Database, index: &Index) {
    let root_regs: Vec<RegIdx> = db
        .elements
        .iter()
        .filter_map(|e| match e {
            Element::Reg(idx) => Some(*idx),
            _ => None,
        })
        .collect();

    for &idx in &root_regs {
        write_pack_struct(output, db, idx);
    }
    for group in &index.variant_groups {
        // Builders of imported registers refer to macros of another header.
        if group.members.iter().all(|m| root_regs.contains(&m.reg)) {
            write_dispatcher(output, db, group);
        }
    }
}

/// Struct members of a register: C type and name, address fields replaced
/// by a buffer reference and offset.
fn members(db: &Database, reg: &Reg) -> Vec<(String, String)> {
    let mut members = vec![];
    for field in &db.bitset_of(reg).fields {
        if field.ty.is_address() {
            members.push(("__bo_type".to_string(), "bo".to_string()));
            members.push(("uint32_t".to_string(), "bo_offset".to_string()));
            continue;
        }
        let (ty, _) = ctype(field, "var");
        members.push((ty, member_name(&reg.name, field.name.as_deref())));
    }
    members
}

fn write_fallback_members(output: &mut String, reg: &Reg) {
    let (ty, word) = word_type(reg);
    tab_to(output, &format!("    {ty}"), "unknown;");
    tab_to(output, &format!("    {ty}"), &format!("{word};"));
}

fn word_type(reg: &Reg) -> (&'static str, &'static str) {
    if reg.bit_size == 64 {
        ("uint64_t", "qword")
    } else {
        ("uint32_t", "dword")
    }
}

/// Suffix of the convenience macros. Registers carrying an address take two
/// register slots.
fn skip_suffix(db: &Database, reg: &Reg) -> &'static str {
    if db.bitset_of(reg).address_field().is_some() || reg.bit_size == 64 {
        ", { .reg = 0 }"
    } else {
        ""
    }
}

fn write_pack_struct(output: &mut String, db: &Database, idx: RegIdx) {
    let reg = &db.regs[idx];
    let name = &reg.full_name;
    writeln!(output, "struct {name} {{").unwrap();
    for (ty, member) in members(db, reg) {
        tab_to(output, &format!("    {ty}"), &format!("{member};"));
    }
    write_fallback_members(output, reg);
    writeln!(output, "}};").unwrap();
    writeln!(output).unwrap();

    let dims = db.reg_indices(idx);
    let (params, args) = if dims.is_empty() {
        (String::new(), String::new())
    } else {
        (
            format!("{}, ", indices_prototype(&dims)),
            format!("{}, ", indices_varlist(&dims)),
        )
    };
    writeln!(output, "static CONSTEXPR inline struct fd_reg_pair").unwrap();
    writeln!(output, "pack_{name}({params}struct {name} fields)").unwrap();
    writeln!(output, "{{").unwrap();
    write_builder(output, db, idx);
    writeln!(output).unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "#define {name}({args}...) pack_{name}({args}__struct_cast({name}) {{ __VA_ARGS__ }}){}",
        skip_suffix(db, reg)
    )
    .unwrap();
    writeln!(output).unwrap();
}

/// Debug checks and the `fd_reg_pair` composed from `fields`.
fn write_builder(output: &mut String, db: &Database, idx: RegIdx) {
    let reg = &db.regs[idx];
    let bitset = db.bitset_of(reg);
    let all_ones = mask(0, reg.bit_size - 1);

    writeln!(output, "#ifndef NDEBUG").unwrap();
    for field in &bitset.fields {
        if matches!(field.ty, FieldType::Boolean) || field.ty.is_address() {
            continue;
        }
        let member = format!("fields.{}", member_name(&reg.name, field.name.as_deref()));
        let (_, val) = ctype(field, &member);
        writeln!(
            output,
            "    assert(({val:<40} & {}) == 0);",
            hex8(all_ones ^ value_mask(field))
        )
        .unwrap();
    }
    writeln!(
        output,
        "    assert(({:<40} & {}) == 0);",
        "fields.unknown",
        hex8(bitset.known_mask())
    )
    .unwrap();
    writeln!(output, "#endif").unwrap();
    writeln!(output).unwrap();

    let dims = db.reg_indices(idx);
    writeln!(output, "    return (struct fd_reg_pair) {{").unwrap();
    if dims.is_empty() {
        writeln!(output, "        .reg = REG_{},", reg.full_name).unwrap();
    } else {
        writeln!(
            output,
            "        .reg = REG_{}({}),",
            reg.full_name,
            indices_varlist(&dims)
        )
        .unwrap();
    }
    writeln!(output, "        .value =").unwrap();
    for field in bitset.fields.iter().filter(|f| !f.ty.is_address()) {
        let member = format!("fields.{}", member_name(&reg.name, field.name.as_deref()));
        let (_, mut val) = ctype(field, &member);
        if field.high > 31 {
            val = format!("(uint64_t){val}");
        }
        writeln!(output, "            ({val:<40} << {:2}) |", field.low).unwrap();
    }
    writeln!(output, "            fields.unknown | fields.{},", word_type(reg).1).unwrap();
    if let Some(address) = bitset.address_field() {
        writeln!(output, "        .bo = fields.bo,").unwrap();
        writeln!(output, "        .is_address = true,").unwrap();
        if address.ty == FieldType::Waddress {
            writeln!(output, "        .bo_write = true,").unwrap();
        }
        writeln!(output, "        .bo_offset = fields.bo_offset,").unwrap();
        writeln!(output, "        .bo_shift = {},", address.shr).unwrap();
        writeln!(output, "        .bo_low = {},", address.low).unwrap();
    }
    writeln!(output, "    }};").unwrap();
}

/// C++ condition selecting the variants of one `variants` attribute.
pub fn variant_test(variants: &str, var: &str) -> String {
    let specs = parse_variants(variants);
    let tests: Vec<String> = specs
        .iter()
        .map(|spec| match spec {
            VariantSpec::Exact(v) => format!("({var} == {v})"),
            VariantSpec::From(from) => format!("({var} >= {from})"),
            VariantSpec::Until(to) => format!("({var} <= {to})"),
            VariantSpec::Range { from, to } if specs.len() > 1 => {
                format!("(({var} >= {from}) && ({var} <= {to}))")
            }
            VariantSpec::Range { from, to } => format!("({var} >= {from}) && ({var} <= {to})"),
        })
        .collect();
    tests.join(" || ")
}

fn write_dispatcher(output: &mut String, db: &Database, group: &VariantGroup) {
    let name = &group.name;
    let first = &db.regs[group.members[0].reg];
    let chip = variant_enum(db, group.members.iter().map(|m| m.reg));
    let var = chip.to_uppercase();

    writeln!(output, "#ifdef __cplusplus").unwrap();
    writeln!(output, "struct __{name} {{").unwrap();
    let mut seen: Vec<String> = vec![];
    for member in &group.members {
        writeln!(output, "    /* {} fields: */", member.variants).unwrap();
        for (ty, field) in members(db, &db.regs[member.reg]) {
            if seen.contains(&field) {
                continue;
            }
            tab_to(output, &format!("    {ty}"), &format!("{field};"));
            seen.push(field);
        }
    }
    writeln!(output, "    /* fallback fields: */").unwrap();
    write_fallback_members(output, first);
    writeln!(output, "}};").unwrap();

    let dims = db.reg_indices(group.members[0].reg);
    let (params, args) = if dims.is_empty() {
        (String::new(), String::new())
    } else {
        (
            format!("{}, ", indices_prototype(&dims)),
            format!("{}, ", indices_varlist(&dims)),
        )
    };
    writeln!(output, "template <{chip} {var}>").unwrap();
    writeln!(output, "static inline struct fd_reg_pair").unwrap();
    writeln!(output, "__{name}({params}struct __{name} fields) {{").unwrap();
    for member in &group.members {
        writeln!(output, "  if ({}) {{", variant_test(&member.variants, &var)).unwrap();
        write_builder(output, db, member.reg);
        writeln!(output, "  }} else").unwrap();
    }
    writeln!(output, "    assert(!\"invalid variant\");").unwrap();
    writeln!(output, "}}").unwrap();
    writeln!(
        output,
        "#define {name}(VARIANT, {args}...) __{name}<VARIANT>({args}{{__VA_ARGS__}}){}",
        skip_suffix(db, first)
    )
    .unwrap();
    writeln!(output, "#endif /* __cplusplus */").unwrap();
    writeln!(output).unwrap();
}
