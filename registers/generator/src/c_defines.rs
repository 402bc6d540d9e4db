// Licensed under the Apache-2.0 license

//! Flat C header backend: address macros, field encoders and usage tables.

use crate::config::GeneratorConfig;
use crate::util::{ctype, hex8, indices_prototype, indices_strides, indices_varlist, tab_to};
use registers_rnndb::model::{
    mask, ArrayIdx, ArrayOffsets, Bitset, Element, Enum, FieldType, RegIdx,
};
use registers_rnndb::{Database, Index};
use std::fmt::Write;

/// Comment at the top of every generated header.
pub fn write_header_comment(output: &mut String, db: &Database, config: &GeneratorConfig) {
    writeln!(output, "/* Autogenerated file, DO NOT EDIT manually!").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated from the following register database files:").unwrap();
    for file in &db.files {
        writeln!(output, "- {}", config.display_path(file)).unwrap();
    }
    if let Some(year) = &db.copyright {
        writeln!(output).unwrap();
        writeln!(output, "Copyright (C) {year} by the following authors:").unwrap();
        for author in &db.authors {
            writeln!(output, "- {author}").unwrap();
        }
    }
    if let Some(license) = &db.license {
        writeln!(output).unwrap();
        for line in license.lines() {
            writeln!(output, "{}", line.trim()).unwrap();
        }
    }
    writeln!(output, "*/").unwrap();
    writeln!(output).unwrap();
}

/// Root file declarations: enums first, then shared bitsets, then registers
/// and arrays, each group in declaration order.
pub fn write_declarations(output: &mut String, db: &Database) {
    let enums = db.elements.iter().filter(|e| matches!(e, Element::Enum(_)));
    let bitsets = db.elements.iter().filter(|e| matches!(e, Element::Bitset(_)));
    let regs = db
        .elements
        .iter()
        .filter(|e| matches!(e, Element::Array(_) | Element::Reg(_)));

    for element in enums.chain(bitsets).chain(regs) {
        match *element {
            Element::Enum(idx) => write_enum(output, &db.enums[idx]),
            Element::Bitset(idx) => {
                let bitset = &db.bitsets[idx];
                write_fields(output, bitset, &bitset.name);
            }
            Element::Array(idx) => write_array(output, db, idx),
            Element::Reg(idx) => write_reg(output, db, idx),
        }
    }
}

fn write_enum(output: &mut String, e: &Enum) {
    let hex = e.uses_hex();
    writeln!(output, "enum {} {{", e.name).unwrap();
    for (name, value) in &e.values {
        if hex {
            writeln!(output, "\t{name} = {},", hex8(*value)).unwrap();
        } else {
            writeln!(output, "\t{name} = {value},").unwrap();
        }
    }
    writeln!(output, "}};").unwrap();
    writeln!(output).unwrap();
}

/// Mask, shift and encoder for every field of `bitset`, named after `prefix`.
pub fn write_fields(output: &mut String, bitset: &Bitset, prefix: &str) {
    for field in &bitset.fields {
        let name = match &field.name {
            Some(field_name) => format!("{prefix}_{field_name}"),
            None => prefix.to_string(),
        };
        // A whole-register value needs no encoder.
        if field.name.is_none() && field.low == 0 && field.shr == 0 && !field.ty.is_scaled() {
            continue;
        }
        let single_bit = field.ty == FieldType::Boolean
            || (field.ty == FieldType::Plain && field.low == field.high);
        if single_bit {
            tab_to(output, &format!("#define {name}"), &hex8(1 << field.low));
            continue;
        }

        tab_to(output, &format!("#define {name}__MASK"), &hex8(field.mask()));
        tab_to(output, &format!("#define {name}__SHIFT"), &field.low.to_string());
        let (ty, val) = ctype(field, "val");
        let ret = if field.high > 31 { "uint64_t" } else { "uint32_t" };
        writeln!(output, "static inline {ret} {name}({ty} val)").unwrap();
        writeln!(output, "{{").unwrap();
        if field.shr > 0 {
            writeln!(output, "\tassert(!(val & 0x{:x}));", mask(0, field.shr - 1)).unwrap();
        }
        writeln!(
            output,
            "\treturn (({val}) << {name}__SHIFT) & {name}__MASK;"
        )
        .unwrap();
        writeln!(output, "}}").unwrap();
    }
    writeln!(output).unwrap();
}

fn write_array(output: &mut String, db: &Database, idx: ArrayIdx) {
    let array = &db.arrays[idx];
    if array.is_fixed() {
        let offsets: Vec<String> = match &array.offsets {
            ArrayOffsets::Fixed(offsets) => offsets.iter().map(|o| hex8(*o)).collect(),
            ArrayOffsets::Expr(exprs) => exprs.iter().map(|e| format!("({e})")).collect(),
            ArrayOffsets::Stride { .. } => vec![],
        };
        let labels: Vec<String> = match array.index_type {
            Some(e) => db.enums[e].names().map(str::to_string).collect(),
            None => (0..offsets.len()).map(|i| i.to_string()).collect(),
        };
        writeln!(
            output,
            "static inline uint32_t __offset_{}({} idx)",
            array.local_name,
            db.index_ctype(array)
        )
        .unwrap();
        writeln!(output, "{{").unwrap();
        writeln!(output, "\tswitch (idx) {{").unwrap();
        for (label, offset) in labels.iter().zip(&offsets) {
            writeln!(output, "\t\tcase {label}: return {offset};").unwrap();
        }
        writeln!(output, "\t\tdefault: return INVALID_IDX(idx);").unwrap();
        writeln!(output, "\t}}").unwrap();
        writeln!(output, "}}").unwrap();
    }

    let dims = db.array_indices(idx);
    let offset = db.array_total_offset(idx);
    let name = format!("#define REG_{}_{}", array.domain, array.name);
    if dims.is_empty() {
        tab_to(output, &name, &format!("{}\n", hex8(offset)));
    } else {
        tab_to(
            output,
            &format!("{name}({})", indices_varlist(&dims)),
            &format!("({} + {} )\n", hex8(offset), indices_strides(db, &dims)),
        );
    }
}

fn write_reg(output: &mut String, db: &Database, idx: RegIdx) {
    let reg = &db.regs[idx];
    let dims = db.reg_indices(idx);
    let offset = db.reg_total_offset(idx);
    if dims.is_empty() {
        tab_to(output, &format!("#define REG_{}", reg.full_name), &hex8(offset));
    } else {
        writeln!(
            output,
            "static inline uint32_t REG_{}({}) {{ return {} + {}; }}",
            reg.full_name,
            indices_prototype(&dims),
            hex8(offset),
            indices_strides(db, &dims)
        )
        .unwrap();
    }
    let bitset = db.bitset_of(reg);
    if bitset.inline {
        write_fields(output, bitset, &reg.full_name);
    }
    writeln!(output).unwrap();
}

/// Name of the enum whose members tag hardware variants.
pub fn variant_enum<'a>(db: &'a Database, regs: impl IntoIterator<Item = RegIdx>) -> &'a str {
    regs.into_iter()
        .find_map(|idx| db.regs[idx].varset)
        .map_or("chip", |e| db.enums[e].name.as_str())
}

/// Per usage, per variant tables of the offsets registers occupy.
pub fn write_usage_tables(output: &mut String, db: &Database, index: &Index) {
    if index.usage_groups.is_empty() {
        return;
    }
    let chip = variant_enum(db, index.usage_groups.iter().flat_map(|g| g.regs.iter().copied()));
    writeln!(output, "#ifdef __cplusplus").unwrap();
    for group in &index.usage_groups {
        writeln!(
            output,
            "template<{chip} CHIP> constexpr inline uint16_t {}_REGS[] = {{}};",
            group.usage.to_uppercase()
        )
        .unwrap();
    }
    for table in &index.usage_tables {
        writeln!(
            output,
            "template<> constexpr inline uint16_t {}_REGS<{}>[] = {{",
            table.usage.to_uppercase(),
            table.variant
        )
        .unwrap();
        for offset in &table.offsets {
            writeln!(output, "\t{offset:#x},").unwrap();
        }
        writeln!(output, "}};").unwrap();
    }
    writeln!(output, "#endif /* __cplusplus */").unwrap();
    writeln!(output).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use registers_rnndb::{parse_str, ParseConfig};
    use std::path::Path;

    fn declarations(xml: &str) -> String {
        let db = parse_str(&ParseConfig::default(), Path::new("test.xml"), xml).unwrap();
        let mut out = String::new();
        write_declarations(&mut out, &db);
        out
    }

    #[test]
    fn test_enum() {
        let out = declarations(
            r#"<database>
                <enum name="a6xx_tile_mode"><value name="TILE6_LINEAR"/><value name="TILE6_2" value="2"/></enum>
                <enum name="big"><value name="HUGE" value="0x1001"/></enum>
            </database>"#,
        );
        assert!(out.contains("enum a6xx_tile_mode {\n\tTILE6_LINEAR = 0,\n\tTILE6_2 = 2,\n};\n\n"));
        assert!(out.contains("\tHUGE = 0x00001001,\n"));
    }

    #[test]
    fn test_field_encoders() {
        let out = declarations(
            r#"<database><domain name="A6XX">
                <reg32 offset="0x10" name="FOO">
                    <bitfield name="A" low="0" high="3" type="uint"/>
                    <bitfield name="B" pos="4" type="boolean"/>
                    <bitfield name="C" low="8" high="15" shr="2" type="hex"/>
                    <bitfield name="D" low="16" high="31" type="float"/>
                </reg32>
            </domain></database>"#,
        );
        assert!(out.contains("#define REG_A6XX_FOO\t\t\t\t\t\t0x00000010\n"));
        assert!(out.contains("#define A6XX_FOO_A__MASK\t\t\t\t\t0x0000000f\n"));
        assert!(out.contains("#define A6XX_FOO_A__SHIFT\t\t\t\t\t0\n"));
        assert!(out.contains(
            "static inline uint32_t A6XX_FOO_A(uint32_t val)\n{\n\treturn ((val) << A6XX_FOO_A__SHIFT) & A6XX_FOO_A__MASK;\n}\n"
        ));
        assert!(out.contains("#define A6XX_FOO_B\t\t\t\t\t\t0x00000010\n"));
        assert!(out.contains(
            "\tassert(!(val & 0x3));\n\treturn (((val >> 2)) << A6XX_FOO_C__SHIFT)"
        ));
        assert!(out.contains("static inline uint32_t A6XX_FOO_D(float val)"));
        assert!(out.contains("_mesa_float_to_half(val)"));
    }

    #[test]
    fn test_whole_register_value_has_no_encoder() {
        let out = declarations(
            r#"<database><domain name="D">
                <reg32 offset="0x20" name="SCRATCH" type="uint"/>
                <reg32 offset="0x21" name="PITCH" low="0" high="28" shr="6" type="uint"/>
            </domain></database>"#,
        );
        assert!(!out.contains("D_SCRATCH__MASK"));
        assert!(out.contains("#define D_PITCH__MASK"));
    }

    #[test]
    fn test_stride_array() {
        let out = declarations(
            r#"<database><domain name="A6XX">
                <array name="BAR" offset="0x100" stride="0x10" length="4">
                    <reg32 offset="0x4" name="X"/>
                </array>
            </domain></database>"#,
        );
        assert!(out.contains("#define REG_A6XX_BAR(i0)\t\t\t\t\t(0x00000100 + 0x10*i0 )\n"));
        assert!(out.contains(
            "static inline uint32_t REG_A6XX_BAR_X(uint32_t i0) { return 0x00000104 + 0x10*i0; }"
        ));
    }

    #[test]
    fn test_fixed_offset_array() {
        let out = declarations(
            r#"<database>
                <enum name="pipe"><value name="P_A"/><value name="P_B"/></enum>
                <domain name="D">
                    <array name="PIPE" offsets="0x10,0x80" length="2" index="pipe">
                        <reg32 offset="0x1" name="CTRL"/>
                    </array>
                </domain>
            </database>"#,
        );
        assert!(out.contains(
            "static inline uint32_t __offset_PIPE(enum pipe idx)\n{\n\tswitch (idx) {\n\t\tcase P_A: return 0x00000010;\n\t\tcase P_B: return 0x00000080;\n\t\tdefault: return INVALID_IDX(idx);\n\t}\n}\n"
        ));
        assert!(out.contains(
            "REG_D_PIPE_CTRL(enum pipe i0) { return 0x00000001 + __offset_PIPE(i0); }"
        ));
        // Enums come before registers regardless of declaration order.
        assert!(out.find("enum pipe {").unwrap() < out.find("__offset_PIPE").unwrap());
    }

    #[test]
    fn test_usage_tables() {
        let db = parse_str(
            &ParseConfig::default(),
            Path::new("test.xml"),
            r#"<database><domain name="A6XX">
                <reg64 offset="0x20" name="BASE" usage="cmd"/>
                <reg32 offset="0x10" name="CTRL" usage="cmd"/>
            </domain></database>"#,
        )
        .unwrap();
        let index = Index::build(&db).unwrap();
        let mut out = String::new();
        write_usage_tables(&mut out, &db, &index);
        assert_eq!(
            out,
            "#ifdef __cplusplus\n\
             template<chip CHIP> constexpr inline uint16_t CMD_REGS[] = {};\n\
             template<> constexpr inline uint16_t CMD_REGS<A6XX>[] = {\n\
             \t0x10,\n\t0x20,\n\t0x21,\n\
             };\n\
             #endif /* __cplusplus */\n\n"
        );
    }

    #[test]
    fn test_no_usage_block_without_usages() {
        let mut out = String::new();
        write_usage_tables(&mut out, &Database::default(), &Index::default());
        assert!(out.is_empty());
    }
}
