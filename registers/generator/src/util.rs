// Licensed under the Apache-2.0 license

//! Formatting helpers shared by the header backends.
//!
//! This module provides column alignment, hex formatting, include guard and
//! member naming, and the C spelling of field types and array indices.

use registers_rnndb::model::{mask, Dimension, Field, FieldType, Step};
use registers_rnndb::Database;
use std::fmt::Write;
use std::path::Path;

/// Writes `name`, then enough tabs to reach the value column, then `value`.
///
/// Names too long for the column get a single tab.
///
/// # Examples
/// ```
/// use registers_generator::util::tab_to;
/// let mut out = String::new();
/// tab_to(&mut out, "#define REG_A6XX_FOO", "0x00000010");
/// assert_eq!(out, "#define REG_A6XX_FOO\t\t\t\t\t\t0x00000010\n");
/// ```
pub fn tab_to(output: &mut String, name: &str, value: &str) {
    let tabs = ((68 - (name.len() & !7) as isize) / 8).max(1) as usize;
    writeln!(output, "{name}{}{value}", "\t".repeat(tabs)).unwrap();
}

/// Formats a value as a zero padded hex constant of at least 8 digits.
///
/// # Examples
/// ```
/// use registers_generator::util::hex8;
/// assert_eq!(hex8(0xf), "0x0000000f");
/// assert_eq!(hex8(0x1_0000_0000), "0x100000000");
/// ```
pub fn hex8(val: u64) -> String {
    format!("0x{val:08x}")
}

/// Include guard derived from the root file name: `a6xx.xml` becomes `A6XX_XML`.
pub fn guard_name(root_file: &Path) -> String {
    root_file
        .file_name()
        .map(|n| n.to_string_lossy().replace('.', "_").to_uppercase())
        .unwrap_or_default()
}

/// Struct member name of a field. Unnamed fields take the register's name.
///
/// # Examples
/// ```
/// use registers_generator::util::member_name;
/// assert_eq!(member_name("RB_MODE", Some("SAMPLES")), "samples");
/// assert_eq!(member_name("RB_MODE", None), "rb_mode");
/// assert_eq!(member_name("RB_MODE", Some("FLOAT")), "_float");
/// assert_eq!(member_name("RB_MODE", Some("2D")), "_2d");
/// ```
pub fn member_name(reg_name: &str, field_name: Option<&str>) -> String {
    let name = field_name.unwrap_or(reg_name).to_lowercase();
    match name.chars().next() {
        Some(c)
            if c.is_ascii_alphabetic()
                && !matches!(name.as_str(), "double" | "float" | "int") =>
        {
            name
        }
        _ => format!("_{name}"),
    }
}

/// C type of a field's input value, and the expression converting `var` into
/// the bits stored in the register (before shifting into place).
pub fn ctype(field: &Field, var: &str) -> (String, String) {
    let (ty, val) = match &field.ty {
        FieldType::Plain | FieldType::Uint | FieldType::Hex | FieldType::Regid => {
            ("uint32_t".to_string(), var.to_string())
        }
        FieldType::Boolean => ("bool".to_string(), var.to_string()),
        FieldType::Int => ("int32_t".to_string(), var.to_string()),
        FieldType::Fixed { radix } => (
            "float".to_string(),
            format!("((int32_t)({var} * {}.0))", 1u64 << radix),
        ),
        FieldType::Ufixed { radix } => (
            "float".to_string(),
            format!("((uint32_t)({var} * {}.0))", 1u64 << radix),
        ),
        FieldType::Float if field.width() == 16 => {
            ("float".to_string(), format!("_mesa_float_to_half({var})"))
        }
        FieldType::Float => ("float".to_string(), format!("fui({var})")),
        FieldType::Address | FieldType::Waddress => ("uint64_t".to_string(), var.to_string()),
        FieldType::Enum(name) => (format!("enum {name}"), var.to_string()),
    };
    if field.shr > 0 {
        (ty, format!("({val} >> {})", field.shr))
    } else {
        (ty, val)
    }
}

/// Mask of the bits a field's value may use before it is shifted into place.
pub fn value_mask(field: &Field) -> u64 {
    mask(0, field.width() - 1)
}

/// Parameter names of an address function: `i0, i1`.
pub fn indices_varlist(dims: &[Dimension]) -> String {
    (0..dims.len())
        .map(|i| format!("i{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameter list of an address function: `uint32_t i0, enum pipe i1`.
pub fn indices_prototype(dims: &[Dimension]) -> String {
    dims.iter()
        .enumerate()
        .map(|(i, dim)| format!("{} i{i}", dim.ctype))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sum of the per-index address contributions: `0x10*i0 + __offset_PIPE(i1)`.
pub fn indices_strides(db: &Database, dims: &[Dimension]) -> String {
    dims.iter()
        .enumerate()
        .map(|(i, dim)| match dim.step {
            Step::Stride(stride) => format!("0x{stride:x}*i{i}"),
            Step::Lookup(array) => format!("__offset_{}(i{i})", db.arrays[array].local_name),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(ty: FieldType, low: u32, high: u32, shr: u32) -> Field {
        Field::new(Some("F"), low, high, shr, ty, 64).unwrap()
    }

    #[test]
    fn test_tab_to() {
        let mut out = String::new();
        tab_to(&mut out, "#define A", "1");
        tab_to(&mut out, &"X".repeat(70), "2");
        assert_eq!(out, format!("#define A\t\t\t\t\t\t\t1\n{}\t2\n", "X".repeat(70)));
    }

    #[test]
    fn test_guard_name() {
        assert_eq!(guard_name(Path::new("adreno/a6xx.xml")), "A6XX_XML");
        assert_eq!(guard_name(Path::new("adreno_pm4.xml")), "ADRENO_PM4_XML");
    }

    #[test]
    fn test_ctype() {
        assert_eq!(
            ctype(&field(FieldType::Uint, 0, 3, 0), "val"),
            ("uint32_t".into(), "val".into())
        );
        assert_eq!(
            ctype(&field(FieldType::Hex, 0, 27, 6), "val"),
            ("uint32_t".into(), "(val >> 6)".into())
        );
        assert_eq!(
            ctype(&field(FieldType::Fixed { radix: 8 }, 0, 15, 0), "val"),
            ("float".into(), "((int32_t)(val * 256.0))".into())
        );
        assert_eq!(
            ctype(&field(FieldType::Ufixed { radix: 4 }, 0, 11, 0), "val"),
            ("float".into(), "((uint32_t)(val * 16.0))".into())
        );
        assert_eq!(
            ctype(&field(FieldType::Float, 16, 31, 0), "val").1,
            "_mesa_float_to_half(val)"
        );
        assert_eq!(ctype(&field(FieldType::Float, 0, 31, 0), "val").1, "fui(val)");
        assert_eq!(
            ctype(&field(FieldType::Enum("a6xx_fmt".into()), 0, 7, 0), "val").0,
            "enum a6xx_fmt"
        );
        assert_eq!(ctype(&field(FieldType::Waddress, 0, 63, 0), "val").0, "uint64_t");
    }

    #[test]
    fn test_indices() {
        let dims = vec![
            Dimension {
                ctype: "uint32_t".into(),
                step: Step::Stride(0x10),
            },
            Dimension {
                ctype: "uint32_t".into(),
                step: Step::Stride(0x4),
            },
        ];
        assert_eq!(indices_varlist(&dims), "i0, i1");
        assert_eq!(indices_prototype(&dims), "uint32_t i0, uint32_t i1");
        assert_eq!(
            indices_strides(&Database::default(), &dims),
            "0x10*i0 + 0x4*i1"
        );
        assert_eq!(indices_varlist(&[]), "");
    }
}
