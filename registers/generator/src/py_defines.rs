// Licensed under the Apache-2.0 license

//! Register offsets as a Python `IntEnum`.

use crate::util::hex8;
use registers_rnndb::model::Element;
use registers_rnndb::Database;
use std::fmt::Write;
use std::path::Path;

pub fn write_py_defines(output: &mut String, db: &Database, root_file: &Path) {
    let stem = root_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    writeln!(output, "from enum import IntEnum").unwrap();
    writeln!(output, "class {stem}Regs(IntEnum):").unwrap();
    let mut empty = true;
    for element in &db.elements {
        if let Element::Reg(idx) = element {
            let reg = &db.regs[*idx];
            writeln!(output, "\tREG_{} = {}", reg.full_name, hex8(reg.offset)).unwrap();
            empty = false;
        }
    }
    if empty {
        writeln!(output, "\tpass").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registers_rnndb::{parse_str, ParseConfig};

    #[test]
    fn test_py_defines() {
        let db = parse_str(
            &ParseConfig::default(),
            Path::new("a6xx.xml"),
            r#"<database>
                <enum name="e"><value name="V"/></enum>
                <domain name="A6XX">
                    <reg32 offset="0x10" name="FOO"/>
                    <array name="BAR" offset="0x100" stride="0x10" length="4">
                        <reg32 offset="0x4" name="X"/>
                    </array>
                </domain>
            </database>"#,
        )
        .unwrap();
        let mut out = String::new();
        write_py_defines(&mut out, &db, Path::new("adreno/a6xx.xml"));
        assert_eq!(
            out,
            "from enum import IntEnum\n\
             class a6xxRegs(IntEnum):\n\
             \tREG_A6XX_FOO = 0x00000010\n\
             \tREG_A6XX_BAR_X = 0x00000004\n"
        );
    }

    #[test]
    fn test_empty_class_body() {
        let mut out = String::new();
        write_py_defines(&mut out, &Database::default(), Path::new("empty.xml"));
        assert_eq!(out, "from enum import IntEnum\nclass emptyRegs(IntEnum):\n\tpass\n");
    }
}
