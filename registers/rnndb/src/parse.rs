// Licensed under the Apache-2.0 license

//! Event driven parser building a [`Database`] from XML register files.
//!
//! Nesting state is kept as an explicit stack of [`Scope`] frames: every
//! start element pushes a copy of the enclosing frame with its own changes
//! applied, and the matching end element pops it again. Imported files are
//! parsed recursively starting from a fresh frame.

use crate::config::{resolve_schema, ParseConfig};
use crate::error::{Location, SchemaError, SchemaResult};
use crate::model::{
    Array, ArrayIdx, ArrayOffsets, Bitset, BitsetIdx, Database, Element, Enum, EnumIdx, Field,
    FieldType, Reg,
};
use crate::variant::{parse_variants, primary_variant, sanitize_variant};
use log::{debug, warn};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use xml::attribute::OwnedAttribute;
use xml::common::Position;
use xml::reader::{EventReader, XmlEvent};

/// Parse a database starting at `file`, following its imports.
pub fn parse_file(config: &ParseConfig, file: &Path) -> SchemaResult<Database> {
    let mut parser = Parser::new(config);
    parser.parse_path(file)?;
    Ok(parser.db)
}

/// Parse a database from in-memory XML. `name` is used for diagnostics;
/// imports are still resolved against the schema root.
pub fn parse_str(config: &ParseConfig, name: &Path, xml: &str) -> SchemaResult<Database> {
    let mut parser = Parser::new(config);
    parser.parse_reader(name, xml.as_bytes())?;
    Ok(parser.db)
}

/// Parse a number the way the register files write them: `0x`, `0o`, `0b`
/// prefixes or plain decimal.
pub fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(oct) = text.strip_prefix("0o") {
        (oct, 8)
    } else if let Some(bin) = text.strip_prefix("0b") {
        (bin, 2)
    } else {
        (text, 10)
    };
    u64::from_str_radix(&digits.replace('_', ""), radix).ok()
}

/// Parsing context of one nesting level.
#[derive(Clone, Debug)]
struct Scope {
    domain: Option<String>,
    prefix: Option<String>,
    prefix_type: Option<String>,
    stripe: Option<String>,
    /// Enum listing every hardware variant.
    varset: Option<EnumIdx>,
    bitset: Option<BitsetIdx>,
    array: Option<ArrayIdx>,
    enumeration: Option<EnumIdx>,
    bit_size: u32,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            domain: None,
            prefix: None,
            prefix_type: None,
            stripe: None,
            varset: None,
            bitset: None,
            array: None,
            enumeration: None,
            bit_size: 32,
        }
    }
}

/// Attributes of one element, keyed by qualified name (`xsi:schemaLocation`).
struct Attrs(Vec<(String, String)>);

impl Attrs {
    fn new(attributes: &[OwnedAttribute]) -> Self {
        Self(
            attributes
                .iter()
                .map(|a| {
                    let key = match &a.name.prefix {
                        Some(prefix) => format!("{prefix}:{}", a.name.local_name),
                        None => a.name.local_name.clone(),
                    };
                    (key, a.value.clone())
                })
                .collect(),
        )
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|s| s.trim().to_string()).collect()
}

struct Parser<'a> {
    config: &'a ParseConfig,
    db: Database,
    /// Files currently being parsed; the root file is at the bottom.
    stack: Vec<PathBuf>,
    /// Position of the event being handled.
    location: Location,
}

impl<'a> Parser<'a> {
    fn new(config: &'a ParseConfig) -> Self {
        Self {
            config,
            db: Database::default(),
            stack: vec![],
            location: Location::default(),
        }
    }

    fn error(&self, message: impl Display) -> SchemaError {
        SchemaError::new(self.location.clone(), message)
    }

    fn in_root_file(&self) -> bool {
        self.stack.len() == 1
    }

    fn parse_path(&mut self, path: &Path) -> SchemaResult<()> {
        for seen in &self.db.files {
            if same_file::is_same_file(seen, path).unwrap_or(false) {
                debug!("{} already parsed, skipping", path.display());
                return Ok(());
            }
        }
        let file = File::open(path)
            .map_err(|e| self.error(format!("cannot open {}: {e}", path.display())))?;
        self.parse_reader(path, BufReader::new(file))
    }

    fn parse_reader<R: Read>(&mut self, path: &Path, reader: R) -> SchemaResult<()> {
        debug!("parsing {}", path.display());
        self.db.files.push(path.to_path_buf());
        self.stack.push(path.to_path_buf());
        let outer_location = self.location.clone();

        let mut scopes = vec![Scope::default()];
        let mut text = String::new();
        let mut events = EventReader::new(reader);
        loop {
            let event = events.next();
            let pos = events.position();
            self.location = Location::new(path, pos.row + 1, pos.column + 1);
            match event {
                Ok(XmlEvent::StartElement {
                    name, attributes, ..
                }) => {
                    text.clear();
                    let enclosing = scopes.last().cloned().unwrap_or_default();
                    let scope =
                        self.start_element(&name.local_name, &Attrs::new(&attributes), enclosing)?;
                    scopes.push(scope);
                }
                Ok(XmlEvent::EndElement { name }) => {
                    let scope = scopes.pop().unwrap_or_default();
                    self.end_element(&name.local_name, scope, &text)?;
                }
                Ok(XmlEvent::Characters(data)) | Ok(XmlEvent::CData(data)) => {
                    text.push_str(&data);
                }
                Ok(XmlEvent::EndDocument) => break,
                Ok(_) => {}
                Err(e) => {
                    let pos = e.position();
                    return Err(SchemaError::new(
                        Location::new(path, pos.row + 1, pos.column + 1),
                        e.msg(),
                    ));
                }
            }
        }

        self.stack.pop();
        self.location = outer_location;
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attrs: &Attrs,
        mut scope: Scope,
    ) -> SchemaResult<Scope> {
        match name {
            "import" => {
                let file = self.required(attrs, "file")?;
                let path = self
                    .config
                    .resolve_import(file)
                    .ok_or_else(|| self.error(format!("cannot find imported file '{file}'")))?;
                self.parse_path(&path)?;
            }
            "domain" => {
                scope.domain = Some(self.required(attrs, "name")?.to_string());
                if let Some(varset) = attrs.get("varset") {
                    scope.varset = Some(self.lookup_enum(varset)?);
                }
                match attrs.get("prefix") {
                    Some(prefix_type) => {
                        scope.prefix = self.parse_variants(attrs, &scope)?;
                        scope.prefix_type = Some(prefix_type.to_string());
                    }
                    None => {
                        scope.prefix = None;
                        scope.prefix_type = None;
                    }
                }
            }
            "stripe" => {
                scope.stripe = self.parse_variants(attrs, &scope)?;
            }
            "enum" => {
                let name = self.required(attrs, "name")?;
                self.db.enums.push(Enum::new(name));
                let idx = self.db.enums.len() - 1;
                self.db.enum_names.insert(name.to_string(), idx);
                scope.enumeration = Some(idx);
                if self.in_root_file() {
                    self.db.elements.push(Element::Enum(idx));
                }
            }
            "value" => {
                if let Some(idx) = scope.enumeration {
                    let name = self.required(attrs, "name")?.to_string();
                    let value = match attrs.get("value") {
                        Some(v) => self.int(v)?,
                        None => self.db.enums[idx].next_value().ok_or_else(|| {
                            self.error(format!("value {name} does not fit in 64 bits"))
                        })?,
                    };
                    self.db.enums[idx].values.push((name, value));
                }
            }
            "bitset" => {
                let name = self.required(attrs, "name")?;
                let inline = attrs.get("inline") == Some("yes");
                self.db.bitsets.push(Bitset::new(name, inline));
                let idx = self.db.bitsets.len() - 1;
                self.db.bitset_names.insert(name.to_string(), idx);
                scope.bitset = Some(idx);
                if self.in_root_file() && !inline {
                    self.db.elements.push(Element::Bitset(idx));
                }
            }
            "bitfield" => {
                if let Some(bitset) = scope.bitset {
                    let name = self.required(attrs, "name")?;
                    let field = self.parse_field(Some(name), attrs, scope.bit_size)?;
                    self.db.bitsets[bitset].fields.push(field);
                }
            }
            "reg32" => self.parse_reg(attrs, &mut scope, 32)?,
            "reg64" => self.parse_reg(attrs, &mut scope, 64)?,
            "array" => {
                scope.bit_size = 32;
                self.parse_array(attrs, &mut scope)?;
            }
            "database" => self.validate(attrs)?,
            "copyright" => {
                if let Some(year) = attrs.get("year") {
                    self.db.copyright = Some(year.to_string());
                }
            }
            "author" => {
                let name = self.required(attrs, "name")?;
                let author = match attrs.get("email") {
                    Some(email) => format!("{name} <{email}>"),
                    None => name.to_string(),
                };
                self.db.authors.push(author);
            }
            _ => {}
        }
        Ok(scope)
    }

    fn end_element(&mut self, name: &str, mut scope: Scope, text: &str) -> SchemaResult<()> {
        match name {
            "array" => {
                // Every array gets at least one addressable register.
                if let Some(array) = scope.array {
                    if self.db.arrays[array].children.is_empty() {
                        let attrs = Attrs::from_pairs(&[("name", "REG"), ("offset", "0")]);
                        self.parse_reg(&attrs, &mut scope, 32)?;
                    }
                }
            }
            "license" => self.db.license = Some(text.trim().to_string()),
            _ => {}
        }
        Ok(())
    }

    fn required<'b>(&self, attrs: &'b Attrs, name: &str) -> SchemaResult<&'b str> {
        attrs
            .get(name)
            .ok_or_else(|| self.error(format!("missing required attribute '{name}'")))
    }

    fn int(&self, text: &str) -> SchemaResult<u64> {
        parse_int(text).ok_or_else(|| self.error(format!("invalid integer '{text}'")))
    }

    fn required_int(&self, attrs: &Attrs, name: &str) -> SchemaResult<u64> {
        self.int(self.required(attrs, name)?)
    }

    fn bit_position(&self, attrs: &Attrs, name: &str) -> SchemaResult<u32> {
        let value = self.required_int(attrs, name)?;
        u32::try_from(value)
            .map_err(|_| self.error(format!("{name} attribute out of range: {value}")))
    }

    /// `offset` relative to the start of the domain.
    fn base_offset(
        &self,
        offset: u64,
        array: Option<ArrayIdx>,
        name: &str,
    ) -> SchemaResult<u64> {
        let outer = array.map_or(0, |a| self.db.arrays[a].base);
        offset
            .checked_add(outer)
            .ok_or_else(|| self.error(format!("offset of {name} does not fit in 64 bits")))
    }

    fn lookup_enum(&self, name: &str) -> SchemaResult<EnumIdx> {
        self.db
            .enum_idx(name)
            .ok_or_else(|| self.error(format!("unknown enum '{name}'")))
    }

    /// Validates an element's `variants` against the varset in scope and
    /// returns the tag it is filed under.
    fn parse_variants(&self, attrs: &Attrs, scope: &Scope) -> SchemaResult<Option<String>> {
        let Some(variants) = attrs.get("variants") else {
            return Ok(None);
        };
        let varset = match attrs.get("varset") {
            Some(name) => Some(self.lookup_enum(name)?),
            None => scope.varset,
        };
        if let Some(varset) = varset {
            let varset = &self.db.enums[varset];
            for spec in parse_variants(variants) {
                for tag in spec.tags() {
                    if !varset.has_name(tag) {
                        return Err(self.error(format!(
                            "variant '{tag}' is not a member of varset '{}'",
                            varset.name
                        )));
                    }
                }
            }
        }
        Ok(Some(primary_variant(variants).to_string()))
    }

    /// Namespace prefix of registers and arrays declared in `scope`.
    fn prefix(&self, scope: &Scope, variant: Option<&str>) -> SchemaResult<String> {
        let domain = scope
            .domain
            .as_deref()
            .ok_or_else(|| self.error("register declared outside of a domain"))?;
        Ok(match (scope.prefix_type.as_deref(), variant) {
            (Some("variant"), Some(variant)) => sanitize_variant(variant).to_string(),
            _ => match (&scope.stripe, &scope.prefix) {
                (Some(stripe), _) => format!("{stripe}_{domain}"),
                (None, Some(prefix)) => format!("{prefix}_{domain}"),
                (None, None) => domain.to_string(),
            },
        })
    }

    fn parse_field(&self, name: Option<&str>, attrs: &Attrs, bit_size: u32) -> SchemaResult<Field> {
        let (low, high) = if attrs.has("pos") {
            let pos = self.bit_position(attrs, "pos")?;
            (pos, pos)
        } else if attrs.has("low") && attrs.has("high") {
            (
                self.bit_position(attrs, "low")?,
                self.bit_position(attrs, "high")?,
            )
        } else {
            (0, bit_size - 1)
        };
        let shr = match attrs.get("shr") {
            Some(_) => self.bit_position(attrs, "shr")?,
            None => 0,
        };
        let radix = match attrs.get("radix") {
            Some(_) => Some(self.bit_position(attrs, "radix")?),
            None => None,
        };
        let ty = FieldType::resolve(attrs.get("type"), radix, |n| {
            self.db.enum_idx(n).is_some()
        })
        .map_err(|e| self.error(e))?;
        Field::new(name, low, high, shr, ty, bit_size).map_err(|e| self.error(e))
    }

    fn parse_reg(&mut self, attrs: &Attrs, scope: &mut Scope, bit_size: u32) -> SchemaResult<()> {
        scope.bit_size = bit_size;
        let name = self.required(attrs, "name")?;

        let shared = attrs.get("type").and_then(|t| self.db.bitset_idx(t));
        let bitset = match shared {
            Some(idx) if !self.db.bitsets[idx].inline => idx,
            Some(idx) => {
                let copy = self.db.bitsets[idx].specialize(name);
                self.db.bitsets.push(copy);
                self.db.bitsets.len() - 1
            }
            None => {
                let mut bitset = Bitset::new(name, true);
                if attrs.has("type") {
                    bitset.fields.push(self.parse_field(None, attrs, bit_size)?);
                }
                self.db.bitsets.push(bitset);
                self.db.bitsets.len() - 1
            }
        };
        scope.bitset = Some(bitset);

        let array = scope.array.map(|a| &self.db.arrays[a]);
        let variants = match attrs.get("variants") {
            Some(v) => {
                self.parse_variants(attrs, scope)?;
                Some(v.to_string())
            }
            None => array.and_then(|a| a.variants.clone()),
        };
        let domain = self.prefix(scope, variants.as_deref().map(primary_variant))?;
        let reg_name = match array {
            Some(a) if !a.name.is_empty() => format!("{}_{name}", a.name),
            _ => name.to_string(),
        };
        let usages = match attrs.get("usage") {
            Some(usage) => split_list(usage),
            None => array.and_then(|a| a.usages.clone()).unwrap_or_default(),
        };
        let (stride, length) = if attrs.has("stride") {
            (
                Some(self.required_int(attrs, "stride")?),
                Some(self.required_int(attrs, "length")?),
            )
        } else {
            (None, None)
        };
        let varset = match attrs.get("varset") {
            Some(name) => Some(self.lookup_enum(name)?),
            None => scope.varset,
        };

        let offset = self.required_int(attrs, "offset")?;
        let base = self.base_offset(offset, scope.array, &reg_name)?;
        let reg = Reg {
            full_name: format!("{domain}_{reg_name}"),
            name: reg_name,
            domain,
            offset,
            base,
            bit_size,
            array: scope.array,
            stride,
            length,
            bitset,
            variants,
            varset,
            usages,
            location: self.location.clone(),
        };
        self.db.regs.push(reg);
        let idx = self.db.regs.len() - 1;
        if let Some(array) = scope.array {
            self.db.arrays[array].children.push(idx);
        }
        if self.in_root_file() {
            self.db.elements.push(Element::Reg(idx));
        }
        Ok(())
    }

    fn parse_array(&mut self, attrs: &Attrs, scope: &mut Scope) -> SchemaResult<()> {
        let parent = scope.array.map(|a| &self.db.arrays[a]);
        let variants = match attrs.get("variants") {
            Some(v) => {
                self.parse_variants(attrs, scope)?;
                Some(v.to_string())
            }
            None => parent.and_then(|p| p.variants.clone()),
        };
        let domain = self.prefix(scope, variants.as_deref().map(primary_variant))?;
        let local_name = attrs.get("name").unwrap_or_default().to_string();
        let name = match parent {
            Some(p) => format!("{}_{local_name}", p.name),
            None => local_name.clone(),
        };
        let usages = match attrs.get("usage") {
            Some(usage) => Some(split_list(usage)),
            None => parent.and_then(|p| p.usages.clone()),
        };
        let offsets = if let Some(list) = attrs.get("offsets") {
            ArrayOffsets::Fixed(
                split_list(list)
                    .iter()
                    .map(|o| self.int(o))
                    .collect::<SchemaResult<_>>()?,
            )
        } else if let Some(list) = attrs.get("doffsets") {
            ArrayOffsets::Expr(split_list(list))
        } else {
            ArrayOffsets::Stride {
                offset: self.required_int(attrs, "offset")?,
                stride: self.required_int(attrs, "stride")?,
            }
        };
        let index_type = match attrs.get("index") {
            Some(index) => Some(self.lookup_enum(index)?),
            None => None,
        };
        let own = match &offsets {
            ArrayOffsets::Stride { offset, .. } => *offset,
            _ => 0,
        };
        let base = self.base_offset(own, scope.array, &name)?;

        let array = Array {
            local_name,
            name,
            domain,
            variants,
            parent: scope.array,
            offsets,
            length: self.required_int(attrs, "length")?,
            base,
            index_type,
            usages,
            children: vec![],
        };
        self.db.arrays.push(array);
        let idx = self.db.arrays.len() - 1;
        scope.array = Some(idx);
        if self.in_root_file() {
            self.db.elements.push(Element::Array(idx));
        }
        Ok(())
    }

    fn validate(&self, attrs: &Attrs) -> SchemaResult<()> {
        if !self.config.validate {
            return Ok(());
        }
        let file = self.location.file.clone();
        let Some(schema_location) = attrs.get("xsi:schemaLocation") else {
            warn!("{} names no schema, skipping validation", file.display());
            return Ok(());
        };
        // "<namespace url> rules-fd.xsd": only the last token is a path.
        let schema = schema_location
            .split_whitespace()
            .last()
            .unwrap_or(schema_location);
        let schema = resolve_schema(&file, schema)
            .ok_or_else(|| self.error(format!("Cannot find schema for: {}", file.display())))?;
        warn!(
            "structural validation against {} is not available, skipping {}",
            schema.display(),
            file.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> SchemaResult<Database> {
        parse_str(&ParseConfig::default(), Path::new("test.xml"), xml)
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x10"), Some(16));
        assert_eq!(parse_int("0X1f"), Some(31));
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("nope"), None);
    }

    #[test]
    fn test_enum_values_increment() {
        let db = parse(
            r#"<database>
                <enum name="a6xx_fmt">
                    <value name="FMT_NONE"/>
                    <value name="FMT_8" value="3"/>
                    <value name="FMT_16"/>
                </enum>
            </database>"#,
        )
        .unwrap();
        let e = db.enum_by_name("a6xx_fmt").unwrap();
        assert_eq!(
            e.values,
            vec![
                ("FMT_NONE".to_string(), 0),
                ("FMT_8".to_string(), 3),
                ("FMT_16".to_string(), 4)
            ]
        );
        assert_eq!(db.elements, vec![Element::Enum(0)]);
    }

    #[test]
    fn test_reg_with_inline_fields() {
        let db = parse(
            r#"<database>
                <domain name="A6XX">
                    <reg32 offset="0x10" name="FOO">
                        <bitfield name="A" low="0" high="3" type="uint"/>
                        <bitfield name="B" pos="4" type="boolean"/>
                    </reg32>
                </domain>
            </database>"#,
        )
        .unwrap();
        let reg = db.reg_by_full_name("A6XX_FOO").unwrap();
        assert_eq!(reg.offset, 0x10);
        assert_eq!(reg.bit_size, 32);
        let bitset = db.bitset_of(reg);
        assert!(bitset.inline);
        assert_eq!(bitset.fields.len(), 2);
        assert_eq!(bitset.fields[1].ty, FieldType::Boolean);
        assert_eq!(bitset.fields[1].mask(), 0x10);
    }

    #[test]
    fn test_single_field_shorthand() {
        let db = parse(
            r#"<database>
                <domain name="A6XX">
                    <reg32 offset="0x88db" name="RB_PITCH" low="0" high="28" shr="6" type="uint"/>
                </domain>
            </database>"#,
        )
        .unwrap();
        let reg = &db.regs[0];
        let field = &db.bitset_of(reg).fields[0];
        assert_eq!(field.name, None);
        assert_eq!((field.low, field.high, field.shr), (0, 28, 6));
    }

    #[test]
    fn test_shared_and_inline_bitsets() {
        let db = parse(
            r#"<database>
                <bitset name="shared_layout">
                    <bitfield name="X" low="0" high="7"/>
                </bitset>
                <bitset name="inline_layout" inline="yes">
                    <bitfield name="Y" low="0" high="7"/>
                </bitset>
                <domain name="D">
                    <reg32 offset="0" name="R0" type="shared_layout"/>
                    <reg32 offset="1" name="R1" type="inline_layout"/>
                </domain>
            </database>"#,
        )
        .unwrap();
        let shared = db.bitset_idx("shared_layout").unwrap();
        assert_eq!(db.regs[0].bitset, shared);

        let copy = db.bitset_of(&db.regs[1]);
        assert_eq!(copy.name, "R1");
        assert!(copy.inline);
        assert_eq!(copy.fields[0].name.as_deref(), Some("Y"));

        // Only the shared bitset is a top-level element of its own.
        assert_eq!(
            db.elements,
            vec![Element::Bitset(shared), Element::Reg(0), Element::Reg(1)]
        );
    }

    #[test]
    fn test_boolean_width_error_is_located() {
        let err = parse(
            "<database>\n<domain name=\"D\">\n<reg32 offset=\"0\" name=\"R\">\n<bitfield name=\"B\" low=\"0\" high=\"1\" type=\"boolean\"/>\n</reg32>\n</domain>\n</database>",
        )
        .unwrap_err();
        assert_eq!(err.location.file, Path::new("test.xml"));
        assert_eq!(err.location.line, 4);
        assert_eq!(err.message, "booleans should be 1 bit fields");
    }

    #[test]
    fn test_unknown_type() {
        let err = parse(
            r#"<database><domain name="D">
                <reg32 offset="0" name="R"><bitfield name="F" low="0" high="3" type="a9xx_thing"/></reg32>
            </domain></database>"#,
        )
        .unwrap_err();
        assert_eq!(err.message, "unknown type 'a9xx_thing'");
    }

    #[test]
    fn test_missing_attribute() {
        let err = parse(r#"<database><domain name="D"><reg32 name="R"/></domain></database>"#)
            .unwrap_err();
        assert_eq!(err.message, "missing required attribute 'offset'");
    }

    #[test]
    fn test_reg64_allows_high_bits() {
        let db = parse(
            r#"<database><domain name="D">
                <reg64 offset="0x20" name="BASE" type="waddress"/>
                <reg32 offset="0x30" name="AFTER"><bitfield name="F" low="0" high="31"/></reg32>
            </domain></database>"#,
        )
        .unwrap();
        assert_eq!(db.regs[0].bit_size, 64);
        let field = &db.bitset_of(&db.regs[0]).fields[0];
        assert_eq!((field.low, field.high), (0, 63));
        assert_eq!(db.regs[1].bit_size, 32);
    }

    #[test]
    fn test_nested_arrays() {
        let db = parse(
            r#"<database><domain name="D">
                <array name="OUTER" offset="0x1000" stride="0x100" length="2">
                    <array name="INNER" offset="0x10" stride="0x8" length="4">
                        <reg32 offset="0x2" name="X"/>
                    </array>
                </array>
            </domain></database>"#,
        )
        .unwrap();
        let x = db.regs.iter().position(|r| r.name == "OUTER_INNER_X").unwrap();
        assert_eq!(db.reg_total_offset(x), 0x1012);
        assert_eq!(db.reg_address(x, &[1, 3]), Some(0x1000 + 0x100 + 0x10 + 3 * 0x8 + 0x2));
        // The outer array has a child array but no registers of its own.
        let outer = &db.arrays[0];
        assert_eq!(outer.children.len(), 1);
        assert_eq!(db.regs[outer.children[0]].full_name, "D_OUTER_REG");
    }

    #[test]
    fn test_empty_array_gets_implicit_reg() {
        let db = parse(
            r#"<database><domain name="D">
                <array name="SCRATCH" offset="0x100" stride="1" length="8" usage="cmd"/>
            </domain></database>"#,
        )
        .unwrap();
        assert_eq!(db.regs.len(), 1);
        let reg = &db.regs[0];
        assert_eq!(reg.full_name, "D_SCRATCH_REG");
        assert_eq!(reg.offset, 0);
        assert_eq!(reg.usages, vec!["cmd".to_string()]);
        assert_eq!(db.reg_address(0, &[5]), Some(0x105));
    }

    #[test]
    fn test_fixed_offsets_with_index_enum() {
        let db = parse(
            r#"<database>
                <enum name="pipe"><value name="P_A"/><value name="P_B"/></enum>
                <domain name="D">
                    <array name="PIPE" offsets="0x10,0x80" length="2" index="pipe">
                        <reg32 offset="0x1" name="CTRL"/>
                    </array>
                </domain>
            </database>"#,
        )
        .unwrap();
        let array = &db.arrays[0];
        assert_eq!(array.offsets, ArrayOffsets::Fixed(vec![0x10, 0x80]));
        assert_eq!(db.index_ctype(array), "enum pipe");
        assert_eq!(db.reg_total_offset(0), 0x1);
        assert_eq!(db.reg_address(0, &[1]), Some(0x81));
    }

    #[test]
    fn test_variant_prefix_and_varset_check() {
        let xml = r#"<database>
            <enum name="chip"><value name="A6XX"/><value name="A7XX"/></enum>
            <domain name="A6XX" prefix="variant" varset="chip">
                <reg32 offset="0x10" name="RB_FOO" variants="A7XX-"/>
                <reg32 offset="0x11" name="RB_BAR"/>
            </domain>
        </database>"#;
        let db = parse(xml).unwrap();
        assert_eq!(db.regs[0].full_name, "A7XX_RB_FOO");
        assert_eq!(db.regs[0].variants.as_deref(), Some("A7XX-"));
        assert_eq!(db.regs[1].full_name, "A6XX_RB_BAR");
        let err = parse(&xml.replace("A7XX-\"", "A9XX\"")).unwrap_err();
        assert_eq!(err.message, "variant 'A9XX' is not a member of varset 'chip'");
    }

    #[test]
    fn test_stripe_prefix() {
        let db = parse(
            r#"<database><domain name="SP">
                <stripe variants="A6XX"><reg32 offset="0" name="R"/></stripe>
            </domain></database>"#,
        )
        .unwrap();
        assert_eq!(db.regs[0].full_name, "A6XX_SP_R");
    }

    #[test]
    fn test_header_metadata() {
        let db = parse(
            r#"<database>
                <copyright year="2013">
                    <author name="Jane Doe" email="jane@example.com"/>
                    <license>Permission is hereby granted.</license>
                </copyright>
            </database>"#,
        )
        .unwrap();
        assert_eq!(db.copyright.as_deref(), Some("2013"));
        assert_eq!(db.authors, vec!["Jane Doe <jane@example.com>".to_string()]);
        assert_eq!(db.license.as_deref(), Some("Permission is hereby granted."));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse("<database><domain name=\"D\"></database>").unwrap_err();
        assert_eq!(err.location.file, Path::new("test.xml"));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_enum_value_overflow_is_located() {
        let err = parse(
            "<database>\n<enum name=\"e\">\n<value name=\"A\" value=\"0xffffffffffffffff\"/>\n<value name=\"B\"/>\n</enum>\n</database>",
        )
        .unwrap_err();
        assert_eq!(err.location.line, 4);
        assert_eq!(err.message, "value B does not fit in 64 bits");
    }

    #[test]
    fn test_radix_out_of_range() {
        let err = parse(
            r#"<database><domain name="D">
                <reg32 offset="0" name="R"><bitfield name="F" low="0" high="7" type="fixed" radix="64"/></reg32>
            </domain></database>"#,
        )
        .unwrap_err();
        assert_eq!(err.location.line, 2);
        assert_eq!(err.message, "radix attribute out of range: 64");
    }

    #[test]
    fn test_offset_overflow_is_located() {
        let err = parse(
            r#"<database><domain name="D">
                <array name="A" offset="0xffffffffffffff00" stride="0x10" length="2">
                    <reg32 offset="0x100" name="X"/>
                </array>
            </domain></database>"#,
        )
        .unwrap_err();
        assert_eq!(err.location.line, 3);
        assert_eq!(err.message, "offset of A_X does not fit in 64 bits");
    }
}
