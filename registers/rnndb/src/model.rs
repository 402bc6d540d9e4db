// Licensed under the Apache-2.0 license

//! Object model of a parsed register database.
//!
//! Every entity lives in an arena owned by [`Database`] and is referenced by
//! index, so registers, arrays and bitsets can point at each other without
//! shared ownership. The model is filled in a single pass by the parser and
//! is read-only afterwards.
//!
//! ```text
//! Database
//! ├── enums:    Vec<Enum>
//! ├── bitsets:  Vec<Bitset>   # shared and per-register inline layouts
//! ├── arrays:   Vec<Array>    # parent links form nested dimensions
//! ├── regs:     Vec<Reg>      # each owns exactly one bitset
//! └── elements: Vec<Element>  # top-level declarations of the root file
//! ```

use crate::error::{FieldError, Location};
use std::collections::HashMap;
use std::path::PathBuf;

pub type EnumIdx = usize;
pub type BitsetIdx = usize;
pub type ArrayIdx = usize;
pub type RegIdx = usize;

/// Bit mask covering `low..=high`.
///
/// ```
/// use registers_rnndb::model::mask;
/// assert_eq!(mask(0, 3), 0xf);
/// assert_eq!(mask(4, 4), 0x10);
/// assert_eq!(mask(0, 63), u64::MAX);
/// ```
pub fn mask(low: u32, high: u32) -> u64 {
    (u64::MAX >> (64 - (high + 1 - low))) << low
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Enum {
    pub name: String,
    pub values: Vec<(String, u64)>,
}

impl Enum {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: vec![],
        }
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    /// Value taken by a member declared without an explicit value, or `None`
    /// when the previous value is already `u64::MAX`.
    pub fn next_value(&self) -> Option<u64> {
        match self.values.last() {
            Some((_, v)) => v.checked_add(1),
            None => Some(0),
        }
    }

    /// Large encodings are easier to read in hex.
    pub fn uses_hex(&self) -> bool {
        self.values.iter().any(|(_, v)| *v > 0x1000)
    }
}

/// Encoding of a bitfield's value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldType {
    /// No `type` attribute: a plain unsigned integer.
    Plain,
    Boolean,
    Uint,
    Hex,
    Int,
    /// `a3xx_regid`, a register id stored as an unsigned integer.
    Regid,
    Fixed {
        radix: u32,
    },
    Ufixed {
        radix: u32,
    },
    /// IEEE half or single precision, depending on the field width.
    Float,
    Address,
    Waddress,
    /// Name of a previously declared enum.
    Enum(String),
}

impl FieldType {
    /// Resolves a `type` attribute against the builtin types and the enums
    /// declared so far.
    pub fn resolve(
        name: Option<&str>,
        radix: Option<u32>,
        is_enum: impl Fn(&str) -> bool,
    ) -> Result<Self, FieldError> {
        let Some(name) = name else {
            return Ok(FieldType::Plain);
        };
        let fixed_radix = || match radix {
            None => Err(FieldError::MissingRadix(name.to_string())),
            Some(radix) if radix >= 64 => Err(FieldError::RadixOutOfRange(radix)),
            Some(radix) => Ok(radix),
        };
        Ok(match name {
            "boolean" => FieldType::Boolean,
            "uint" => FieldType::Uint,
            "hex" => FieldType::Hex,
            "int" => FieldType::Int,
            "a3xx_regid" => FieldType::Regid,
            "fixed" => FieldType::Fixed {
                radix: fixed_radix()?,
            },
            "ufixed" => FieldType::Ufixed {
                radix: fixed_radix()?,
            },
            "float" => FieldType::Float,
            "address" => FieldType::Address,
            "waddress" => FieldType::Waddress,
            other if is_enum(other) => FieldType::Enum(other.to_string()),
            other => return Err(FieldError::UnknownType(other.to_string())),
        })
    }

    pub fn is_address(&self) -> bool {
        matches!(self, FieldType::Address | FieldType::Waddress)
    }

    /// Types whose stored bits are a numeric transform of the input value.
    pub fn is_scaled(&self) -> bool {
        matches!(
            self,
            FieldType::Float | FieldType::Fixed { .. } | FieldType::Ufixed { .. }
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    /// Unnamed fields take the owning register's name.
    pub name: Option<String>,
    pub low: u32,
    pub high: u32,
    /// Right shift applied to values before they are stored.
    pub shr: u32,
    pub ty: FieldType,
}

impl Field {
    pub fn new(
        name: Option<&str>,
        low: u32,
        high: u32,
        shr: u32,
        ty: FieldType,
        bit_size: u32,
    ) -> Result<Self, FieldError> {
        let maxpos = bit_size - 1;
        if low > maxpos {
            return Err(FieldError::LowOutOfRange(low));
        }
        if high > maxpos {
            return Err(FieldError::HighOutOfRange(high));
        }
        if high < low {
            return Err(FieldError::Inverted { low, high });
        }
        if shr >= 64 {
            return Err(FieldError::ShrOutOfRange(shr));
        }
        match ty {
            FieldType::Boolean if low != high => return Err(FieldError::BooleanWidth),
            FieldType::Float if high - low != 31 && high - low != 15 => {
                return Err(FieldError::FloatWidth)
            }
            _ => {}
        }
        Ok(Self {
            name: name.map(str::to_string),
            low,
            high,
            shr,
            ty,
        })
    }

    pub fn width(&self) -> u32 {
        self.high - self.low + 1
    }

    pub fn mask(&self) -> u64 {
        mask(self.low, self.high)
    }

    /// Places a raw value into the field's bits, applying `shr`.
    pub fn encode(&self, value: u64) -> Result<u64, FieldError> {
        if self.shr > 0 && value & mask(0, self.shr - 1) != 0 {
            return Err(FieldError::ShiftedOutBits {
                value,
                shr: self.shr,
            });
        }
        Ok(((value >> self.shr) << self.low) & self.mask())
    }

    /// Extracts the raw value stored in `word`, undoing `shr`.
    pub fn decode(&self, word: u64) -> u64 {
        ((word & self.mask()) >> self.low) << self.shr
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bitset {
    pub name: String,
    /// Inline bitsets are emitted with their owning register instead of on
    /// their own.
    pub inline: bool,
    pub fields: Vec<Field>,
}

impl Bitset {
    pub fn new(name: &str, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            inline,
            fields: vec![],
        }
    }

    /// Copies this layout into an inline bitset owned by register `name`.
    pub fn specialize(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            inline: true,
            fields: self.fields.clone(),
        }
    }

    pub fn address_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.ty.is_address())
    }

    /// Union of all field masks.
    pub fn known_mask(&self) -> u64 {
        self.fields.iter().fold(0, |acc, f| acc | f.mask())
    }
}

/// How the elements of an array are laid out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArrayOffsets {
    Stride { offset: u64, stride: u64 },
    /// One numeric offset per index (`offsets=`).
    Fixed(Vec<u64>),
    /// One offset expression per index (`doffsets=`), emitted verbatim.
    Expr(Vec<String>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Array {
    pub local_name: String,
    /// Name qualified by the enclosing arrays.
    pub name: String,
    pub domain: String,
    pub variants: Option<String>,
    pub parent: Option<ArrayIdx>,
    pub offsets: ArrayOffsets,
    pub length: u64,
    /// Own offset plus the base of the parent array.
    pub base: u64,
    pub index_type: Option<EnumIdx>,
    pub usages: Option<Vec<String>>,
    pub children: Vec<RegIdx>,
}

impl Array {
    pub fn is_fixed(&self) -> bool {
        !matches!(self.offsets, ArrayOffsets::Stride { .. })
    }
}

/// How one index parameter of an address function moves the address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Stride(u64),
    /// Looked up through the array's generated offset function.
    Lookup(ArrayIdx),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dimension {
    /// C type of the index parameter.
    pub ctype: String,
    pub step: Step,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reg {
    /// Name qualified by the enclosing arrays.
    pub name: String,
    pub domain: String,
    /// `domain` + `_` + `name`.
    pub full_name: String,
    pub offset: u64,
    /// `offset` plus the base of the enclosing array.
    pub base: u64,
    pub bit_size: u32,
    pub array: Option<ArrayIdx>,
    pub stride: Option<u64>,
    pub length: Option<u64>,
    pub bitset: BitsetIdx,
    /// Declared (or inherited) `variants` attribute.
    pub variants: Option<String>,
    pub varset: Option<EnumIdx>,
    /// Declared (or inherited) usage tags.
    pub usages: Vec<String>,
    pub location: Location,
}

/// A top-level declaration of the root file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Element {
    Enum(EnumIdx),
    Bitset(BitsetIdx),
    Array(ArrayIdx),
    Reg(RegIdx),
}

#[derive(Clone, Debug, Default)]
pub struct Database {
    pub enums: Vec<Enum>,
    pub bitsets: Vec<Bitset>,
    pub arrays: Vec<Array>,
    pub regs: Vec<Reg>,
    pub elements: Vec<Element>,
    /// Every file read, root first, in the order they were opened.
    pub files: Vec<PathBuf>,
    pub copyright: Option<String>,
    pub authors: Vec<String>,
    pub license: Option<String>,
    pub(crate) enum_names: HashMap<String, EnumIdx>,
    pub(crate) bitset_names: HashMap<String, BitsetIdx>,
}

impl Database {
    pub fn enum_idx(&self, name: &str) -> Option<EnumIdx> {
        self.enum_names.get(name).copied()
    }

    pub fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.enum_idx(name).map(|idx| &self.enums[idx])
    }

    pub fn bitset_idx(&self, name: &str) -> Option<BitsetIdx> {
        self.bitset_names.get(name).copied()
    }

    pub fn bitset_by_name(&self, name: &str) -> Option<&Bitset> {
        self.bitset_idx(name).map(|idx| &self.bitsets[idx])
    }

    pub fn reg_by_full_name(&self, full_name: &str) -> Option<&Reg> {
        self.regs.iter().find(|r| r.full_name == full_name)
    }

    pub fn bitset_of(&self, reg: &Reg) -> &Bitset {
        &self.bitsets[reg.bitset]
    }

    /// C type of an array's index parameter.
    pub fn index_ctype(&self, array: &Array) -> String {
        match array.index_type {
            Some(e) => format!("enum {}", self.enums[e].name),
            None => "uint32_t".to_string(),
        }
    }

    /// Index parameters of an array, outermost first.
    pub fn array_indices(&self, idx: ArrayIdx) -> Vec<Dimension> {
        let array = &self.arrays[idx];
        let mut indices = match array.parent {
            Some(parent) => self.array_indices(parent),
            None => vec![],
        };
        if array.length != 1 {
            let step = match array.offsets {
                ArrayOffsets::Stride { stride, .. } => Step::Stride(stride),
                _ => Step::Lookup(idx),
            };
            indices.push(Dimension {
                ctype: self.index_ctype(array),
                step,
            });
        }
        indices
    }

    /// Base offset of an array. Fixed-offset dimensions contribute through
    /// their lookup function instead.
    pub fn array_total_offset(&self, idx: ArrayIdx) -> u64 {
        self.arrays[idx].base
    }

    /// Addresses of every element of an array, outermost index first.
    ///
    /// Returns `None` when a dimension is addressed through offset
    /// expressions or an address does not fit in 64 bits.
    pub fn array_element_offsets(&self, idx: ArrayIdx) -> Option<Vec<u64>> {
        let array = &self.arrays[idx];
        let outer = match array.parent {
            Some(parent) => self.array_element_offsets(parent)?,
            None => vec![0],
        };
        let own: Vec<u64> = match &array.offsets {
            ArrayOffsets::Stride { offset, stride } => (0..array.length)
                .map(|i| stride.checked_mul(i)?.checked_add(*offset))
                .collect::<Option<_>>()?,
            ArrayOffsets::Fixed(offsets) => offsets.clone(),
            ArrayOffsets::Expr(_) => return None,
        };
        let mut offsets = Vec::with_capacity(outer.len() * own.len());
        for base in outer {
            for o in &own {
                offsets.push(base.checked_add(*o)?);
            }
        }
        Some(offsets)
    }

    pub fn reg_indices(&self, idx: RegIdx) -> Vec<Dimension> {
        let reg = &self.regs[idx];
        let mut indices = match reg.array {
            Some(array) => self.array_indices(array),
            None => vec![],
        };
        if let Some(stride) = reg.stride.filter(|s| *s != 0) {
            indices.push(Dimension {
                ctype: "uint32_t".to_string(),
                step: Step::Stride(stride),
            });
        }
        indices
    }

    pub fn reg_total_offset(&self, idx: RegIdx) -> u64 {
        self.regs[idx].base
    }

    /// Concrete address of a register for the given index values.
    ///
    /// Returns `None` when the number of indices does not match or a
    /// dimension is addressed through offset expressions.
    pub fn reg_address(&self, idx: RegIdx, indices: &[u64]) -> Option<u64> {
        let dims = self.reg_indices(idx);
        if dims.len() != indices.len() {
            return None;
        }
        let mut address = self.reg_total_offset(idx);
        for (dim, i) in dims.iter().zip(indices) {
            let step = match dim.step {
                Step::Stride(stride) => stride.checked_mul(*i)?,
                Step::Lookup(array) => match &self.arrays[array].offsets {
                    ArrayOffsets::Fixed(offsets) => *offsets.get(usize::try_from(*i).ok()?)?,
                    _ => return None,
                },
            };
            address = address.checked_add(step)?;
        }
        Some(address)
    }
}
