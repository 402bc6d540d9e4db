// Licensed under the Apache-2.0 license

//! Cross-reference indices computed over a finished [`Database`].
//!
//! Registers declared several times for different hardware variants are
//! grouped by name, and registers tagged with `usage` are grouped per tag and
//! expanded into per-variant offset tables. Building the index never changes
//! the database.

use crate::error::{SchemaError, SchemaResult};
use crate::model::{ArrayIdx, ArrayOffsets, Database, RegIdx};
use crate::variant::{primary_variant, sanitize_variant};

/// One declaration of a multi-variant register.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantMember {
    /// Tag the declaration is filed under (`A2XX` for `A2XX-A3XX`).
    pub tag: String,
    /// The full `variants` attribute.
    pub variants: String,
    pub reg: RegIdx,
}

/// All declarations of one register name, in declaration order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantGroup {
    pub name: String,
    pub members: Vec<VariantMember>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UsageGroup {
    pub usage: String,
    pub regs: Vec<RegIdx>,
}

/// Sorted register offsets used for one purpose by one variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UsageTable {
    pub usage: String,
    pub variant: String,
    pub offsets: Vec<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct Index {
    pub variant_groups: Vec<VariantGroup>,
    pub usage_groups: Vec<UsageGroup>,
    /// Domains of usage-tagged registers, in first-seen order. Registers
    /// without variants are listed under each of these.
    pub usage_variants: Vec<String>,
    pub usage_tables: Vec<UsageTable>,
}

impl Index {
    pub fn build(db: &Database) -> SchemaResult<Self> {
        let mut index = Index::default();
        for (idx, reg) in db.regs.iter().enumerate() {
            if let Some(variants) = &reg.variants {
                index.add_variant(db, idx, variants)?;
            }
            if !reg.usages.is_empty() {
                index.add_usages(db, idx);
            }
        }
        index.usage_tables = index.expand_usages(db)?;
        Ok(index)
    }

    pub fn variant_group(&self, name: &str) -> Option<&VariantGroup> {
        self.variant_groups.iter().find(|g| g.name == name)
    }

    fn add_variant(&mut self, db: &Database, idx: RegIdx, variants: &str) -> SchemaResult<()> {
        let reg = &db.regs[idx];
        let member = VariantMember {
            tag: primary_variant(variants).to_string(),
            variants: variants.to_string(),
            reg: idx,
        };
        let Some(group) = self.variant_groups.iter_mut().find(|g| g.name == reg.name) else {
            self.variant_groups.push(VariantGroup {
                name: reg.name.clone(),
                members: vec![member],
            });
            return Ok(());
        };

        // All variants of a register must be the same size.
        let first = &db.regs[group.members[0].reg];
        if first.bit_size != reg.bit_size {
            return Err(SchemaError::new(
                reg.location.clone(),
                format!(
                    "register {} is {} bits for variants {} but {} bits for variants {}",
                    reg.name, first.bit_size, group.members[0].variants, reg.bit_size, variants
                ),
            ));
        }
        match group.members.iter_mut().find(|m| m.tag == member.tag) {
            Some(existing) => *existing = member,
            None => group.members.push(member),
        }
        Ok(())
    }

    fn add_usages(&mut self, db: &Database, idx: RegIdx) {
        let reg = &db.regs[idx];
        for usage in &reg.usages {
            match self.usage_groups.iter_mut().find(|g| &g.usage == usage) {
                Some(group) => group.regs.push(idx),
                None => self.usage_groups.push(UsageGroup {
                    usage: usage.clone(),
                    regs: vec![idx],
                }),
            }
        }
        if !self.usage_variants.contains(&reg.domain) {
            self.usage_variants.push(reg.domain.clone());
        }
    }

    fn expand_usages(&self, db: &Database) -> SchemaResult<Vec<UsageTable>> {
        let mut buckets: Vec<(String, String, Vec<RegIdx>)> = vec![];
        let mut file = |usage: &str, variant: &str, reg: RegIdx| {
            match buckets
                .iter_mut()
                .find(|(u, v, _)| u == usage && v == variant)
            {
                Some((_, _, regs)) => regs.push(reg),
                None => buckets.push((usage.to_string(), variant.to_string(), vec![reg])),
            }
        };

        for group in &self.usage_groups {
            for &idx in &group.regs {
                match self.variant_group(&db.regs[idx].name) {
                    Some(variants) => {
                        for member in variants.members.iter().filter(|m| m.reg == idx) {
                            file(group.usage.as_str(), sanitize_variant(&member.tag), idx);
                        }
                    }
                    None => {
                        for variant in &self.usage_variants {
                            file(group.usage.as_str(), variant.as_str(), idx);
                        }
                    }
                }
            }
        }

        buckets
            .into_iter()
            .map(|(usage, variant, regs)| {
                let mut offsets = vec![];
                for idx in regs {
                    offsets.extend(usage_offsets(db, idx)?);
                }
                offsets.sort();
                Ok(UsageTable {
                    usage,
                    variant,
                    offsets,
                })
            })
            .collect()
    }
}

/// Offsets a register occupies, one per index tuple of its enclosing arrays
/// (outermost first) and its own stride, with a second slot for the upper
/// half of 64-bit registers.
fn usage_offsets(db: &Database, idx: RegIdx) -> SchemaResult<Vec<u64>> {
    let reg = &db.regs[idx];
    let error = |why: &str| {
        SchemaError::new(
            reg.location.clone(),
            format!("cannot list usage offsets of {}: {why}", reg.full_name),
        )
    };
    let overflow = || error("offsets do not fit in 64 bits");
    let arrays = match reg.array {
        None => vec![0],
        Some(array) if has_expr_offsets(db, array) => {
            return Err(error("array offsets are expressions"))
        }
        Some(array) => db.array_element_offsets(array).ok_or_else(overflow)?,
    };
    let own: Vec<u64> = match (reg.stride, reg.length) {
        (Some(stride), Some(length)) if stride != 0 => (0..length)
            .map(|i| stride.checked_mul(i))
            .collect::<Option<_>>()
            .ok_or_else(overflow)?,
        _ => vec![0],
    };

    let mut offsets = vec![];
    for array in arrays {
        for step in &own {
            let base = array
                .checked_add(reg.offset)
                .and_then(|o| o.checked_add(*step))
                .ok_or_else(overflow)?;
            offsets.push(base);
            if reg.bit_size == 64 {
                offsets.push(base.checked_add(1).ok_or_else(overflow)?);
            }
        }
    }
    Ok(offsets)
}

fn has_expr_offsets(db: &Database, idx: ArrayIdx) -> bool {
    let array = &db.arrays[idx];
    matches!(array.offsets, ArrayOffsets::Expr(_))
        || array.parent.is_some_and(|p| has_expr_offsets(db, p))
}
