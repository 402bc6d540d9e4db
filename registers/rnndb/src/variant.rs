// Licensed under the Apache-2.0 license

//! Hardware variant tags and ranges, as written in `variants=` attributes.
//!
//! A `variants` attribute is a comma separated list of items. Each item is
//! either a single tag (`A6XX`), a closed range (`A2XX-A4XX`), an open range
//! (`A6XX-`) or a range open at the start (`-A5XX`).

/// One item of a `variants` list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VariantSpec {
    Exact(String),
    Range { from: String, to: String },
    From(String),
    Until(String),
}

impl VariantSpec {
    pub fn parse(item: &str) -> Self {
        let item = item.trim();
        match item.split_once('-') {
            None => VariantSpec::Exact(item.to_string()),
            Some((from, "")) => VariantSpec::From(from.to_string()),
            Some(("", to)) => VariantSpec::Until(to.to_string()),
            Some((from, to)) => VariantSpec::Range {
                from: from.to_string(),
                to: to.to_string(),
            },
        }
    }

    /// Tags named by this item.
    pub fn tags(&self) -> Vec<&str> {
        match self {
            VariantSpec::Exact(tag) | VariantSpec::From(tag) | VariantSpec::Until(tag) => {
                vec![tag.as_str()]
            }
            VariantSpec::Range { from, to } => vec![from.as_str(), to.as_str()],
        }
    }
}

pub fn parse_variants(attr: &str) -> Vec<VariantSpec> {
    attr.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(VariantSpec::parse)
        .collect()
}

/// Strips the range part of a variant item: `A2XX-A4XX` becomes `A2XX`.
pub fn sanitize_variant(variant: &str) -> &str {
    match variant.find('-') {
        Some(pos) => &variant[..pos],
        None => variant,
    }
}

/// The tag a `variants` attribute is filed under: the start of its first item.
pub fn primary_variant(attr: &str) -> &str {
    sanitize_variant(attr.split(',').next().unwrap_or_default().trim())
}
