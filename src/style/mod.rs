use std::collections::{HashMap, HashSet};
use std::fmt;

use itertools::iproduct;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleError {
    #[error("attribute palette is empty")]
    EmptyPalette,

    #[error("attribute '{attribute}' is declared more than once")]
    DuplicateAttribute { attribute: String },

    #[error("invalid attribute name '{attribute}'")]
    InvalidName { attribute: String },

    #[error("invalid color '{color}' for attribute '{attribute}'")]
    InvalidColor { attribute: String, color: String },

    #[error("no style for attribute '{attribute}'")]
    LookupMiss { attribute: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AttributeColor {
    pub name: String,
    pub color: String,
}

impl AttributeColor {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

pub fn default_palette() -> Vec<AttributeColor> {
    [
        ("fire", "#f8c5a3"),
        ("grass", "#baffbf"),
        ("electric", "#ffec8c"),
        ("water", "#8ab2e0"),
        ("ground", "#c6c79a"),
        ("rock", "#9b876d"),
        ("fairy", "#f3bfef"),
        ("poison", "#cdb1dd"),
        ("bug", "#c0d394"),
        ("dragon", "#9f88f1"),
        ("psychic", "#cbcc78"),
        ("flying", "#b5ccff"),
        ("fighting", "#ffd49b"),
        ("normal", "#fdecf8"),
        ("ice", "#cbfdff"),
        ("ghost", "#978ca3"),
        ("dark", "#676e69"),
        ("steel", "#999795"),
    ]
    .iter()
    .map(|(name, color)| AttributeColor::new(name, color))
    .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StylePair {
    pub first: String,
    pub second: String,
}

impl StylePair {
    pub fn new(first: &str, second: &str) -> Self {
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn is_mono(&self) -> bool {
        self.first == self.second
    }

    /// Class token used by the renderer, e.g. `type-fire-water` or `type-fire-monotype`.
    pub fn label(&self) -> String {
        if self.is_mono() {
            format!("type-{}-monotype", self.first)
        } else {
            format!("type-{}-{}", self.first, self.second)
        }
    }
}

impl fmt::Display for StylePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleDescriptor {
    // left-to-right, `from` is the entity's first attribute
    Gradient { from: String, to: String },
    Flat { color: String },
}

impl StyleDescriptor {
    pub fn is_gradient(&self) -> bool {
        matches!(self, StyleDescriptor::Gradient { .. })
    }
}

/// Style lookup for every ordered attribute pair, mono pairs included.
#[derive(Clone, Debug)]
pub struct StyleTable {
    entries: HashMap<StylePair, StyleDescriptor>,
    order: Vec<StylePair>,
}

fn name_pattern() -> Regex {
    Regex::new(r"^[a-z][a-z0-9_]*$").expect("static attribute name pattern")
}

fn color_pattern() -> Regex {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("static color pattern")
}

fn validate_palette(palette: &[AttributeColor]) -> Result<(), StyleError> {
    if palette.is_empty() {
        return Err(StyleError::EmptyPalette);
    }
    let names = name_pattern();
    let colors = color_pattern();
    let mut seen: HashSet<&str> = HashSet::new();
    for entry in palette {
        if !names.is_match(&entry.name) {
            return Err(StyleError::InvalidName {
                attribute: entry.name.clone(),
            });
        }
        if !colors.is_match(&entry.color) {
            return Err(StyleError::InvalidColor {
                attribute: entry.name.clone(),
                color: entry.color.clone(),
            });
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(StyleError::DuplicateAttribute {
                attribute: entry.name.clone(),
            });
        }
    }
    Ok(())
}

impl StyleTable {
    pub fn build(palette: &[AttributeColor]) -> Result<Self, StyleError> {
        validate_palette(palette)?;

        let size = palette.len() * palette.len();
        let mut entries = HashMap::with_capacity(size);
        let mut order = Vec::with_capacity(size);

        for (a, b) in iproduct!(palette.iter(), palette.iter()) {
            if a.name == b.name {
                continue;
            }
            let pair = StylePair::new(&a.name, &b.name);
            entries.insert(
                pair.clone(),
                StyleDescriptor::Gradient {
                    from: a.color.clone(),
                    to: b.color.clone(),
                },
            );
            order.push(pair);
        }

        for a in palette {
            let pair = StylePair::new(&a.name, &a.name);
            entries.insert(
                pair.clone(),
                StyleDescriptor::Flat {
                    color: a.color.clone(),
                },
            );
            order.push(pair);
        }

        Ok(Self { entries, order })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_attribute(&self, attribute: &str) -> bool {
        self.entries
            .contains_key(&StylePair::new(attribute, attribute))
    }

    /// Resolves a style in the entity's declared order; a missing second
    /// attribute selects the mono entry.
    pub fn resolve(
        &self,
        first: &str,
        second: Option<&str>,
    ) -> Result<(StylePair, &StyleDescriptor), StyleError> {
        for attribute in std::iter::once(first).chain(second) {
            if !self.contains_attribute(attribute) {
                return Err(StyleError::LookupMiss {
                    attribute: attribute.to_string(),
                });
            }
        }
        let pair = StylePair::new(first, second.unwrap_or(first));
        match self.entries.get(&pair) {
            Some(descriptor) => Ok((pair, descriptor)),
            None => Err(StyleError::LookupMiss {
                attribute: pair.label(),
            }),
        }
    }

    pub fn resolve_tags(&self, tags: &[String]) -> Result<(StylePair, &StyleDescriptor), StyleError> {
        match tags {
            [first] => self.resolve(first, None),
            [first, second] => self.resolve(first, Some(second.as_str())),
            _ => Err(StyleError::LookupMiss {
                attribute: tags.join("-"),
            }),
        }
    }

    /// Entries in build order: directional pairs first, then mono entries.
    pub fn iter(&self) -> impl Iterator<Item = (&StylePair, &StyleDescriptor)> {
        self.order
            .iter()
            .filter_map(move |pair| self.entries.get(pair).map(|d| (pair, d)))
    }
}
