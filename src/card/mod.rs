use serde::Serialize;

use crate::catalog::EntityRecord;
use crate::style::{StyleDescriptor, StyleError, StyleTable};

pub const DEFAULT_SPRITE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpriteUrls {
    base: String,
}

impl SpriteUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn normal(&self, id: u64) -> String {
        format!("{}/{}.png", self.base, id)
    }

    pub fn shiny(&self, id: u64) -> String {
        format!("{}/shiny/{}.png", self.base, id)
    }
}

impl Default for SpriteUrls {
    fn default() -> Self {
        Self::new(DEFAULT_SPRITE_URL)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteVariant {
    #[default]
    Normal,
    Shiny,
}

// two-state image toggle; the transition is pure, callers re-render with the result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SpriteToggle {
    pub id: u64,
    pub variant: SpriteVariant,
}

impl SpriteToggle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            variant: SpriteVariant::Normal,
        }
    }

    pub fn toggled(self) -> Self {
        let variant = match self.variant {
            SpriteVariant::Normal => SpriteVariant::Shiny,
            SpriteVariant::Shiny => SpriteVariant::Normal,
        };
        Self { variant, ..self }
    }

    pub fn url(&self, urls: &SpriteUrls) -> String {
        match self.variant {
            SpriteVariant::Normal => urls.normal(self.id),
            SpriteVariant::Shiny => urls.shiny(self.id),
        }
    }

    pub fn icon_color(&self) -> &'static str {
        match self.variant {
            SpriteVariant::Normal => "gray",
            SpriteVariant::Shiny => "gold",
        }
    }
}

/// First letter uppercased, the rest lowercased.
pub fn display_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

pub fn number_label(id: u64) -> String {
    format!("N° {:04}", id)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Card {
    pub id: u64,
    pub name: String,
    pub number: String,
    pub attributes: Vec<String>,
    pub style_class: String,
    pub style: StyleDescriptor,
    pub sprite: SpriteToggle,
    pub sprite_normal: String,
    pub sprite_shiny: String,
}

impl Card {
    pub fn render(
        record: &EntityRecord,
        table: &StyleTable,
        sprites: &SpriteUrls,
    ) -> Result<Self, StyleError> {
        let (pair, style) = table.resolve_tags(&record.attributes)?;
        Ok(Self {
            id: record.id,
            name: display_name(&record.name),
            number: number_label(record.id),
            attributes: record.attributes.clone(),
            style_class: pair.label(),
            style: style.clone(),
            sprite: SpriteToggle::new(record.id),
            sprite_normal: sprites.normal(record.id),
            sprite_shiny: sprites.shiny(record.id),
        })
    }

    pub fn toggle_sprite(&mut self) {
        self.sprite = self.sprite.toggled();
    }

    pub fn current_sprite(&self) -> &str {
        match self.sprite.variant {
            SpriteVariant::Normal => &self.sprite_normal,
            SpriteVariant::Shiny => &self.sprite_shiny,
        }
    }
}
