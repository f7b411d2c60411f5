pub mod report;

use serde::Serialize;

use crate::card::Card;
use crate::style::StyleTable;

/// Receives rendered cards in gallery order.
pub trait RenderSink {
    fn append(&mut self, card: Card);
}

#[derive(Clone, Debug, Default)]
pub struct CardCollector {
    cards: Vec<Card>,
}

impl CardCollector {
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }
}

impl RenderSink for CardCollector {
    fn append(&mut self, card: Card) {
        self.cards.push(card);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<OutputFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".json") {
        return Some(OutputFormat::Json);
    }
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        return Some(OutputFormat::Html);
    }
    if lower.ends_with(".txt") {
        return Some(OutputFormat::Text);
    }
    None
}

#[derive(Serialize)]
struct GalleryDocument<'a> {
    cards: &'a [Card],
    styles: Vec<StyleEntry<'a>>,
}

#[derive(Serialize)]
struct StyleEntry<'a> {
    class: String,
    #[serde(flatten)]
    style: &'a crate::style::StyleDescriptor,
}

pub fn render_text(cards: &[Card]) -> Vec<u8> {
    let mut out = String::new();
    for c in cards {
        out.push_str(&format!(
            "{}  {:<24} {:<20} {}\n",
            c.number,
            c.name,
            c.attributes.join("/"),
            c.style_class
        ));
    }
    out.into_bytes()
}

pub fn render_json(cards: &[Card], table: &StyleTable) -> Result<Vec<u8>, serde_json::Error> {
    let doc = GalleryDocument {
        cards,
        styles: table
            .iter()
            .map(|(pair, style)| StyleEntry {
                class: pair.label(),
                style,
            })
            .collect(),
    };
    let mut out = serde_json::to_vec_pretty(&doc)?;
    out.push(b'\n');
    Ok(out)
}

pub fn render_html(cards: &[Card], table: &StyleTable) -> Vec<u8> {
    report::render_html(cards, table)
}

pub fn render(
    format: OutputFormat,
    cards: &[Card],
    table: &StyleTable,
) -> Result<Vec<u8>, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(cards)),
        OutputFormat::Json => render_json(cards, table),
        OutputFormat::Html => Ok(render_html(cards, table)),
    }
}
