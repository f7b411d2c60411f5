use crate::card::Card;
use crate::style::{StyleDescriptor, StyleTable};

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Stylesheet with one rule per style table entry.
pub fn render_stylesheet(table: &StyleTable) -> String {
    let mut out = String::new();
    for (pair, style) in table.iter() {
        let declaration = match style {
            StyleDescriptor::Gradient { from, to } => {
                format!("background-image: linear-gradient(to right, {from}, {to});")
            }
            StyleDescriptor::Flat { color } => format!("background-color: {color};"),
        };
        out.push_str(&format!(".card.{} {{ {} }}\n", pair.label(), declaration));
    }
    out
}

fn render_card(card: &Card) -> String {
    let name = escape_html(&card.name);
    let mut attributes = String::new();
    for (i, attribute) in card.attributes.iter().enumerate() {
        attributes.push_str(&format!(
            "        <small class=\"type\">Type {} : <span>{}</span></small><br>\n",
            i + 1,
            escape_html(attribute)
        ));
    }
    format!(
        r#"    <div class="card {class}" data-id="{id}">
      <button class="shiny" type="button" style="color: {icon};" data-normal="{normal}" data-shiny="{shiny}" aria-label="toggle shiny">&#9670;</button>
      <div class="sprite"><img src="{src}" alt="{name}"/></div>
      <div class="info">
        <h3 class="name">{name}</h3>
        <small class="number"><span>{number}</span></small><br>
{attributes}      </div>
    </div>
"#,
        class = escape_html(&card.style_class),
        id = card.id,
        icon = card.sprite.icon_color(),
        normal = escape_html(&card.sprite_normal),
        shiny = escape_html(&card.sprite_shiny),
        src = escape_html(card.current_sprite()),
        name = name,
        number = escape_html(&card.number),
        attributes = attributes,
    )
}

pub fn render_html(cards: &[Card], table: &StyleTable) -> Vec<u8> {
    let stylesheet = render_stylesheet(table);
    let body: String = cards.iter().map(render_card).collect();

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>Gallery</title>
  <style>
    body {{ font-family: sans-serif; background: #f8fafc; margin: 0; padding: 2rem; }}
    #gallery {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }}
    .card {{ position: relative; border-radius: 12px; padding: 1rem; text-align: center; box-shadow: 0 1px 3px rgba(0,0,0,.15); }}
    .card .shiny {{ position: absolute; top: .5rem; right: .5rem; border: none; background: none; font-size: 20px; cursor: pointer; }}
    .card .sprite img {{ width: 120px; height: 120px; }}
    .card .name {{ margin: .25rem 0; }}
  </style>
  <style id="type-styles">
{stylesheet}  </style>
</head>
<body>
  <div id="gallery">
{body}  </div>
  <script>
    document.querySelectorAll("#gallery .shiny").forEach(function (icon) {{
      icon.addEventListener("click", function () {{
        var img = icon.parentElement.querySelector(".sprite img");
        var shiny = icon.dataset.state === "shiny";
        img.src = shiny ? icon.dataset.normal : icon.dataset.shiny;
        icon.style.color = shiny ? "gray" : "gold";
        icon.dataset.state = shiny ? "normal" : "shiny";
      }});
    }});
  </script>
</body>
</html>
"####
    );
    html.into_bytes()
}
