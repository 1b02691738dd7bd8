use std::collections::HashMap;

use crate::data::geo::StyleAttrs;
use crate::data::kml::{KmlDocument, RawStyle};

/// Stroke color applied when a packed color cannot be decoded.
pub const DEFAULT_STROKE: &str = "#64748b";
/// Opacity applied when a packed color cannot be decoded.
pub const DEFAULT_OPACITY: f64 = 1.0;

/// Resolved visual attributes keyed by style reference (`"#" + id`).
/// Built once per document; later declarations of the same id win.
pub type StyleTable = HashMap<String, StyleAttrs>;

struct ColorDecode {
    hex: String,
    opacity: f64,
    defaulted: bool,
}

/// Decode a packed KML color. The channel order is alpha-blue-green-red,
/// so `aabbggrr` becomes `#rrggbb` plus an opacity of `aa / 255`. Anything
/// that is not exactly 8 hex characters decodes to the documented defaults.
fn decode_packed_color(raw: &str) -> ColorDecode {
    let bytes = raw.as_bytes();
    if bytes.len() != 8 || !bytes.iter().all(u8::is_ascii_hexdigit) {
        return ColorDecode {
            hex: DEFAULT_STROKE.to_string(),
            opacity: DEFAULT_OPACITY,
            defaulted: true,
        };
    }

    let opacity = match u8::from_str_radix(&raw[0..2], 16) {
        Ok(alpha) => f64::from(alpha) / 255.0,
        Err(_) => DEFAULT_OPACITY,
    };
    let blue = &raw[2..4];
    let green = &raw[4..6];
    let red = &raw[6..8];

    ColorDecode {
        hex: format!("#{red}{green}{blue}"),
        opacity,
        defaulted: false,
    }
}

/// Flatten one style block into render attributes. Missing sub-blocks
/// leave their fields unset; unparsable numbers are dropped silently.
pub fn resolve_style(raw: &RawStyle) -> StyleAttrs {
    let mut attrs = StyleAttrs::default();

    if let Some(href) = &raw.icon_href {
        attrs.icon = Some(href.clone());
    }
    if let Some(scale) = &raw.icon_scale {
        if let Ok(value) = scale.parse::<f64>() {
            attrs.icon_scale = Some(value);
        }
    }

    if let Some(color) = &raw.line_color {
        let decoded = decode_packed_color(color);
        attrs.stroke = Some(decoded.hex);
        attrs.stroke_opacity = Some(decoded.opacity);
    }
    if let Some(width) = &raw.line_width {
        if let Ok(value) = width.parse::<f64>() {
            attrs.stroke_width = Some(value);
        }
    }

    if let Some(color) = &raw.poly_color {
        let decoded = decode_packed_color(color);
        attrs.fill = Some(decoded.hex);
        attrs.fill_opacity = Some(decoded.opacity);
    }

    attrs
}

/// Build the style reference table for one document: every id-carrying
/// `Style` in declaration order, then every `StyleMap` whose "normal" pair
/// references an already-resolved entry. Map entries take a copy of the
/// referenced attributes, so the alias and its target stay independent.
/// Maps pointing at unknown references create no entry at all.
pub fn build_style_table(doc: &KmlDocument) -> StyleTable {
    let mut table = StyleTable::new();

    for style in &doc.styles {
        if let Some(id) = &style.id {
            table.insert(format!("#{id}"), resolve_style(style));
        }
    }

    for style_map in &doc.style_maps {
        if let Some(map_id) = &style_map.id {
            for pair in &style_map.pairs {
                if pair.key.as_deref() != Some("normal") {
                    continue;
                }
                let aliased = pair
                    .style_url
                    .as_ref()
                    .and_then(|url| table.get(url))
                    .cloned();
                if let Some(attrs) = aliased {
                    table.insert(format!("#{map_id}"), attrs);
                }
            }
        }
    }

    table
}
