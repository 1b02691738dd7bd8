use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::data::geo::LonLat;
use crate::data::kml::{
    DataEntry, KmlDocument, Placemark, RawGeometry, RawStyle, RawStyleMap, StylePair,
};
use crate::errors::Result;

/// Parse one KML document into the raw record model.
///
/// Only reader-level XML errors fail the whole document; anything the
/// subset does not know is skipped, and malformed values inside known
/// elements degrade field by field further down the pipeline.
pub fn parse_document(text: &str) -> Result<KmlDocument> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut state = ParserState::default();

    loop {
        match reader.read_event() {
            Err(e) => return Err(e.into()),
            Ok(Event::Eof) => break,
            Ok(Event::Start(el)) => state.open_element(&el),
            Ok(Event::Empty(el)) => {
                state.open_element(&el);
                state.close_element();
            }
            Ok(Event::End(_)) => state.close_element(),
            Ok(Event::Text(el)) => {
                // Unknown entities degrade to the raw text instead of
                // failing the document.
                let text = match el.unescape() {
                    Ok(cow) => cow.into_owned(),
                    Err(_) => String::from_utf8_lossy(&el).into_owned(),
                };
                state.absorb_text(&text);
            }
            Ok(Event::CData(el)) => {
                // CDATA passes through verbatim; descriptions carry HTML.
                let bytes = el.into_inner();
                state.absorb_text(&String::from_utf8_lossy(&bytes));
            }
            Ok(_) => (),
        }
    }

    Ok(state.doc)
}

/// Whitespace-separated `lon,lat[,alt]` tuples. Altitude is ignored and
/// tuples that do not yield two floats are skipped.
fn parse_coordinates(text: &str) -> Vec<LonLat> {
    let mut coords = Vec::new();
    for tuple in text.split_whitespace() {
        let mut parts = tuple.split(',');
        let lon = parts.next().and_then(|v| v.parse::<f64>().ok());
        let lat = parts.next().and_then(|v| v.parse::<f64>().ok());
        if let (Some(lon), Some(lat)) = (lon, lat) {
            coords.push(LonLat::new(lon, lat));
        }
    }
    coords
}

fn attr_value(el: &BytesStart, name: &[u8]) -> Option<String> {
    for attribute in el.attributes().flatten() {
        if attribute.key.as_ref() == name {
            if let Ok(value) = str::from_utf8(&attribute.value) {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[derive(Default)]
struct ParserState {
    doc: KmlDocument,
    /// Local names of the currently open elements.
    path: Vec<String>,
    style: Option<RawStyle>,
    style_map: Option<RawStyleMap>,
    pair: Option<StylePair>,
    placemark: Option<Placemark>,
    data_entry: Option<DataEntry>,
    polygon_rings: Option<Vec<Vec<LonLat>>>,
    /// Accumulated text of the open `<coordinates>` element; the reader
    /// may split one text node across several events.
    coord_text: Option<String>,
}

impl ParserState {
    fn parent_is(&self, name: &str) -> bool {
        self.path.len() >= 2 && self.path[self.path.len() - 2] == name
    }

    fn in_path(&self, name: &str) -> bool {
        self.path.iter().any(|n| n == name)
    }

    fn open_element(&mut self, el: &BytesStart) {
        let name = String::from_utf8_lossy(el.local_name().as_ref()).into_owned();
        match name.as_str() {
            "Style" => {
                self.style = Some(RawStyle {
                    id: attr_value(el, b"id"),
                    ..RawStyle::default()
                });
            }
            "StyleMap" => {
                self.style_map = Some(RawStyleMap {
                    id: attr_value(el, b"id"),
                    pairs: Vec::new(),
                });
            }
            "Pair" => self.pair = Some(StylePair::default()),
            "Placemark" => self.placemark = Some(Placemark::default()),
            "Data" => {
                if self.placemark.is_some() {
                    self.data_entry = Some(DataEntry {
                        name: attr_value(el, b"name"),
                        value: String::new(),
                    });
                }
            }
            "Polygon" => self.polygon_rings = Some(Vec::new()),
            "coordinates" => self.coord_text = Some(String::new()),
            _ => (),
        }
        self.path.push(name);
    }

    fn close_element(&mut self) {
        let name = match self.path.pop() {
            Some(name) => name,
            None => return,
        };
        match name.as_str() {
            "Style" => {
                // Inline (id-less) styles are kept too; the resolver
                // skips them when building the table.
                if let Some(style) = self.style.take() {
                    self.doc.styles.push(style);
                }
            }
            "StyleMap" => {
                if let Some(style_map) = self.style_map.take() {
                    self.doc.style_maps.push(style_map);
                }
            }
            "Pair" => {
                if let (Some(pair), Some(style_map)) = (self.pair.take(), self.style_map.as_mut())
                {
                    style_map.pairs.push(pair);
                }
            }
            "Data" => {
                if let (Some(entry), Some(placemark)) =
                    (self.data_entry.take(), self.placemark.as_mut())
                {
                    placemark.extended_data.push(entry);
                }
            }
            "Polygon" => {
                let rings = self.polygon_rings.take().unwrap_or_default();
                if let Some(placemark) = self.placemark.as_mut() {
                    placemark.geometry = Some(RawGeometry::Polygon(rings));
                }
            }
            "Placemark" => {
                if let Some(placemark) = self.placemark.take() {
                    self.doc.placemarks.push(placemark);
                }
            }
            "coordinates" => {
                if let Some(text) = self.coord_text.take() {
                    self.absorb_coordinates(&text);
                }
            }
            _ => (),
        }
    }

    fn absorb_text(&mut self, text: &str) {
        let current = match self.path.last() {
            Some(name) => name.clone(),
            None => return,
        };

        match current.as_str() {
            "name" if self.parent_is("Placemark") => {
                if let Some(placemark) = self.placemark.as_mut() {
                    append(&mut placemark.name, text);
                }
            }
            "description" if self.parent_is("Placemark") => {
                if let Some(placemark) = self.placemark.as_mut() {
                    append(&mut placemark.description, text);
                }
            }
            "styleUrl" => {
                if let Some(pair) = self.pair.as_mut() {
                    append(&mut pair.style_url, text);
                } else if self.parent_is("Placemark") {
                    if let Some(placemark) = self.placemark.as_mut() {
                        append(&mut placemark.style_url, text);
                    }
                }
            }
            "key" => {
                if let Some(pair) = self.pair.as_mut() {
                    append(&mut pair.key, text);
                }
            }
            "value" => {
                if let Some(entry) = self.data_entry.as_mut() {
                    entry.value.push_str(text);
                }
            }
            "scale" if self.parent_is("IconStyle") => {
                if let Some(style) = self.style.as_mut() {
                    append(&mut style.icon_scale, text);
                }
            }
            "href" if self.parent_is("Icon") && self.in_path("IconStyle") => {
                if let Some(style) = self.style.as_mut() {
                    append(&mut style.icon_href, text);
                }
            }
            "color" if self.parent_is("LineStyle") => {
                if let Some(style) = self.style.as_mut() {
                    append(&mut style.line_color, text);
                }
            }
            "width" if self.parent_is("LineStyle") => {
                if let Some(style) = self.style.as_mut() {
                    append(&mut style.line_width, text);
                }
            }
            "color" if self.parent_is("PolyStyle") => {
                if let Some(style) = self.style.as_mut() {
                    append(&mut style.poly_color, text);
                }
            }
            "coordinates" => {
                if let Some(buf) = self.coord_text.as_mut() {
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(text);
                }
            }
            _ => (),
        }
    }

    /// Called when the `<coordinates>` element closes, so the geometry
    /// element it belongs to is the current top of the path.
    fn absorb_coordinates(&mut self, text: &str) {
        let coords = parse_coordinates(text);
        let parent = self.path.last().map(String::as_str).unwrap_or_default();
        match parent {
            "Point" => {
                if let (Some(first), Some(placemark)) =
                    (coords.into_iter().next(), self.placemark.as_mut())
                {
                    placemark.geometry = Some(RawGeometry::Point(first));
                }
            }
            "LineString" => {
                if let Some(placemark) = self.placemark.as_mut() {
                    placemark.geometry = Some(RawGeometry::LineString(coords));
                }
            }
            "LinearRing" => {
                if let Some(rings) = self.polygon_rings.as_mut() {
                    rings.push(coords);
                }
            }
            _ => (),
        }
    }
}

fn append(field: &mut Option<String>, text: &str) {
    field.get_or_insert_with(String::new).push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Race pack</name>
    <Style id="route">
      <LineStyle>
        <color>ff0000ff</color>
        <width>3</width>
      </LineStyle>
    </Style>
    <Style id="zone">
      <PolyStyle>
        <color>4c00ff00</color>
      </PolyStyle>
      <IconStyle>
        <scale>1.1</scale>
        <Icon>
          <href>https://example.com/zone.png</href>
        </Icon>
      </IconStyle>
    </Style>
    <StyleMap id="route-map">
      <Pair>
        <key>normal</key>
        <styleUrl>#route</styleUrl>
      </Pair>
      <Pair>
        <key>highlight</key>
        <styleUrl>#route-hl</styleUrl>
      </Pair>
    </StyleMap>
    <Placemark>
      <name>Water station</name>
      <description><![CDATA[<b>km 12</b> &amp; cups]]></description>
      <styleUrl>#zone</styleUrl>
      <ExtendedData>
        <Data name="icon">
          <value>https://example.com/water.png</value>
        </Data>
      </ExtendedData>
      <Point>
        <coordinates>24.1052,56.9496,0</coordinates>
      </Point>
    </Placemark>
    <Placemark>
      <styleUrl>#route-map</styleUrl>
      <LineString>
        <coordinates>
          24.10,56.94,12 24.11,56.95
          junk 24.12,56.96,7
        </coordinates>
      </LineString>
    </Placemark>
    <Placemark>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>24.0,56.9 24.2,56.9 24.1,57.0 24.0,56.9</coordinates>
          </LinearRing>
        </outerBoundaryIs>
        <innerBoundaryIs>
          <LinearRing>
            <coordinates>24.05,56.92 24.15,56.92 24.1,56.97 24.05,56.92</coordinates>
          </LinearRing>
        </innerBoundaryIs>
      </Polygon>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn parses_styles_maps_and_placemarks() {
        let doc = parse_document(DOC).unwrap();

        assert_eq!(doc.styles.len(), 2);
        let route = &doc.styles[0];
        assert_eq!(route.id.as_deref(), Some("route"));
        assert_eq!(route.line_color.as_deref(), Some("ff0000ff"));
        assert_eq!(route.line_width.as_deref(), Some("3"));
        let zone = &doc.styles[1];
        assert_eq!(zone.poly_color.as_deref(), Some("4c00ff00"));
        assert_eq!(zone.icon_scale.as_deref(), Some("1.1"));
        assert_eq!(zone.icon_href.as_deref(), Some("https://example.com/zone.png"));

        assert_eq!(doc.style_maps.len(), 1);
        let map = &doc.style_maps[0];
        assert_eq!(map.id.as_deref(), Some("route-map"));
        assert_eq!(map.pairs.len(), 2);
        assert_eq!(map.pairs[0].key.as_deref(), Some("normal"));
        assert_eq!(map.pairs[0].style_url.as_deref(), Some("#route"));

        assert_eq!(doc.placemarks.len(), 3);
    }

    #[test]
    fn placemark_fields_and_extended_data() {
        let doc = parse_document(DOC).unwrap();
        let station = &doc.placemarks[0];
        assert_eq!(station.name.as_deref(), Some("Water station"));
        // CDATA content comes through verbatim, HTML tags included.
        assert_eq!(station.description.as_deref(), Some("<b>km 12</b> &amp; cups"));
        assert_eq!(station.style_url.as_deref(), Some("#zone"));
        assert_eq!(station.extended_data.len(), 1);
        assert_eq!(station.extended_data[0].name.as_deref(), Some("icon"));
        assert_eq!(station.extended_data[0].value, "https://example.com/water.png");
        assert_eq!(
            station.geometry,
            Some(RawGeometry::Point(LonLat::new(24.1052, 56.9496)))
        );
    }

    #[test]
    fn line_coordinates_skip_junk_and_altitude() {
        let doc = parse_document(DOC).unwrap();
        match &doc.placemarks[1].geometry {
            Some(RawGeometry::LineString(coords)) => {
                assert_eq!(coords.len(), 3);
                assert_eq!(coords[0], LonLat::new(24.10, 56.94));
                assert_eq!(coords[2], LonLat::new(24.12, 56.96));
            }
            other => panic!("expected LineString, got {other:?}"),
        }
    }

    #[test]
    fn polygon_keeps_inner_rings() {
        let doc = parse_document(DOC).unwrap();
        match &doc.placemarks[2].geometry {
            Some(RawGeometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 4);
                assert_eq!(rings[1][0], LonLat::new(24.05, 56.92));
            }
            other => panic!("expected Polygon, got {other:?}"),
        }
    }

    #[test]
    fn coordinates_split_by_a_comment_stay_one_geometry() {
        let text = r#"<kml><Document>
            <Placemark><LineString><coordinates>
                24.10,56.94 24.11,56.95 <!-- leg two -->
                24.12,56.96 24.13,56.97
            </coordinates></LineString></Placemark>
            <Placemark><Polygon><outerBoundaryIs><LinearRing><coordinates>
                24.0,56.9 24.2,56.9 <!-- closing edge -->
                24.1,57.0 24.0,56.9
            </coordinates></LinearRing></outerBoundaryIs></Polygon></Placemark>
        </Document></kml>"#;
        let doc = parse_document(text).unwrap();
        match &doc.placemarks[0].geometry {
            Some(RawGeometry::LineString(coords)) => assert_eq!(coords.len(), 4),
            other => panic!("expected LineString, got {other:?}"),
        }
        match &doc.placemarks[1].geometry {
            Some(RawGeometry::Polygon(rings)) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 4);
            }
            other => panic!("expected Polygon, got {other:?}"),
        }
    }

    #[test]
    fn document_name_is_not_a_placemark_name() {
        let doc = parse_document(DOC).unwrap();
        // The route placemark has no <name>; the Document-level one must
        // not leak into it.
        assert_eq!(doc.placemarks[1].name, None);
    }

    #[test]
    fn inline_placemark_style_stays_out_of_placemark_fields() {
        let text = r#"<kml><Document><Placemark>
            <name>Inline</name>
            <Style><LineStyle><color>ff336699</color></LineStyle></Style>
            <Point><coordinates>1,2</coordinates></Point>
        </Placemark></Document></kml>"#;
        let doc = parse_document(text).unwrap();
        assert_eq!(doc.placemarks.len(), 1);
        assert_eq!(doc.placemarks[0].name.as_deref(), Some("Inline"));
        // The inline style is captured id-less rather than merged.
        assert_eq!(doc.styles.len(), 1);
        assert_eq!(doc.styles[0].id, None);
        assert_eq!(doc.styles[0].line_color.as_deref(), Some("ff336699"));
    }

    #[test]
    fn mismatched_markup_is_a_parse_failure() {
        let err = parse_document("<kml><Placemark></kml>").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn non_markup_text_yields_an_empty_document() {
        let doc = parse_document("not a kml document").unwrap();
        assert_eq!(doc, KmlDocument::default());
    }

    #[test]
    fn entities_unescape_in_names() {
        let text = r#"<kml><Placemark><name>Start &amp; finish</name>
            <Point><coordinates>1,2</coordinates></Point></Placemark></kml>"#;
        let doc = parse_document(text).unwrap();
        assert_eq!(doc.placemarks[0].name.as_deref(), Some("Start & finish"));
    }
}
