use crate::data::geo::LonLat;

/// One `<Style>` block. Attribute text is kept exactly as found in the
/// document; decoding into render attributes happens in the style resolver.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawStyle {
    pub id: Option<String>,
    pub icon_href: Option<String>,
    pub icon_scale: Option<String>,
    pub line_color: Option<String>,
    pub line_width: Option<String>,
    pub poly_color: Option<String>,
}

/// One `<Pair>` inside a `<StyleMap>`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StylePair {
    pub key: Option<String>,
    pub style_url: Option<String>,
}

/// One `<StyleMap>` block with its state/reference pairs in document order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawStyleMap {
    pub id: Option<String>,
    pub pairs: Vec<StylePair>,
}

/// One `<Data name="..."><value>..</value></Data>` entry under
/// `<ExtendedData>`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataEntry {
    pub name: Option<String>,
    pub value: String,
}

/// Geometry payload of a placemark, longitude-first as stored in KML.
/// Polygon rings are outer ring first, then any inner rings.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    Point(LonLat),
    LineString(Vec<LonLat>),
    Polygon(Vec<Vec<LonLat>>),
}

/// One `<Placemark>` record.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Placemark {
    pub name: Option<String>,
    pub description: Option<String>,
    pub style_url: Option<String>,
    pub extended_data: Vec<DataEntry>,
    pub geometry: Option<RawGeometry>,
}

/// Everything the parser keeps from one document, in declaration order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct KmlDocument {
    pub styles: Vec<RawStyle>,
    pub style_maps: Vec<RawStyleMap>,
    pub placemarks: Vec<Placemark>,
}
