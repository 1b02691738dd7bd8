use serde_json::{json, Map, Value};

/// Coordinate in KML storage order: longitude first.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> LonLat {
        LonLat { lon, lat }
    }

    /// The presentation-order pair. Mapping consumers take latitude first;
    /// every axis swap in the crate goes through this one function.
    pub fn lat_lng(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// Visual attributes extracted from one style definition. Absent sub-blocks
/// leave the matching fields unset; merging copies only the set fields.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StyleAttrs {
    pub stroke: Option<String>,
    pub stroke_opacity: Option<f64>,
    pub stroke_width: Option<f64>,
    pub fill: Option<String>,
    pub fill_opacity: Option<f64>,
    pub icon: Option<String>,
    pub icon_scale: Option<f64>,
}

/// Merged property bag attached to every output feature.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeatureProperties {
    pub name: Option<String>,
    /// Raw HTML fragment, passed through verbatim. Sanitizing is the
    /// presentation layer's job.
    pub description: Option<String>,
    pub icon: Option<String>,
    pub icon_scale: Option<f64>,
    pub stroke: Option<String>,
    pub stroke_opacity: Option<f64>,
    pub stroke_width: Option<f64>,
    pub fill: Option<String>,
    pub fill_opacity: Option<f64>,
}

impl FeatureProperties {
    /// Merge resolved style attributes into the bag. Set style fields win
    /// over whatever the bag already holds; unset ones leave it alone.
    pub fn apply_style(&mut self, style: &StyleAttrs) {
        if style.stroke.is_some() {
            self.stroke = style.stroke.clone();
        }
        if style.stroke_opacity.is_some() {
            self.stroke_opacity = style.stroke_opacity;
        }
        if style.stroke_width.is_some() {
            self.stroke_width = style.stroke_width;
        }
        if style.fill.is_some() {
            self.fill = style.fill.clone();
        }
        if style.fill_opacity.is_some() {
            self.fill_opacity = style.fill_opacity;
        }
        if style.icon.is_some() {
            self.icon = style.icon.clone();
        }
        if style.icon_scale.is_some() {
            self.icon_scale = style.icon_scale;
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("name".into(), json!(name));
        }
        if let Some(description) = &self.description {
            map.insert("description".into(), json!(description));
        }
        if let Some(icon) = &self.icon {
            map.insert("icon".into(), json!(icon));
        }
        if let Some(icon_scale) = self.icon_scale {
            map.insert("iconScale".into(), json!(icon_scale));
        }
        if let Some(stroke) = &self.stroke {
            map.insert("stroke".into(), json!(stroke));
        }
        if let Some(stroke_opacity) = self.stroke_opacity {
            map.insert("strokeOpacity".into(), json!(stroke_opacity));
        }
        if let Some(stroke_width) = self.stroke_width {
            map.insert("strokeWidth".into(), json!(stroke_width));
        }
        if let Some(fill) = &self.fill {
            map.insert("fill".into(), json!(fill));
        }
        if let Some(fill_opacity) = self.fill_opacity {
            map.insert("fillOpacity".into(), json!(fill_opacity));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub coordinate: LonLat,
    pub properties: FeatureProperties,
}

impl PointFeature {
    /// Marker position in presentation (latitude-first) order.
    pub fn position(&self) -> [f64; 2] {
        self.coordinate.lat_lng()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub coordinates: Vec<LonLat>,
    pub properties: FeatureProperties,
}

impl LineFeature {
    /// Vertex path in presentation (latitude-first) order.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.coordinates.iter().map(LonLat::lat_lng).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub rings: Vec<Vec<LonLat>>,
    pub properties: FeatureProperties,
}

impl PolygonFeature {
    /// Every ring, inner ones included, in presentation (latitude-first)
    /// order.
    pub fn ring_positions(&self) -> Vec<Vec<[f64; 2]>> {
        self.rings
            .iter()
            .map(|ring| ring.iter().map(LonLat::lat_lng).collect())
            .collect()
    }
}

/// One render-ready feature. The sequence handed to the presentation layer
/// keeps the document's declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoFeature {
    Point(PointFeature),
    Line(LineFeature),
    Polygon(PolygonFeature),
}

impl GeoFeature {
    pub fn properties(&self) -> &FeatureProperties {
        match self {
            GeoFeature::Point(f) => &f.properties,
            GeoFeature::Line(f) => &f.properties,
            GeoFeature::Polygon(f) => &f.properties,
        }
    }

    /// GeoJSON Feature object. GeoJSON interchange keeps the storage
    /// (longitude-first) axis order; only the presentation accessors swap.
    pub fn to_geojson(&self) -> Value {
        let geometry = match self {
            GeoFeature::Point(f) => json!({
                "type": "Point",
                "coordinates": [f.coordinate.lon, f.coordinate.lat],
            }),
            GeoFeature::Line(f) => json!({
                "type": "LineString",
                "coordinates": f.coordinates.iter()
                    .map(|c| json!([c.lon, c.lat]))
                    .collect::<Vec<_>>(),
            }),
            GeoFeature::Polygon(f) => json!({
                "type": "Polygon",
                "coordinates": f.rings.iter()
                    .map(|ring| {
                        ring.iter().map(|c| json!([c.lon, c.lat])).collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>(),
            }),
        };
        json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": self.properties().to_json(),
        })
    }
}

/// Minimal axis-aligned box over every coordinate seen during
/// normalization, used by the viewport for initial camera framing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            min_lat: f64::INFINITY,
            min_lon: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            max_lon: f64::NEG_INFINITY,
        }
    }
}

impl Bounds {
    pub fn extend(&mut self, c: &LonLat) {
        self.min_lat = self.min_lat.min(c.lat);
        self.min_lon = self.min_lon.min(c.lon);
        self.max_lat = self.max_lat.max(c.lat);
        self.max_lon = self.max_lon.max(c.lon);
    }

    /// False until at least one coordinate was seen; no auto-framing then.
    pub fn is_valid(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lon <= self.max_lon
    }

    pub fn south_west(&self) -> [f64; 2] {
        [self.min_lat, self.min_lon]
    }

    pub fn north_east(&self) -> [f64; 2] {
        [self.max_lat, self.max_lon]
    }

    pub fn center(&self) -> Option<[f64; 2]> {
        if !self.is_valid() {
            return None;
        }
        Some([
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        ])
    }
}

/// The per-fetch artifact: every normalized feature in declaration order
/// plus the envelope. Replaced wholesale whenever the selection changes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventMap {
    pub features: Vec<GeoFeature>,
    pub bounds: Bounds,
}

impl EventMap {
    /// Points of interest, rendered as markers.
    pub fn points(&self) -> impl Iterator<Item = &PointFeature> {
        self.features.iter().filter_map(|f| match f {
            GeoFeature::Point(p) => Some(p),
            _ => None,
        })
    }

    /// Route polylines.
    pub fn lines(&self) -> impl Iterator<Item = &LineFeature> {
        self.features.iter().filter_map(|f| match f {
            GeoFeature::Line(l) => Some(l),
            _ => None,
        })
    }

    /// Zone polygons.
    pub fn polygons(&self) -> impl Iterator<Item = &PolygonFeature> {
        self.features.iter().filter_map(|f| match f {
            GeoFeature::Polygon(p) => Some(p),
            _ => None,
        })
    }

    pub fn to_geojson(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter()
                .map(GeoFeature::to_geojson)
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lat_lng_reverses_storage_order() {
        let c = LonLat::new(24.1052, 56.9496);
        assert_eq!(c.lat_lng(), [56.9496, 24.1052]);
    }

    #[test]
    fn presentation_accessors_swap_every_level() {
        let line = LineFeature {
            coordinates: vec![LonLat::new(1.0, 2.0), LonLat::new(3.0, 4.0)],
            properties: FeatureProperties::default(),
        };
        assert_eq!(line.positions(), vec![[2.0, 1.0], [4.0, 3.0]]);

        let polygon = PolygonFeature {
            rings: vec![
                vec![LonLat::new(0.0, 0.0), LonLat::new(2.0, 0.0), LonLat::new(1.0, 2.0)],
                vec![LonLat::new(0.5, 0.5), LonLat::new(1.5, 0.5), LonLat::new(1.0, 1.0)],
            ],
            properties: FeatureProperties::default(),
        };
        let rings = polygon.ring_positions();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0][1], [0.0, 2.0]);
        // The inner ring must be swapped too, not just the outer one.
        assert_eq!(rings[1][0], [0.5, 0.5]);
        assert_eq!(rings[1][1], [0.5, 1.5]);
    }

    #[test]
    fn apply_style_overwrites_only_set_fields() {
        let mut props = FeatureProperties {
            stroke: Some("#000000".to_string()),
            stroke_width: Some(5.0),
            ..FeatureProperties::default()
        };
        let style = StyleAttrs {
            stroke: Some("#ff0000".to_string()),
            stroke_opacity: Some(0.5),
            ..StyleAttrs::default()
        };
        props.apply_style(&style);
        assert_eq!(props.stroke.as_deref(), Some("#ff0000"));
        assert_eq!(props.stroke_opacity, Some(0.5));
        // Unset style fields leave existing values in place.
        assert_eq!(props.stroke_width, Some(5.0));
    }

    #[test]
    fn bounds_invalid_until_extended() {
        let mut bounds = Bounds::default();
        assert!(!bounds.is_valid());
        assert_eq!(bounds.center(), None);

        bounds.extend(&LonLat::new(24.0, 56.9));
        bounds.extend(&LonLat::new(24.2, 57.1));
        assert!(bounds.is_valid());
        assert_eq!(bounds.south_west(), [56.9, 24.0]);
        assert_eq!(bounds.north_east(), [57.1, 24.2]);
        let center = bounds.center().unwrap();
        assert!((center[0] - 57.0).abs() < 1e-9);
        assert!((center[1] - 24.1).abs() < 1e-9);
    }

    #[test]
    fn geojson_keeps_longitude_first() {
        let feature = GeoFeature::Point(PointFeature {
            coordinate: LonLat::new(24.1, 56.9),
            properties: FeatureProperties {
                name: Some("Start".to_string()),
                stroke: Some("#ff0000".to_string()),
                ..FeatureProperties::default()
            },
        });
        let value = feature.to_geojson();
        assert_eq!(value["geometry"]["type"], "Point");
        assert_eq!(value["geometry"]["coordinates"][0], 24.1);
        assert_eq!(value["geometry"]["coordinates"][1], 56.9);
        assert_eq!(value["properties"]["name"], "Start");
        assert_eq!(value["properties"]["stroke"], "#ff0000");
        // Absent fields stay absent rather than serializing as null.
        assert!(value["properties"].get("fill").is_none());
    }

    #[test]
    fn event_map_layer_filters() {
        let map = EventMap {
            features: vec![
                GeoFeature::Point(PointFeature {
                    coordinate: LonLat::new(1.0, 1.0),
                    properties: FeatureProperties::default(),
                }),
                GeoFeature::Line(LineFeature {
                    coordinates: vec![],
                    properties: FeatureProperties::default(),
                }),
                GeoFeature::Point(PointFeature {
                    coordinate: LonLat::new(2.0, 2.0),
                    properties: FeatureProperties::default(),
                }),
            ],
            bounds: Bounds::default(),
        };
        assert_eq!(map.points().count(), 2);
        assert_eq!(map.lines().count(), 1);
        assert_eq!(map.polygons().count(), 0);
    }
}
