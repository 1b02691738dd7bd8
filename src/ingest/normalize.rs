use crate::data::geo::{
    Bounds, EventMap, FeatureProperties, GeoFeature, LineFeature, PointFeature, PolygonFeature,
};
use crate::data::kml::{KmlDocument, Placemark, RawGeometry};
use crate::ingest::style::StyleTable;

/// Turn parsed records into the render-ready feature list plus bounds.
///
/// Records keep their declaration order. A record without a geometry
/// payload produces no feature; everything else goes through, including
/// lines and polygons whose coordinate lists came out empty.
pub fn normalize_features(doc: &KmlDocument, styles: &StyleTable) -> EventMap {
    let mut map = EventMap::default();

    for placemark in &doc.placemarks {
        let properties = merge_properties(placemark, styles);
        let feature = match &placemark.geometry {
            Some(RawGeometry::Point(coordinate)) => GeoFeature::Point(PointFeature {
                coordinate: *coordinate,
                properties,
            }),
            Some(RawGeometry::LineString(coordinates)) => GeoFeature::Line(LineFeature {
                coordinates: coordinates.clone(),
                properties,
            }),
            Some(RawGeometry::Polygon(rings)) => GeoFeature::Polygon(PolygonFeature {
                rings: rings.clone(),
                properties,
            }),
            None => continue,
        };
        extend_bounds(&mut map.bounds, &feature);
        map.features.push(feature);
    }

    map
}

fn merge_properties(placemark: &Placemark, styles: &StyleTable) -> FeatureProperties {
    let mut properties = FeatureProperties {
        name: placemark.name.clone(),
        description: placemark.description.clone(),
        ..FeatureProperties::default()
    };

    // Unknown references merge nothing; the record still goes through.
    if let Some(attrs) = placemark.style_url.as_ref().and_then(|url| styles.get(url)) {
        properties.apply_style(attrs);
    }

    // A non-empty "icon" data entry beats the shared style. With several
    // such entries the last one counts.
    for entry in &placemark.extended_data {
        if entry.name.as_deref() == Some("icon") && !entry.value.is_empty() {
            properties.icon = Some(entry.value.clone());
        }
    }

    properties
}

fn extend_bounds(bounds: &mut Bounds, feature: &GeoFeature) {
    match feature {
        GeoFeature::Point(f) => bounds.extend(&f.coordinate),
        GeoFeature::Line(f) => {
            for coordinate in &f.coordinates {
                bounds.extend(coordinate);
            }
        }
        GeoFeature::Polygon(f) => {
            for ring in &f.rings {
                for coordinate in ring {
                    bounds.extend(coordinate);
                }
            }
        }
    }
}
