//! Raw KML records as found in the document, and the normalized
//! render-ready feature model derived from them.

pub mod geo;
pub mod kml;
