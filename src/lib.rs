//! Event-map ingestion for race course documents. Fetches the KML (or
//! KMZ) behind a language/distance selection, resolves its shared styles
//! and normalizes every placemark into a render-ready feature list with
//! viewport bounds.

pub mod config;
pub mod data;
pub mod errors;
pub mod ingest;
pub mod session;

pub use config::{Language, MapConfig, RouteDistance};
pub use data::geo::{EventMap, GeoFeature};
pub use errors::{IngestError, Result};
pub use session::{FetchTicket, MapSession, Selection};
