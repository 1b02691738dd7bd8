//! The ingestion pipeline, from document URL to render-ready features.

pub mod fetch;
pub mod normalize;
pub mod parse_kml;
pub mod style;

use log::info;

use crate::data::geo::EventMap;
use crate::errors::Result;

/// Run the whole pipeline for one document URL.
pub async fn ingest_url(client: &reqwest::Client, url: &str) -> Result<EventMap> {
    let text = fetch::fetch_document(client, url).await?;
    let document = parse_kml::parse_document(&text)?;
    let styles = style::build_style_table(&document);
    let map = normalize::normalize_features(&document, &styles);

    info!(
        url = url,
        styles = styles.len(),
        placemarks = document.placemarks.len(),
        features = map.features.len();
        "ingested event map"
    );

    Ok(map)
}
