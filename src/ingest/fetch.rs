use std::io::{Cursor, Read};

use log::debug;
use zip::ZipArchive;

use crate::errors::{IngestError, Result};

/// Local-file-header signature of a ZIP archive.
const KMZ_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// GET one document and hand back its KML text. Transport errors and
/// non-success statuses become fetch errors; payload problems become
/// parse errors.
pub async fn fetch_document(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| IngestError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::FetchStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| IngestError::Fetch {
            url: url.to_string(),
            source,
        })?;

    document_from_bytes(&bytes)
}

/// Decode a payload into document text. KMZ archives are unwrapped to
/// their first `.kml` entry; everything else is taken as text as-is.
pub fn document_from_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&KMZ_MAGIC) {
        return extract_kml_entry(bytes);
    }
    let text = String::from_utf8_lossy(bytes);
    Ok(strip_bom(&text).to_string())
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn extract_kml_entry(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    // Scan in archive order; file_names() is unordered and would make
    // multi-entry archives decode differently run to run.
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.name().to_ascii_lowercase().ends_with(".kml") {
            continue;
        }

        debug!(entry = entry.name(); "unpacking archived document");

        let mut raw = Vec::new();
        entry
            .read_to_end(&mut raw)
            .map_err(|e| IngestError::Parse(format!("unreadable archive entry: {e}")))?;

        let text = String::from_utf8_lossy(&raw);
        return Ok(strip_bom(&text).to_string());
    }

    Err(IngestError::Parse("archive holds no .kml entry".to_string()))
}
