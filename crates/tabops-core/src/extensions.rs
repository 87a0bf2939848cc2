//! Dashboard extension scan of packaged workbooks

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{OpsError, Result};

/// Extension kinds detected in a workbook document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionUsage {
    /// A `<script>` element points at a TabPy service
    pub tabpy: bool,
    /// An `<extension>` element points at Einstein Discovery
    pub einstein: bool,
    /// Any element whose tag mentions "extension"
    pub viz_ext: bool,
}

/// Workbook document (`.twb`) pulled out of a package
#[derive(Debug, Clone)]
pub struct WorkbookDocument {
    /// Entry name inside the archive, or `None` for a bare `.twb` download
    pub entry: Option<String>,
    pub xml: Vec<u8>,
}

/// Pull the first `.twb` entry out of a `.twbx` archive
pub fn extract_twb(archive: &[u8]) -> Result<WorkbookDocument> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| OpsError::Archive(format!("Failed to open workbook package: {e}")))?;

    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| OpsError::Archive(format!("Failed to read archive entry {i}: {e}")))?;
        let name = file.name().to_string();
        if !name.ends_with(".twb") {
            continue;
        }

        let mut xml = Vec::new();
        file.read_to_end(&mut xml)
            .map_err(|e| OpsError::Archive(format!("Failed to read {name}: {e}")))?;
        debug!(entry = %name, bytes = xml.len(), "Extracted workbook document");
        return Ok(WorkbookDocument {
            entry: Some(name),
            xml,
        });
    }

    Err(OpsError::Archive(
        "No .twb file found in the .twbx archive.".to_string(),
    ))
}

fn attribute_contains(element: &BytesStart<'_>, key: &[u8], needle: &str) -> bool {
    element
        .attributes()
        .flatten()
        .filter(|attr| attr.key.as_ref() == key)
        .any(|attr| {
            String::from_utf8_lossy(&attr.value)
                .to_lowercase()
                .contains(needle)
        })
}

fn visit(element: &BytesStart<'_>, usage: &mut ExtensionUsage) {
    let name = element.name();
    let tag = String::from_utf8_lossy(name.as_ref()).to_lowercase();

    if tag.contains("extension") {
        usage.viz_ext = true;
    }
    if tag == "script" && attribute_contains(element, b"url", "tabpy") {
        usage.tabpy = true;
    }
    if tag == "extension" && attribute_contains(element, b"url", "einstein") {
        usage.einstein = true;
    }
}

/// Scan a workbook document for extension usage.
///
/// Malformed XML is logged and reported as "no extensions".
pub fn scan(xml: &[u8]) -> ExtensionUsage {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut usage = ExtensionUsage::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => visit(e, &mut usage),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                error!(position = reader.buffer_position(), "Failed to parse workbook XML: {e}");
                return ExtensionUsage::default();
            }
        }
        buf.clear();
    }

    usage
}

/// Locate the workbook document in a downloaded package and scan it
pub fn scan_package(bytes: &[u8]) -> Result<(WorkbookDocument, ExtensionUsage)> {
    let document = if bytes.starts_with(b"PK\x03\x04") {
        extract_twb(bytes)?
    } else {
        WorkbookDocument {
            entry: None,
            xml: bytes.to_vec(),
        }
    };
    let usage = scan(&document.xml);
    Ok((document, usage))
}
