// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use region_builder::RegionBuilder;

use crate::osm::VehicleModel;
use crate::{NumMwmId, RoadGeometry};

mod model;
mod region_builder;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the first bytes of a file:
    /// gzip and bzip2 magic numbers, or a `<` opening an XML document
    /// (possibly preceded by a byte order mark and whitespace).
    pub fn detect(head: &[u8]) -> Option<Self> {
        if head.starts_with(&[0x1F, 0x8B]) {
            return Some(Self::XmlGz);
        }

        if head.starts_with(b"BZh") {
            return Some(Self::XmlBz2);
        }

        let text = head.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(head);
        match text.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'<') => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Additional controls for interpreting OSM data as a region of a [RoadGeometry].
#[derive(Debug)]
pub struct Options<'a> {
    /// How OSM features should be interpreted and converted into roads.
    pub model: &'a VehicleModel<'a>,

    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter features by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite.
    pub bbox: [f64; 4],
}

/// Error which can occur while loading OSM data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unrecognized file format")]
    UnknownFormat,
}

/// Parse OSM features from a reader into a new region of a [RoadGeometry]
/// as per the provided [Options]. Returns the id of the region.
///
/// Loading into a region which already exists (by name) appends to it.
/// The provided stream will be automatically wrapped in a buffered reader when needed.
pub fn add_region_from_io<R: io::Read>(
    geometry: &mut RoadGeometry,
    name: &str,
    options: &Options<'_>,
    reader: R,
) -> Result<NumMwmId, Error> {
    let mut b = io::BufReader::new(reader);

    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(b.fill_buf()?).ok_or(Error::UnknownFormat)?,
        f => f,
    };

    let mwm_id = geometry.add_region(name);
    let mut builder = RegionBuilder::new(geometry, mwm_id, options);

    match format {
        FileFormat::Xml | FileFormat::Unknown => builder.add_features(xml::Reader::from_io(b))?,

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            builder.add_features(xml::Reader::from_io(io::BufReader::new(d)))?;
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            builder.add_features(xml::Reader::from_io(io::BufReader::new(d)))?;
        }
    }

    log::info!("loaded region {} as {}", name, mwm_id);
    Ok(mwm_id)
}

/// Parse OSM features from a file at the provided path into a new region of a [RoadGeometry]
/// as per the provided [Options]. Returns the id of the region.
pub fn add_region_from_file<P: AsRef<Path>>(
    geometry: &mut RoadGeometry,
    name: &str,
    options: &Options<'_>,
    path: P,
) -> Result<NumMwmId, Error> {
    let f = File::open(path)?;
    add_region_from_io(geometry, name, options, f)
}

/// Parse OSM features from a static buffer into a new region of a [RoadGeometry]
/// as per the provided [Options]. Returns the id of the region.
pub fn add_region_from_buffer(
    geometry: &mut RoadGeometry,
    name: &str,
    options: &Options<'_>,
    data: &[u8],
) -> Result<NumMwmId, Error> {
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(data).ok_or(Error::UnknownFormat)?,
        f => f,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        let mwm_id = geometry.add_region(name);
        RegionBuilder::new(geometry, mwm_id, options).add_features(xml::Reader::from_buffer(data))?;
        log::info!("loaded region {} as {}", name, mwm_id);
        Ok(mwm_id)
    } else {
        add_region_from_io(geometry, name, options, io::Cursor::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect() {
        assert_eq!(FileFormat::detect(&[0x1F, 0x8B, 0x08, 0x00]), Some(FileFormat::XmlGz));
        assert_eq!(FileFormat::detect(b"BZh91AY&SY"), Some(FileFormat::XmlBz2));
        assert_eq!(FileFormat::detect(b"<?xml version=\"1.0\"?>"), Some(FileFormat::Xml));
        assert_eq!(FileFormat::detect(b"\xEF\xBB\xBF\n  <osm>"), Some(FileFormat::Xml));
        assert_eq!(FileFormat::detect(b"\x00\x00\x00\x0d\x0a\x09OSMHeader"), None);
        assert_eq!(FileFormat::detect(b""), None);
    }
}
