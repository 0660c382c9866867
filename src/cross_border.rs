// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Coarse graph of border crossings between regions, and its binary format.
//!
//! The format is little-endian:
//!
//! | Field | Type |
//! |---|---|
//! | magic `XBRD` | `u32` |
//! | version | `u16` |
//! | reserved | `u16` |
//! | region count | `u32` |
//! | xxh3 hashes of region names | `u64` × region count |
//! | segment count | `u32` |
//! | segments | 30 bytes × segment count |
//! | CRC-64 (GO-ISO) of everything above | `u64` |
//!
//! Each segment is stored as: id (`u32`), start latitude and longitude (`u32` each,
//! quantized to 30 bits), start region index (`u16`), end latitude, longitude and
//! region index, and weight (`u64`, in thousandths).
//!
//! Regions are referred to by hashes of their names, so that a file stays valid when
//! the set of loaded regions (and thus their numeric ids) changes.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};

use crc::{Crc, Digest, CRC_64_GO_ISO};

use crate::{LatLon, NumMwmId, RoadGeometryProvider, Weight, WorldGraph};

const MAGIC: u32 = 0x4452_4258; // "XBRD"
const VERSION: u16 = 1;
const COORD_BITS: u32 = 30;
const WEIGHT_SCALE: f64 = 1000.0;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

#[derive(Debug, thiserror::Error)]
pub enum CrossBorderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("not a cross-border graph")]
    BadMagic,

    #[error("unsupported cross-border graph version {0}")]
    UnsupportedVersion(u16),

    #[error("unexpected end of cross-border graph data")]
    Truncated,

    #[error("cross-border graph checksum mismatch")]
    ChecksumMismatch,

    #[error("no loaded region has name hash {0:#018x}")]
    UnknownRegionHash(u64),

    #[error("unknown region {0}")]
    UnknownRegion(NumMwmId),

    #[error("weight {0} can't be stored")]
    InvalidWeight(Weight),
}

/// One end of a [CrossBorderSegment].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossBorderSegmentEnding {
    pub point: LatLon,
    pub mwm_id: NumMwmId,
}

impl CrossBorderSegmentEnding {
    pub const fn new(point: LatLon, mwm_id: NumMwmId) -> Self {
        Self { point, mwm_id }
    }
}

/// Crossing of a border: from the start of an exit segment in one region
/// to the end of the twin segment in the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossBorderSegment {
    pub start: CrossBorderSegmentEnding,
    pub end: CrossBorderSegmentEnding,
    pub weight: Weight,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossBorderGraph {
    segments: BTreeMap<u32, CrossBorderSegment>,
    mwm_to_segments: HashMap<NumMwmId, Vec<u32>>,
}

impl CrossBorderGraph {
    /// Adds a crossing, replacing any previous crossing with the same id.
    pub fn add_segment(&mut self, id: u32, segment: CrossBorderSegment) {
        if let Some(old) = self.segments.insert(id, segment) {
            for mwm_id in [old.start.mwm_id, old.end.mwm_id] {
                if let Some(ids) = self.mwm_to_segments.get_mut(&mwm_id) {
                    ids.retain(|&other| other != id);
                    if ids.is_empty() {
                        self.mwm_to_segments.remove(&mwm_id);
                    }
                }
            }
        }

        self.mwm_to_segments
            .entry(segment.start.mwm_id)
            .or_default()
            .push(id);
        if segment.end.mwm_id != segment.start.mwm_id {
            self.mwm_to_segments
                .entry(segment.end.mwm_id)
                .or_default()
                .push(id);
        }
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&CrossBorderSegment> {
        self.segments.get(&id)
    }

    /// All crossings, ordered by id.
    pub fn segments(&self) -> impl Iterator<Item = (u32, &CrossBorderSegment)> {
        self.segments.iter().map(|(&id, s)| (id, s))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments touching a region, either leaving or entering it.
    pub fn segments_of(&self, mwm_id: NumMwmId) -> impl Iterator<Item = (u32, &CrossBorderSegment)> {
        self.mwm_to_segments
            .get(&mwm_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.segments.get(id).map(|s| (*id, s)))
    }

    /// Turns every transition of the world graph into a cross-border segment.
    pub fn build(world: &WorldGraph) -> Self {
        let mut pairs: Vec<_> = world.transitions().iter().collect();
        pairs.sort_unstable();

        let mut graph = Self::default();
        let mut id: u32 = 0;
        for (exit, enter) in pairs {
            let (Some(start), Some(end)) = (world.point(&exit, false), world.point(&enter, true)) else {
                log::warn!("skipping transition {} -> {} with unknown geometry", exit, enter);
                continue;
            };

            let weight = world.calc_segment_weight(&exit) + world.calc_segment_weight(&enter);
            graph.add_segment(
                id,
                CrossBorderSegment {
                    start: CrossBorderSegmentEnding::new(start, exit.mwm_id),
                    end: CrossBorderSegmentEnding::new(end, enter.mwm_id),
                    weight,
                },
            );
            id += 1;
        }

        log::info!("built cross-border graph with {} segments", graph.len());
        graph
    }

    /// Writes the graph in the binary format, with regions named after `geometry`.
    pub fn serialize<W: Write>(
        &self,
        writer: W,
        geometry: &dyn RoadGeometryProvider,
    ) -> Result<(), CrossBorderError> {
        let mut regions: Vec<NumMwmId> = self
            .segments
            .values()
            .flat_map(|s| [s.start.mwm_id, s.end.mwm_id])
            .collect();
        regions.sort_unstable();
        regions.dedup();

        let mut region_index: HashMap<NumMwmId, u16> = HashMap::with_capacity(regions.len());
        let mut hashes = Vec::with_capacity(regions.len());
        for (index, &mwm_id) in regions.iter().enumerate() {
            let name = geometry
                .region_name(mwm_id)
                .ok_or(CrossBorderError::UnknownRegion(mwm_id))?;
            hashes.push(region_name_hash(name));
            region_index.insert(mwm_id, index as u16);
        }

        let mut w = ChecksumWriter::new(writer);
        w.write_u32(MAGIC)?;
        w.write_u16(VERSION)?;
        w.write_u16(0)?;
        w.write_u32(hashes.len() as u32)?;
        for hash in hashes {
            w.write_u64(hash)?;
        }

        w.write_u32(self.segments.len() as u32)?;
        for (&id, segment) in &self.segments {
            w.write_u32(id)?;
            for ending in [segment.start, segment.end] {
                w.write_u32(quantize(ending.point.lat, 90.0))?;
                w.write_u32(quantize(ending.point.lon, 180.0))?;
                w.write_u16(region_index[&ending.mwm_id])?;
            }
            w.write_u64(encode_weight(segment.weight)?)?;
        }

        w.finish()
    }

    /// Reads a graph in the binary format, mapping region name hashes
    /// onto the regions of `geometry`.
    pub fn deserialize<R: Read>(
        reader: R,
        geometry: &dyn RoadGeometryProvider,
    ) -> Result<Self, CrossBorderError> {
        let known: HashMap<u64, NumMwmId> = geometry
            .regions()
            .into_iter()
            .filter_map(|id| geometry.region_name(id).map(|name| (region_name_hash(name), id)))
            .collect();

        let mut r = ChecksumReader::new(reader);
        if r.read_u32()? != MAGIC {
            return Err(CrossBorderError::BadMagic);
        }
        let version = r.read_u16()?;
        if version != VERSION {
            return Err(CrossBorderError::UnsupportedVersion(version));
        }
        let _reserved = r.read_u16()?;

        let region_count = r.read_u32()?;
        let mut regions = Vec::with_capacity(region_count.min(u16::MAX as u32) as usize);
        for _ in 0..region_count {
            let hash = r.read_u64()?;
            match known.get(&hash) {
                Some(&id) => regions.push(id),
                None => {
                    log::error!("cross-border graph refers to an unknown region hash {:#018x}", hash);
                    return Err(CrossBorderError::UnknownRegionHash(hash));
                }
            }
        }

        let segment_count = r.read_u32()?;
        let mut graph = Self::default();
        for _ in 0..segment_count {
            let id = r.read_u32()?;
            let mut endings = [CrossBorderSegmentEnding::new(LatLon::default(), 0); 2];
            for ending in &mut endings {
                let lat = dequantize(r.read_u32()?, 90.0);
                let lon = dequantize(r.read_u32()?, 180.0);
                let index = r.read_u16()?;
                let mwm_id = *regions
                    .get(index as usize)
                    .ok_or(CrossBorderError::UnknownRegion(index))?;
                *ending = CrossBorderSegmentEnding::new(LatLon::new(lat, lon), mwm_id);
            }
            let weight = r.read_u64()? as f64 / WEIGHT_SCALE;

            graph.add_segment(
                id,
                CrossBorderSegment {
                    start: endings[0],
                    end: endings[1],
                    weight,
                },
            );
        }

        r.finish()?;
        Ok(graph)
    }
}

pub fn region_name_hash(name: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(name.as_bytes())
}

fn quantize(value: f64, range: f64) -> u32 {
    let max = ((1u32 << COORD_BITS) - 1) as f64;
    let normalized = ((value + range) / (2.0 * range)).clamp(0.0, 1.0);
    (normalized * max).round() as u32
}

fn dequantize(value: u32, range: f64) -> f64 {
    let max = ((1u32 << COORD_BITS) - 1) as f64;
    value as f64 / max * 2.0 * range - range
}

fn encode_weight(weight: Weight) -> Result<u64, CrossBorderError> {
    let scaled = (weight * WEIGHT_SCALE).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
        return Err(CrossBorderError::InvalidWeight(weight));
    }
    Ok(scaled as u64)
}

struct ChecksumWriter<W> {
    inner: W,
    digest: Digest<'static, u64>,
}

impl<W: Write> ChecksumWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            digest: CRC64.digest(),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CrossBorderError> {
        self.digest.update(bytes);
        self.inner.write_all(bytes)?;
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<(), CrossBorderError> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn write_u32(&mut self, v: u32) -> Result<(), CrossBorderError> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn write_u64(&mut self, v: u64) -> Result<(), CrossBorderError> {
        self.write_bytes(&v.to_le_bytes())
    }

    fn finish(mut self) -> Result<(), CrossBorderError> {
        let checksum = self.digest.finalize();
        self.inner.write_all(&checksum.to_le_bytes())?;
        self.inner.flush()?;
        Ok(())
    }
}

struct ChecksumReader<R> {
    inner: R,
    digest: Digest<'static, u64>,
}

impl<R: Read> ChecksumReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            digest: CRC64.digest(),
        }
    }

    fn read_raw<const N: usize>(&mut self) -> Result<[u8; N], CrossBorderError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => CrossBorderError::Truncated,
            _ => CrossBorderError::Io(e),
        })?;
        Ok(buf)
    }

    fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], CrossBorderError> {
        let buf = self.read_raw::<N>()?;
        self.digest.update(&buf);
        Ok(buf)
    }

    fn read_u16(&mut self) -> Result<u16, CrossBorderError> {
        self.read_bytes().map(u16::from_le_bytes)
    }

    fn read_u32(&mut self) -> Result<u32, CrossBorderError> {
        self.read_bytes().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Result<u64, CrossBorderError> {
        self.read_bytes().map(u64::from_le_bytes)
    }

    /// Reads the checksum footer and compares it with the data read so far.
    fn finish(mut self) -> Result<(), CrossBorderError> {
        let stored = u64::from_le_bytes(self.read_raw::<8>()?);
        if stored != self.digest.finalize() {
            return Err(CrossBorderError::ChecksumMismatch);
        }
        Ok(())
    }
}
