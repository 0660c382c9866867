// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Loading of [OpenStreetMap](https://www.openstreetmap.org/) data into regions
//! of a [RoadGeometry](crate::RoadGeometry).
//!
//! Every loaded file becomes a single region. Ways matched by a [VehicleModel] become
//! roads (one-way roads always point in the direction of travel), and node-via
//! [turn restrictions](https://wiki.openstreetmap.org/wiki/Relation:restriction)
//! become [Restrictions](crate::Restriction).

mod reader;
mod vehicle;

pub use reader::{add_region_from_buffer, add_region_from_file, add_region_from_io, Error, FileFormat, Options};
pub use vehicle::{RoadSpeed, VehicleModel, BICYCLE_MODEL, CAR_MODEL, FOOT_MODEL};
