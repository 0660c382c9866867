// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::{LatLon, NumMwmId, Restriction, RoadAccess, RoadGeometry, RoadGeometryProvider, RoadInfo};

use super::model::{self, FeatureType};
use super::Options;

/// Part of an OSM way which became a single road.
struct WayPart {
    feature_id: u32,
    nodes: Vec<i64>,
}

/// Helper object used for storing state related to converting [OSM features](model::Feature)
/// into roads and restrictions of a single region.
pub(super) struct RegionBuilder<'a> {
    geometry: &'a mut RoadGeometry,
    mwm_id: NumMwmId,
    options: &'a Options<'a>,
    nodes: HashMap<i64, LatLon>,
    way_parts: HashMap<i64, Vec<WayPart>>,
    ignore_bbox: bool,
}

impl<'a> RegionBuilder<'a> {
    pub(super) fn new(geometry: &'a mut RoadGeometry, mwm_id: NumMwmId, options: &'a Options<'a>) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());

        Self {
            geometry,
            mwm_id,
            options,
            nodes: HashMap::default(),
            way_parts: HashMap::default(),
            ignore_bbox,
        }
    }

    /// Add all features from the provided iterator, stopping at the first error.
    pub(super) fn add_features<E, I>(&mut self, features: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<model::Feature, E>>,
    {
        for f in features {
            self.add_feature(f?);
        }

        log::debug!(
            "region {} has {} roads and {} restrictions",
            self.mwm_id,
            self.way_parts.values().map(Vec::len).sum::<usize>(),
            self.geometry.restrictions(self.mwm_id).len(),
        );
        Ok(())
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.add_node(n),
            model::Feature::Way(w) => self.add_way(w),
            model::Feature::Relation(r) => self.add_relation(r),
        }
    }

    fn add_node(&mut self, n: model::Node) {
        if self.is_in_bbox(n.position) {
            self.nodes.insert(n.id, n.position);
        }
    }

    fn is_in_bbox(&self, p: LatLon) -> bool {
        if self.ignore_bbox {
            return true;
        }
        let [min_lon, min_lat, max_lon, max_lat] = self.options.bbox;
        p.lat >= min_lat && p.lat <= max_lat && p.lon >= min_lon && p.lon <= max_lon
    }

    fn add_way(&mut self, w: model::Way) {
        let model = self.options.model;
        let Some(speed_kmph) = model.way_speed(&w.tags) else {
            return;
        };

        let access = if model.is_allowed(&w.tags) {
            RoadAccess::Yes
        } else {
            RoadAccess::No
        };

        let (forward, backward) = model.way_direction(&w.tags);
        let mut nodes = w.nodes;
        if !forward {
            nodes.reverse();
        }
        let bidirectional = forward && backward;

        for run in self.known_node_runs(w.id, &nodes) {
            let road = RoadInfo {
                points: run.iter().map(|id| self.nodes[id]).collect(),
                bidirectional,
                speed_kmph,
                access,
            };

            if let Some(feature_id) = self.geometry.add_road(self.mwm_id, road) {
                self.way_parts.entry(w.id).or_default().push(WayPart {
                    feature_id,
                    nodes: run,
                });
            }
        }
    }

    /// Splits the nodes of a way into runs of known nodes,
    /// dropping runs too short to form a road.
    fn known_node_runs(&self, way_id: i64, nodes: &[i64]) -> Vec<Vec<i64>> {
        let mut runs: Vec<Vec<i64>> = vec![Vec::default()];

        for &node_id in nodes {
            if !self.nodes.contains_key(&node_id) {
                log::warn!("way {} references unknown node {}", way_id, node_id);
                runs.push(Vec::default());
                continue;
            }

            if let Some(run) = runs.last_mut() {
                if run.last() != Some(&node_id) {
                    run.push(node_id);
                }
            }
        }

        runs.retain(|run| run.len() >= 2);
        runs
    }

    fn add_relation(&mut self, r: model::Relation) {
        let Some(kind) = self.options.model.restriction_kind(&r.tags) else {
            return;
        };

        match self.restriction_features(&r) {
            Ok((from, via, to)) => {
                self.geometry
                    .add_restriction(self.mwm_id, Restriction::new(kind, from, to).with_via(via));
            }
            Err(e) => log::warn!("skipping turn restriction {}: {}", r.id, e),
        }
    }

    /// Resolves the members of a node-via restriction to the roads which contain
    /// the via node, and the position of that node.
    fn restriction_features(&self, r: &model::Relation) -> Result<(u32, LatLon, u32), InvalidRestriction> {
        let from = single_member(r, "from")?;
        let via = single_member(r, "via")?;
        let to = single_member(r, "to")?;

        match via.type_ {
            FeatureType::Node => {}
            FeatureType::Way => return Err(InvalidRestriction::ViaWay),
            t => return Err(InvalidRestriction::InvalidMemberType("via".to_string(), t)),
        }
        let position = self
            .nodes
            .get(&via.ref_)
            .copied()
            .ok_or(InvalidRestriction::ReferenceToUnknownNode(via.ref_))?;

        let from = self.part_containing(from, via.ref_)?;
        let to = self.part_containing(to, via.ref_)?;
        Ok((from, position, to))
    }

    fn part_containing(&self, m: &model::RelationMember, node_id: i64) -> Result<u32, InvalidRestriction> {
        if m.type_ != FeatureType::Way {
            return Err(InvalidRestriction::InvalidMemberType(m.role.clone(), m.type_));
        }

        self.way_parts
            .get(&m.ref_)
            .ok_or(InvalidRestriction::ReferenceToUnknownWay(m.ref_))?
            .iter()
            .find(|part| part.nodes.contains(&node_id))
            .map(|part| part.feature_id)
            .ok_or(InvalidRestriction::Disjoint)
    }
}

fn single_member<'r>(r: &'r model::Relation, role: &'static str) -> Result<&'r model::RelationMember, InvalidRestriction> {
    let mut members = r.members_with_role(role);
    match (members.next(), members.next()) {
        (Some(m), None) => Ok(m),
        (None, _) => Err(InvalidRestriction::MissingMember(role)),
        (Some(_), Some(_)) => Err(InvalidRestriction::MultipleMembers(role)),
    }
}

#[derive(Debug, thiserror::Error)]
enum InvalidRestriction {
    #[error("via node is not part of the from or to way")]
    Disjoint,

    #[error("missing '{0}' member")]
    MissingMember(&'static str),

    #[error("multiple '{0}' members")]
    MultipleMembers(&'static str),

    #[error("reference to unknown node {0}")]
    ReferenceToUnknownNode(i64),

    #[error("reference to unknown way {0}")]
    ReferenceToUnknownWay(i64),

    #[error("member with role {0} can't be of type {1}")]
    InvalidMemberType(String, FeatureType),

    #[error("restrictions with a via way are not supported")]
    ViaWay,
}
