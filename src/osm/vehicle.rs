// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::RestrictionKind;

const MPH_TO_KMPH: f64 = 1.609344;

/// Describes how OSM ways are turned into roads of a region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleModel<'a> {
    /// Human readable name of the vehicle model,
    /// customary the most specific [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
    ///
    /// When set to "foot", generic `oneway` tags are ignored (except on footways, paths,
    /// steps and platforms) and only `restriction:foot` turn restrictions are considered.
    pub name: &'a str,

    /// Ways which can be used for routing, together with their speeds.
    ///
    /// A way is matched against all [RoadSpeed] objects in order, and the first exact key
    /// and value match decides the speed of the resulting road. Ways not matching any
    /// [RoadSpeed] are not loaded.
    pub speeds: &'a [RoadSpeed<'a>],

    /// OSM [access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation)
    /// (in order from least to most specific) to consider when checking for road prohibitions.
    ///
    /// Also used to follow mode-specific one-way and turn restrictions.
    pub access: &'a [&'a str],

    /// Force no routing over [motorroad=yes](https://wiki.openstreetmap.org/wiki/Key:motorroad) ways.
    pub disallow_motorroad: bool,

    /// Force ignoring of [turn restrictions](https://wiki.openstreetmap.org/wiki/Turn_restriction).
    pub disable_restrictions: bool,

    /// Lower road speeds to numeric [maxspeed](https://wiki.openstreetmap.org/wiki/Key:maxspeed) tags.
    pub follow_maxspeed: bool,
}

/// Speed of ways with a specific key and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadSpeed<'a> {
    /// Key of an OSM way for which this speed applies, e.g. "highway".
    pub key: &'a str,

    /// Value under [RoadSpeed::key] of an OSM way for which this speed applies.
    /// E.g. "motorway" or "residential".
    pub value: &'a str,

    /// Must be a positive, finite number.
    pub speed_kmph: f64,
}

impl<'a> VehicleModel<'a> {
    /// Highest speed of any road; the speed an
    /// [EdgeEstimator](crate::EdgeEstimator) for this model should be capped at.
    pub fn max_speed_kmph(&self) -> f64 {
        self.speeds
            .iter()
            .map(|s| s.speed_kmph)
            .fold(1.0, f64::max)
    }

    /// Returns the speed of a way with given tags, or [None] if the way
    /// doesn't match any [RoadSpeed]. Access restrictions are not considered,
    /// see [VehicleModel::is_allowed].
    pub fn way_speed(&self, tags: &HashMap<String, String>) -> Option<f64> {
        let speed = self
            .speeds
            .iter()
            .find(|s| tags.get(s.key).map(|v| v.as_str()) == Some(s.value))
            .map(|s| s.speed_kmph)
            .filter(|&s| s.is_finite() && s > 0.0)?;

        let limit = if self.follow_maxspeed {
            tags.get("maxspeed").and_then(|v| parse_maxspeed(v))
        } else {
            None
        };

        Some(limit.map_or(speed, |limit| speed.min(limit)))
    }

    /// Checks if the way is routable, by considering motor roads ([VehicleModel::disallow_motorroad])
    /// and access tags ([VehicleModel::access]).
    pub fn is_allowed(&self, tags: &HashMap<String, String>) -> bool {
        if self.disallow_motorroad && tags.get("motorroad").map(|v| v.as_str()) == Some("yes") {
            return false;
        }

        match self
            .access
            .iter()
            .rev()
            .find_map(|&mode| tags.get(mode).map(|v| v.as_str()))
        {
            Some("no") | Some("private") => false,
            _ => true,
        }
    }

    /// Checks if a way is traversable forward (first return value) and
    /// backwards (second return value) by investigating mode-specific and generic one-way tags.
    ///
    /// Some ways (highway=motorway, highway=motorway_link, junction=roundabout and
    /// junction=circular) default to being one-way, except if overridden by specific tags.
    pub fn way_direction(&self, tags: &HashMap<String, String>) -> (bool, bool) {
        let mut forward = true;
        let mut backward = true;

        if !self.apply_foot_exceptions() {
            if matches!(
                tags.get("highway").map(|s| s.as_str()),
                Some("motorway") | Some("motorway_link")
            ) {
                backward = false;
            }

            if matches!(
                tags.get("junction").map(|s| s.as_str()),
                Some("roundabout") | Some("circular")
            ) {
                backward = false;
            }
        }

        match self.active_oneway_value(tags) {
            "yes" | "true" | "1" => {
                forward = true;
                backward = false;
            }

            "-1" | "reverse" => {
                forward = false;
                backward = true;
            }

            "no" => {
                forward = true;
                backward = true;
            }

            _ => {}
        }

        (forward, backward)
    }

    /// Returns the value of the most specific "oneway:MODE" tag (based on [VehicleModel::access]),
    /// falling back to simply "oneway", and returning an empty string if no relevant tag was found.
    fn active_oneway_value<'t>(&self, tags: &'t HashMap<String, String>) -> &'t str {
        if self.apply_foot_exceptions() {
            if let Some(oneway_foot) = tags.get("oneway:foot") {
                return oneway_foot.as_str();
            }

            let generic_applies = matches!(
                tags.get("highway").map(|v| v.as_str()),
                Some("footway") | Some("path") | Some("steps") | Some("platform")
            ) || tags.get("public_transport").map(|v| v.as_str()) == Some("platform")
                || tags.get("railway").map(|v| v.as_str()) == Some("platform");

            if generic_applies {
                return tags.get("oneway").map_or("", |v| v.as_str());
            }
            return "";
        }

        self.access
            .iter()
            .rev()
            .filter(|&&mode| mode != "access")
            .find_map(|&mode| tags.get(&format!("oneway:{}", mode)))
            .or_else(|| tags.get("oneway"))
            .map_or("", |v| v.as_str())
    }

    /// Figures out which [RestrictionKind] a relation with given tags represents,
    /// or [None] if it's not a turn restriction applicable to this vehicle.
    pub fn restriction_kind(&self, tags: &HashMap<String, String>) -> Option<RestrictionKind> {
        if self.disable_restrictions
            || tags.get("type").map(|v| v.as_str()) != Some("restriction")
            || self.is_exempted(tags)
        {
            return None;
        }

        let (kind, description) = self.active_restriction_tag(tags).split_once('_')?;
        match description {
            "right_turn" | "left_turn" | "u_turn" | "straight_on" => {}
            _ => return None,
        }

        match kind {
            "no" => Some(RestrictionKind::No),
            "only" => Some(RestrictionKind::Only),
            _ => None,
        }
    }

    /// Returns true if [VehicleModel::access] intersects with any mode present in the `except` tag.
    pub fn is_exempted(&self, tags: &HashMap<String, String>) -> bool {
        tags.get("except")
            .map_or("", |v| v.as_str())
            .split(';')
            .any(|exempted| self.access.contains(&exempted.trim()))
    }

    fn active_restriction_tag<'t>(&self, tags: &'t HashMap<String, String>) -> &'t str {
        if self.apply_foot_exceptions() {
            return tags.get("restriction:foot").map_or("", |v| v.as_str());
        }

        self.access
            .iter()
            .rev()
            .filter(|&&mode| mode != "access")
            .find_map(|&mode| tags.get(&format!("restriction:{}", mode)))
            .or_else(|| tags.get("restriction"))
            .map_or("", |v| v.as_str())
    }

    fn apply_foot_exceptions(&self) -> bool {
        self.name == "foot"
    }
}

/// Parses a numeric [maxspeed](https://wiki.openstreetmap.org/wiki/Key:maxspeed) value,
/// in km/h or in mph. Symbolic values (like "walk" or "PL:urban") are not understood.
fn parse_maxspeed(value: &str) -> Option<f64> {
    let value = value.trim();
    let (number, factor) = match value.strip_suffix("mph") {
        Some(number) => (number.trim(), MPH_TO_KMPH),
        None => (value.strip_suffix("km/h").unwrap_or(value).trim(), 1.0),
    };

    number
        .parse::<f64>()
        .ok()
        .map(|n| n * factor)
        .filter(|&s| s.is_finite() && s > 0.0)
}

/// [VehicleModel] for cars, with typical free-flow speeds of road classes.
pub const CAR_MODEL: VehicleModel = VehicleModel {
    name: "motorcar",
    speeds: &[
        RoadSpeed {
            key: "highway",
            value: "motorway",
            speed_kmph: 120.0,
        },
        RoadSpeed {
            key: "highway",
            value: "motorway_link",
            speed_kmph: 60.0,
        },
        RoadSpeed {
            key: "highway",
            value: "trunk",
            speed_kmph: 90.0,
        },
        RoadSpeed {
            key: "highway",
            value: "trunk_link",
            speed_kmph: 50.0,
        },
        RoadSpeed {
            key: "highway",
            value: "primary",
            speed_kmph: 70.0,
        },
        RoadSpeed {
            key: "highway",
            value: "primary_link",
            speed_kmph: 45.0,
        },
        RoadSpeed {
            key: "highway",
            value: "secondary",
            speed_kmph: 60.0,
        },
        RoadSpeed {
            key: "highway",
            value: "secondary_link",
            speed_kmph: 40.0,
        },
        RoadSpeed {
            key: "highway",
            value: "tertiary",
            speed_kmph: 50.0,
        },
        RoadSpeed {
            key: "highway",
            value: "tertiary_link",
            speed_kmph: 35.0,
        },
        RoadSpeed {
            key: "highway",
            value: "unclassified",
            speed_kmph: 40.0,
        },
        RoadSpeed {
            key: "highway",
            value: "residential",
            speed_kmph: 30.0,
        },
        RoadSpeed {
            key: "highway",
            value: "living_street",
            speed_kmph: 10.0,
        },
        RoadSpeed {
            key: "highway",
            value: "service",
            speed_kmph: 15.0,
        },
        RoadSpeed {
            key: "highway",
            value: "track",
            speed_kmph: 10.0,
        },
    ],
    access: &["access", "vehicle", "motor_vehicle", "motorcar"],
    disallow_motorroad: false,
    disable_restrictions: false,
    follow_maxspeed: true,
};

/// [VehicleModel] for bicycles, avoiding motorways and motor roads.
pub const BICYCLE_MODEL: VehicleModel = VehicleModel {
    name: "bicycle",
    speeds: &[
        RoadSpeed {
            key: "highway",
            value: "cycleway",
            speed_kmph: 20.0,
        },
        RoadSpeed {
            key: "highway",
            value: "primary",
            speed_kmph: 16.0,
        },
        RoadSpeed {
            key: "highway",
            value: "secondary",
            speed_kmph: 17.0,
        },
        RoadSpeed {
            key: "highway",
            value: "tertiary",
            speed_kmph: 18.0,
        },
        RoadSpeed {
            key: "highway",
            value: "unclassified",
            speed_kmph: 18.0,
        },
        RoadSpeed {
            key: "highway",
            value: "residential",
            speed_kmph: 18.0,
        },
        RoadSpeed {
            key: "highway",
            value: "living_street",
            speed_kmph: 14.0,
        },
        RoadSpeed {
            key: "highway",
            value: "service",
            speed_kmph: 14.0,
        },
        RoadSpeed {
            key: "highway",
            value: "track",
            speed_kmph: 12.0,
        },
        RoadSpeed {
            key: "highway",
            value: "path",
            speed_kmph: 12.0,
        },
    ],
    access: &["access", "vehicle", "bicycle"],
    disallow_motorroad: true,
    disable_restrictions: false,
    follow_maxspeed: false,
};

/// [VehicleModel] for pedestrians.
pub const FOOT_MODEL: VehicleModel = VehicleModel {
    name: "foot",
    speeds: &[
        RoadSpeed {
            key: "highway",
            value: "pedestrian",
            speed_kmph: 5.0,
        },
        RoadSpeed {
            key: "highway",
            value: "footway",
            speed_kmph: 5.0,
        },
        RoadSpeed {
            key: "highway",
            value: "path",
            speed_kmph: 5.0,
        },
        RoadSpeed {
            key: "highway",
            value: "steps",
            speed_kmph: 2.0,
        },
        RoadSpeed {
            key: "highway",
            value: "living_street",
            speed_kmph: 5.0,
        },
        RoadSpeed {
            key: "highway",
            value: "residential",
            speed_kmph: 5.0,
        },
        RoadSpeed {
            key: "highway",
            value: "service",
            speed_kmph: 5.0,
        },
        RoadSpeed {
            key: "highway",
            value: "track",
            speed_kmph: 4.5,
        },
        RoadSpeed {
            key: "highway",
            value: "unclassified",
            speed_kmph: 4.5,
        },
        RoadSpeed {
            key: "highway",
            value: "tertiary",
            speed_kmph: 4.5,
        },
    ],
    access: &["access", "foot"],
    disallow_motorroad: true,
    disable_restrictions: false,
    follow_maxspeed: false,
};
