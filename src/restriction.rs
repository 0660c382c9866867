// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::LatLon;

/// Turn restriction kind indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestrictionKind {
    /// Going from the `from` road onto the `to` road is prohibited.
    No,

    /// After using the `from` road, the `to` road is the only allowed continuation.
    Only,
}

/// Turn restriction between two roads of the same region, applying at the `via` point.
///
/// Without a via point, the turn is restricted where the `from` road meets the `to`
/// road, preferring the ends of the `from` road. Restrictions whose roads don't meet
/// (at `via`, if given) are dropped when building an [IndexGraph](crate::IndexGraph).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Restriction {
    pub kind: RestrictionKind,
    pub from: u32,
    pub to: u32,
    pub via: Option<LatLon>,
}

impl Restriction {
    #[inline]
    pub const fn new(kind: RestrictionKind, from: u32, to: u32) -> Self {
        Self {
            kind,
            from,
            to,
            via: None,
        }
    }

    #[inline]
    pub const fn no(from: u32, to: u32) -> Self {
        Self::new(RestrictionKind::No, from, to)
    }

    #[inline]
    pub const fn only(from: u32, to: u32) -> Self {
        Self::new(RestrictionKind::Only, from, to)
    }

    #[inline]
    pub const fn with_via(self, via: LatLon) -> Self {
        Self {
            via: Some(via),
            ..self
        }
    }
}
