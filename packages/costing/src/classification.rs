//! Builds the static [`LinkClassification`] of a link.
//!
//! Road geometry comes from the configured override lists, the area type
//! from the land-use class found for the link plus its free speed, and the
//! lane class from its lane count.

use std::collections::BTreeSet;

use accidents_costing_models::{
    AccidentsConfig, AreaType, LaneClass, LinkClassification, RoadGeometry,
};
use accidents_network_models::{Link, LinkId};

/// Land-use classes counted as built-up area.
pub const BUILT_UP_LAND_USES: &[&str] = &[
    "commercial",
    "industrial",
    "recreation_ground",
    "residential",
    "retail",
];

/// Whether a land-use class counts as built-up. Exact, case-sensitive.
#[must_use]
pub fn is_built_up(land_use: &str) -> bool {
    BUILT_UP_LAND_USES.contains(&land_use)
}

/// Road geometry overrides from config.
///
/// A link on neither list is [`RoadGeometry::PlanEqual`]. A link on both
/// lists is a tunnel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLists {
    plan_free: BTreeSet<LinkId>,
    tunnel: BTreeSet<LinkId>,
}

impl OverrideLists {
    /// Builds the lists, warning about every id present on both.
    pub fn new<P, T>(plan_free: P, tunnel: T) -> Self
    where
        P: IntoIterator,
        P::Item: Into<LinkId>,
        T: IntoIterator,
        T::Item: Into<LinkId>,
    {
        let lists = Self {
            plan_free: plan_free.into_iter().map(Into::into).collect(),
            tunnel: tunnel.into_iter().map(Into::into).collect(),
        };

        for id in lists.plan_free.intersection(&lists.tunnel) {
            log::warn!(
                "Link {id} is listed as both plan-free and tunnel; treating it as a tunnel"
            );
        }

        lists
    }

    #[must_use]
    pub fn from_config(config: &AccidentsConfig) -> Self {
        Self::new(
            config.plan_free_link_ids.iter().map(String::as_str),
            config.tunnel_link_ids.iter().map(String::as_str),
        )
    }

    #[must_use]
    pub fn road_geometry(&self, link_id: &LinkId) -> RoadGeometry {
        if self.tunnel.contains(link_id) {
            RoadGeometry::Tunnel
        } else if self.plan_free.contains(link_id) {
            RoadGeometry::PlanFree
        } else {
            RoadGeometry::PlanEqual
        }
    }
}

/// Classifies one link.
///
/// `land_use` is the class of the land-use polygon found for the link, or
/// `None` when there is none; that case counts as not built-up.
#[must_use]
pub fn build_classification(
    link: &Link,
    overrides: &OverrideLists,
    land_use: Option<&str>,
) -> LinkClassification {
    let road_geometry = overrides.road_geometry(&link.id);
    let built_up = land_use.is_some_and(is_built_up);

    LinkClassification {
        road_geometry,
        area_type: AreaType::from_freespeed(built_up, link.freespeed),
        lanes: LaneClass::from_lanes(link.lanes),
    }
}
