//! Accident cost formulas and the registry that resolves them by name.

use std::collections::BTreeMap;

use accidents_costing_models::{BVWP_METHOD, LinkClassification};
use accidents_network_models::Link;

use crate::AccidentError;

/// Turns demand on a link in one time bin into an accident cost.
pub trait CostFormula: Send + Sync {
    /// Name the formula is registered under (matched exactly).
    fn name(&self) -> &str;

    /// Cost in EUR for `demand` vehicles (already upscaled) traversing
    /// `link`.
    fn compute_cost(&self, demand: f64, link: &Link, classification: &LinkClassification) -> f64;
}

/// Accident cost rates in EUR per 1000 vehicle-km, indexed
/// `[road geometry][lane class - 1][area type]`.
const BVWP_COST_RATES: [[[f64; 4]; 4]; 3] = [
    // plan-free
    [
        [0.0, 0.0, 0.0, 0.0],
        [23.165, 23.165, 0.0, 0.0],
        [23.79, 23.79, 0.0, 0.0],
        [23.79, 23.79, 0.0, 0.0],
    ],
    // plan-equal
    [
        [61.785, 101.2, 61.785, 101.2],
        [31.63, 101.53, 31.63, 101.53],
        [37.84, 82.62, 34.735, 101.53],
        [0.0, 0.0, 0.0, 101.53],
    ],
    // tunnel
    [
        [9.56, 15.09, 9.56, 15.09],
        [9.56, 15.09, 9.56, 15.09],
        [9.56, 15.09, 9.56, 15.09],
        [9.56, 15.09, 9.56, 15.09],
    ],
];

/// The German federal transport plan (BVWP) accident cost model:
/// `rate * vehicle-km / 1000`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BvwpFormula;

impl BvwpFormula {
    /// Cost rate in EUR per 1000 vehicle-km for a classification.
    #[must_use]
    pub const fn cost_rate(classification: &LinkClassification) -> f64 {
        let geometry = classification.road_geometry.code() as usize;
        let lanes = (classification.lanes.value() - 1) as usize;
        let area = classification.area_type.code() as usize;
        BVWP_COST_RATES[geometry][lanes][area]
    }
}

impl CostFormula for BvwpFormula {
    fn name(&self) -> &str {
        BVWP_METHOD
    }

    fn compute_cost(&self, demand: f64, link: &Link, classification: &LinkClassification) -> f64 {
        let rate = Self::cost_rate(classification);

        if rate == 0.0 && demand > 0.0 {
            log::warn!(
                "Link {} has no accident cost rate for classification {classification}",
                link.id
            );
        }

        let vehicle_km = demand * link.length / 1000.0;
        rate * vehicle_km / 1000.0
    }
}

/// Cost formulas keyed by method name.
pub struct CostFormulaRegistry {
    formulas: BTreeMap<String, Box<dyn CostFormula>>,
}

impl CostFormulaRegistry {
    /// A registry with no formulas.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            formulas: BTreeMap::new(),
        }
    }

    /// Adds a formula, replacing any formula with the same name.
    pub fn register(&mut self, formula: Box<dyn CostFormula>) {
        self.formulas.insert(formula.name().to_string(), formula);
    }

    /// Looks up a formula by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`AccidentError::UnknownComputationMethod`] if no formula is
    /// registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<&dyn CostFormula, AccidentError> {
        self.formulas
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| AccidentError::UnknownComputationMethod(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formulas.keys().map(String::as_str)
    }
}

impl Default for CostFormulaRegistry {
    /// Registers [`BvwpFormula`].
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(BvwpFormula));
        registry
    }
}

impl std::fmt::Debug for CostFormulaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use accidents_costing_models::{AreaType, LaneClass, RoadGeometry};
    use accidents_network_models::{Coord, LinkId, Node, NodeId};

    use super::*;

    fn link(length: f64) -> Link {
        Link {
            id: LinkId::from("l"),
            from: Node {
                id: NodeId::from("a"),
                coord: Coord::new(0.0, 0.0),
            },
            to: Node {
                id: NodeId::from("b"),
                coord: Coord::new(length, 0.0),
            },
            length,
            freespeed: 30.0,
            lanes: 2.0,
        }
    }

    fn classification(
        road_geometry: RoadGeometry,
        area_type: AreaType,
        lanes: u8,
    ) -> LinkClassification {
        LinkClassification {
            road_geometry,
            area_type,
            lanes: LaneClass::from_lanes(f64::from(lanes)),
        }
    }

    #[test]
    fn cost_rates_follow_table_indices() {
        let built_up = classification(RoadGeometry::PlanEqual, AreaType::BuiltUpExpressway, 2);
        assert!((BvwpFormula::cost_rate(&built_up) - 101.53).abs() < 1e-12);

        let single_lane = classification(RoadGeometry::PlanFree, AreaType::NonBuiltUpExpressway, 1);
        assert!(BvwpFormula::cost_rate(&single_lane).abs() < f64::EPSILON);

        let wide = classification(RoadGeometry::PlanEqual, AreaType::NonBuiltUpOther, 3);
        assert!((BvwpFormula::cost_rate(&wide) - 34.735).abs() < 1e-12);

        let tunnel = classification(RoadGeometry::Tunnel, AreaType::BuiltUpOther, 4);
        assert!((BvwpFormula::cost_rate(&tunnel) - 15.09).abs() < 1e-12);
    }

    #[test]
    fn bvwp_cost_scales_with_demand_and_length() {
        let class = classification(RoadGeometry::PlanEqual, AreaType::BuiltUpExpressway, 2);
        let cost = BvwpFormula.compute_cost(100.0, &link(1000.0), &class);
        // 100 vehicles * 1 km = 100 vehicle-km at 101.53 EUR per 1000.
        assert!((cost - 10.153).abs() < 1e-9);

        let doubled = BvwpFormula.compute_cost(200.0, &link(1000.0), &class);
        assert!((doubled - 2.0 * cost).abs() < 1e-9);
    }

    #[test]
    fn nan_lane_count_uses_single_lane_rate() {
        let nan_lanes = LinkClassification {
            road_geometry: RoadGeometry::PlanEqual,
            area_type: AreaType::BuiltUpOther,
            lanes: LaneClass::from_lanes(f64::NAN),
        };
        let single_lane = classification(RoadGeometry::PlanEqual, AreaType::BuiltUpOther, 1);
        assert!(
            (BvwpFormula::cost_rate(&nan_lanes) - BvwpFormula::cost_rate(&single_lane)).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn zero_demand_costs_nothing() {
        let class = classification(RoadGeometry::PlanEqual, AreaType::BuiltUpOther, 1);
        assert!(BvwpFormula.compute_cost(0.0, &link(500.0), &class).abs() < f64::EPSILON);
    }

    #[test]
    fn default_registry_resolves_bvwp_only() {
        let registry = CostFormulaRegistry::default();
        assert_eq!(registry.resolve("BVWP").unwrap().name(), "BVWP");
        assert!(matches!(
            registry.resolve("bvwp"),
            Err(AccidentError::UnknownComputationMethod(name)) if name == "bvwp"
        ));
        assert!(matches!(
            registry.resolve(""),
            Err(AccidentError::UnknownComputationMethod(_))
        ));
    }

    #[test]
    fn custom_formula_can_be_registered() {
        struct Flat;

        impl CostFormula for Flat {
            fn name(&self) -> &str {
                "FLAT"
            }

            fn compute_cost(&self, demand: f64, _: &Link, _: &LinkClassification) -> f64 {
                demand
            }
        }

        let mut registry = CostFormulaRegistry::default();
        registry.register(Box::new(Flat));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["BVWP", "FLAT"]);

        let class = classification(RoadGeometry::PlanEqual, AreaType::BuiltUpOther, 1);
        let cost = registry
            .resolve("FLAT")
            .unwrap()
            .compute_cost(7.0, &link(10.0), &class);
        assert!((cost - 7.0).abs() < f64::EPSILON);
    }
}
