//! Hybrid-solver configuration.
//!
//! Deserialized from the `hybrid` object of a configuration document.
//! Out-of-range knobs are clamped on ingest rather than rejected.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Valid time-integration orders for the external solver.
const TIME_ORDERS: [u32; 3] = [1, 2, 4];

/// Knobs for the Euler/Lagrangian exchange.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HybridConfig {
    /// Whether the hybrid scheme runs at all.
    pub enabled: bool,
    /// Spatial order of the external solver, clamped to `[1, 5]`.
    pub element_order: u32,
    /// Time order of the external solver: 1, 2, or 4.
    pub time_order: u32,
    /// Substeps per coupled step, clamped to `[1, 1000]`.
    pub num_substeps: u32,
    /// Preconditioner name; `"none"` is the only recognized value.
    pub preconditioner: String,
    /// Linear solver name; `"fgmres"` is the only recognized value.
    pub solver_type: String,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            element_order: 1,
            time_order: 1,
            num_substeps: 100,
            preconditioner: "none".to_string(),
            solver_type: "fgmres".to_string(),
        }
    }
}

impl HybridConfig {
    /// Parse from a JSON document holding a top-level `hybrid` object;
    /// absent keys fall back to defaults.
    pub fn from_json(doc: &serde_json::Value) -> Self {
        let cfg = match doc.get("hybrid") {
            Some(h) => match serde_json::from_value::<HybridConfig>(h.clone()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(error = %e, "malformed hybrid configuration, using defaults");
                    HybridConfig::default()
                }
            },
            None => HybridConfig::default(),
        };
        cfg.clamped()
    }

    /// Serialize into the `hybrid` object of a configuration document.
    pub fn add_to_json(&self, doc: &mut serde_json::Value) {
        if let Some(map) = doc.as_object_mut() {
            map.insert(
                "hybrid".to_string(),
                serde_json::to_value(self).expect("hybrid config serializes"),
            );
        }
    }

    /// Clamp every knob into its valid range.
    pub fn clamped(mut self) -> Self {
        self.element_order = self.element_order.clamp(1, 5);
        self.num_substeps = self.num_substeps.clamp(1, 1000);
        if !TIME_ORDERS.contains(&self.time_order) {
            let nearest = *TIME_ORDERS
                .iter()
                .min_by_key(|&&t| t.abs_diff(self.time_order))
                .unwrap();
            warn!(
                requested = self.time_order,
                used = nearest,
                "unsupported time order"
            );
            self.time_order = nearest;
        }
        if self.preconditioner != "none" {
            warn!(requested = %self.preconditioner, "unknown preconditioner, using none");
            self.preconditioner = "none".to_string();
        }
        if self.solver_type != "fgmres" {
            warn!(requested = %self.solver_type, "unknown solver type, using fgmres");
            self.solver_type = "fgmres".to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HybridConfig::default();
        assert!(!cfg.enabled);
        assert_eq!(cfg.element_order, 1);
        assert_eq!(cfg.num_substeps, 100);
        assert_eq!(cfg.solver_type, "fgmres");
    }

    #[test]
    fn test_parse_and_clamp() {
        let doc: serde_json::Value = serde_json::from_str(
            r#"{
                "hybrid": {
                    "enabled": true,
                    "elementOrder": 9,
                    "timeOrder": 3,
                    "numSubsteps": 5000,
                    "preconditioner": "ilu",
                    "solverType": "fgmres"
                }
            }"#,
        )
        .unwrap();
        let cfg = HybridConfig::from_json(&doc);
        assert!(cfg.enabled);
        assert_eq!(cfg.element_order, 5);
        assert_eq!(cfg.time_order, 2);
        assert_eq!(cfg.num_substeps, 1000);
        assert_eq!(cfg.preconditioner, "none");
    }

    #[test]
    fn test_round_trip() {
        let cfg = HybridConfig {
            enabled: true,
            element_order: 3,
            ..Default::default()
        };
        let mut doc = serde_json::json!({});
        cfg.add_to_json(&mut doc);
        let back = HybridConfig::from_json(&doc);
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_missing_section_is_default() {
        let doc = serde_json::json!({ "simparams": {} });
        assert_eq!(HybridConfig::from_json(&doc), HybridConfig::default());
    }
}
