use crate::ParameterError;
use serde::{Deserialize, Serialize};

/// Configuration shared by every layout engine
///
/// Parameters are passed by value into each invocation, there is no global
/// layout state. Missing fields fall back to [`Default`] when deserializing,
/// so partial configuration files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParameters {
    /// Vertical distance between consecutive layers (layered, tree) or rings
    /// (radial)
    pub layer_spacing: f32,

    /// Horizontal gap between neighbouring nodes of the same layer
    pub node_spacing: f32,

    /// Strength of the pairwise repulsion in the force simulation
    pub repulsion_strength: f32,

    /// Strength of the logarithmic spring along edges
    pub attraction_strength: f32,

    /// Rest length of the edge springs
    pub ideal_edge_length: f32,

    /// Velocity multiplier applied every integration step
    pub damping: f32,

    /// Integration time step
    pub time_step: f32,

    /// Force simulation rounds per coarsening level
    pub max_iterations_per_level: usize,

    /// Forward+backward barycenter sweeps for crossing minimization
    pub max_crossing_iterations: usize,

    /// Rounds of neighbour alignment after the layered coordinates are set.
    /// Zero keeps plain centered rows.
    pub alignment_iterations: usize,

    /// Levels with at most this many nodes are not coarsened further
    pub coarsening_threshold: usize,

    /// Coarsening stops once a pass keeps more than this fraction of nodes
    pub coarsening_ratio: f32,

    /// Geometric cooling factor of the simulation temperature
    pub cooling_rate: f32,

    /// Floor of the simulation temperature
    pub min_temperature: f32,

    /// Above this node count the force engine switches to a single level,
    /// edge-local simulation
    pub large_graph_threshold: usize,

    /// Seed for every random choice made by the engines
    pub seed: u64,
}

impl Default for LayoutParameters {
    fn default() -> Self {
        Self {
            layer_spacing: 80.0,
            node_spacing: 40.0,
            repulsion_strength: 1000.0,
            attraction_strength: 1.0,
            ideal_edge_length: 100.0,
            damping: 0.9,
            time_step: 1.0,
            max_iterations_per_level: 300,
            max_crossing_iterations: 24,
            alignment_iterations: 0,
            coarsening_threshold: 16,
            coarsening_ratio: 0.9,
            cooling_rate: 0.95,
            min_temperature: 0.05,
            large_graph_threshold: 1000,
            seed: 0,
        }
    }
}

impl LayoutParameters {
    pub fn with_layer_spacing(mut self, layer_spacing: f32) -> Self {
        self.layer_spacing = layer_spacing;
        self
    }

    pub fn with_node_spacing(mut self, node_spacing: f32) -> Self {
        self.node_spacing = node_spacing;
        self
    }

    pub fn with_repulsion_strength(mut self, repulsion_strength: f32) -> Self {
        self.repulsion_strength = repulsion_strength;
        self
    }

    pub fn with_attraction_strength(mut self, attraction_strength: f32) -> Self {
        self.attraction_strength = attraction_strength;
        self
    }

    pub fn with_ideal_edge_length(mut self, ideal_edge_length: f32) -> Self {
        self.ideal_edge_length = ideal_edge_length;
        self
    }

    pub fn with_max_iterations_per_level(mut self, iterations: usize) -> Self {
        self.max_iterations_per_level = iterations;
        self
    }

    pub fn with_max_crossing_iterations(mut self, iterations: usize) -> Self {
        self.max_crossing_iterations = iterations;
        self
    }

    pub fn with_alignment_iterations(mut self, iterations: usize) -> Self {
        self.alignment_iterations = iterations;
        self
    }

    pub fn with_coarsening(mut self, threshold: usize, ratio: f32) -> Self {
        self.coarsening_threshold = threshold;
        self.coarsening_ratio = ratio;
        self
    }

    pub fn with_large_graph_threshold(mut self, threshold: usize) -> Self {
        self.large_graph_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that every field is within its accepted range
    ///
    /// # Errors
    /// Returns the first offending field
    pub fn validate(&self) -> Result<(), ParameterError> {
        non_negative("layer_spacing", self.layer_spacing)?;
        non_negative("node_spacing", self.node_spacing)?;
        non_negative("repulsion_strength", self.repulsion_strength)?;
        non_negative("attraction_strength", self.attraction_strength)?;
        positive("ideal_edge_length", self.ideal_edge_length)?;
        positive("time_step", self.time_step)?;
        non_negative("min_temperature", self.min_temperature)?;
        unit_interval("damping", self.damping, true)?;
        unit_interval("cooling_rate", self.cooling_rate, true)?;
        unit_interval("coarsening_ratio", self.coarsening_ratio, false)?;
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError {
            name,
            reason: format!("expected a finite, non-negative value, got {value}"),
        })
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError {
            name,
            reason: format!("expected a finite, positive value, got {value}"),
        })
    }
}

fn unit_interval(name: &'static str, value: f32, inclusive: bool) -> Result<(), ParameterError> {
    let in_range = value > 0.0 && (value < 1.0 || (inclusive && value == 1.0));
    if in_range {
        Ok(())
    } else {
        let upper = if inclusive { "1]" } else { "1)" };
        Err(ParameterError {
            name,
            reason: format!("expected a value in (0, {upper}, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(LayoutParameters::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let params = LayoutParameters::default().with_ideal_edge_length(0.0);
        assert_eq!(params.validate().unwrap_err().name, "ideal_edge_length");

        let params = LayoutParameters::default().with_coarsening(10, 1.0);
        assert_eq!(params.validate().unwrap_err().name, "coarsening_ratio");

        let params = LayoutParameters {
            damping: f32::NAN,
            ..Default::default()
        };
        assert_eq!(params.validate().unwrap_err().name, "damping");

        let params = LayoutParameters::default().with_node_spacing(-1.0);
        assert_eq!(params.validate().unwrap_err().name, "node_spacing");
    }

    #[test]
    fn partial_configuration_uses_defaults() {
        let params: LayoutParameters =
            ron::from_str("(layer_spacing: 120.0, seed: 7)").unwrap();
        assert_eq!(params.layer_spacing, 120.0);
        assert_eq!(params.seed, 7);
        assert_eq!(params.node_spacing, LayoutParameters::default().node_spacing);
    }
}
