// src/graph/topology.rs

//! Topology descriptors.
//!
//! A [`Topology`] is plain data: two square binary masks (spatial and
//! temporal) where `mask[i][j]` means "unit i precedes unit j", plus optional
//! edge weights for the spatial mask. Named presets build the usual shapes.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::errors::{GraphError, Result};

/// Square binary adjacency matrix, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mask {
    rows: Vec<Vec<bool>>,
}

impl Mask {
    /// All-zero mask for `n` units.
    pub fn zeros(n: usize) -> Self {
        Self {
            rows: vec![vec![false; n]; n],
        }
    }

    /// All-one mask for `n` units (diagonal included).
    pub fn ones(n: usize) -> Self {
        Self {
            rows: vec![vec![true; n]; n],
        }
    }

    /// Build from a predicate over `(row, col)`.
    pub fn from_fn(n: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        Self {
            rows: (0..n).map(|i| (0..n).map(|j| f(i, j)).collect()).collect(),
        }
    }

    /// Parse 0/1 rows, checking the matrix is square.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let n = rows.len();
        let mut out = Vec::with_capacity(n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(GraphError::Topology(format!(
                    "mask row {i} has {} entries, expected {n}",
                    row.len()
                )));
            }
            let mut parsed = Vec::with_capacity(n);
            for (j, &v) in row.iter().enumerate() {
                match v {
                    0 => parsed.push(false),
                    1 => parsed.push(true),
                    other => {
                        return Err(GraphError::Topology(format!(
                            "mask entry [{i}][{j}] is {other}, expected 0 or 1"
                        )));
                    }
                }
            }
            out.push(parsed);
        }
        Ok(Self { rows: out })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.rows
            .get(i)
            .and_then(|r| r.get(j))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, i: usize, j: usize, value: bool) {
        if let Some(cell) = self.rows.get_mut(i).and_then(|r| r.get_mut(j)) {
            *cell = value;
        }
    }

    /// Set `(i, j)` pairs in row-major order.
    pub fn ones_iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| v)
                .map(move |(j, _)| (i, j))
        })
    }

    pub fn has_zero_diagonal(&self) -> bool {
        (0..self.size()).all(|i| !self.get(i, i))
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows
            .iter()
            .map(|r| r.iter().map(|&b| u8::from(b)).collect())
            .collect()
    }
}

/// Explicit logits for soft pruning of spatial edges.
///
/// A masked edge `(i, j)` is kept when `sigmoid(logits[i][j]) >= threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeWeights {
    pub logits: Vec<Vec<f64>>,
    pub threshold: f64,
}

impl EdgeWeights {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;

    pub fn new(logits: Vec<Vec<f64>>) -> Self {
        Self {
            logits,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Keep-probability of edge `(i, j)`; missing entries count as certain.
    pub fn probability(&self, i: usize, j: usize) -> f64 {
        match self.logits.get(i).and_then(|r| r.get(j)) {
            Some(&logit) => 1.0 / (1.0 + (-logit).exp()),
            None => 1.0,
        }
    }

    fn is_square(&self, n: usize) -> bool {
        self.logits.len() == n && self.logits.iter().all(|r| r.len() == n)
    }
}

/// Topology descriptor for one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub spatial: Mask,
    pub temporal: Mask,
    pub weights: Option<EdgeWeights>,
}

impl Topology {
    pub fn new(spatial: Mask, temporal: Mask) -> Self {
        Self {
            spatial,
            temporal,
            weights: None,
        }
    }

    /// Parse both masks from 0/1 rows.
    pub fn from_rows(spatial: &[Vec<u8>], temporal: &[Vec<u8>]) -> Result<Self> {
        Ok(Self::new(Mask::from_rows(spatial)?, Mask::from_rows(temporal)?))
    }

    pub fn with_weights(mut self, weights: EdgeWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn size(&self) -> usize {
        self.spatial.size()
    }

    /// Check the descriptor fits a graph of `units` units.
    pub fn validate_for(&self, units: usize) -> Result<()> {
        if self.spatial.size() != units {
            return Err(GraphError::Topology(format!(
                "spatial mask is {0}x{0} but the graph has {units} units",
                self.spatial.size()
            )));
        }
        if self.temporal.size() != units {
            return Err(GraphError::Topology(format!(
                "temporal mask is {0}x{0} but the graph has {units} units",
                self.temporal.size()
            )));
        }
        if !self.spatial.has_zero_diagonal() {
            return Err(GraphError::Topology(
                "spatial mask diagonal must be zero (a unit cannot precede itself)".to_string(),
            ));
        }
        if let Some(ref w) = self.weights {
            if !w.is_square(units) {
                return Err(GraphError::Topology(format!(
                    "spatial logits must be {units}x{units}"
                )));
            }
        }
        Ok(())
    }

    /// Build a named preset for `n` units.
    ///
    /// `seed` only affects [`TopologyMode::Random`].
    pub fn preset(mode: TopologyMode, n: usize, seed: Option<u64>) -> Self {
        match mode {
            TopologyMode::Debate => Self::new(Mask::zeros(n), Mask::ones(n)),
            TopologyMode::FullConnected => {
                Self::new(Mask::from_fn(n, |i, j| i != j), Mask::ones(n))
            }
            TopologyMode::Random => {
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::from_entropy(),
                };
                let mut spatial = Mask::zeros(n);
                let mut temporal = Mask::zeros(n);
                for i in 0..n {
                    for j in 0..n {
                        if i != j {
                            spatial.set(i, j, rng.gen_bool(0.5));
                        }
                        temporal.set(i, j, rng.gen_bool(0.5));
                    }
                }
                Self::new(spatial, temporal)
            }
            TopologyMode::Layered => Self::new(layered_mask(n, 2), Mask::ones(n)),
            TopologyMode::Mesh => Self::new(Mask::from_fn(n, |i, j| j > i), Mask::ones(n)),
            TopologyMode::Star => {
                Self::new(Mask::from_fn(n, |i, j| i == 0 && j != 0), Mask::ones(n))
            }
            TopologyMode::Chain => Self::new(
                Mask::from_fn(n, |i, j| j == i + 1),
                Mask::from_fn(n, |i, j| n > 1 && i == n - 1 && j == 0),
            ),
            TopologyMode::DirectAnswer => Self::new(Mask::zeros(n), Mask::zeros(n)),
        }
    }
}

/// Split `n` units into `layers` consecutive layers (earlier layers take the
/// remainder) and connect every unit to every unit of the next layer.
fn layered_mask(n: usize, layers: usize) -> Mask {
    let layers = layers.max(1);
    let base = n / layers;
    let remainder = n % layers;
    let mut layer_of = Vec::with_capacity(n);
    for layer in 0..layers {
        let size = base + usize::from(layer < remainder);
        layer_of.extend(std::iter::repeat_n(layer, size));
    }
    Mask::from_fn(n, |i, j| layer_of[j] == layer_of[i] + 1)
}

/// Named topology shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TopologyMode {
    /// No spatial edges; every unit hears every unit of the previous round.
    Debate,
    FullConnected,
    Random,
    /// Two layers; each unit feeds every unit of the next layer.
    Layered,
    /// Unit i precedes every unit j > i.
    Mesh,
    /// Unit 0 precedes all others.
    Star,
    /// i precedes i+1; the last unit feeds the first across rounds.
    Chain,
    DirectAnswer,
}

impl FromStr for TopologyMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalised.as_str() {
            "debate" => Ok(TopologyMode::Debate),
            "fullconnected" => Ok(TopologyMode::FullConnected),
            "random" => Ok(TopologyMode::Random),
            "layered" => Ok(TopologyMode::Layered),
            "mesh" => Ok(TopologyMode::Mesh),
            "star" => Ok(TopologyMode::Star),
            "chain" => Ok(TopologyMode::Chain),
            "directanswer" => Ok(TopologyMode::DirectAnswer),
            _ => Err(format!("invalid topology mode: {s}")),
        }
    }
}

impl TryFrom<String> for TopologyMode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TopologyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopologyMode::Debate => "debate",
            TopologyMode::FullConnected => "full_connected",
            TopologyMode::Random => "random",
            TopologyMode::Layered => "layered",
            TopologyMode::Mesh => "mesh",
            TopologyMode::Star => "star",
            TopologyMode::Chain => "chain",
            TopologyMode::DirectAnswer => "direct_answer",
        };
        f.write_str(name)
    }
}
