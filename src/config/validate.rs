// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{GraphError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_agents(cfg)?;
    validate_run_section(cfg)?;
    validate_graph_section(cfg)?;
    warn_on_spatial_cycle(cfg);
    Ok(())
}

fn ensure_has_agents(cfg: &RawConfigFile) -> Result<()> {
    if cfg.agents.is_empty() {
        return Err(GraphError::Config(
            "config must contain at least one [[agent]] section".to_string(),
        ));
    }
    for (i, agent) in cfg.agents.iter().enumerate() {
        if agent.name.trim().is_empty() {
            return Err(GraphError::Config(format!("[[agent]] #{i} has an empty name")));
        }
    }
    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.rounds == 0 {
        return Err(GraphError::Config(
            "[run].rounds must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.run.max_tries == 0 {
        return Err(GraphError::Config(
            "[run].max_tries must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_graph_section(cfg: &RawConfigFile) -> Result<()> {
    let graph = &cfg.graph;
    let n = cfg.agents.len();

    if graph.decision.trim().is_empty() {
        return Err(GraphError::Config("[graph].decision must not be empty".to_string()));
    }

    let has_masks = graph.spatial_mask.is_some() && graph.temporal_mask.is_some();
    if graph.mode.is_none() && !has_masks {
        return Err(GraphError::Config(
            "[graph] needs a `mode` preset or both `spatial_mask` and `temporal_mask`".to_string(),
        ));
    }

    if let Some(threshold) = graph.prune_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GraphError::Config(format!(
                "[graph].prune_threshold must be within [0, 1] (got {threshold})"
            )));
        }
        if graph.spatial_logits.is_none() {
            warn!("[graph].prune_threshold has no effect without spatial_logits");
        }
    }

    // Dimensions, 0/1 entries and the diagonal are checked on the
    // materialised topology.
    let topology = graph
        .topology(n)
        .map_err(|e| GraphError::Config(format!("[graph]: {e}")))?;
    topology
        .validate_for(n)
        .map_err(|e| GraphError::Config(format!("[graph]: {e}")))?;

    Ok(())
}

/// An explicit spatial mask may legally contain a cycle; the connection
/// builder drops the closing edge. Say so up front.
fn warn_on_spatial_cycle(cfg: &RawConfigFile) {
    let Some(ref rows) = cfg.graph.spatial_mask else {
        return;
    };

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..rows.len() {
        graph.add_node(i);
    }
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            if v == 1 && i != j {
                graph.add_edge(i, j, ());
            }
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        warn!(
            unit_index = cycle.node_id(),
            "spatial_mask contains a cycle; the edge closing it will be dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::AgentConfig;
    use crate::graph::topology::TopologyMode;

    fn raw(n: usize) -> RawConfigFile {
        let mut cfg = RawConfigFile::default();
        cfg.agents = (0..n)
            .map(|_| AgentConfig {
                name: "MathSolver".to_string(),
                role: None,
                id: None,
            })
            .collect();
        cfg.graph.mode = Some(TopologyMode::Chain);
        cfg
    }

    #[test]
    fn accepts_preset_only_config() {
        assert!(ConfigFile::try_from(raw(3)).is_ok());
    }

    #[test]
    fn rejects_missing_agents_and_zero_counts() {
        assert!(ConfigFile::try_from(raw(0)).is_err());

        let mut cfg = raw(2);
        cfg.run.max_tries = 0;
        assert!(matches!(ConfigFile::try_from(cfg), Err(GraphError::Config(_))));

        let mut cfg = raw(2);
        cfg.run.rounds = 0;
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn rejects_missing_topology_source() {
        let mut cfg = raw(2);
        cfg.graph.mode = None;
        cfg.graph.spatial_mask = Some(vec![vec![0, 1], vec![0, 0]]);
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn rejects_bad_masks() {
        let mut cfg = raw(2);
        cfg.graph.spatial_mask = Some(vec![vec![0, 1, 0], vec![0, 0, 0], vec![0, 0, 0]]);
        assert!(ConfigFile::try_from(cfg).is_err());

        let mut cfg = raw(2);
        cfg.graph.spatial_mask = Some(vec![vec![1, 0], vec![0, 0]]);
        assert!(ConfigFile::try_from(cfg).is_err());

        let mut cfg = raw(2);
        cfg.graph.temporal_mask = Some(vec![vec![0, 3], vec![0, 0]]);
        assert!(ConfigFile::try_from(cfg).is_err());
    }

    #[test]
    fn cyclic_spatial_mask_is_accepted() {
        let mut cfg = raw(2);
        cfg.graph.spatial_mask = Some(vec![vec![0, 1], vec![1, 0]]);
        assert!(ConfigFile::try_from(cfg).is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold_and_bad_logits() {
        let mut cfg = raw(2);
        cfg.graph.prune_threshold = Some(1.5);
        assert!(ConfigFile::try_from(cfg).is_err());

        let mut cfg = raw(2);
        cfg.graph.spatial_logits = Some(vec![vec![0.0]]);
        assert!(ConfigFile::try_from(cfg).is_err());
    }
}
