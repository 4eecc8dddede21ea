// src/graph/scheduler.rs

//! Per-round execution in spatial dependency order.
//!
//! One round:
//! - counts spatial predecessors of every unit
//! - seeds a FIFO ready queue with the units that have none, in creation order
//! - executes each ready unit with bounded retries
//! - decrements the in-degree of its spatial successors, queueing the ones
//!   that reach zero (successors outside the arena are skipped)
//! - snapshots every unit's memory once the queue drains
//!
//! Edges must already be materialised for the round; the executor never
//! mutates them.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::graph::arena::UnitArena;
use crate::graph::unit::{NeighbourInfo, Unit, UnitId};
use crate::types::{FailurePolicy, RunOptions};

/// What happened during one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundReport {
    pub round: usize,
    /// Units in the order they were executed.
    pub executed: Vec<UnitId>,
    /// Units that exhausted every attempt.
    pub failed: Vec<UnitId>,
    /// The unit processed last.
    pub last_unit: Option<UnitId>,
}

impl RoundReport {
    fn new(round: usize) -> Self {
        Self {
            round,
            ..Self::default()
        }
    }

    fn record(&mut self, id: &str, ok: bool) {
        self.executed.push(id.to_string());
        if !ok {
            self.failed.push(id.to_string());
        }
        self.last_unit = Some(id.to_string());
    }
}

/// Executes rounds over a [`UnitArena`] with fixed retry settings.
#[derive(Debug, Clone)]
pub struct RoundExecutor {
    max_tries: usize,
    retry_delay: Option<Duration>,
    failure_policy: FailurePolicy,
    concurrent_frontier: bool,
}

impl RoundExecutor {
    pub fn new(options: &RunOptions) -> Self {
        Self {
            max_tries: options.max_tries,
            retry_delay: options.retry_delay,
            failure_policy: options.failure_policy,
            concurrent_frontier: options.concurrent_frontier,
        }
    }

    /// Same settings, but one attempt and no delay.
    pub fn single_attempt(&self) -> Self {
        Self {
            max_tries: 1,
            retry_delay: None,
            ..self.clone()
        }
    }

    /// In-degree table and initial ready queue for the current edges.
    fn seed(arena: &UnitArena) -> (HashMap<UnitId, usize>, VecDeque<UnitId>) {
        let mut in_degree = HashMap::with_capacity(arena.len());
        let mut ready = VecDeque::new();
        for unit in arena.units() {
            let degree = unit.connections().spatial_predecessors.len();
            in_degree.insert(unit.id().to_string(), degree);
            if degree == 0 {
                ready.push_back(unit.id().to_string());
            }
        }
        (in_degree, ready)
    }

    /// Decrement successors of `id`, queueing those that become ready.
    fn release(
        arena: &UnitArena,
        id: &str,
        in_degree: &mut HashMap<UnitId, usize>,
        ready: &mut VecDeque<UnitId>,
    ) {
        let Some(unit) = arena.get(id) else {
            return;
        };
        for successor in &unit.connections().spatial_successors {
            // e.g. the decision unit
            let Some(degree) = in_degree.get_mut(successor) else {
                continue;
            };
            *degree = degree.saturating_sub(1);
            if *degree == 0 {
                ready.push_back(successor.clone());
            }
        }
    }

    fn finish(arena: &mut UnitArena, report: &RoundReport) {
        if report.executed.len() < arena.len() {
            // Only reachable if edges were wired outside the builder.
            warn!(
                round = report.round,
                executed = report.executed.len(),
                units = arena.len(),
                "some units never became ready this round"
            );
        }
        arena.snapshot_memory();
        info!(
            round = report.round,
            executed = report.executed.len(),
            failed = report.failed.len(),
            "round finished"
        );
    }

    /// Blocking round. Always drains the queue one unit at a time.
    pub fn run_round(&self, arena: &mut UnitArena, round: usize, input: &Value) -> RoundReport {
        info!(round, units = arena.len(), "round started");
        let mut report = RoundReport::new(round);
        let (mut in_degree, mut ready) = Self::seed(arena);

        while let Some(id) = ready.pop_front() {
            let Some(neighbours) = arena
                .get(&id)
                .map(|u| arena.collect_dependency_info(u.connections()))
            else {
                continue;
            };
            let Some(unit) = arena.get_mut(&id) else {
                continue;
            };
            let ok = self.execute_with_retries(unit, input, &neighbours);
            report.record(&id, ok);
            Self::release(arena, &id, &mut in_degree, &mut ready);
        }

        Self::finish(arena, &report);
        report
    }

    /// Non-blocking round.
    ///
    /// With `concurrent_frontier` the whole ready frontier runs at once;
    /// decrements are then applied in frontier order.
    pub async fn run_round_async(
        &self,
        arena: &mut UnitArena,
        round: usize,
        input: &Value,
    ) -> RoundReport {
        info!(round, units = arena.len(), concurrent = self.concurrent_frontier, "round started");
        let mut report = RoundReport::new(round);
        let (mut in_degree, mut ready) = Self::seed(arena);

        if !self.concurrent_frontier {
            while let Some(id) = ready.pop_front() {
                let Some(neighbours) = arena
                    .get(&id)
                    .map(|u| arena.collect_dependency_info(u.connections()))
                else {
                    continue;
                };
                let Some(unit) = arena.get_mut(&id) else {
                    continue;
                };
                let ok = self.execute_with_retries_async(unit, input, &neighbours).await;
                report.record(&id, ok);
                Self::release(arena, &id, &mut in_degree, &mut ready);
            }
        } else {
            while !ready.is_empty() {
                let frontier: Vec<UnitId> = ready.drain(..).collect();
                debug!(round, frontier = ?frontier, "executing frontier");

                // Frontier units share no spatial edge, so every dependency
                // is already final when the frontier starts.
                let infos: HashMap<UnitId, NeighbourInfo> = frontier
                    .iter()
                    .filter_map(|id| {
                        let unit = arena.get(id)?;
                        Some((id.clone(), arena.collect_dependency_info(unit.connections())))
                    })
                    .collect();

                let results: HashMap<UnitId, bool> = {
                    let tasks = arena.units_mut().filter_map(|unit| {
                        let neighbours = infos.get(unit.id())?;
                        Some(async move {
                            let id = unit.id().to_string();
                            let ok = self.execute_with_retries_async(unit, input, neighbours).await;
                            (id, ok)
                        })
                    });
                    join_all(tasks).await.into_iter().collect()
                };

                for id in &frontier {
                    let Some(&ok) = results.get(id) else {
                        continue;
                    };
                    report.record(id, ok);
                    Self::release(arena, id, &mut in_degree, &mut ready);
                }
            }
        }

        Self::finish(arena, &report);
        report
    }

    /// Run `unit` up to `max_tries` times. Returns whether an attempt
    /// succeeded.
    pub fn execute_with_retries(&self, unit: &mut Unit, input: &Value, neighbours: &NeighbourInfo) -> bool {
        let id = unit.id().to_string();
        let mut last_error = None;

        for attempt in 1..=self.max_tries {
            match unit.execute(input, neighbours) {
                Ok(outputs) => {
                    debug!(unit = %id, attempt, outputs = outputs.len(), "unit executed");
                    return true;
                }
                Err(err) => {
                    debug!(unit = %id, attempt, error = %err, "unit attempt failed");
                    last_error = Some(err);
                    if attempt < self.max_tries {
                        if let Some(delay) = self.retry_delay {
                            std::thread::sleep(delay);
                        }
                    }
                }
            }
        }

        self.give_up(unit, last_error);
        false
    }

    /// Non-blocking variant of [`RoundExecutor::execute_with_retries`].
    pub async fn execute_with_retries_async(
        &self,
        unit: &mut Unit,
        input: &Value,
        neighbours: &NeighbourInfo,
    ) -> bool {
        let id = unit.id().to_string();
        let mut last_error = None;

        for attempt in 1..=self.max_tries {
            match unit.execute_async(input, neighbours).await {
                Ok(outputs) => {
                    debug!(unit = %id, attempt, outputs = outputs.len(), "unit executed");
                    return true;
                }
                Err(err) => {
                    debug!(unit = %id, attempt, error = %err, "unit attempt failed");
                    last_error = Some(err);
                    if attempt < self.max_tries {
                        if let Some(delay) = self.retry_delay {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        self.give_up(unit, last_error);
        false
    }

    fn give_up(&self, unit: &mut Unit, last_error: Option<anyhow::Error>) {
        let message = last_error
            .map(|e| format!("{e:#}"))
            .unwrap_or_else(|| "unit was never attempted".to_string());
        warn!(
            unit = %unit.id(),
            role = %unit.role(),
            tries = self.max_tries,
            error = %message,
            "unit exhausted retries"
        );
        if self.failure_policy == FailurePolicy::Surface {
            unit.mark_failed(message);
        }
    }
}
