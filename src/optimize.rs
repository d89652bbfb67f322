use std::collections::BTreeMap;

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, constraint,
    default_solver, variable,
};
use serde::Serialize;
use thiserror::Error;

use crate::join::JoinedView;
use crate::tables::Subspecialty;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("optimization is infeasible: session limits, overbooked backlog, and provider hours cannot all be satisfied")]
    Infeasible,
    #[error("optimization is unbounded")]
    Unbounded,
    #[error("nothing to optimize: the joined view has no rows")]
    NothingToOptimize,
    #[error("solver failed: {0}")]
    Solver(String),
}

impl SolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            SolveError::Infeasible => "infeasible",
            SolveError::Unbounded => "unbounded",
            SolveError::NothingToOptimize => "empty",
            SolveError::Solver(_) => "solver",
        }
    }
}

/// Per-row result, aligned 1:1 with the joined view's rows.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedRow {
    pub patient_group: String,
    pub provider: String,
    pub subspecialty: Subspecialty,
    pub optimized_sessions: f64,
}

/// Redistribute sessions across the joined view with a linear program.
///
/// One variable per joined row (sessions assigned to that (group, provider,
/// subspecialty) combination), bounded by the row's own limit. Per patient
/// group, assigned sessions stay within the group's total limit and cover its
/// overbooked backlog; per (provider, subspecialty), they stay within
/// operating hours net of downtime. The objective weights each session by the
/// group's volume of requests, so the solver favors the busiest groups.
pub fn solve(view: &JoinedView) -> Result<Vec<OptimizedRow>, SolveError> {
    if view.rows.is_empty() {
        return Err(SolveError::NothingToOptimize);
    }

    let mut vars = ProblemVariables::new();
    let xs: Vec<_> = view
        .rows
        .iter()
        .map(|row| vars.add(variable().min(0.0).max(row.max_sessions as f64)))
        .collect();

    let mut objective = Expression::default();
    for (row, &x) in view.rows.iter().zip(&xs) {
        objective += row.volume_of_requests as f64 * x;
    }

    // Group and provider-pair aggregates over the same variables.
    let mut by_group: BTreeMap<&str, (Expression, f64, f64)> = BTreeMap::new();
    let mut by_pair: BTreeMap<(&str, Subspecialty), (Expression, f64)> = BTreeMap::new();
    for (row, &x) in view.rows.iter().zip(&xs) {
        let group = by_group
            .entry(row.patient_group.as_str())
            .or_insert_with(|| (Expression::default(), 0.0, 0.0));
        group.0 += x;
        group.1 += row.max_sessions as f64;
        group.2 += row.overbooked_sessions as f64;

        let pair = by_pair
            .entry((row.provider.as_str(), row.subspecialty))
            .or_insert_with(|| {
                (
                    Expression::default(),
                    row.operating_hours as f64 - row.downtime as f64,
                )
            });
        pair.0 += x;
    }

    let mut model = vars.maximise(objective).using(default_solver);
    for (_, (total, cap, floor)) in by_group {
        model = model.with(constraint!(total.clone() <= cap));
        if floor > 0.0 {
            model = model.with(constraint!(total >= floor));
        }
    }
    for (_, (total, capacity)) in by_pair {
        model = model.with(constraint!(total <= capacity));
    }

    let solution = match model.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => return Err(SolveError::Infeasible),
        Err(ResolutionError::Unbounded) => return Err(SolveError::Unbounded),
        Err(other) => return Err(SolveError::Solver(other.to_string())),
    };

    Ok(view
        .rows
        .iter()
        .zip(&xs)
        .map(|(row, &x)| OptimizedRow {
            patient_group: row.patient_group.clone(),
            provider: row.provider.clone(),
            subspecialty: row.subspecialty,
            optimized_sessions: solution.value(x),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::join_tables;
    use crate::tables::Tables;

    const EPS: f64 = 1e-6;

    #[test]
    fn seed_solution_respects_all_caps_and_floors() {
        let tables = Tables::seed();
        let view = join_tables(&tables);
        let rows = solve(&view).unwrap();

        assert_eq!(rows.len(), view.rows.len());
        for r in &rows {
            assert!(r.optimized_sessions >= -EPS, "negative sessions for {r:?}");
        }

        let mut group_sums: BTreeMap<&str, f64> = BTreeMap::new();
        let mut group_caps: BTreeMap<&str, f64> = BTreeMap::new();
        let mut group_floors: BTreeMap<&str, f64> = BTreeMap::new();
        let mut pair_sums: BTreeMap<(&str, Subspecialty), f64> = BTreeMap::new();
        for (joined, opt) in view.rows.iter().zip(&rows) {
            *group_sums.entry(joined.patient_group.as_str()).or_default() +=
                opt.optimized_sessions;
            *group_caps.entry(joined.patient_group.as_str()).or_default() +=
                joined.max_sessions as f64;
            *group_floors.entry(joined.patient_group.as_str()).or_default() +=
                joined.overbooked_sessions as f64;
            *pair_sums
                .entry((joined.provider.as_str(), joined.subspecialty))
                .or_default() += opt.optimized_sessions;
        }

        for (group, sum) in &group_sums {
            assert!(*sum <= group_caps[group] + EPS);
            assert!(*sum >= group_floors[group] - EPS);
        }
        for (joined, _) in view.rows.iter().zip(&rows) {
            let capacity = joined.operating_hours as f64 - joined.downtime as f64;
            let sum = pair_sums[&(joined.provider.as_str(), joined.subspecialty)];
            assert!(sum <= capacity + EPS, "pair over capacity: {sum} > {capacity}");
        }
    }

    #[test]
    fn seed_solution_assigns_something() {
        let tables = Tables::seed();
        let view = join_tables(&tables);
        let rows = solve(&view).unwrap();
        let total: f64 = rows.iter().map(|r| r.optimized_sessions).sum();
        assert!(total > 1.0, "expected a non-trivial assignment, got {total}");
    }

    #[test]
    fn zeroed_limits_with_overbooked_backlog_report_infeasible() {
        let mut tables = Tables::seed();
        // Group B carries one overbooked session; a zero limit cannot seat it.
        tables
            .update_session_limit("B", "P2", Subspecialty::Neurology, 0)
            .unwrap();
        tables
            .update_session_limit("B", "P2", Subspecialty::Orthopedics, 0)
            .unwrap();

        let view = join_tables(&tables);
        let err = solve(&view).unwrap_err();
        assert!(matches!(err, SolveError::Infeasible), "got {err:?}");
    }

    #[test]
    fn empty_view_is_reported_not_solved() {
        let view = JoinedView {
            rows: Vec::new(),
            dropped: Vec::new(),
        };
        let err = solve(&view).unwrap_err();
        assert!(matches!(err, SolveError::NothingToOptimize));
    }
}
