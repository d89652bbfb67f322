use std::fmt::Write as _;

use anyhow::Context;

use crate::join::{JoinedView, join_tables};
use crate::optimize;
use crate::tables::Tables;

/// `panel` subcommand: the joined view as a fixed-width text table.
pub fn run_panel() -> anyhow::Result<()> {
    let tables = Tables::seed();
    let view = join_tables(&tables);
    print!("{}", render_panel(&view, None));
    Ok(())
}

/// `solve` subcommand: one redistribution pass over the seed tables.
pub fn run_solve() -> anyhow::Result<()> {
    let tables = Tables::seed();
    let view = join_tables(&tables);
    let optimized = optimize::solve(&view).context("re-optimization failed")?;
    let sessions: Vec<f64> = optimized.iter().map(|r| r.optimized_sessions).collect();
    print!("{}", render_panel(&view, Some(&sessions)));
    Ok(())
}

fn render_panel(view: &JoinedView, optimized: Option<&[f64]>) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{:<6} {:>7} {:>5} {:<9} {:<12} {:>4} {:>5} {:>5} {:>6} {:>5} {:>6}",
        "Group", "Volume", "Lead", "Provider", "Subspecialty", "Max", "Util", "Over", "Hours",
        "Down", "Staff"
    );
    if optimized.is_some() {
        let _ = write!(out, " {:>10}", "Optimized");
    }
    out.push('\n');

    for (i, row) in view.rows.iter().enumerate() {
        let _ = write!(
            out,
            "{:<6} {:>7} {:>5} {:<9} {:<12} {:>4} {:>5} {:>5} {:>6} {:>5} {:>6}",
            row.patient_group,
            row.volume_of_requests,
            row.lead_time,
            row.provider,
            row.subspecialty.to_string(),
            row.max_sessions,
            row.current_utilization,
            row.overbooked_sessions,
            row.operating_hours,
            row.downtime,
            row.support_staff
        );
        if let Some(sessions) = optimized {
            let _ = write!(out, " {:>10.2}", sessions[i]);
        }
        out.push('\n');
    }

    for drop in &view.dropped {
        let _ = writeln!(
            out,
            "dropped: {} / {} ({}): no match in {}",
            drop.patient_group, drop.provider, drop.subspecialty, drop.missing_in
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_renders_one_line_per_joined_row_plus_header() {
        let tables = Tables::seed();
        let view = join_tables(&tables);
        let rendered = render_panel(&view, None);
        assert_eq!(rendered.lines().count(), view.rows.len() + 1);
        assert!(rendered.contains("Cardiology"));
    }

    #[test]
    fn solve_rendering_appends_an_optimized_column() {
        let tables = Tables::seed();
        let view = join_tables(&tables);
        let sessions = vec![0.0; view.rows.len()];
        let rendered = render_panel(&view, Some(&sessions));
        assert!(rendered.lines().next().unwrap().contains("Optimized"));
        assert!(rendered.contains("0.00"));
    }
}
