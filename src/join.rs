use serde::Serialize;

use crate::tables::{Seasonality, Subspecialty, Tables};

/// One row of the merged panel view: a session-limit row widened with the
/// patient, provider, operational, and historical columns it joins to.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedRow {
    pub patient_group: String,
    pub volume_of_requests: u32,
    pub lead_time: u32,
    pub provider: String,
    pub subspecialty: Subspecialty,
    pub max_sessions: u32,
    pub current_utilization: u32,
    pub overbooked_sessions: u32,
    pub operating_hours: u32,
    pub downtime: u32,
    pub support_staff: u32,
    pub appointment_volume: u32,
    pub no_shows: u32,
    pub cancellations: u32,
    pub seasonality: Seasonality,
}

/// A session-limit row excluded from the view because one of the joins found
/// no matching key. `missing_in` names the first table that failed to match.
#[derive(Debug, Clone, Serialize)]
pub struct DroppedRow {
    pub patient_group: String,
    pub provider: String,
    pub subspecialty: Subspecialty,
    pub missing_in: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinedView {
    pub rows: Vec<JoinedRow>,
    pub dropped: Vec<DroppedRow>,
}

/// Sequential inner joins in the original order: patients -> session limits
/// -> providers -> operational -> historical. Inner-join semantics are kept
/// (a row missing a key anywhere is excluded), but every exclusion is logged
/// and reported instead of vanishing.
pub fn join_tables(tables: &Tables) -> JoinedView {
    let mut rows = Vec::with_capacity(tables.session_limits.len());
    let mut dropped = Vec::new();

    for limit in &tables.session_limits {
        let drop_from = |table: &'static str, dropped: &mut Vec<DroppedRow>| {
            tracing::warn!(
                patient_group = %limit.patient_group,
                provider = %limit.provider,
                subspecialty = %limit.subspecialty,
                table,
                "join dropped session-limit row: key not found"
            );
            dropped.push(DroppedRow {
                patient_group: limit.patient_group.clone(),
                provider: limit.provider.clone(),
                subspecialty: limit.subspecialty,
                missing_in: table,
            });
        };

        let Some(patient) = tables
            .patients
            .iter()
            .find(|p| p.patient_group == limit.patient_group)
        else {
            drop_from("patients", &mut dropped);
            continue;
        };

        if !tables
            .providers
            .iter()
            .any(|p| p.provider == limit.provider && p.subspecialty == limit.subspecialty)
        {
            drop_from("providers", &mut dropped);
            continue;
        }

        let Some(operational) = tables
            .operational
            .iter()
            .find(|o| o.provider == limit.provider && o.subspecialty == limit.subspecialty)
        else {
            drop_from("operational", &mut dropped);
            continue;
        };

        let Some(historical) = tables
            .historical
            .iter()
            .find(|h| h.patient_group == limit.patient_group)
        else {
            drop_from("historical", &mut dropped);
            continue;
        };

        rows.push(JoinedRow {
            patient_group: limit.patient_group.clone(),
            volume_of_requests: patient.volume_of_requests,
            lead_time: patient.lead_time,
            provider: limit.provider.clone(),
            subspecialty: limit.subspecialty,
            max_sessions: limit.max_sessions,
            current_utilization: limit.current_utilization,
            overbooked_sessions: limit.overbooked_sessions,
            operating_hours: operational.operating_hours,
            downtime: operational.downtime,
            support_staff: operational.support_staff,
            appointment_volume: historical.appointment_volume,
            no_shows: historical.no_shows,
            cancellations: historical.cancellations,
            seasonality: historical.seasonality,
        });
    }

    JoinedView { rows, dropped }
}
