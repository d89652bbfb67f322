use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subspecialty {
    Cardiology,
    Neurology,
    Orthopedics,
    Oncology,
}

impl Subspecialty {
    pub const ALL: [Subspecialty; 4] = [
        Subspecialty::Cardiology,
        Subspecialty::Neurology,
        Subspecialty::Orthopedics,
        Subspecialty::Oncology,
    ];
}

impl fmt::Display for Subspecialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Subspecialty::Cardiology => "Cardiology",
            Subspecialty::Neurology => "Neurology",
            Subspecialty::Orthopedics => "Orthopedics",
            Subspecialty::Oncology => "Oncology",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seasonality {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientGroupRow {
    pub patient_group: String,
    pub volume_of_requests: u32,
    pub lead_time: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderRow {
    pub provider: String,
    pub subspecialty: Subspecialty,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionLimitRow {
    pub patient_group: String,
    pub provider: String,
    pub subspecialty: Subspecialty,
    pub max_sessions: u32,
    pub current_utilization: u32,
    pub overbooked_sessions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationalRow {
    pub provider: String,
    pub subspecialty: Subspecialty,
    pub operating_hours: u32,
    pub downtime: u32,
    pub support_staff: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalRow {
    pub patient_group: String,
    pub appointment_volume: u32,
    pub no_shows: u32,
    pub cancellations: u32,
    pub seasonality: Seasonality,
}

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("no session-limit row for {patient_group} with {provider} ({subspecialty})")]
    UnknownCombination {
        patient_group: String,
        provider: String,
        subspecialty: Subspecialty,
    },
    #[error("provider name must not be empty")]
    EmptyProviderName,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInput {
    pub provider: String,
    pub subspecialty: Subspecialty,
    pub operating_hours: u32,
    pub downtime: u32,
    pub support_staff: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddProviderOutcome {
    pub provider: String,
    pub subspecialty: Subspecialty,
    /// False until some session-limit row names this (provider, subspecialty)
    /// pair; the new row stays out of the joined view until then.
    pub referenced_by_session_limits: bool,
}

/// The five in-memory sample tables. Seeded once per process; the limit editor
/// mutates `session_limits` in place and the add-provider form appends to
/// `operational`. Nothing is deleted or persisted.
#[derive(Debug, Clone)]
pub struct Tables {
    pub patients: Vec<PatientGroupRow>,
    pub providers: Vec<ProviderRow>,
    pub session_limits: Vec<SessionLimitRow>,
    pub operational: Vec<OperationalRow>,
    pub historical: Vec<HistoricalRow>,
}

impl Tables {
    pub fn seed() -> Self {
        use Subspecialty::*;

        let patients = [
            ("A", 100, 5),
            ("B", 150, 7),
            ("C", 120, 6),
            ("D", 80, 4),
        ]
        .into_iter()
        .map(|(g, vol, lead)| PatientGroupRow {
            patient_group: g.to_string(),
            volume_of_requests: vol,
            lead_time: lead,
        })
        .collect();

        let pairs = [
            ("P1", Cardiology),
            ("P1", Neurology),
            ("P2", Neurology),
            ("P2", Orthopedics),
            ("P3", Orthopedics),
            ("P3", Oncology),
            ("P4", Oncology),
            ("P4", Cardiology),
        ];

        let providers = pairs
            .iter()
            .map(|&(p, s)| ProviderRow {
                provider: p.to_string(),
                subspecialty: s,
            })
            .collect();

        let session_limits = [
            ("A", "P1", Cardiology, 10, 8, 0),
            ("A", "P1", Neurology, 12, 9, 0),
            ("B", "P2", Neurology, 15, 12, 1),
            ("B", "P2", Orthopedics, 14, 11, 0),
            ("C", "P3", Orthopedics, 12, 10, 0),
            ("C", "P3", Oncology, 10, 9, 0),
            ("D", "P4", Oncology, 8, 6, 0),
            ("D", "P4", Cardiology, 10, 7, 0),
        ]
        .into_iter()
        .map(|(g, p, s, max, cur, over)| SessionLimitRow {
            patient_group: g.to_string(),
            provider: p.to_string(),
            subspecialty: s,
            max_sessions: max,
            current_utilization: cur,
            overbooked_sessions: over,
        })
        .collect();

        let operational = [
            ("P1", Cardiology, 8, 1, 2),
            ("P1", Neurology, 7, 2, 1),
            ("P2", Neurology, 7, 2, 1),
            ("P2", Orthopedics, 6, 1, 2),
            ("P3", Orthopedics, 6, 1, 2),
            ("P3", Oncology, 8, 1, 1),
            ("P4", Oncology, 8, 1, 1),
            ("P4", Cardiology, 7, 2, 2),
        ]
        .into_iter()
        .map(|(p, s, hours, down, staff)| OperationalRow {
            provider: p.to_string(),
            subspecialty: s,
            operating_hours: hours,
            downtime: down,
            support_staff: staff,
        })
        .collect();

        let historical = [
            ("A", 120, 10, 5, Seasonality::High),
            ("B", 180, 15, 10, Seasonality::High),
            ("C", 150, 12, 8, Seasonality::Low),
            ("D", 100, 8, 3, Seasonality::Low),
        ]
        .into_iter()
        .map(|(g, vol, ns, canc, season)| HistoricalRow {
            patient_group: g.to_string(),
            appointment_volume: vol,
            no_shows: ns,
            cancellations: canc,
            seasonality: season,
        })
        .collect();

        Self {
            patients,
            providers,
            session_limits,
            operational,
            historical,
        }
    }

    /// Overwrite `max_sessions` on every session-limit row matching the triple.
    /// Returns how many rows changed; a combination with no matching row is an
    /// error and leaves the table untouched.
    pub fn update_session_limit(
        &mut self,
        patient_group: &str,
        provider: &str,
        subspecialty: Subspecialty,
        new_limit: u32,
    ) -> Result<usize, PanelError> {
        let mut updated = 0;
        for row in self.session_limits.iter_mut().filter(|r| {
            r.patient_group == patient_group
                && r.provider == provider
                && r.subspecialty == subspecialty
        }) {
            row.max_sessions = new_limit;
            updated += 1;
        }
        if updated == 0 {
            return Err(PanelError::UnknownCombination {
                patient_group: patient_group.to_string(),
                provider: provider.to_string(),
                subspecialty,
            });
        }
        Ok(updated)
    }

    /// Append a row to the operational table. No uniqueness check, matching the
    /// original form; the outcome says whether any session-limit row references
    /// the pair so callers can tell the row is not yet visible in the join.
    pub fn add_provider(&mut self, input: ProviderInput) -> Result<AddProviderOutcome, PanelError> {
        let name = input.provider.trim();
        if name.is_empty() {
            return Err(PanelError::EmptyProviderName);
        }
        let name = name.to_string();

        self.operational.push(OperationalRow {
            provider: name.clone(),
            subspecialty: input.subspecialty,
            operating_hours: input.operating_hours,
            downtime: input.downtime,
            support_staff: input.support_staff,
        });

        let referenced = self
            .session_limits
            .iter()
            .any(|r| r.provider == name && r.subspecialty == input.subspecialty);

        Ok(AddProviderOutcome {
            provider: name,
            subspecialty: input.subspecialty,
            referenced_by_session_limits: referenced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_existing_combination_changes_only_that_row() {
        let mut tables = Tables::seed();
        let before: Vec<u32> = tables.session_limits.iter().map(|r| r.max_sessions).collect();

        let updated = tables
            .update_session_limit("A", "P1", Subspecialty::Cardiology, 20)
            .unwrap();
        assert_eq!(updated, 1);

        for (i, row) in tables.session_limits.iter().enumerate() {
            if row.patient_group == "A"
                && row.provider == "P1"
                && row.subspecialty == Subspecialty::Cardiology
            {
                assert_eq!(row.max_sessions, 20);
            } else {
                assert_eq!(row.max_sessions, before[i]);
            }
        }
    }

    #[test]
    fn update_unknown_combination_is_an_error_and_changes_nothing() {
        let mut tables = Tables::seed();
        let before: Vec<u32> = tables.session_limits.iter().map(|r| r.max_sessions).collect();

        // A and P2 both exist, but A never sees P2.
        let err = tables
            .update_session_limit("A", "P2", Subspecialty::Neurology, 99)
            .unwrap_err();
        assert!(matches!(err, PanelError::UnknownCombination { .. }));

        let after: Vec<u32> = tables.session_limits.iter().map(|r| r.max_sessions).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn add_provider_appends_one_operational_row() {
        let mut tables = Tables::seed();
        let before = tables.operational.len();

        let outcome = tables
            .add_provider(ProviderInput {
                provider: "P5".to_string(),
                subspecialty: Subspecialty::Cardiology,
                operating_hours: 8,
                downtime: 1,
                support_staff: 2,
            })
            .unwrap();

        assert_eq!(tables.operational.len(), before + 1);
        assert!(!outcome.referenced_by_session_limits);
    }

    #[test]
    fn add_provider_rejects_blank_name() {
        let mut tables = Tables::seed();
        let err = tables
            .add_provider(ProviderInput {
                provider: "   ".to_string(),
                subspecialty: Subspecialty::Oncology,
                operating_hours: 8,
                downtime: 1,
                support_staff: 1,
            })
            .unwrap_err();
        assert!(matches!(err, PanelError::EmptyProviderName));
    }
}
