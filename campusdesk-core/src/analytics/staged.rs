use serde::{Deserialize, Serialize};

use crate::attendance::{RiskLevel, StudentAttendance};

use super::TimeRange;

/// Filters that scope the analytics dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilters {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub time_range: TimeRange,
}

impl AnalyticsFilters {
    /// Student-level part of the filter (the time range is applied by the API).
    pub fn matches(&self, student: &StudentAttendance) -> bool {
        let department_ok = self.department.as_deref().is_none_or(|d| {
            student
                .department
                .as_deref()
                .is_some_and(|sd| sd.eq_ignore_ascii_case(d))
        });
        department_ok && self.risk_level.is_none_or(|r| r == student.risk_level)
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(department) = &self.department {
            pairs.push(("department", department.clone()));
        }
        if let Some(risk) = self.risk_level {
            pairs.push(("riskLevel", risk.as_str().to_string()));
        }
        pairs
    }
}

/// Two-phase filter state: edits go to `pending` and only take effect on
/// [`StagedFilters::apply`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagedFilters {
    pending: AnalyticsFilters,
    applied: AnalyticsFilters,
}

impl StagedFilters {
    pub fn new(applied: AnalyticsFilters) -> Self {
        StagedFilters {
            pending: applied.clone(),
            applied,
        }
    }

    pub fn pending(&self) -> &AnalyticsFilters {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut AnalyticsFilters {
        &mut self.pending
    }

    pub fn applied(&self) -> &AnalyticsFilters {
        &self.applied
    }

    /// Whether there are staged edits not yet applied.
    pub fn is_dirty(&self) -> bool {
        self.pending != self.applied
    }

    /// Commit the pending selection. Returns true when the applied filters
    /// changed, i.e. data has to be fetched again.
    pub fn apply(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.applied = self.pending.clone();
        true
    }

    /// Throw away staged edits.
    pub fn discard(&mut self) {
        self.pending = self.applied.clone();
    }

    /// Back to defaults, both staged and applied.
    pub fn reset(&mut self) {
        self.pending = AnalyticsFilters::default();
        self.applied = AnalyticsFilters::default();
    }
}
