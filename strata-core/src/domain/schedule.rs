//! Schedule domain model
//!
//! Schedules are owned by the scheduler; the registry only reads them to
//! decide whether a pipeline or version may be deleted.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// A periodic schedule that runs a specific pipeline version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub pipeline_version_id: Uuid,
    pub status: ScheduleStatus,
}

/// Status of a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// Still firing runs
    Running,

    /// Reached its end time
    Success,

    /// Stopped because of an error
    Failed,

    /// Stopped by a user
    Terminated,
}

impl ScheduleStatus {
    /// Statuses in which a schedule still references its pipeline version
    pub const NOT_FINAL: &'static [ScheduleStatus] = &[ScheduleStatus::Running];

    pub fn is_final(&self) -> bool {
        !Self::NOT_FINAL.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Running => "running",
            ScheduleStatus::Success => "success",
            ScheduleStatus::Failed => "failed",
            ScheduleStatus::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ScheduleStatus::Running),
            "success" => Ok(ScheduleStatus::Success),
            "failed" => Ok(ScheduleStatus::Failed),
            "terminated" => Ok(ScheduleStatus::Terminated),
            other => Err(format!("unknown schedule status: {}", other)),
        }
    }
}
