//! Shared document schema — jobs, candidates, interviewers, schedules.
//!
//! DESIGN
//! ======
//! These are the typed nodes of the replicated tree. Entity ids are strings
//! owned by the document; referential integrity is NOT enforced — an
//! `OnSiteSchedule` may reference a candidate or interviewer that another
//! client has since deleted, so every lookup returns `Option`.

use serde::{Deserialize, Serialize};

// =============================================================================
// AVAILABILITY
// =============================================================================

/// Days of the week an interviewer or candidate is available. Order is
/// presentation order; membership is the availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Availability {
    pub days: Vec<String>,
}

impl Availability {
    #[must_use]
    pub fn new(days: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { days: days.into_iter().map(Into::into).collect() }
    }

    /// Add or remove a day. Adding an already-present day is a no-op.
    pub fn set_day(&mut self, day: &str, available: bool) {
        if available {
            if !self.days.iter().any(|d| d == day) {
                self.days.insert(0, day.to_string());
            }
        } else if let Some(index) = self.days.iter().position(|d| d == day) {
            self.days.remove(index);
        }
    }

    #[must_use]
    pub fn includes(&self, day: &str) -> bool {
        self.days.iter().any(|d| d == day)
    }
}

// =============================================================================
// SCHEDULE
// =============================================================================

/// An on-site interview day for one candidate. Identified within a job by
/// its `candidate_id`; the referenced candidate and interviewers may have
/// been deleted by the time anyone reads this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnSiteSchedule {
    pub day: String,
    pub candidate_id: String,
    pub interviewer_ids: Vec<String>,
    pub unread: bool,
}

impl OnSiteSchedule {
    /// Fresh schedule for a candidate, defaulting to Monday like the
    /// planner UI does.
    #[must_use]
    pub fn for_candidate(candidate_id: impl Into<String>) -> Self {
        Self {
            day: "Monday".to_string(),
            candidate_id: candidate_id.into(),
            interviewer_ids: Vec::new(),
            unread: false,
        }
    }
}

// =============================================================================
// PEOPLE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interviewer {
    pub interviewer_id: String,
    pub name: String,
    pub role: String,
    pub availability: Availability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub candidate_id: String,
    pub name: String,
    pub years_of_experience: u32,
    pub availability: Availability,
    pub unread: bool,
}

// =============================================================================
// JOB
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub job_state: String,
    pub job_title: String,
    pub job_description: String,
    pub candidates: Vec<Candidate>,
    pub on_site_schedule: Vec<OnSiteSchedule>,
    pub unread: bool,
}

impl Job {
    #[must_use]
    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.candidate_id == candidate_id)
    }

    pub fn candidate_mut(&mut self, candidate_id: &str) -> Option<&mut Candidate> {
        self.candidates.iter_mut().find(|c| c.candidate_id == candidate_id)
    }

    #[must_use]
    pub fn has_on_site_for_candidate(&self, candidate_id: &str) -> bool {
        self.get_on_site_for_candidate(candidate_id).is_some()
    }

    #[must_use]
    pub fn get_on_site_for_candidate(&self, candidate_id: &str) -> Option<&OnSiteSchedule> {
        self.on_site_schedule.iter().find(|s| s.candidate_id == candidate_id)
    }

    pub fn get_on_site_for_candidate_mut(&mut self, candidate_id: &str) -> Option<&mut OnSiteSchedule> {
        self.on_site_schedule.iter_mut().find(|s| s.candidate_id == candidate_id)
    }
}

// =============================================================================
// ROOT
// =============================================================================

/// Root of the shared document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrData {
    pub jobs_list: Vec<Job>,
    pub interviewer_pool: Vec<Interviewer>,
}

impl HrData {
    #[must_use]
    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs_list.iter().find(|j| j.job_id == job_id)
    }

    pub fn job_mut(&mut self, job_id: &str) -> Option<&mut Job> {
        self.jobs_list.iter_mut().find(|j| j.job_id == job_id)
    }

    #[must_use]
    pub fn interviewer(&self, interviewer_id: &str) -> Option<&Interviewer> {
        self.interviewer_pool.iter().find(|i| i.interviewer_id == interviewer_id)
    }

    pub fn interviewer_mut(&mut self, interviewer_id: &str) -> Option<&mut Interviewer> {
        self.interviewer_pool.iter_mut().find(|i| i.interviewer_id == interviewer_id)
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
