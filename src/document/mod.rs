//! Replicated document — operations, replica state, and the mutation facade.
//!
//! ARCHITECTURE
//! ============
//! Every mutation is a [`DocumentOp`] published fire-and-forget to the
//! transport. Replicas never pre-apply their own ops: the hub's echo is the
//! single apply path, so all replicas apply the identical totally ordered
//! op sequence and converge without merge logic.
//!
//! ERROR HANDLING
//! ==============
//! An op targeting a node that no longer exists (deleted concurrently by
//! another client) applies as a silent no-op. Dangling references are a
//! normal state, not an error.

pub mod schema;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::envelope::{AttendeeId, Body};
use crate::hub::Outbound;
use crate::subs::{HandlerRegistry, Subscription};

pub use schema::{Availability, Candidate, HrData, Interviewer, Job, OnSiteSchedule};

// =============================================================================
// OPERATIONS
// =============================================================================

/// One mutation of the shared document. Targets are addressed by entity id,
/// never by value equality, so structurally equal entities are not confused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocumentOp {
    AddJob { job: Job },
    DeleteJob { job_id: String },
    SetJobTitle { job_id: String, title: String },
    SetJobDescription { job_id: String, description: String },
    SetJobUnread { job_id: String, unread: bool },

    AddCandidate { job_id: String, candidate: Candidate },
    SetCandidateUnread { job_id: String, candidate_id: String, unread: bool },
    SetCandidateAvailability { job_id: String, candidate_id: String, day: String, available: bool },

    AddOnSiteForCandidate { job_id: String, candidate_id: String },
    SetScheduleDay { job_id: String, candidate_id: String, day: String },
    SetScheduleUnread { job_id: String, candidate_id: String, unread: bool },
    AddScheduleInterviewer { job_id: String, candidate_id: String, interviewer_id: String },
    RemoveScheduleInterviewer { job_id: String, candidate_id: String, interviewer_id: String },

    AddInterviewer { interviewer: Interviewer },
    RemoveInterviewer { interviewer_id: String },
    SetInterviewerAvailability { interviewer_id: String, day: String, available: bool },
}

// =============================================================================
// CHANGE SCOPE
// =============================================================================

/// The part of the tree an applied op touched. Tree-level consumers react to
/// list scopes; node-level consumers match on the entity scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Membership change in the jobs list.
    JobsList,
    /// Field change on one job node.
    Job { job_id: String },
    /// Membership change in one job's candidate list.
    CandidateList { job_id: String },
    /// Field change on one candidate node.
    Candidate { job_id: String, candidate_id: String },
    /// Membership change in one job's on-site schedule list.
    ScheduleList { job_id: String },
    /// Field change on one schedule node.
    Schedule { job_id: String, candidate_id: String },
    /// Membership change in the interviewer pool.
    InterviewerPool,
    /// Field change on one interviewer node.
    Interviewer { interviewer_id: String },
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply one op to a replica root. Returns the scope the op affected, or
/// `None` when the target no longer exists (silent no-op).
pub fn apply(root: &mut HrData, op: &DocumentOp) -> Option<ChangeScope> {
    match op {
        DocumentOp::AddJob { job } => {
            if root.job(&job.job_id).is_some() {
                return None;
            }
            root.jobs_list.push(job.clone());
            Some(ChangeScope::JobsList)
        }
        DocumentOp::DeleteJob { job_id } => {
            let index = root.jobs_list.iter().position(|j| &j.job_id == job_id)?;
            root.jobs_list.remove(index);
            Some(ChangeScope::JobsList)
        }
        DocumentOp::SetJobTitle { job_id, title } => {
            root.job_mut(job_id)?.job_title = title.clone();
            Some(ChangeScope::Job { job_id: job_id.clone() })
        }
        DocumentOp::SetJobDescription { job_id, description } => {
            root.job_mut(job_id)?.job_description = description.clone();
            Some(ChangeScope::Job { job_id: job_id.clone() })
        }
        DocumentOp::SetJobUnread { job_id, unread } => {
            root.job_mut(job_id)?.unread = *unread;
            Some(ChangeScope::Job { job_id: job_id.clone() })
        }

        DocumentOp::AddCandidate { job_id, candidate } => {
            let job = root.job_mut(job_id)?;
            if job.candidate(&candidate.candidate_id).is_some() {
                return None;
            }
            job.candidates.push(candidate.clone());
            Some(ChangeScope::CandidateList { job_id: job_id.clone() })
        }
        DocumentOp::SetCandidateUnread { job_id, candidate_id, unread } => {
            root.job_mut(job_id)?.candidate_mut(candidate_id)?.unread = *unread;
            Some(ChangeScope::Candidate { job_id: job_id.clone(), candidate_id: candidate_id.clone() })
        }
        DocumentOp::SetCandidateAvailability { job_id, candidate_id, day, available } => {
            root.job_mut(job_id)?
                .candidate_mut(candidate_id)?
                .availability
                .set_day(day, *available);
            Some(ChangeScope::Candidate { job_id: job_id.clone(), candidate_id: candidate_id.clone() })
        }

        DocumentOp::AddOnSiteForCandidate { job_id, candidate_id } => {
            let job = root.job_mut(job_id)?;
            if job.has_on_site_for_candidate(candidate_id) {
                return None;
            }
            job.on_site_schedule.push(OnSiteSchedule::for_candidate(candidate_id.clone()));
            Some(ChangeScope::ScheduleList { job_id: job_id.clone() })
        }
        DocumentOp::SetScheduleDay { job_id, candidate_id, day } => {
            root.job_mut(job_id)?.get_on_site_for_candidate_mut(candidate_id)?.day = day.clone();
            Some(ChangeScope::Schedule { job_id: job_id.clone(), candidate_id: candidate_id.clone() })
        }
        DocumentOp::SetScheduleUnread { job_id, candidate_id, unread } => {
            root.job_mut(job_id)?.get_on_site_for_candidate_mut(candidate_id)?.unread = *unread;
            Some(ChangeScope::Schedule { job_id: job_id.clone(), candidate_id: candidate_id.clone() })
        }
        DocumentOp::AddScheduleInterviewer { job_id, candidate_id, interviewer_id } => {
            let schedule = root.job_mut(job_id)?.get_on_site_for_candidate_mut(candidate_id)?;
            // Idempotent: a second add of the same interviewer is a no-op.
            if schedule.interviewer_ids.iter().any(|id| id == interviewer_id) {
                return None;
            }
            schedule.interviewer_ids.push(interviewer_id.clone());
            Some(ChangeScope::Schedule { job_id: job_id.clone(), candidate_id: candidate_id.clone() })
        }
        DocumentOp::RemoveScheduleInterviewer { job_id, candidate_id, interviewer_id } => {
            let schedule = root.job_mut(job_id)?.get_on_site_for_candidate_mut(candidate_id)?;
            let index = schedule.interviewer_ids.iter().position(|id| id == interviewer_id)?;
            schedule.interviewer_ids.remove(index);
            Some(ChangeScope::Schedule { job_id: job_id.clone(), candidate_id: candidate_id.clone() })
        }

        DocumentOp::AddInterviewer { interviewer } => {
            if root.interviewer(&interviewer.interviewer_id).is_some() {
                return None;
            }
            root.interviewer_pool.push(interviewer.clone());
            Some(ChangeScope::InterviewerPool)
        }
        DocumentOp::RemoveInterviewer { interviewer_id } => {
            let index = root
                .interviewer_pool
                .iter()
                .position(|i| &i.interviewer_id == interviewer_id)?;
            root.interviewer_pool.remove(index);
            Some(ChangeScope::InterviewerPool)
        }
        DocumentOp::SetInterviewerAvailability { interviewer_id, day, available } => {
            root.interviewer_mut(interviewer_id)?.availability.set_day(day, *available);
            Some(ChangeScope::Interviewer { interviewer_id: interviewer_id.clone() })
        }
    }
}

// =============================================================================
// DOCUMENT HANDLE
// =============================================================================

/// A client's view of the replicated document: local replica reads, change
/// subscriptions, and the typed mutation facade.
///
/// Cloning yields another handle to the same replica.
#[derive(Clone)]
pub struct DocumentHandle {
    attendee: AttendeeId,
    outbound: Arc<dyn Outbound>,
    state: Arc<Mutex<HrData>>,
    changes: HandlerRegistry<ChangeScope>,
}

impl DocumentHandle {
    pub(crate) fn new(attendee: AttendeeId, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            attendee,
            outbound,
            state: Arc::new(Mutex::new(HrData::default())),
            changes: HandlerRegistry::new(),
        }
    }

    /// Apply an op arriving from the transport and notify subscribers.
    pub(crate) fn apply_remote(&self, op: &DocumentOp) {
        let scope = {
            let mut root = self.state.lock().expect("document poisoned");
            apply(&mut root, op)
        };
        match scope {
            Some(scope) => self.changes.emit(&scope),
            None => debug!(?op, "document op targeted a missing node; ignored"),
        }
    }

    /// Subscribe to change notifications. The handler receives the scope of
    /// every applied op; consumers filter for the granularity they need.
    #[must_use]
    pub fn on_change(&self, handler: impl FnMut(&ChangeScope) + Send + 'static) -> Subscription {
        self.changes.subscribe(handler)
    }

    fn send(&self, op: DocumentOp) {
        // Fire-and-forget: visibility comes with the echoed envelope.
        self.outbound.publish(self.attendee, Body::DocOp { op });
    }

    // -------------------------------------------------------------------------
    // Reads (always possibly-absent)
    // -------------------------------------------------------------------------

    /// Clone of the full replica root.
    #[must_use]
    pub fn snapshot(&self) -> HrData {
        self.state.lock().expect("document poisoned").clone()
    }

    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.state.lock().expect("document poisoned").jobs_list.clone()
    }

    #[must_use]
    pub fn interviewers(&self) -> Vec<Interviewer> {
        self.state.lock().expect("document poisoned").interviewer_pool.clone()
    }

    #[must_use]
    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.state.lock().expect("document poisoned").job(job_id).cloned()
    }

    #[must_use]
    pub fn candidate(&self, job_id: &str, candidate_id: &str) -> Option<Candidate> {
        self.state
            .lock()
            .expect("document poisoned")
            .job(job_id)
            .and_then(|j| j.candidate(candidate_id))
            .cloned()
    }

    #[must_use]
    pub fn interviewer(&self, interviewer_id: &str) -> Option<Interviewer> {
        self.state
            .lock()
            .expect("document poisoned")
            .interviewer(interviewer_id)
            .cloned()
    }

    #[must_use]
    pub fn has_on_site_for_candidate(&self, job_id: &str, candidate_id: &str) -> bool {
        self.get_on_site_for_candidate(job_id, candidate_id).is_some()
    }

    #[must_use]
    pub fn get_on_site_for_candidate(&self, job_id: &str, candidate_id: &str) -> Option<OnSiteSchedule> {
        self.state
            .lock()
            .expect("document poisoned")
            .job(job_id)
            .and_then(|j| j.get_on_site_for_candidate(candidate_id))
            .cloned()
    }

    // -------------------------------------------------------------------------
    // Mutations (fire-and-forget)
    // -------------------------------------------------------------------------

    pub fn add_job(&self, job: Job) {
        self.send(DocumentOp::AddJob { job });
    }

    pub fn delete_job(&self, job_id: &str) {
        self.send(DocumentOp::DeleteJob { job_id: job_id.to_string() });
    }

    pub fn set_job_title(&self, job_id: &str, title: &str) {
        self.send(DocumentOp::SetJobTitle { job_id: job_id.to_string(), title: title.to_string() });
    }

    pub fn set_job_description(&self, job_id: &str, description: &str) {
        self.send(DocumentOp::SetJobDescription {
            job_id: job_id.to_string(),
            description: description.to_string(),
        });
    }

    pub fn set_job_unread(&self, job_id: &str, unread: bool) {
        self.send(DocumentOp::SetJobUnread { job_id: job_id.to_string(), unread });
    }

    pub fn add_candidate(&self, job_id: &str, candidate: Candidate) {
        self.send(DocumentOp::AddCandidate { job_id: job_id.to_string(), candidate });
    }

    pub fn set_candidate_unread(&self, job_id: &str, candidate_id: &str, unread: bool) {
        self.send(DocumentOp::SetCandidateUnread {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            unread,
        });
    }

    pub fn set_candidate_day_availability(&self, job_id: &str, candidate_id: &str, day: &str, available: bool) {
        self.send(DocumentOp::SetCandidateAvailability {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            day: day.to_string(),
            available,
        });
    }

    pub fn add_new_on_site_for_candidate(&self, job_id: &str, candidate_id: &str) {
        self.send(DocumentOp::AddOnSiteForCandidate {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
        });
    }

    pub fn set_schedule_day(&self, job_id: &str, candidate_id: &str, day: &str) {
        self.send(DocumentOp::SetScheduleDay {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            day: day.to_string(),
        });
    }

    pub fn set_schedule_unread(&self, job_id: &str, candidate_id: &str, unread: bool) {
        self.send(DocumentOp::SetScheduleUnread {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            unread,
        });
    }

    pub fn add_schedule_interviewer(&self, job_id: &str, candidate_id: &str, interviewer_id: &str) {
        self.send(DocumentOp::AddScheduleInterviewer {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            interviewer_id: interviewer_id.to_string(),
        });
    }

    pub fn remove_schedule_interviewer(&self, job_id: &str, candidate_id: &str, interviewer_id: &str) {
        self.send(DocumentOp::RemoveScheduleInterviewer {
            job_id: job_id.to_string(),
            candidate_id: candidate_id.to_string(),
            interviewer_id: interviewer_id.to_string(),
        });
    }

    pub fn add_interviewer(&self, interviewer: Interviewer) {
        self.send(DocumentOp::AddInterviewer { interviewer });
    }

    pub fn remove_interviewer(&self, interviewer_id: &str) {
        self.send(DocumentOp::RemoveInterviewer { interviewer_id: interviewer_id.to_string() });
    }

    pub fn set_interviewer_day_availability(&self, interviewer_id: &str, day: &str, available: bool) {
        self.send(DocumentOp::SetInterviewerAvailability {
            interviewer_id: interviewer_id.to_string(),
            day: day.to_string(),
            available,
        });
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
