//! Selection controller — the local user's job/candidate/schedule focus.
//!
//! ARCHITECTURE
//! ============
//! The controller owns the UI-facing selection state and coordinates two
//! side channels on every transition: outbound presence publication (so
//! peers see what this user is looking at) and document read-marking.
//! Selections are held as ids, never as node clones — the document mutates
//! underneath, and ids are re-resolved against the live replica on use.
//!
//! The reconciliation rule is the load-bearing part: on any structural
//! change to the jobs list or a candidates list, both selections are
//! re-validated against the document. A selection whose target vanished is
//! cleared locally AND re-published as the empty sentinel, so no peer's
//! projection keeps showing a phantom viewer.
//!
//! All inputs are best-effort UI events; nothing here surfaces a failure.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::document::{ChangeScope, DocumentHandle, OnSiteSchedule};
use crate::envelope::{CandidateSelection, JobSelection};
use crate::presence::channel::PresenceWorkspace;
use crate::subs::Subscription;

#[derive(Debug, Default)]
struct SelectionState {
    job: Option<String>,
    candidate: Option<String>,
    /// Candidate id the selected on-site schedule belongs to, within the
    /// selected job.
    schedule_candidate: Option<String>,
    drawer_open: bool,
}

/// Local selection state machine. Dropping the controller releases its
/// document subscription.
pub struct SelectionController {
    state: Arc<Mutex<SelectionState>>,
    document: DocumentHandle,
    presence: PresenceWorkspace,
    _doc_sub: Subscription,
}

impl SelectionController {
    #[must_use]
    pub fn new(document: DocumentHandle, presence: PresenceWorkspace) -> Self {
        let state = Arc::new(Mutex::new(SelectionState::default()));

        let reconcile_state = Arc::clone(&state);
        let reconcile_document = document.clone();
        let reconcile_presence = presence.clone();
        let doc_sub = document.on_change(move |scope: &ChangeScope| {
            if matches!(scope, ChangeScope::JobsList | ChangeScope::CandidateList { .. } | ChangeScope::ScheduleList { .. }) {
                reconcile(&reconcile_state, &reconcile_document, &reconcile_presence);
            }
        });

        Self { state, document, presence, _doc_sub: doc_sub }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Select a job (or clear the selection). Unconditionally clears the
    /// candidate and schedule selections, closes the drawer, publishes
    /// both selection slots, and marks the job read when one was selected.
    pub fn select_job(&self, job_id: Option<&str>) {
        {
            let mut state = self.state.lock().expect("selection poisoned");
            state.job = job_id.map(String::from);
            state.candidate = None;
            state.schedule_candidate = None;
            state.drawer_open = false;
        }

        match job_id {
            Some(id) => {
                self.presence.set_local_job_selection(&JobSelection::selected(id));
                self.document.set_job_unread(id, false);
            }
            None => self.presence.set_local_job_selection(&JobSelection::none()),
        }
        self.presence.set_local_candidate_selection(&CandidateSelection::none());
    }

    /// Select a candidate (or clear the selection) under the current job.
    /// Resolves the job's on-site schedule for the candidate: found means
    /// the schedule is selected and marked read, absent means the schedule
    /// selection clears.
    pub fn select_candidate(&self, candidate_id: Option<&str>) {
        let job_id = {
            let mut state = self.state.lock().expect("selection poisoned");
            state.candidate = candidate_id.map(String::from);
            state.drawer_open = false;
            state.job.clone()
        };

        let mut mark_schedule_read = false;
        {
            let mut state = self.state.lock().expect("selection poisoned");
            state.schedule_candidate = match (&job_id, candidate_id) {
                (Some(job_id), Some(candidate_id))
                    if self.document.has_on_site_for_candidate(job_id, candidate_id) =>
                {
                    mark_schedule_read = true;
                    Some(candidate_id.to_string())
                }
                _ => None,
            };
        }

        match candidate_id {
            Some(id) => self
                .presence
                .set_local_candidate_selection(&CandidateSelection::selected(id)),
            None => self.presence.set_local_candidate_selection(&CandidateSelection::none()),
        }

        if let (Some(job_id), Some(candidate_id)) = (&job_id, candidate_id) {
            if mark_schedule_read {
                self.document.set_schedule_unread(job_id, candidate_id, false);
            }
            self.document.set_candidate_unread(job_id, candidate_id, false);
        }
    }

    /// Flip the interviewer drawer. Meaningful only while a schedule is
    /// selected; harmless otherwise.
    pub fn toggle_drawer(&self) {
        let mut state = self.state.lock().expect("selection poisoned");
        state.drawer_open = !state.drawer_open;
    }

    /// Append an interviewer to the selected schedule. Idempotent: an
    /// interviewer already on the schedule is not added again. No-op when
    /// no schedule is selected or the schedule has vanished.
    pub fn add_interviewer_to_schedule(&self, interviewer_id: &str) {
        let (job_id, schedule_candidate) = {
            let state = self.state.lock().expect("selection poisoned");
            (state.job.clone(), state.schedule_candidate.clone())
        };
        let (Some(job_id), Some(candidate_id)) = (job_id, schedule_candidate) else {
            return;
        };
        let Some(schedule) = self.document.get_on_site_for_candidate(&job_id, &candidate_id) else {
            return;
        };
        if schedule.interviewer_ids.iter().any(|id| id == interviewer_id) {
            return;
        }
        self.document.add_schedule_interviewer(&job_id, &candidate_id, interviewer_id);
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn selected_job(&self) -> Option<String> {
        self.state.lock().expect("selection poisoned").job.clone()
    }

    #[must_use]
    pub fn selected_candidate(&self) -> Option<String> {
        self.state.lock().expect("selection poisoned").candidate.clone()
    }

    /// The selected on-site schedule, resolved live against the document.
    #[must_use]
    pub fn selected_schedule(&self) -> Option<OnSiteSchedule> {
        let (job_id, candidate_id) = {
            let state = self.state.lock().expect("selection poisoned");
            (state.job.clone()?, state.schedule_candidate.clone()?)
        };
        self.document.get_on_site_for_candidate(&job_id, &candidate_id)
    }

    #[must_use]
    pub fn drawer_open(&self) -> bool {
        self.state.lock().expect("selection poisoned").drawer_open
    }
}

/// Re-validate the selections against the live document, clearing (and
/// re-publishing as empty) anything whose target was deleted by any
/// client.
fn reconcile(
    state: &Arc<Mutex<SelectionState>>,
    document: &DocumentHandle,
    presence: &PresenceWorkspace,
) {
    let (job_id, candidate_id) = {
        let state = state.lock().expect("selection poisoned");
        (state.job.clone(), state.candidate.clone())
    };
    let Some(job_id) = job_id else {
        return;
    };

    let Some(job) = document.job(&job_id) else {
        debug!(%job_id, "selected job vanished; clearing selection");
        {
            let mut state = state.lock().expect("selection poisoned");
            state.job = None;
            state.candidate = None;
            state.schedule_candidate = None;
            state.drawer_open = false;
        }
        presence.set_local_job_selection(&JobSelection::none());
        presence.set_local_candidate_selection(&CandidateSelection::none());
        return;
    };

    if let Some(candidate_id) = candidate_id {
        if job.candidate(&candidate_id).is_none() {
            debug!(%job_id, %candidate_id, "selected candidate vanished; clearing selection");
            {
                let mut state = state.lock().expect("selection poisoned");
                state.candidate = None;
                state.schedule_candidate = None;
                state.drawer_open = false;
            }
            presence.set_local_candidate_selection(&CandidateSelection::none());
            return;
        }
    }

    // The schedule can be removed independently of its candidate.
    let mut state = state.lock().expect("selection poisoned");
    if let Some(schedule_candidate) = &state.schedule_candidate {
        if !job.has_on_site_for_candidate(schedule_candidate) {
            state.schedule_candidate = None;
            state.drawer_open = false;
        }
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
