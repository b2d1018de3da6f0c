use super::*;
use crate::demo;
use crate::envelope::AttendeeId;
use std::sync::Mutex as StdMutex;

fn seeded_root() -> HrData {
    HrData {
        jobs_list: vec![demo::sample_job()],
        interviewer_pool: demo::sample_interviewers(),
    }
}

// =============================================================================
// APPLY
// =============================================================================

#[test]
fn add_and_delete_job_report_jobs_list_scope() {
    let mut root = HrData::default();

    let scope = apply(&mut root, &DocumentOp::AddJob { job: demo::sample_job() });
    assert_eq!(scope, Some(ChangeScope::JobsList));
    assert!(root.job("1").is_some());

    // A second add of the same id is a no-op.
    assert_eq!(apply(&mut root, &DocumentOp::AddJob { job: demo::sample_job() }), None);
    assert_eq!(root.jobs_list.len(), 1);

    let scope = apply(&mut root, &DocumentOp::DeleteJob { job_id: "1".into() });
    assert_eq!(scope, Some(ChangeScope::JobsList));
    assert!(root.job("1").is_none());
}

#[test]
fn ops_on_missing_nodes_are_silent_no_ops() {
    let mut root = seeded_root();

    assert_eq!(apply(&mut root, &DocumentOp::DeleteJob { job_id: "404".into() }), None);
    assert_eq!(
        apply(&mut root, &DocumentOp::SetJobTitle { job_id: "404".into(), title: "x".into() }),
        None
    );
    assert_eq!(
        apply(
            &mut root,
            &DocumentOp::SetCandidateUnread {
                job_id: "1".into(),
                candidate_id: "404".into(),
                unread: false
            }
        ),
        None
    );
    assert_eq!(
        apply(&mut root, &DocumentOp::RemoveInterviewer { interviewer_id: "404".into() }),
        None
    );

    assert_eq!(root, seeded_root(), "failed ops must not perturb the tree");
}

#[test]
fn add_schedule_interviewer_is_idempotent() {
    let mut root = seeded_root();
    let op = DocumentOp::AddScheduleInterviewer {
        job_id: "1".into(),
        candidate_id: "1".into(),
        interviewer_id: "30".into(),
    };

    assert!(apply(&mut root, &op).is_some());
    assert_eq!(apply(&mut root, &op), None);

    let schedule = root.job("1").unwrap().get_on_site_for_candidate("1").unwrap();
    assert_eq!(schedule.interviewer_ids.iter().filter(|id| *id == "30").count(), 1);
}

#[test]
fn remove_schedule_interviewer_removes_by_id() {
    let mut root = seeded_root();
    let op = DocumentOp::RemoveScheduleInterviewer {
        job_id: "1".into(),
        candidate_id: "1".into(),
        interviewer_id: "20".into(),
    };

    let scope = apply(&mut root, &op);
    assert_eq!(scope, Some(ChangeScope::Schedule { job_id: "1".into(), candidate_id: "1".into() }));
    let schedule = root.job("1").unwrap().get_on_site_for_candidate("1").unwrap();
    assert_eq!(schedule.interviewer_ids, vec!["10".to_string(), "40".to_string()]);

    // Gone already: silent no-op.
    assert_eq!(apply(&mut root, &op), None);
}

#[test]
fn add_on_site_creates_default_schedule_once() {
    let mut root = seeded_root();
    let candidate = demo::new_candidate();
    let candidate_id = candidate.candidate_id.clone();
    apply(&mut root, &DocumentOp::AddCandidate { job_id: "1".into(), candidate }).unwrap();

    let op = DocumentOp::AddOnSiteForCandidate { job_id: "1".into(), candidate_id: candidate_id.clone() };
    assert_eq!(apply(&mut root, &op), Some(ChangeScope::ScheduleList { job_id: "1".into() }));
    assert_eq!(apply(&mut root, &op), None);

    let schedule = root.job("1").unwrap().get_on_site_for_candidate(&candidate_id).unwrap();
    assert_eq!(schedule.day, "Monday");
}

#[test]
fn field_edits_report_node_scopes() {
    let mut root = seeded_root();

    let scope = apply(
        &mut root,
        &DocumentOp::SetJobUnread { job_id: "1".into(), unread: false },
    );
    assert_eq!(scope, Some(ChangeScope::Job { job_id: "1".into() }));

    let scope = apply(
        &mut root,
        &DocumentOp::SetInterviewerAvailability {
            interviewer_id: "60".into(),
            day: "Monday".into(),
            available: true,
        },
    );
    assert_eq!(scope, Some(ChangeScope::Interviewer { interviewer_id: "60".into() }));
    assert!(root.interviewer("60").unwrap().availability.includes("Monday"));
}

// =============================================================================
// FACADE
// =============================================================================

struct CaptureOutbound {
    sent: StdMutex<Vec<Body>>,
}

impl CaptureOutbound {
    fn new() -> Arc<Self> {
        Arc::new(Self { sent: StdMutex::new(Vec::new()) })
    }

    fn take(&self) -> Vec<Body> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }
}

impl Outbound for CaptureOutbound {
    fn publish(&self, _from: AttendeeId, body: Body) {
        self.sent.lock().unwrap().push(body);
    }
}

#[test]
fn mutations_publish_but_never_pre_apply() {
    let outbound = CaptureOutbound::new();
    let document = DocumentHandle::new(AttendeeId::new(), outbound.clone());

    document.add_job(demo::sample_job());

    let sent = outbound.take();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Body::DocOp { op: DocumentOp::AddJob { .. } }));

    // Visibility comes with the echo, not at call time.
    assert!(document.job("1").is_none());
}

#[test]
fn apply_remote_notifies_change_subscribers() {
    let outbound = CaptureOutbound::new();
    let document = DocumentHandle::new(AttendeeId::new(), outbound);

    let scopes = Arc::new(StdMutex::new(Vec::new()));
    let scopes_inner = Arc::clone(&scopes);
    let sub = document.on_change(move |scope: &ChangeScope| {
        scopes_inner.lock().unwrap().push(scope.clone());
    });

    document.apply_remote(&DocumentOp::AddJob { job: demo::sample_job() });
    assert!(document.job("1").is_some());
    assert_eq!(*scopes.lock().unwrap(), vec![ChangeScope::JobsList]);

    // An op on a missing node applies silently and fires nothing.
    document.apply_remote(&DocumentOp::DeleteJob { job_id: "404".into() });
    assert_eq!(scopes.lock().unwrap().len(), 1);

    drop(sub);
    document.apply_remote(&DocumentOp::DeleteJob { job_id: "1".into() });
    assert_eq!(scopes.lock().unwrap().len(), 1, "released subscription must not fire");
}

#[test]
fn facade_reads_tolerate_dangling_references() {
    let outbound = CaptureOutbound::new();
    let document = DocumentHandle::new(AttendeeId::new(), outbound);
    document.apply_remote(&DocumentOp::AddJob { job: demo::sample_job() });

    // The sample schedule references interviewer "40"; delete it from the
    // pool and the schedule still holds the id.
    document.apply_remote(&DocumentOp::AddInterviewer {
        interviewer: demo::sample_interviewers().remove(3),
    });
    document.apply_remote(&DocumentOp::RemoveInterviewer { interviewer_id: "40".into() });

    let schedule = document.get_on_site_for_candidate("1", "1").unwrap();
    assert!(schedule.interviewer_ids.contains(&"40".to_string()));
    assert!(document.interviewer("40").is_none());
}
