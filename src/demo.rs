//! Sample data for demos and tests.

use rand::Rng;
use uuid::Uuid;

use crate::document::{Availability, Candidate, Interviewer, Job, OnSiteSchedule};

const WEEKDAYS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

const CANDIDATE_NAMES: [&str; 8] = [
    "John Doe",
    "Jane Roe",
    "Sam Carter",
    "Priya Patel",
    "Wei Chen",
    "Maria Garcia",
    "Tom Okafor",
    "Lena Novak",
];

fn fully_available() -> Availability {
    Availability::new(WEEKDAYS)
}

/// A job with one candidate and a scheduled on-site, mirroring the demo
/// dataset the dashboard seeds with.
#[must_use]
pub fn sample_job() -> Job {
    let candidate = Candidate {
        candidate_id: "1".to_string(),
        name: "John Doe".to_string(),
        years_of_experience: 5,
        availability: fully_available(),
        unread: false,
    };

    let on_site = OnSiteSchedule {
        day: "Monday".to_string(),
        candidate_id: "1".to_string(),
        interviewer_ids: vec!["10".to_string(), "20".to_string(), "40".to_string()],
        unread: false,
    };

    Job {
        job_id: "1".to_string(),
        job_state: "Open".to_string(),
        job_title: "Software Engineer".to_string(),
        job_description: "We are looking for a software engineer to join our team.".to_string(),
        candidates: vec![candidate],
        on_site_schedule: vec![on_site],
        unread: false,
    }
}

/// A fresh empty job with a random id.
#[must_use]
pub fn new_job() -> Job {
    Job {
        job_id: Uuid::new_v4().to_string(),
        job_state: "Open".to_string(),
        job_title: "Software Engineer".to_string(),
        job_description: "We are looking for a software engineer to join our team.".to_string(),
        candidates: Vec::new(),
        on_site_schedule: Vec::new(),
        unread: true,
    }
}

/// A random candidate, like the "+ add candidate" button produces.
#[must_use]
pub fn new_candidate() -> Candidate {
    let mut rng = rand::rng();
    Candidate {
        candidate_id: Uuid::new_v4().to_string(),
        name: CANDIDATE_NAMES[rng.random_range(0..CANDIDATE_NAMES.len())].to_string(),
        years_of_experience: rng.random_range(1..=20),
        availability: fully_available(),
        unread: true,
    }
}

/// The demo interviewer pool.
#[must_use]
pub fn sample_interviewers() -> Vec<Interviewer> {
    let pool = [
        ("10", "Alice Johnson", "Technical Lead", &WEEKDAYS[0..3]),
        ("20", "Bob Smith", "HR Manager", &WEEKDAYS[0..3]),
        ("30", "Charlie Brown", "Senior Developer", &WEEKDAYS[3..5]),
        ("40", "Diana Prince", "Project Manager", &WEEKDAYS[3..5]),
        ("50", "Ethan Hunt", "QA Engineer", &WEEKDAYS[3..5]),
        ("60", "Fiona Gallagher", "DevOps Engineer", &WEEKDAYS[4..5]),
        ("70", "George Martin", "Product Owner", &WEEKDAYS[0..2]),
    ];
    pool.into_iter()
        .map(|(id, name, role, days)| Interviewer {
            interviewer_id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            availability: Availability::new(days.iter().copied()),
        })
        .collect()
}
