//! Starter resume used when the owner has nothing to duplicate yet.

use uuid::Uuid;

use crate::resume::drafts::{
    ContactDraft, EducationDraft, LinkDraft, ProjectDraft, ResumeDraft, SocialDraft, WorkDraft,
};
use crate::resume::normalize::{NamedEntry, TaskEntry};

const SEED_NAME: &str = "Alex Morgan";

fn names(items: &[&str]) -> Vec<NamedEntry> {
    items.iter().map(|n| NamedEntry::new(*n)).collect()
}

fn tasks(items: &[&str]) -> Vec<TaskEntry> {
    items.iter().map(|t| TaskEntry::new(*t)).collect()
}

/// The default document. Title starts out equal to the name.
pub fn default_resume(owner_id: Uuid) -> ResumeDraft {
    ResumeDraft {
        user_id: Some(owner_id),
        name: SEED_NAME.to_string(),
        title: SEED_NAME.to_string(),
        initials: Some("AM".to_string()),
        location: Some("Berlin, Germany".to_string()),
        location_link: Some("https://www.google.com/maps/place/Berlin".to_string()),
        about: Some("Backend engineer focused on reliable, observable services.".to_string()),
        summary: "Software engineer with eight years of experience building APIs, data \
                  pipelines and developer tooling. Comfortable owning a service from schema \
                  design to on-call."
            .to_string(),
        avatar_url: None,
        personal_website_url: Some("https://alexmorgan.dev".to_string()),
        contact: Some(ContactDraft {
            email: Some("alex@alexmorgan.dev".to_string()),
            tel: Some("+49 30 1234567".to_string()),
            social: vec![
                SocialDraft {
                    name: "GitHub".to_string(),
                    url: "https://github.com/alexmorgan".to_string(),
                },
                SocialDraft {
                    name: "LinkedIn".to_string(),
                    url: "https://www.linkedin.com/in/alexmorgan".to_string(),
                },
            ],
        }),
        education: vec![EducationDraft {
            school: "Technical University of Berlin".to_string(),
            degree: "M.Sc. Computer Science".to_string(),
            start: "2012".to_string(),
            end: Some("2015".to_string()),
        }],
        work: vec![
            WorkDraft {
                company: "Northwind Logistics".to_string(),
                link: Some("https://northwind.example".to_string()),
                title: "Senior Backend Engineer".to_string(),
                start: "2020".to_string(),
                end: None,
                description: "Owns the shipment tracking platform.".to_string(),
                badges: names(&["Remote", "Rust", "PostgreSQL"]),
                tasks: tasks(&[
                    "Rebuilt the tracking ingest path, cutting p95 latency from 900ms to 120ms",
                    "Introduced structured logging and tracing across twelve services",
                ]),
            },
            WorkDraft {
                company: "Contoso Payments".to_string(),
                link: None,
                title: "Software Engineer".to_string(),
                start: "2015".to_string(),
                end: Some("2020".to_string()),
                description: "Worked on settlement and reconciliation.".to_string(),
                badges: names(&["Go", "Kafka"]),
                tasks: tasks(&["Designed the nightly reconciliation job"]),
            },
        ],
        skills: names(&["Rust", "Go", "PostgreSQL", "Kafka", "Kubernetes", "Terraform"]),
        projects: vec![ProjectDraft {
            title: "tinyqueue".to_string(),
            description: Some("A persistent job queue on top of PostgreSQL.".to_string()),
            tech_stack: names(&["Rust", "PostgreSQL"]),
            link: Some(LinkDraft {
                label: "github.com/alexmorgan/tinyqueue".to_string(),
                href: "https://github.com/alexmorgan/tinyqueue".to_string(),
            }),
        }],
    }
}
