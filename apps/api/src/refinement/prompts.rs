// Prompt text for resume refinement. Reuses cross-cutting fragments from llm_client::prompts.

use std::fmt::Write;

use crate::llm_client::prompts::{ENTRY_SHAPE_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::models::resume::Resume;

const SYSTEM_PREAMBLE: &str = "You are an expert resume writer that helps refine resumes to \
    match job descriptions. You may enhance or modify descriptions, but you never delete any \
    item: every work experience, education entry, project, skill, task and badge of the \
    original resume must still be present in your answer. Add skills and tasks that the role \
    calls for and that fit the candidate's history.";

const GENERIC_INSTRUCTION: &str =
    "No job description or URL provided. Make general improvements to the resume.";

/// Schema and preservation rules appended after the resume text.
const OUTPUT_RULES: &str = r#"Please analyze the resume and the job, then return a refined version of the resume that:
1. Enhances or modifies descriptions of existing items to better match the job, but never deletes an item
2. Highlights skills and experiences relevant to the job
3. Adds missing skills and tasks the role expects, as badges or tasks on the relevant work experiences
4. Improves the wording of bullet points to showcase achievements

Return ONLY a JSON object with these fields:
- name: string (identical to the original)
- title: string (identical to the original)
- location: string (identical to the original)
- summary: string
- skills: array of { "name": string }
- work: array of { "company", "link", "title", "start", "end", "description", "badges": [{ "name" }], "tasks": [{ "description" }] }
  with exactly the same company, title, start and end as the original entries; keep every link
- education: array of { "school", "degree", "start", "end" } with exactly the same school and degree
- projects: array of { "title", "description", "techStack": [{ "name" }], "link": { "label", "href" } }
  with exactly the same titles; keep every link

Do not wrap your response in ```json or any other markdown."#;

pub fn refinement_system_prompt() -> String {
    format!("{SYSTEM_PREAMBLE} {ENTRY_SHAPE_INSTRUCTION} {JSON_ONLY_SYSTEM}")
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// The job section of the prompt: description first, then URL, then a generic request.
fn job_section(job_description: Option<&str>, job_url: Option<&str>) -> String {
    match (non_blank(job_description), non_blank(job_url)) {
        (Some(description), _) => format!("Job Description:\n{description}"),
        (None, Some(url)) => format!(
            "Job URL:\n{url}\nPlease analyze the job posting at this URL and tailor the resume accordingly."
        ),
        (None, None) => GENERIC_INSTRUCTION.to_string(),
    }
}

pub fn build_refinement_prompt(
    resume: &Resume,
    job_description: Option<&str>,
    job_url: Option<&str>,
) -> String {
    format!(
        "You are an expert resume writer. Your task is to refine the following resume to better \
         match the job described below.\n\n{}\n\nResume:\n{}\n{OUTPUT_RULES}",
        job_section(job_description, job_url),
        render_resume_text(resume)
    )
}

/// Plain-text rendering of a resume, section by section, as the model reads it.
pub fn render_resume_text(resume: &Resume) -> String {
    let h = &resume.header;
    let contact = resume.contact.as_ref();
    let or_empty = |v: Option<&String>| v.map(String::as_str).unwrap_or("").to_string();

    // Writing into a String cannot fail.
    let mut text = String::new();
    let _ = writeln!(text, "Name: {}", h.name);
    let _ = writeln!(text, "Title: {}", h.title);
    let _ = writeln!(text, "Location: {}", or_empty(h.location.as_ref()));
    let _ = writeln!(
        text,
        "Email: {}",
        or_empty(contact.and_then(|c| c.email.as_ref()))
    );
    let _ = writeln!(
        text,
        "Phone: {}",
        or_empty(contact.and_then(|c| c.tel.as_ref()))
    );
    let _ = writeln!(
        text,
        "Website: {}\n",
        or_empty(h.personal_website_url.as_ref())
    );

    let _ = writeln!(text, "SUMMARY\n{}\n", h.summary);

    text.push_str("SKILLS\n");
    for skill in &resume.skills {
        let _ = writeln!(text, "- {}", skill.name);
    }
    text.push('\n');

    text.push_str("WORK EXPERIENCE\n");
    for work in &resume.work {
        let _ = writeln!(text, "{} at {}", work.title, work.company);
        if let Some(link) = work.link.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(text, "Company Link: {link}");
        }
        let _ = writeln!(
            text,
            "{} - {}",
            work.start,
            work.end.as_deref().filter(|e| !e.is_empty()).unwrap_or("Present")
        );
        if !work.description.is_empty() {
            let _ = writeln!(text, "{}", work.description);
        }
        if !work.badges.is_empty() {
            let badges: Vec<&str> = work.badges.iter().map(|b| b.name.as_str()).collect();
            let _ = writeln!(text, "Skills: {}", badges.join(", "));
        }
        for task in &work.tasks {
            let _ = writeln!(text, "• {}", task.description);
        }
        text.push('\n');
    }

    text.push_str("EDUCATION\n");
    for edu in &resume.education {
        let _ = writeln!(text, "{} at {}", edu.degree, edu.school);
        let _ = writeln!(
            text,
            "{} - {}\n",
            edu.start,
            edu.end.as_deref().filter(|e| !e.is_empty()).unwrap_or("Present")
        );
    }

    text.push_str("PROJECTS\n");
    for project in &resume.projects {
        let _ = writeln!(text, "{}", project.title);
        let _ = writeln!(text, "{}", or_empty(project.description.as_ref()));
        if !project.tech_stack.is_empty() {
            let tech: Vec<&str> = project.tech_stack.iter().map(|t| t.name.as_str()).collect();
            let _ = writeln!(text, "Technologies: {}", tech.join(", "));
        }
        if let Some(link) = &project.link {
            let _ = writeln!(text, "Link: {}", link.href);
        }
        text.push('\n');
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::seed::default_resume;
    use crate::store::{MemoryStore, ResumeStore};
    use uuid::Uuid;

    async fn seeded() -> Resume {
        let store = MemoryStore::new();
        store
            .create_resume(&default_resume(Uuid::new_v4()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_render_lists_every_section_in_order() {
        let resume = seeded().await;
        let text = render_resume_text(&resume);

        assert!(text.starts_with("Name: Alex Morgan\nTitle: Alex Morgan\n"));
        assert!(text.contains("Email: alex@alexmorgan.dev\n"));
        assert!(text.contains("Senior Backend Engineer at Northwind Logistics\n"));
        assert!(text.contains("2020 - Present\n"));
        assert!(text.contains("2015 - 2020\n"));
        assert!(text.contains("Skills: Remote, Rust, PostgreSQL\n"));
        assert!(text.contains("• Designed the nightly reconciliation job\n"));
        assert!(text.contains("M.Sc. Computer Science at Technical University of Berlin\n"));
        assert!(text.contains("Technologies: Rust, PostgreSQL\n"));
        assert!(text.contains("Link: https://github.com/alexmorgan/tinyqueue\n"));

        let order = ["SUMMARY", "SKILLS", "WORK EXPERIENCE", "EDUCATION", "PROJECTS"];
        let positions: Vec<usize> = order.iter().map(|s| text.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_prompt_prefers_description_then_url() {
        let resume = seeded().await;

        let prompt = build_refinement_prompt(&resume, Some("Rust role"), Some("https://jobs/1"));
        assert!(prompt.contains("Job Description:\nRust role"));
        assert!(!prompt.contains("Job URL"));

        let prompt = build_refinement_prompt(&resume, Some("  "), Some("https://jobs/1"));
        assert!(prompt.contains("Job URL:\nhttps://jobs/1"));

        let prompt = build_refinement_prompt(&resume, None, None);
        assert!(prompt.contains(GENERIC_INSTRUCTION));
        assert!(prompt.contains("Resume:\nName: Alex Morgan"));
    }

    #[test]
    fn test_job_section_trims_inputs() {
        assert_eq!(
            job_section(Some("  Rust role \n"), None),
            "Job Description:\nRust role"
        );
        assert!(job_section(Some(""), Some("  ")).contains(GENERIC_INSTRUCTION));
        assert!(job_section(None, Some(" https://jobs/2 ")).starts_with("Job URL:\nhttps://jobs/2\n"));
    }

    #[test]
    fn test_system_prompt_demands_json_and_entry_shapes() {
        let system = refinement_system_prompt();
        assert!(system.contains("valid JSON object"));
        assert!(system.contains("{ \"name\": \"PostgreSQL\" }"));
    }
}
