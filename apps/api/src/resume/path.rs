//! Field paths: parse a list of segments into the one update shape it addresses.
//!
//! Numeric segments are zero-based positions in the current snapshot of a collection,
//! not stable identifiers. Anything that does not match a known shape is `UnknownPath`.

use serde::Deserialize;

use crate::errors::AppError;

/// A single path segment as it arrives in a request body: `"work"` or `0`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Text(String),
    Unsigned(u64),
    Signed(i64),
}

impl Segment {
    pub fn into_string(self) -> String {
        match self {
            Segment::Text(s) => s,
            Segment::Unsigned(n) => n.to_string(),
            Segment::Signed(n) => n.to_string(),
        }
    }
}

macro_rules! field_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($key:literal, $column:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn parse(key: &str) -> Option<Self> {
                match key {
                    $($key => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Name of the field in request and response bodies.
            pub fn key(self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            /// Backing column in the relational schema.
            pub fn column(self) -> &'static str {
                match self {
                    $($name::$variant => $column),+
                }
            }
        }
    };
}

field_enum!(
    /// Scalar attributes stored directly on the resume row.
    ResumeField {
        Name => ("name", "name"),
        Title => ("title", "title"),
        Initials => ("initials", "initials"),
        Location => ("location", "location"),
        LocationLink => ("locationLink", "location_link"),
        About => ("about", "about"),
        Summary => ("summary", "summary"),
        AvatarUrl => ("avatarUrl", "avatar_url"),
        PersonalWebsiteUrl => ("personalWebsiteUrl", "personal_website_url"),
    }
);

field_enum!(ContactField {
    Email => ("email", "email"),
    Tel => ("tel", "tel"),
});

field_enum!(SocialField {
    Name => ("name", "name"),
    Url => ("url", "url"),
});

field_enum!(EducationField {
    School => ("school", "school"),
    Degree => ("degree", "degree"),
    Start => ("start", "start_date"),
    End => ("end", "end_date"),
});

field_enum!(WorkField {
    Company => ("company", "company"),
    Link => ("link", "link"),
    Title => ("title", "title"),
    Start => ("start", "start_date"),
    End => ("end", "end_date"),
    Description => ("description", "description"),
});

field_enum!(ProjectField {
    Title => ("title", "title"),
    Description => ("description", "description"),
});

impl ResumeField {
    pub fn nullable(self) -> bool {
        !matches!(self, ResumeField::Name | ResumeField::Title | ResumeField::Summary)
    }
}

impl EducationField {
    pub fn nullable(self) -> bool {
        matches!(self, EducationField::End)
    }
}

impl WorkField {
    pub fn nullable(self) -> bool {
        matches!(self, WorkField::Link | WorkField::End)
    }
}

impl ProjectField {
    pub fn nullable(self) -> bool {
        matches!(self, ProjectField::Description)
    }
}

/// Every update shape the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    /// `[]`: decompose an object value into its known top-level fields.
    Document,
    Scalar(ResumeField),
    Contact,
    ContactField(ContactField),
    Socials,
    SocialField { index: usize, field: SocialField },
    Education,
    EducationEntry(usize),
    EducationField { index: usize, field: EducationField },
    Skills,
    Work,
    WorkEntry(usize),
    WorkField { index: usize, field: WorkField },
    WorkBadges(usize),
    WorkTasks(usize),
    Projects,
    ProjectEntry(usize),
    ProjectField { index: usize, field: ProjectField },
    ProjectTechStack(usize),
    ProjectLink(usize),
}

impl FieldPath {
    pub fn parse(segments: &[String]) -> Result<FieldPath, AppError> {
        let unknown = || AppError::UnknownPath(segments.to_vec());
        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();

        let path = match parts.as_slice() {
            [] => FieldPath::Document,
            [field] if ResumeField::parse(field).is_some() => {
                FieldPath::Scalar(ResumeField::parse(field).ok_or_else(unknown)?)
            }

            ["contact"] => FieldPath::Contact,
            ["contact", "social"] => FieldPath::Socials,
            ["contact", "social", index, field] => FieldPath::SocialField {
                index: parse_index(index)?,
                field: SocialField::parse(field).ok_or_else(unknown)?,
            },
            ["contact", field] => {
                FieldPath::ContactField(ContactField::parse(field).ok_or_else(unknown)?)
            }

            ["education"] => FieldPath::Education,
            ["education", index] => FieldPath::EducationEntry(parse_index(index)?),
            ["education", index, field] => FieldPath::EducationField {
                index: parse_index(index)?,
                field: EducationField::parse(field).ok_or_else(unknown)?,
            },

            ["skills"] => FieldPath::Skills,

            ["work"] => FieldPath::Work,
            ["work", index] => FieldPath::WorkEntry(parse_index(index)?),
            ["work", index, "badges"] => FieldPath::WorkBadges(parse_index(index)?),
            ["work", index, "tasks"] => FieldPath::WorkTasks(parse_index(index)?),
            ["work", index, field] => FieldPath::WorkField {
                index: parse_index(index)?,
                field: WorkField::parse(field).ok_or_else(unknown)?,
            },

            ["projects"] => FieldPath::Projects,
            ["projects", index] => FieldPath::ProjectEntry(parse_index(index)?),
            ["projects", index, "techStack"] => FieldPath::ProjectTechStack(parse_index(index)?),
            ["projects", index, "link"] => FieldPath::ProjectLink(parse_index(index)?),
            ["projects", index, field] => FieldPath::ProjectField {
                index: parse_index(index)?,
                field: ProjectField::parse(field).ok_or_else(unknown)?,
            },

            _ => return Err(unknown()),
        };
        Ok(path)
    }
}

fn parse_index(segment: &str) -> Result<usize, AppError> {
    segment.parse::<usize>().map_err(|_| {
        AppError::Validation(format!(
            "Path segment '{segment}' is not a valid collection index"
        ))
    })
}
