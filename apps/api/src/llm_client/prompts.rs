// Cross-cutting prompt fragments. Features that call the model keep their own
// prompts.rs next to them and build on these.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Shape reminder for list entries the normalizer would otherwise have to repair.
pub const ENTRY_SHAPE_INSTRUCTION: &str = "\
    Badges, skills and tech-stack entries MUST be objects with a name property, \
    like { \"name\": \"PostgreSQL\" }. \
    Tasks MUST be objects with a description property, \
    like { \"description\": \"Cut build times by 40%\" }. \
    Never use bare strings for these entries.";
