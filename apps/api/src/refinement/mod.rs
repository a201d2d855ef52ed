pub mod candidate;
pub mod commit;
pub mod coordinator;
pub mod handlers;
pub mod prompts;
pub mod repair;
