pub mod drafts;
pub mod handlers;
pub mod normalize;
pub mod patch;
pub mod path;
pub mod seed;
pub mod service;
