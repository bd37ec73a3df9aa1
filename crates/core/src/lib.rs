pub mod models;
pub mod prompts;
pub mod timestamp;
pub mod validate;

pub use models::*;
pub use prompts::{
    extraction_prompt, narration_prompt, normalize_query, planning_prompt, EXTRACTION_ROLE,
    NARRATION_ROLE, PLANNING_ROLE,
};
pub use validate::{Validate, ValidationError};
