/// Prompt and seed injection into workflow documents
pub mod inject;
/// Workflow file resolution and template eligibility
pub mod registry;
