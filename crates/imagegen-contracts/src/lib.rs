pub mod events;
pub mod prompts;
pub mod results;
