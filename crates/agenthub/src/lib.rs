pub mod catalog;
pub mod dispatch;
pub mod documents;
pub mod errors;
pub mod fallback;
pub mod history;
pub mod models;
pub mod orchestrator;
pub mod prompt_template;
pub mod providers;
pub mod routing;
pub mod synthesis;
