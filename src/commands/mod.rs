pub mod completions;
pub mod config;
pub mod prompt;
pub mod run;
