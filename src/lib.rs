pub mod characters;
pub mod config;
pub mod error;
pub mod liturgy;
pub mod llm;
pub mod reading;
pub mod reference;
pub mod script;
pub mod text;
pub mod workflow;
