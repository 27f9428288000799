// Library interface for newzlm modules
// This allows tests and other binaries to import modules

pub mod auth;
pub mod editorial;
pub mod generator;
pub mod llm;
pub mod news;
pub mod scraping;
pub mod server;
pub mod store;
