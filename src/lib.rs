pub mod app;
pub mod card;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod gallery;
pub mod output;
pub mod style;

#[cfg(test)]
mod tests;
