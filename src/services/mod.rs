pub mod account;
pub mod agent;
pub mod catalog;
pub mod history;
pub mod recommendations;

pub use agent::{BoomieAgent, GeminiClient, LanguageModel};
pub use catalog::{CatalogProvider, SpotifyClient};
pub use recommendations::RecommendationService;
