//! Prompt management: fetching, TTL caching with stale-while-revalidate
//! refresh, and the create/update glue that keeps the cache honest.

pub mod cache;
pub mod client;
pub mod fetcher;
pub mod types;

pub use cache::{PromptCache, PromptKey};
pub use client::{GetPromptOptions, PromptClient};
pub use fetcher::{HttpPromptFetcher, PromptFetcher};
pub use types::{ChatMessage, CreatePromptRequest, Prompt, PromptContent, PromptType};
