mod engine;
mod progress;

pub use engine::{CrawlConfig, CrawlOutcome, Crawler, ListErrorPolicy};
pub use progress::{CrawlMessage, CrawlStats};
