pub mod alpha_vantage;
pub mod caching;

pub use alpha_vantage::AlphaVantageProvider;
pub use caching::{CachingProvider, ResponseCache};
