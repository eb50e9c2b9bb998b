pub mod alphavantage;
pub mod newsapi;
pub mod provider;
pub mod types;

pub use provider::{NewsProvider, PriceProvider};
