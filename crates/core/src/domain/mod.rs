pub mod price;
pub mod pulse;
pub mod ticker;

pub use price::{PricePoint, PriceSeries};
pub use pulse::{MarketPulseResult, MomentumFeatures, NewsItem, Pulse, PulseVerdict};
pub use ticker::Ticker;
