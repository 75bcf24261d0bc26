//! Domain types for MarketRadar

pub mod candle;
pub mod instrument;
pub mod snapshot;
pub mod status;

pub use candle::{is_canonical_order, Candle, CandleRecord};
pub use instrument::{AssetType, DateWindow, Instrument, ProviderId};
pub use snapshot::{IndicatorSnapshot, KdjValues, MacdValues};
pub use status::{ErrorKind, FetchStatus};

/// Candle series for one instrument, ascending by date.
pub type Series = Vec<Candle>;
