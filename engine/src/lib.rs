pub mod alerts;
pub mod clock;
pub mod config;
pub mod error;
pub mod etl;
pub mod forecast;
pub mod ledger;
pub mod metrics;
pub mod snapshot;
pub mod tenants;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, StoreError};
