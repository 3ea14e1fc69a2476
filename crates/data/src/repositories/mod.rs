//! Append-only CSV histories.
//!
//! Three files back the keeper:
//! - Spot prices, written every minute
//! - Yield readings per instrument
//! - Computed signals read by the condition gate

mod apr_repository;
mod price_repository;
mod signal_repository;
mod table;

pub use apr_repository::AprRepository;
pub use price_repository::PriceRepository;
pub use signal_repository::{SignalRepository, SignalSource};
pub use table::{CsvTable, Row, TIMESTAMP_COLUMN, format_timestamp};

use crate::config::{InstrumentConfig, StorageConfig, volatility_signal_column};

/// Hands out the repositories of one deployment.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    storage: StorageConfig,
    assets: Vec<String>,
    instruments: Vec<InstrumentConfig>,
}

impl HistoryStore {
    #[must_use]
    pub fn new(
        storage: StorageConfig,
        assets: Vec<String>,
        instruments: Vec<InstrumentConfig>,
    ) -> Self {
        Self {
            storage,
            assets,
            instruments,
        }
    }

    #[must_use]
    pub fn prices(&self) -> PriceRepository {
        PriceRepository::new(&self.storage.prices_path, self.assets.clone())
    }

    #[must_use]
    pub fn aprs(&self) -> AprRepository {
        AprRepository::new(
            &self.storage.apr_path,
            self.instruments.iter().map(|i| i.heading.clone()).collect(),
        )
    }

    /// Signal columns cover the instruments that name a volatility pair.
    #[must_use]
    pub fn signals(&self) -> SignalRepository {
        let tracked: Vec<&InstrumentConfig> = self
            .instruments
            .iter()
            .filter(|i| i.volatility_pair.is_some())
            .collect();
        SignalRepository::new(
            &self.storage.signals_path,
            tracked.iter().map(|i| i.apr_signal_column()).collect(),
            tracked
                .iter()
                .filter_map(|i| i.volatility_pair.as_deref())
                .map(volatility_signal_column)
                .collect(),
        )
    }

    /// Creates every history file that does not exist yet.
    pub async fn init(&self) -> crate::error::Result<()> {
        self.prices().init().await?;
        self.aprs().init().await?;
        self.signals().init().await
    }
}
