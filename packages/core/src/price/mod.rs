//! USD price gathering across independent vendors.
//!
//! Every source is queried concurrently under its own timeout. Failed,
//! zero and non-finite answers are dropped from the sample; the published
//! price is the lower median of what remains.

pub mod sources;
pub mod symbols;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::timeout;

use crate::consensus::median::lower_median;
use crate::error::{ProviderError, SnapshotError};
use crate::services::http::HttpClient;

pub use sources::{Binance, CoinGecko, Coinbase, CryptoCompare, Kraken};

/// One vendor's USD quote for an asset symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_usd(&self, symbol: &str) -> Result<f64, ProviderError>;
}

pub struct PriceGatherer {
    sources: Vec<Arc<dyn PriceSource>>,
    per_source_timeout: Duration,
}

impl PriceGatherer {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>, per_source_timeout: Duration) -> Self {
        Self {
            sources,
            per_source_timeout,
        }
    }

    /// The standard vendor set, in priority order.
    pub fn with_default_sources(
        http: HttpClient,
        coingecko_api_key: Option<String>,
        per_source_timeout: Duration,
    ) -> Self {
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(CoinGecko::new(http.clone(), coingecko_api_key)),
            Arc::new(Binance::new(http.clone())),
            Arc::new(Coinbase::new(http.clone())),
            Arc::new(Kraken::new(http.clone())),
            Arc::new(CryptoCompare::new(http)),
        ];
        Self::new(sources, per_source_timeout)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub async fn fetch_price_usd(&self, symbol: &str) -> Result<f64, SnapshotError> {
        let quotes = self.sources.iter().map(|source| async move {
            let outcome = match timeout(self.per_source_timeout, source.fetch_usd(symbol)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };
            (source.name(), outcome)
        });

        let mut sample = Vec::with_capacity(self.sources.len());
        for (name, outcome) in join_all(quotes).await {
            match outcome {
                Ok(price) if price.is_finite() && price > 0.0 => sample.push(price),
                Ok(price) => {
                    tracing::debug!("{}: discarding unusable {} price {}", name, symbol, price)
                }
                Err(ProviderError::Unsupported { .. }) => {
                    tracing::debug!("{}: does not list {}", name, symbol)
                }
                Err(err) => tracing::warn!("{}: {} price unavailable: {}", name, symbol, err),
            }
        }

        let price = lower_median(&sample).ok_or_else(|| SnapshotError::PriceUnavailable {
            symbol: symbol.to_string(),
        })?;
        tracing::debug!("{} = {} USD from {} sources", symbol, price, sample.len());
        Ok(price)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubSource;
    use super::*;

    fn gatherer(sources: Vec<Arc<dyn PriceSource>>) -> PriceGatherer {
        PriceGatherer::new(sources, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn returns_lower_median_of_successful_quotes() {
        let prices = gatherer(vec![
            StubSource::price("a", 2010.0),
            StubSource::price("b", 1990.0),
            StubSource::price("c", 2000.0),
            StubSource::price("d", 2500.0),
        ]);
        assert_eq!(prices.fetch_price_usd("ETH").await.unwrap(), 2000.0);
    }

    #[tokio::test]
    async fn failing_and_unusable_quotes_are_excluded() {
        let prices = gatherer(vec![
            StubSource::failing("down"),
            StubSource::price("zero", 0.0),
            StubSource::price("nan", f64::NAN),
            StubSource::price("good", 150.0),
        ]);
        assert_eq!(prices.fetch_price_usd("SOL").await.unwrap(), 150.0);
    }

    #[tokio::test]
    async fn no_usable_quote_is_price_unavailable() {
        let prices = gatherer(vec![StubSource::failing("a"), StubSource::price("b", -1.0)]);
        assert_eq!(
            prices.fetch_price_usd("XRP").await.unwrap_err(),
            SnapshotError::PriceUnavailable { symbol: "XRP".into() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_does_not_block_the_others() {
        let slow: Arc<dyn PriceSource> = Arc::new(StubSource {
            name: "slow",
            answer: Ok(1.0),
            delay: Duration::from_secs(60),
        });
        let prices = PriceGatherer::new(
            vec![slow, StubSource::price("fast", 0.11)],
            Duration::from_secs(5),
        );

        let started = tokio::time::Instant::now();
        assert_eq!(prices.fetch_price_usd("XLM").await.unwrap(), 0.11);
        assert!(started.elapsed() < Duration::from_secs(6));
    }
}
