//! USD price sources. Each speaks one vendor's public ticker API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::symbols::{lookup, AssetIds};
use super::PriceSource;
use crate::error::ProviderError;
use crate::services::http::HttpClient;

fn ids(symbol: &str) -> Result<&'static AssetIds, ProviderError> {
    lookup(symbol).ok_or_else(|| ProviderError::Unsupported {
        symbol: symbol.to_string(),
    })
}

fn parse_price(raw: &str) -> Result<f64, ProviderError> {
    raw.parse::<f64>()
        .map_err(|err| ProviderError::format(format!("invalid price '{}': {}", raw, err)))
}

pub struct CoinGecko {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGecko {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        Self::with_base_url(http, "https://api.coingecko.com", api_key)
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { http, base_url: base_url.into(), api_key }
    }
}

#[async_trait]
impl PriceSource for CoinGecko {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch_usd(&self, symbol: &str) -> Result<f64, ProviderError> {
        let id = ids(symbol)?.coingecko;
        let mut url = format!("{}/api/v3/simple/price?ids={}&vs_currencies=usd", self.base_url, id);
        if let Some(key) = &self.api_key {
            url.push_str("&x_cg_demo_api_key=");
            url.push_str(key);
        }
        let body: Value = self.http.get_json(&url).await?;
        body[id]["usd"]
            .as_f64()
            .ok_or_else(|| ProviderError::format(format!("coingecko response missing {}.usd", id)))
    }
}

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    price: String,
}

pub struct Binance {
    http: HttpClient,
    base_url: String,
}

impl Binance {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, "https://api.binance.com")
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl PriceSource for Binance {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_usd(&self, symbol: &str) -> Result<f64, ProviderError> {
        let pair = ids(symbol)?.binance;
        let url = format!("{}/api/v3/ticker/price?symbol={}", self.base_url, pair);
        let ticker: BinanceTicker = self.http.get_json(&url).await?;
        parse_price(&ticker.price)
    }
}

#[derive(Debug, Deserialize)]
struct CoinbaseSpot {
    data: CoinbaseAmount,
}

#[derive(Debug, Deserialize)]
struct CoinbaseAmount {
    amount: String,
}

pub struct Coinbase {
    http: HttpClient,
    base_url: String,
}

impl Coinbase {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, "https://api.coinbase.com")
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl PriceSource for Coinbase {
    fn name(&self) -> &str {
        "coinbase"
    }

    async fn fetch_usd(&self, symbol: &str) -> Result<f64, ProviderError> {
        let pair = ids(symbol)?.coinbase;
        let url = format!("{}/v2/prices/{}/spot", self.base_url, pair);
        let spot: CoinbaseSpot = self.http.get_json(&url).await?;
        parse_price(&spot.data.amount)
    }
}

pub struct Kraken {
    http: HttpClient,
    base_url: String,
}

impl Kraken {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, "https://api.kraken.com")
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl PriceSource for Kraken {
    fn name(&self) -> &str {
        "kraken"
    }

    async fn fetch_usd(&self, symbol: &str) -> Result<f64, ProviderError> {
        let pair = ids(symbol)?.kraken;
        let url = format!("{}/0/public/Ticker?pair={}", self.base_url, pair);
        let body: Value = self.http.get_json(&url).await?;

        if let Some(errors) = body["error"].as_array().filter(|e| !e.is_empty()) {
            return Err(ProviderError::unavailable(format!("kraken: {:?}", errors)));
        }

        // Result is keyed by Kraken's canonical pair name (e.g. XXBTZUSD),
        // which differs from the requested one; there is exactly one entry.
        let last_trade = body["result"]
            .as_object()
            .and_then(|pairs| pairs.values().next())
            .and_then(|ticker| ticker["c"][0].as_str())
            .ok_or_else(|| ProviderError::format("kraken response missing last trade price"))?;
        parse_price(last_trade)
    }
}

pub struct CryptoCompare {
    http: HttpClient,
    base_url: String,
}

impl CryptoCompare {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, "https://min-api.cryptocompare.com")
    }

    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl PriceSource for CryptoCompare {
    fn name(&self) -> &str {
        "cryptocompare"
    }

    async fn fetch_usd(&self, symbol: &str) -> Result<f64, ProviderError> {
        let symbol = ids(symbol)?.symbol;
        let url = format!("{}/data/price?fsym={}&tsyms=USD", self.base_url, symbol);
        let body: Value = self.http.get_json(&url).await?;
        body["USD"]
            .as_f64()
            .ok_or_else(|| ProviderError::format("cryptocompare response missing USD"))
    }
}
