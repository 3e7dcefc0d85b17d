//! Per-vendor identifiers for the native assets we price.

/// Vendor-specific names of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetIds {
    pub symbol: &'static str,
    pub coingecko: &'static str,
    /// Binance spot pair against USDT.
    pub binance: &'static str,
    pub coinbase: &'static str,
    pub kraken: &'static str,
}

const ASSETS: &[AssetIds] = &[
    AssetIds { symbol: "BTC", coingecko: "bitcoin", binance: "BTCUSDT", coinbase: "BTC-USD", kraken: "XBTUSD" },
    AssetIds { symbol: "LTC", coingecko: "litecoin", binance: "LTCUSDT", coinbase: "LTC-USD", kraken: "LTCUSD" },
    AssetIds { symbol: "ETH", coingecko: "ethereum", binance: "ETHUSDT", coinbase: "ETH-USD", kraken: "ETHUSD" },
    AssetIds { symbol: "BNB", coingecko: "binancecoin", binance: "BNBUSDT", coinbase: "BNB-USD", kraken: "BNBUSD" },
    AssetIds { symbol: "POL", coingecko: "polygon-ecosystem-token", binance: "POLUSDT", coinbase: "POL-USD", kraken: "POLUSD" },
    AssetIds { symbol: "SOL", coingecko: "solana", binance: "SOLUSDT", coinbase: "SOL-USD", kraken: "SOLUSD" },
    AssetIds { symbol: "XRP", coingecko: "ripple", binance: "XRPUSDT", coinbase: "XRP-USD", kraken: "XRPUSD" },
    AssetIds { symbol: "XLM", coingecko: "stellar", binance: "XLMUSDT", coinbase: "XLM-USD", kraken: "XLMUSD" },
    AssetIds { symbol: "DOGE", coingecko: "dogecoin", binance: "DOGEUSDT", coinbase: "DOGE-USD", kraken: "XDGUSD" },
];

pub fn lookup(symbol: &str) -> Option<&'static AssetIds> {
    ASSETS.iter().find(|a| a.symbol.eq_ignore_ascii_case(symbol))
}
