//! Built-in chain table used when no `CHAINS_FILE` is configured.

use super::{AuxLimits, ChainConfig, ChainType, Endpoint, EndpointApi, UsdRange};

use EndpointApi::*;

fn chain(
    key: &str,
    symbol: &str,
    chain_type: ChainType,
    usd_range: (f64, f64),
    native_decimals: u32,
    endpoints: Vec<Endpoint>,
    aux: AuxLimits,
) -> ChainConfig {
    ChainConfig {
        key: key.to_string(),
        symbol: symbol.to_string(),
        chain_type,
        usd_range: UsdRange::new(usd_range.0, usd_range.1),
        endpoints,
        native_decimals,
        aux,
    }
}

pub fn default_chains() -> Vec<ChainConfig> {
    vec![
        chain(
            "bitcoin",
            "BTC",
            ChainType::Utxo,
            (0.05, 100.0),
            8,
            vec![
                Endpoint::new("https://mempool.space", MempoolSpace),
                Endpoint::new("https://blockstream.info/api", Esplora),
                Endpoint::new("https://api.blockcypher.com/v1/btc/main", BlockCypher),
            ],
            AuxLimits {
                block_time_secs: 600,
                fast_fee_rate: 20.0,
                mid_fee_rate: 5.0,
                // 10 sat/vB on a 140 vB transfer
                fallback_fee_native: 0.000_014,
                ..AuxLimits::default()
            },
        ),
        chain(
            "litecoin",
            "LTC",
            ChainType::Utxo,
            (0.0005, 5.0),
            8,
            vec![
                Endpoint::new("https://litecoinspace.org", MempoolSpace),
                Endpoint::new("https://api.blockcypher.com/v1/ltc/main", BlockCypher),
            ],
            AuxLimits {
                block_time_secs: 150,
                fast_fee_rate: 10.0,
                mid_fee_rate: 2.0,
                fallback_fee_native: 0.000_002_8,
                ..AuxLimits::default()
            },
        ),
        chain(
            "ethereum",
            "ETH",
            ChainType::Evm,
            (0.01, 200.0),
            18,
            vec![
                Endpoint::new("https://cloudflare-eth.com", EvmRpc),
                Endpoint::new("https://rpc.ankr.com/eth", EvmRpc),
                Endpoint::new("https://eth.llamarpc.com", EvmRpc),
                Endpoint::new("https://api.etherscan.io/api", GasOracle),
            ],
            AuxLimits {
                block_time_secs: 12,
                // 20 gwei transfer
                fallback_fee_native: 0.000_42,
                ..AuxLimits::default()
            },
        ),
        chain(
            "bsc",
            "BNB",
            ChainType::Evm,
            (0.001, 5.0),
            18,
            vec![
                Endpoint::new("https://bsc-dataseed.binance.org", EvmRpc),
                Endpoint::new("https://rpc.ankr.com/bsc", EvmRpc),
                Endpoint::new("https://api.bscscan.com/api", GasOracle),
            ],
            AuxLimits {
                block_time_secs: 3,
                max_gas_price_gwei: 1_000.0,
                fallback_fee_native: 0.000_063,
                ..AuxLimits::default()
            },
        ),
        chain(
            "polygon",
            "POL",
            ChainType::Evm,
            (0.000_01, 2.0),
            18,
            vec![
                Endpoint::new("https://polygon-rpc.com", EvmRpc),
                Endpoint::new("https://rpc.ankr.com/polygon", EvmRpc),
                Endpoint::new("https://api.polygonscan.com/api", GasOracle),
            ],
            AuxLimits {
                block_time_secs: 2,
                max_gas_price_gwei: 50_000.0,
                fallback_fee_native: 0.001_05,
                ..AuxLimits::default()
            },
        ),
        chain(
            "arbitrum",
            "ETH",
            ChainType::Rollup,
            (0.0005, 5.0),
            18,
            vec![
                Endpoint::new("https://arb1.arbitrum.io/rpc", EvmRpc),
                Endpoint::new("https://rpc.ankr.com/arbitrum", EvmRpc),
            ],
            AuxLimits {
                max_gas_price_gwei: 100.0,
                fallback_fee_native: 0.000_005,
                ..AuxLimits::default()
            },
        ),
        chain(
            "optimism",
            "ETH",
            ChainType::Rollup,
            (0.000_01, 5.0),
            18,
            vec![
                Endpoint::new("https://mainnet.optimism.io", EvmRpc),
                Endpoint::new("https://rpc.ankr.com/optimism", EvmRpc),
                Endpoint::new("https://mainnet.optimism.io", OpGasPriceOracle),
            ],
            AuxLimits {
                max_gas_price_gwei: 100.0,
                fallback_fee_native: 0.000_002,
                ..AuxLimits::default()
            },
        ),
        chain(
            "base",
            "ETH",
            ChainType::Rollup,
            (0.000_01, 5.0),
            18,
            vec![
                Endpoint::new("https://mainnet.base.org", EvmRpc),
                Endpoint::new("https://rpc.ankr.com/base", EvmRpc),
                Endpoint::new("https://mainnet.base.org", OpGasPriceOracle),
            ],
            AuxLimits {
                max_gas_price_gwei: 100.0,
                fallback_fee_native: 0.000_002,
                ..AuxLimits::default()
            },
        ),
        chain(
            "solana",
            "SOL",
            ChainType::AccountModel,
            (0.000_05, 2.0),
            9,
            vec![
                Endpoint::new("https://api.mainnet-beta.solana.com", SolanaRpc),
                Endpoint::new("https://rpc.ankr.com/solana", SolanaRpc),
            ],
            AuxLimits {
                // one signature at 5000 lamports
                fallback_fee_native: 0.000_005,
                ..AuxLimits::default()
            },
        ),
        chain(
            "xrp",
            "XRP",
            ChainType::Ledger,
            (0.000_001, 0.5),
            6,
            vec![
                Endpoint::new("https://s1.ripple.com:51234", Rippled),
                Endpoint::new("https://xrplcluster.com", Rippled),
            ],
            AuxLimits {
                fallback_fee_native: 0.000_012,
                ..AuxLimits::default()
            },
        ),
        chain(
            "stellar",
            "XLM",
            ChainType::Ledger,
            (0.000_000_1, 0.5),
            7,
            vec![
                Endpoint::new("https://horizon.stellar.org", Horizon),
                Endpoint::new("https://horizon.stellar.lobstr.co", Horizon),
            ],
            AuxLimits {
                fallback_fee_native: 0.000_01,
                ..AuxLimits::default()
            },
        ),
    ]
}
