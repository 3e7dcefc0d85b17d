//! Loading the chain table from a JSON file.
//!
//! Type and endpoint flavour are kept as strings on the wire so that an
//! unrecognised chain type surfaces as `UnsupportedChainType` instead of a
//! generic decode error.

use std::path::Path;

use serde::Deserialize;

use super::{AuxLimits, ChainConfig, ChainType, Endpoint, EndpointApi, UsdRange};
use crate::error::SnapshotError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainFileEntry {
    key: String,
    symbol: String,
    #[serde(rename = "type")]
    chain_type: String,
    usd_range: UsdRange,
    endpoints: Vec<EndpointFileEntry>,
    native_decimals: u32,
    #[serde(default)]
    aux: AuxLimits,
}

#[derive(Debug, Deserialize)]
struct EndpointFileEntry {
    url: String,
    api: String,
}

impl TryFrom<ChainFileEntry> for ChainConfig {
    type Error = SnapshotError;

    fn try_from(entry: ChainFileEntry) -> Result<Self, Self::Error> {
        let chain_type: ChainType = entry.chain_type.parse()?;
        let endpoints = entry
            .endpoints
            .into_iter()
            .map(|e| Ok(Endpoint::new(e.url, e.api.parse::<EndpointApi>()?)))
            .collect::<Result<Vec<_>, SnapshotError>>()?;

        Ok(ChainConfig {
            key: entry.key,
            symbol: entry.symbol.to_ascii_uppercase(),
            chain_type,
            usd_range: entry.usd_range,
            endpoints,
            native_decimals: entry.native_decimals,
            aux: entry.aux,
        })
    }
}

/// Parse a JSON array of chain entries.
pub fn parse_chain_entries(json: &str) -> Result<Vec<ChainConfig>, SnapshotError> {
    let entries: Vec<ChainFileEntry> = serde_json::from_str(json).map_err(|err| SnapshotError::Config {
        message: format!("invalid chain file: {}", err),
    })?;
    entries.into_iter().map(ChainConfig::try_from).collect()
}

pub fn load_chain_file(path: &Path) -> Result<Vec<ChainConfig>, SnapshotError> {
    let raw = std::fs::read_to_string(path).map_err(|err| SnapshotError::Config {
        message: format!("cannot read chain file {}: {}", path.display(), err),
    })?;
    parse_chain_entries(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::ChainRegistry;
    use crate::fetch_meta::FetchMeta;
    use crate::gas::ProviderSettings;
    use crate::services::http::HttpClient;
    use std::time::Duration;

    const CHAINS_JSON: &str = r#"[
        {
            "key": "dogecoin",
            "symbol": "doge",
            "type": "utxo",
            "usdRange": { "min": 0.001, "max": 1.0 },
            "nativeDecimals": 8,
            "endpoints": [
                { "url": "https://api.blockcypher.com/v1/doge/main", "api": "blockcypher" }
            ],
            "aux": { "blockTimeSecs": 60, "fallbackFeeNative": 0.01 }
        }
    ]"#;

    #[test]
    fn parses_chain_with_partial_aux_limits() {
        let chains = parse_chain_entries(CHAINS_JSON).unwrap();
        assert_eq!(chains.len(), 1);
        let doge = &chains[0];
        assert_eq!(doge.symbol, "DOGE");
        assert_eq!(doge.chain_type, ChainType::Utxo);
        assert_eq!(doge.aux.block_time_secs, 60);
        assert_eq!(doge.aux.tx_vbytes, 140.0);
        assert_eq!(doge.endpoints[0].api, EndpointApi::BlockCypher);
    }

    #[test]
    fn entry_without_fallback_fee_fails_registry_validation() {
        let json = CHAINS_JSON.replace(r#"{ "blockTimeSecs": 60, "fallbackFeeNative": 0.01 }"#, "{}");
        let chains = parse_chain_entries(&json).unwrap();
        assert_eq!(chains[0].aux.fallback_fee_native, 0.0);

        let http = HttpClient::new(Duration::from_secs(1), FetchMeta::new(Duration::from_secs(60)));
        let err = ChainRegistry::new(chains, http, ProviderSettings::default()).unwrap_err();
        match err {
            SnapshotError::Config { message } => assert!(message.contains("dogecoin"), "{}", message),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unknown_chain_type_is_unsupported() {
        let json = CHAINS_JSON.replace("\"utxo\"", "\"plasma\"");
        let err = parse_chain_entries(&json).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::UnsupportedChainType { value: "plasma".into() }
        );
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = parse_chain_entries("{ not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Config { .. }));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_chain_file(Path::new("/nonexistent/chains.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Config { .. }));
    }
}
