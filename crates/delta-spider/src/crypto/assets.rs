use std::fmt;
use std::str::FromStr;

/// A tradable asset: the ticker symbol and the market data provider's id for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub symbol: String,
    pub coin_id: String,
}

impl Asset {
    pub fn new(symbol: impl Into<String>, coin_id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            coin_id: coin_id.into(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.coin_id)
    }
}

/// Parses `SYMBOL:coin-id`, e.g. `ETH:ethereum`.
impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((symbol, coin_id)) if !symbol.trim().is_empty() && !coin_id.trim().is_empty() => {
                Ok(Asset::new(symbol.trim().to_uppercase(), coin_id.trim()))
            }
            _ => Err(format!("expected SYMBOL:coin-id, got \"{s}\"")),
        }
    }
}

// symbol -> CoinGecko coin id, in output order
const COINS: [(&str, &str); 40] = [
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("TON", "the-open-network"),
    ("ADA", "cardano"),
    ("DOGE", "dogecoin"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("DOT", "polkadot"),
    ("UNI", "uniswap"),
    ("NEAR", "near"),
    ("SUI", "sui"),
    ("PEPE", "pepe"),
    ("TAO", "bittensor"),
    ("ICP", "internet-computer"),
    ("POL", "polygon-ecosystem-token"),
    ("IMX", "immutable-x"),
    ("AAVE", "aave"),
    ("RNDR", "render-token"),
    ("FIL", "filecoin"),
    ("INJ", "injective-protocol"),
    ("OP", "optimism"),
    ("MKR", "maker"),
    ("AR", "arweave"),
    ("SEI", "sei-network"),
    ("TIA", "celestia"),
    ("JUP", "jupiter-exchange-solana"),
    ("LDO", "lido-dao"),
    ("ONDO", "ondo-finance"),
    ("POPCAT", "popcat"),
    ("BEAM", "beam-2"),
    ("CKB", "nervos-network"),
    ("FLR", "flare-networks"),
    ("STRK", "starknet"),
    ("PENDLE", "pendle"),
    ("AERO", "aerodrome-finance"),
    ("CAKE", "pancakeswap-token"),
    ("ZRO", "layerzero"),
    ("ZK", "zksync"),
    ("MOG", "mog-coin"),
    ("AXL", "axelar"),
];

/// Tokens tracked for CEX trading volume.
pub const CEX_TOKENS: [&str; 22] = [
    "ETH", "SOL", "TON", "LINK", "UNI", "PEPE", "POL", "IMX", "AAVE", "RNDR", "INJ", "MKR", "LDO",
    "ONDO", "BEAM", "STRK", "PENDLE", "CAKE", "ZRO", "ZK", "MOG", "AXL",
];

/// The default market data assets, in output order.
pub fn default_assets() -> Vec<Asset> {
    COINS
        .iter()
        .map(|(symbol, coin_id)| Asset::new(*symbol, *coin_id))
        .collect()
}

/// The default CEX volume tokens, in output order.
pub fn default_cex_tokens() -> Vec<String> {
    CEX_TOKENS.iter().map(|token| token.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_asset() {
        let asset: Asset = "eth:ethereum".parse().unwrap();
        assert_eq!(asset, Asset::new("ETH", "ethereum"));
        assert!("ethereum".parse::<Asset>().is_err());
        assert!("ETH:".parse::<Asset>().is_err());
    }

    #[test]
    fn defaults_are_unique() {
        let assets = default_assets();
        let mut symbols: Vec<&str> = assets.iter().map(|a| a.symbol.as_str()).collect();
        symbols.sort();
        symbols.dedup();
        assert_eq!(symbols.len(), assets.len());
        assert_eq!(assets[0], Asset::new("ETH", "ethereum"));
    }
}
