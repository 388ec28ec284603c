//! Response envelope and typed payloads for the Kraken REST API

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{KrakenError, Result};

// =============================================================================
// Envelope
// =============================================================================

/// Uniform wrapper returned by every endpoint
///
/// A non-empty `errors` list is the exchange reporting a failure; check it
/// before trusting `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    #[serde(rename = "error", default)]
    pub errors: Vec<String>,
    pub result: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Result payload, only when no errors were reported
    pub fn result(&self) -> Option<&T> {
        if self.is_success() {
            self.result.as_ref()
        } else {
            None
        }
    }

    /// Collapse into a `Result`, turning exchange errors into `KrakenError::Api`
    pub fn into_result(self) -> Result<T> {
        if !self.errors.is_empty() {
            return Err(KrakenError::Api(self.errors));
        }
        self.result
            .ok_or_else(|| KrakenError::Api(vec!["response carried no result".to_string()]))
    }
}

// =============================================================================
// Public market data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTime {
    pub unixtime: i64,
    pub rfc1123: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Online,
    Maintenance,
    CancelOnly,
    PostOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub status: SystemState,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub aclass: String,
    pub altname: String,
    pub decimals: u32,
    pub display_decimals: u32,
}

/// Ticker for one pair, keyed by pair name in the result map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerInfo {
    /// Ask `[price, whole lot volume, lot volume]`
    #[serde(rename = "a")]
    pub ask: Vec<Decimal>,
    /// Bid `[price, whole lot volume, lot volume]`
    #[serde(rename = "b")]
    pub bid: Vec<Decimal>,
    /// Last trade `[price, lot volume]`
    #[serde(rename = "c")]
    pub last_trade: Vec<Decimal>,
    /// Volume `[today, last 24 hours]`
    #[serde(rename = "v")]
    pub volume: Vec<Decimal>,
    /// Number of trades `[today, last 24 hours]`
    #[serde(rename = "t")]
    pub trades: Vec<u64>,
    #[serde(rename = "l")]
    pub low: Vec<Decimal>,
    #[serde(rename = "h")]
    pub high: Vec<Decimal>,
    #[serde(rename = "o")]
    pub open: Decimal,
}

impl TickerInfo {
    pub fn last_price(&self) -> Option<Decimal> {
        self.last_trade.first().copied()
    }
}

// =============================================================================
// Private account data
// =============================================================================

/// Asset name to balance
pub type Balances = HashMap<String, Decimal>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeBalance {
    #[serde(rename = "eb")]
    pub equivalent_balance: Decimal,
    #[serde(rename = "tb")]
    pub trade_balance: Decimal,
    #[serde(rename = "m")]
    pub margin: Decimal,
    #[serde(rename = "n")]
    pub unrealized_pnl: Decimal,
    #[serde(rename = "c")]
    pub cost_basis: Decimal,
    #[serde(rename = "v")]
    pub valuation: Decimal,
    #[serde(rename = "e")]
    pub equity: Decimal,
    #[serde(rename = "mf")]
    pub free_margin: Decimal,
    #[serde(rename = "ml", default)]
    pub margin_level: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDescription {
    pub pair: String,
    #[serde(rename = "type")]
    pub side: String,
    pub ordertype: String,
    pub price: Decimal,
    pub order: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub status: String,
    pub opentm: f64,
    pub vol: Decimal,
    pub vol_exec: Decimal,
    pub descr: OrderDescription,
    #[serde(default)]
    pub userref: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrders {
    pub open: HashMap<String, OrderInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInfo {
    pub ordertxid: String,
    pub pair: String,
    pub time: f64,
    #[serde(rename = "type")]
    pub side: String,
    pub ordertype: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub fee: Decimal,
    pub vol: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradesHistory {
    pub trades: HashMap<String, TradeInfo>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub refid: String,
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub asset: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledgers {
    pub ledger: HashMap<String, LedgerEntry>,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Foo {
        foo: i64,
    }

    #[test]
    fn test_envelope_success() {
        let env: ResponseEnvelope<Foo> =
            serde_json::from_str(r#"{"error":[],"result":{"foo":1}}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.result().map(|r| r.foo), Some(1));
    }

    #[test]
    fn test_envelope_error() {
        let env: ResponseEnvelope<Foo> =
            serde_json::from_str(r#"{"error":["EGeneral:Invalid arguments"],"result":null}"#)
                .unwrap();
        assert_eq!(env.errors, vec!["EGeneral:Invalid arguments".to_string()]);
        assert!(env.result().is_none());

        match env.into_result() {
            Err(KrakenError::Api(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_missing_result_field() {
        let env: ResponseEnvelope<Foo> =
            serde_json::from_str(r#"{"error":["EAPI:Invalid nonce"]}"#).unwrap();
        assert!(!env.is_success());
        assert!(env.result.is_none());
    }

    #[test]
    fn test_server_time() {
        let env: ResponseEnvelope<ServerTime> = serde_json::from_str(
            r#"{"error":[],"result":{"unixtime":1688669448,"rfc1123":"Thu, 06 Jul 23 18:50:48 +0000"}}"#,
        )
        .unwrap();
        assert_eq!(env.into_result().unwrap().unixtime, 1688669448);
    }

    #[test]
    fn test_system_status() {
        let status: SystemStatus = serde_json::from_str(
            r#"{"status":"cancel_only","timestamp":"2023-07-06T18:52:00Z"}"#,
        )
        .unwrap();
        assert_eq!(status.status, SystemState::CancelOnly);
    }

    #[test]
    fn test_ticker_info() {
        let json = r#"{
            "a": ["30300.10000", "1", "1.000"],
            "b": ["30300.00000", "1", "1.000"],
            "c": ["30303.20000", "0.00067643"],
            "v": ["4083.67001100", "4412.73601799"],
            "p": ["30706.77771", "30689.13205"],
            "t": [34619, 38907],
            "l": ["29868.30000", "29868.30000"],
            "h": ["31631.00000", "31631.00000"],
            "o": "30502.80000"
        }"#;
        let ticker: TickerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(ticker.last_price(), Some(dec!(30303.2)));
        assert_eq!(ticker.trades, vec![34619, 38907]);
        assert_eq!(ticker.open, dec!(30502.8));
    }

    #[test]
    fn test_balances() {
        let env: ResponseEnvelope<Balances> = serde_json::from_str(
            r#"{"error":[],"result":{"ZUSD":"171288.6158","XXBT":"0.0011000000"}}"#,
        )
        .unwrap();
        let balances = env.into_result().unwrap();
        assert_eq!(balances["ZUSD"], dec!(171288.6158));
        assert_eq!(balances["XXBT"], dec!(0.0011));
    }

    #[test]
    fn test_trade_balance_optional_margin_level() {
        let json = r#"{"eb":"1101.3425","tb":"392.2264","m":"7.0354","n":"-10.0232",
            "c":"21.1063","v":"31.1297","e":"382.2032","mf":"375.1678"}"#;
        let tb: TradeBalance = serde_json::from_str(json).unwrap();
        assert_eq!(tb.free_margin, dec!(375.1678));
        assert_eq!(tb.margin_level, None);
    }
}
