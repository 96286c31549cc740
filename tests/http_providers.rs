use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use defi_portfolio_tracker::error::WalletError;
use defi_portfolio_tracker::models::ChainRegistry;
use defi_portfolio_tracker::providers::{
    CoinGeckoPriceProvider, PriceSource, RateGovernor, RpcDataProvider, RpcWalletProvider,
};
use defi_portfolio_tracker::tracker::ChainBalanceReader;
use defi_portfolio_tracker::traits::{PriceFeed, PriceFeedError, WalletProvider};
use defi_portfolio_tracker::utils::clock::{Clock, SystemClock};

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// JSON-RPC reply that echoes the request id
struct RpcReply(serde_json::Value);

impl Respond for RpcReply {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request
            .body_json::<serde_json::Value>()
            .ok()
            .and_then(|body| body.get("id").cloned())
            .unwrap_or(json!(1));
        let mut body = self.0.clone();
        body["jsonrpc"] = json!("2.0");
        body["id"] = id;
        ResponseTemplate::new(200).set_body_json(body)
    }
}

fn rpc_result(result: serde_json::Value) -> RpcReply {
    RpcReply(json!({ "result": result }))
}

fn rpc_error(code: i64, message: &str) -> RpcReply {
    RpcReply(json!({ "error": { "code": code, "message": message } }))
}

#[tokio::test]
async fn coingecko_quotes_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ethereum,tether"))
        .and(query_param("include_24hr_change", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ethereum": { "usd": 3150.25, "usd_24h_change": 2.5 },
            "tether": { "usd": 1.0, "usd_24h_change": -0.01 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let feed = CoinGeckoPriceProvider::new(server.uri(), None);
    let quotes = feed.fetch_quotes(&ids(&["ethereum", "tether"])).await.unwrap();

    assert_eq!(quotes["ethereum"].usd, 3150.25);
    assert_eq!(quotes["ethereum"].usd_24h_change, 2.5);
    assert_eq!(quotes["tether"].usd_24h_change, -0.01);
}

#[tokio::test]
async fn coingecko_api_key_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("x_cg_pro_api_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ethereum": { "usd": 3000.0 } })))
        .expect(1)
        .mount(&server)
        .await;

    let feed = CoinGeckoPriceProvider::new(server.uri(), Some("secret".to_string()));
    assert!(feed.has_api_key());
    let quotes = feed.fetch_quotes(&ids(&["ethereum"])).await.unwrap();
    assert_eq!(quotes["ethereum"].usd_24h_change, 0.0);
}

#[tokio::test]
async fn coingecko_429_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let feed = CoinGeckoPriceProvider::new(server.uri(), None);
    let err = feed.fetch_quotes(&ids(&["ethereum"])).await.unwrap_err();
    assert!(matches!(err, PriceFeedError::RateLimited));
}

#[tokio::test]
async fn coingecko_malformed_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "an", "object"])))
        .mount(&server)
        .await;

    let feed = CoinGeckoPriceProvider::new(server.uri(), None);
    let err = feed.fetch_quotes(&ids(&["ethereum"])).await.unwrap_err();
    assert!(matches!(err, PriceFeedError::Malformed(_)));
}

#[tokio::test]
async fn price_source_falls_back_when_upstream_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = PriceSource::new(
        Arc::new(CoinGeckoPriceProvider::new(server.uri(), None)),
        RateGovernor::free_tier(clock.clone()),
        clock,
    );

    let quotes = source.fetch_prices(&ids(&["ethereum", "usd-coin", "shiba-inu"])).await;
    assert_eq!(quotes.len(), 3);
    assert!(quotes["ethereum"].usd > 1500.0);
    assert!((quotes["usd-coin"].usd - 1.0).abs() < 0.05);
    assert_eq!(quotes["shiba-inu"].usd, 1.0);
}

#[tokio::test]
async fn balances_are_read_through_the_rpc_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getBalance" })))
        .respond_with(rpc_result(json!("0x1bc16d674ec80000")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_call" })))
        .respond_with(rpc_result(json!("0x000000000000000000000000000000000000000000000000000000003b9aca00")))
        .mount(&server)
        .await;

    let mut chains = ChainRegistry::default();
    chains.set_rpc_url(1, server.uri());
    let reader = ChainBalanceReader::new(Arc::new(RpcDataProvider::new()), chains);

    let balances = reader.read_balances(&Address::repeat_byte(0x11), 1).await.unwrap();
    let by_symbol: Vec<(&str, &str)> = balances
        .iter()
        .map(|b| (b.token.symbol.as_str(), b.balance.as_str()))
        .collect();

    assert_eq!(
        by_symbol,
        vec![("ETH", "2"), ("USDC", "1000"), ("USDT", "1000"), ("WBTC", "10")]
    );
}

#[tokio::test]
async fn reverted_token_calls_read_as_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getBalance" })))
        .respond_with(rpc_result(json!("0xde0b6b3a7640000")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_call" })))
        .respond_with(rpc_error(3, "execution reverted"))
        .mount(&server)
        .await;

    let mut chains = ChainRegistry::default();
    chains.set_rpc_url(137, server.uri());
    let reader = ChainBalanceReader::new(Arc::new(RpcDataProvider::new()), chains);

    let balances = reader.read_balances(&Address::repeat_byte(0x22), 137).await.unwrap();
    assert_eq!(balances[0].token.symbol, "MATIC");
    assert_eq!(balances[0].balance, "1");
    assert!(balances[1..].iter().all(|b| b.balance == "0"));
}

#[tokio::test]
async fn wallet_switch_reports_unknown_chain() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "wallet_switchEthereumChain" })))
        .respond_with(rpc_error(4902, "Unrecognized chain ID"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_requestAccounts" })))
        .respond_with(rpc_result(json!(["0x00000000000000000000000000000000000a11ce"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_chainId" })))
        .respond_with(rpc_result(json!("0x89")))
        .mount(&server)
        .await;

    let wallet = RpcWalletProvider::new(server.uri()).unwrap();

    let accounts = wallet.request_accounts().await.unwrap();
    assert_eq!(accounts, vec!["0x00000000000000000000000000000000000a11ce".parse::<Address>().unwrap()]);
    assert_eq!(wallet.chain_id().await.unwrap(), 137);

    let err = wallet.switch_chain(137).await.unwrap_err();
    assert_eq!(err, WalletError::UnrecognizedChain(137));
}

#[tokio::test]
async fn wallet_acknowledges_switch_and_add() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "wallet_switchEthereumChain",
            "params": [{ "chainId": "0x89" }]
        })))
        .respond_with(rpc_result(serde_json::Value::Null))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "wallet_addEthereumChain",
            "params": [{ "chainId": "0x89", "nativeCurrency": { "symbol": "MATIC", "decimals": 18 } }]
        })))
        .respond_with(rpc_result(serde_json::Value::Null))
        .expect(1)
        .mount(&server)
        .await;

    let chains = ChainRegistry::default();
    let wallet = RpcWalletProvider::new(server.uri()).unwrap();

    wallet.add_chain(chains.get(137).unwrap()).await.unwrap();
    wallet.switch_chain(137).await.unwrap();
}

#[tokio::test]
async fn unreachable_wallet_is_missing() {
    // nothing listens on the discard port
    let wallet = RpcWalletProvider::new("http://127.0.0.1:9").unwrap();
    let err = tokio::time::timeout(Duration::from_secs(10), wallet.accounts())
        .await
        .expect("request hung")
        .unwrap_err();
    assert_eq!(err, WalletError::ProviderMissing);
}
