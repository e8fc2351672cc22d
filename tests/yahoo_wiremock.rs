use anyhow::Result;
use chrono::NaiveDate;
use meowney_backend::external::price_provider::{PriceProvider, PriceProviderError};
use meowney_backend::external::yahoo::YahooProvider;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHART_BODY: &str = r#"{
    "chart": {
        "result": [{
            "meta": {
                "symbol": "AAPL",
                "currency": "USD",
                "exchangeName": "NMS",
                "longName": "Apple Inc.",
                "regularMarketPrice": 182.5
            },
            "timestamp": [1704205800, 1704292200, 1704378600],
            "indicators": {"quote": [{"close": [185.6, 184.2, 181.9]}]}
        }],
        "error": null
    }
}"#;

#[tokio::test]
async fn yahoo_quote_uses_regular_market_price() -> Result<()> {
    let server = MockServer::start().await;
    let provider = YahooProvider::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(CHART_BODY, "application/json"))
        .mount(&server)
        .await;

    let quote = provider.fetch_quote("AAPL").await?;
    assert!(quote.valid);
    assert_eq!(quote.price, Some(182.5));
    assert_eq!(quote.currency.as_deref(), Some("USD"));
    assert_eq!(quote.name.as_deref(), Some("Apple Inc."));
    assert_eq!(quote.exchange.as_deref(), Some("NMS"));

    Ok(())
}

#[tokio::test]
async fn yahoo_quote_without_price_is_invalid() -> Result<()> {
    let server = MockServer::start().await;
    let provider = YahooProvider::new().with_base_url(server.uri());

    let body = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "USDKRW=X", "currency": "KRW"},
                "timestamp": [],
                "indicators": {"quote": [{"close": []}]}
            }],
            "error": null
        }
    }"#;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/USDKRW=X"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let quote = provider.fetch_quote("USDKRW=X").await?;
    assert!(!quote.valid);
    assert_eq!(quote.usable_price(), None);

    Ok(())
}

#[tokio::test]
async fn yahoo_maps_http_errors() -> Result<()> {
    let server = MockServer::start().await;
    let provider = YahooProvider::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/BUSY"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let missing = provider.fetch_quote("NOPE").await;
    assert!(matches!(missing, Err(PriceProviderError::NotFound(ref s)) if s == "NOPE"));

    let limited = provider.fetch_quote("BUSY").await;
    assert!(matches!(limited, Err(PriceProviderError::RateLimited)));

    Ok(())
}

#[tokio::test]
async fn yahoo_history_is_clipped_to_requested_range() -> Result<()> {
    let server = MockServer::start().await;
    let provider = YahooProvider::new().with_base_url(server.uri());

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(CHART_BODY, "application/json"))
        .mount(&server)
        .await;

    let day = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
    let points = provider.fetch_daily_history("AAPL", day, day).await?;
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].date, day);
    assert_eq!(points[0].close, 184.2);

    let requests = server.received_requests().await.unwrap_or_default();
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(query.contains("period1=1704240000"), "{query}");
    assert!(query.contains("period2=1704326400"), "{query}");

    Ok(())
}
