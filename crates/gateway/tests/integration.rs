//! Provider HTTP mapping tests against a mock server

use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use unionpay_gateway::{
    GatewayConfig, MobileMoneyGateway, PaymentGateway, ProviderId, ProviderSettings,
    SettlementRequest, SettlementResult, StatusResult,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(phone: &str) -> SettlementRequest {
    SettlementRequest {
        amount: dec!(5000),
        recipient_phone: phone.to_string(),
        recipient_name: "Member One".to_string(),
        purpose: "Travel reimbursement".to_string(),
        transaction_reference: "ISS-20260101120000-ABCDEF012345".to_string(),
        initiator: "signatory-1".to_string(),
    }
}

fn gateway_for(server: &MockServer) -> MobileMoneyGateway {
    let config = GatewayConfig {
        vodacom: ProviderSettings::new(server.uri()).enabled("voda-key"),
        tigo: ProviderSettings::new(server.uri()).enabled("tigo-key"),
        airtel: ProviderSettings::new(server.uri()).enabled("airtel-key"),
        ..GatewayConfig::default()
    };
    MobileMoneyGateway::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_vodacom_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .and(header("authorization", "Bearer voda-key"))
        .and(body_partial_json(json!({
            "PartyB": "255754000111",
            "AccountReference": "ISS-20260101120000-ABCDEF012345",
            "TransactionType": "CustomerPayBillOnline",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResponseCode": "0",
            "CheckoutRequestID": "ws_CO_123",
            "ResponseDescription": "Success. Request accepted for processing",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let provider = gateway.route("0754 000 111").unwrap();
    assert_eq!(provider, ProviderId::Vodacom);

    match gateway.submit(provider, request("0754 000 111")).await {
        SettlementResult::Success {
            provider,
            provider_reference,
            raw,
        } => {
            assert_eq!(provider, ProviderId::Vodacom);
            assert_eq!(provider_reference, "ws_CO_123");
            assert_eq!(raw["ResponseCode"], "0");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_vodacom_failure_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mpesa/stkpush/v1/processrequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResponseCode": "1",
            "ResponseDescription": "insufficient balance",
        })))
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .submit(ProviderId::Vodacom, request("0754000111"))
        .await;
    assert_eq!(
        result,
        SettlementResult::failure(ProviderId::Vodacom, "insufficient balance")
    );
}

#[tokio::test]
async fn test_tigo_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/request"))
        .and(body_partial_json(json!({"phone": "255713000111"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "transaction_id": "TG-77",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/request"))
        .and(body_partial_json(json!({"phone": "255713999999"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "subscriber not found",
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let ok = gateway.submit(ProviderId::Tigo, request("0713000111")).await;
    assert!(matches!(
        ok,
        SettlementResult::Success { ref provider_reference, .. } if provider_reference == "TG-77"
    ));

    let failed = gateway.submit(ProviderId::Tigo, request("0713999999")).await;
    assert_eq!(
        failed,
        SettlementResult::failure(ProviderId::Tigo, "subscriber not found")
    );
}

#[tokio::test]
async fn test_airtel_sends_country_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/merchant/v1/payments/"))
        .and(header("X-Country", "TZ"))
        .and(header("X-Currency", "TZS"))
        .and(body_partial_json(json!({
            "subscriber": {"msisdn": "255689000111"},
            "transaction": {"id": "ISS-20260101120000-ABCDEF012345"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "200", "message": "SUCCESS"},
            "data": {"transaction": {"id": "AM-5", "status": "TIP"}},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let provider = gateway.route("+255 689 000 111").unwrap();
    assert_eq!(provider, ProviderId::Airtel);

    let result = gateway.submit(provider, request("+255 689 000 111")).await;
    assert!(matches!(
        result,
        SettlementResult::Success { ref provider_reference, .. } if provider_reference == "AM-5"
    ));
}

#[tokio::test]
async fn test_http_error_becomes_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/merchant/v1/payments/"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "status": {"code": "503", "message": "maintenance"},
        })))
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .submit(ProviderId::Airtel, request("0689000111"))
        .await;
    assert_eq!(
        result,
        SettlementResult::failure(ProviderId::Airtel, "Airtel API returned HTTP 503: maintenance")
    );
}

#[tokio::test]
async fn test_timeout_becomes_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/payments/request"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success", "transaction_id": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = GatewayConfig {
        timeout_secs: 1,
        tigo: ProviderSettings::new(server.uri()).enabled("tigo-key"),
        ..GatewayConfig::default()
    };
    let gateway = MobileMoneyGateway::from_config(&config).unwrap();

    let result = gateway.submit(ProviderId::Tigo, request("0713000111")).await;
    assert_eq!(
        result,
        SettlementResult::failure(ProviderId::Tigo, "Tigo API request timed out")
    );
}

#[tokio::test]
async fn test_unreachable_provider_becomes_failure() {
    let config = GatewayConfig {
        vodacom: ProviderSettings::new("http://127.0.0.1:9").enabled("k"),
        ..GatewayConfig::default()
    };
    let gateway = MobileMoneyGateway::from_config(&config).unwrap();

    let result = gateway.submit(ProviderId::Vodacom, request("0754000111")).await;
    match result {
        SettlementResult::Failure { provider, error } => {
            assert_eq!(provider, ProviderId::Vodacom);
            assert!(error.starts_with("Vodacom API request"), "{error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_status_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mpesa/stkpush/v1/status/ws_CO_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultCode": "0",
            "ResultDesc": "The service request is processed successfully.",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payments/TG-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/standard/v1/payments/AM-1"))
        .and(header("X-Country", "TZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"transaction": {"status": "TF", "message": "Transaction declined"}},
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    assert_eq!(
        gateway.check_status(ProviderId::Vodacom, "ws_CO_1").await,
        StatusResult::Completed
    );
    assert_eq!(
        gateway.check_status(ProviderId::Tigo, "TG-1").await,
        StatusResult::Pending
    );
    assert_eq!(
        gateway.check_status(ProviderId::Airtel, "AM-1").await,
        StatusResult::Failed {
            reason: "Transaction declined".to_string()
        }
    );
    assert!(matches!(
        gateway.check_status(ProviderId::Tigo, "missing").await,
        StatusResult::Unknown { .. }
    ));
}
