//! `LlmGateway` and `response_parser` working the way `adva_pipeline::extract`
//! drives them: a real HTTP round trip through a mocked Gemini endpoint, then
//! the raw text handed to `extract_json`/`assign_invoice_direction` exactly
//! as the pipeline would, across a classify call and an extract call for the
//! same document.

use std::sync::Arc;

use adva_core::rate_limiter::RateLimiter;
use adva_llm::response_parser::{assign_invoice_direction, extract_json};
use adva_llm::LlmGateway;
use adva_llm::LlmError;
use httpmock::prelude::*;
use serde_json::json;

fn gateway_against(server: &MockServer) -> LlmGateway {
    let limiter = Arc::new(RateLimiter::new(10_000, 1000));
    LlmGateway::new(server.url("/v1/models/gemini:generateContent"), "test-key", limiter).with_sleeper(|_| {})
}

fn gemini_text_response(text: &str) -> serde_json::Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

#[test]
fn classify_then_extract_round_trip_resolves_a_direction() {
    let server = MockServer::start();
    let gw = gateway_against(&server);

    let classify_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/models/gemini:generateContent");
        then.status(200).json_body(gemini_text_response(
            r#"```json
            {"documentType":"factura","confidence":0.92,"indicators":["CUIT","IVA"]}
            ```"#,
        ));
    });

    let classify_raw = gw.analyze_document(b"%PDF-1", "application/pdf", "classify this", 2).unwrap();
    let classify_json = extract_json(&classify_raw).unwrap();
    assert_eq!(classify_json["documentType"], "factura");
    classify_mock.assert_hits(1);
    classify_mock.delete();

    server.mock(|when, then| {
        when.method(POST).path("/v1/models/gemini:generateContent");
        then.status(200).json_body(gemini_text_response(
            r#"Here is the extracted invoice:
            {"cuitEmisor":"20123456786","razonSocialEmisor":"Proveedor SA",
             "cuitReceptor":"30709076783","razonSocialReceptor":"ADVA",
             "nombreEmisor":"Proveedor SA","nombreReceptor":"ADVA",
             "cuits":["20123456786","30709076783"]}"#,
        ));
    });

    let extract_raw = gw.analyze_document(b"%PDF-1", "application/pdf", "extract fields", 2).unwrap();
    let extract_json_value = extract_json(&extract_raw).unwrap();

    let name_issuer = extract_json_value["nombreEmisor"].as_str().unwrap();
    let name_receiver = extract_json_value["nombreReceptor"].as_str().unwrap();
    let cuits: Vec<String> =
        extract_json_value["cuits"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();

    let (direction, emisor, receptor) = assign_invoice_direction(name_issuer, name_receiver, &cuits).unwrap();
    assert_eq!(direction.to_string(), "factura_recibida");
    assert_eq!(emisor, "20123456786");
    assert_eq!(receptor, "30709076783");
}

#[test]
fn malformed_model_reply_surfaces_as_permanent_error_not_a_panic() {
    let server = MockServer::start();
    let gw = gateway_against(&server);

    server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(gemini_text_response("I couldn't read this document."));
    });

    let raw = gw.analyze_document(b"garbled", "application/pdf", "classify this", 0).unwrap();
    let err = extract_json(&raw).unwrap_err();
    assert!(matches!(err, LlmError::Permanent(_)));
}
