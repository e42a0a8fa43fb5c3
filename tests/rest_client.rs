//! RestClient against a mock node

use entry_submitter::payload::{arg, build_entry_function};
use entry_submitter::types::Ed25519Authenticator;
use entry_submitter::{
    AccountAddress, ClientError, NodeApi, RestClient, SignedTransaction, TransactionStatus,
    UnsignedTransaction,
};

use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const ADDRESS: &str = "0x0000000000000000000000000000000000000000000000000000000000000abc";

fn address() -> AccountAddress {
    ADDRESS.parse().unwrap()
}

fn client(server: &Server) -> RestClient {
    RestClient::new(server.url())
        .unwrap()
        .with_retry_policy(2, Duration::from_millis(1))
}

fn signed(sequence_number: u64) -> SignedTransaction {
    SignedTransaction::new(
        UnsignedTransaction {
            sender: address(),
            sequence_number,
            max_gas_amount: 2000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 1_700_000_000,
            payload: build_entry_function(
                "0xabc::M",
                "f",
                Vec::<String>::new(),
                vec![arg::string("x"), arg::u64(1)],
            )
            .unwrap(),
        },
        Ed25519Authenticator::new(&[7; 32], &[9; 64]),
    )
}

#[tokio::test]
async fn test_get_sequence_number() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", format!("/accounts/{}", ADDRESS).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sequence_number":"5","authentication_key":"0xabc"}"#)
        .create_async()
        .await;

    let sequence = client(&server).get_sequence_number(address()).await.unwrap();
    assert_eq!(sequence, 5);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_reads_retry_server_errors() {
    let mut server = Server::new_async().await;
    let path = format!("/accounts/{}", ADDRESS);
    let failing = server
        .mock("GET", path.as_str())
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let healthy = server
        .mock("GET", path.as_str())
        .with_status(200)
        .with_body(r#"{"sequence_number":"9","authentication_key":"0xabc"}"#)
        .expect(1)
        .create_async()
        .await;

    let sequence = client(&server).get_sequence_number(address()).await.unwrap();
    assert_eq!(sequence, 9);
    failing.assert_async().await;
    healthy.assert_async().await;
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", format!("/accounts/{}", ADDRESS).as_str())
        .with_status(404)
        .with_body(r#"{"message":"Account not found","error_code":"account_not_found"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = assert_err!(client(&server).get_sequence_number(address()).await);
    match err {
        ClientError::Node { status_code, body } => {
            assert_eq!(status_code, 404);
            assert!(body.contains("Account not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_estimate_gas_price_and_encode() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/estimate_gas_price")
        .with_status(200)
        .with_body(r#"{"gas_estimate":100,"prioritized_gas_estimate":150}"#)
        .create_async()
        .await;
    let encode = server
        .mock("POST", "/transactions/encode_submission")
        .match_body(Matcher::PartialJson(json!({
            "sender": ADDRESS,
            "sequence_number": "5",
            "payload": {
                "type": "entry_function_payload",
                "arguments": ["x", "1"]
            }
        })))
        .with_status(200)
        .with_body(r#""0xdeadbeef""#)
        .create_async()
        .await;

    let client = client(&server);
    assert_eq!(client.estimate_gas_price().await.unwrap(), 100);

    let message = client.encode_submission(signed(5).raw()).await.unwrap();
    assert_eq!(message, vec![0xde, 0xad, 0xbe, 0xef]);
    encode.assert_async().await;
}

#[tokio::test]
async fn test_submit_returns_hash() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/transactions")
        .match_body(Matcher::PartialJson(json!({
            "sequence_number": "5",
            "signature": {"type": "ed25519_signature"}
        })))
        .with_status(202)
        .with_body(r#"{"hash":"0xa11ce","sender":"0xabc","sequence_number":"5"}"#)
        .create_async()
        .await;

    let hash = assert_ok!(client(&server).submit_signed_transaction(&signed(5)).await);
    assert_eq!(hash, "0xa11ce");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_insufficient_balance_is_rejected_without_retry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/transactions")
        .with_status(400)
        .with_body(r#"{"message":"insufficient balance"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = client(&server)
        .submit_signed_transaction(&signed(5))
        .await
        .unwrap_err();
    match err {
        ClientError::SubmissionRejected {
            status_code,
            detail,
        } => {
            assert_eq!(status_code, 400);
            assert_eq!(detail, "insufficient balance");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_stale_sequence_is_conflict() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/transactions")
        .with_status(400)
        .with_body(
            r#"{"message":"Invalid transaction: Type: Validation Code: SEQUENCE_NUMBER_TOO_OLD","error_code":"vm_error","vm_error_code":3}"#,
        )
        .create_async()
        .await;

    let err = client(&server)
        .submit_signed_transaction(&signed(5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::SequenceNumberConflict { sequence_number: 5, ref address, .. } if address == ADDRESS
    ));
}

#[tokio::test]
async fn test_submit_server_error_is_retryable_node_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/transactions")
        .with_status(503)
        .with_body("mempool is full")
        .expect(1)
        .create_async()
        .await;

    let err = client(&server)
        .submit_signed_transaction(&signed(5))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, ClientError::Node { status_code: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unknown_hash_is_pending() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/transactions/by_hash/0xdead")
        .with_status(404)
        .with_body(r#"{"message":"Transaction not found","error_code":"transaction_not_found"}"#)
        .create_async()
        .await;

    let result = client(&server).get_transaction_by_hash("0xdead").await.unwrap();
    assert_eq!(result.status, TransactionStatus::Pending);
    assert!(!result.is_terminal());
}

#[tokio::test]
async fn test_wait_with_zero_timeout_never_submitted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/transactions/by_hash/0x0e")
        .with_status(404)
        .expect(0)
        .create_async()
        .await;

    let err = client(&server)
        .wait_for_transaction("0x0e", Duration::ZERO, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TimedOut { .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_wait_reports_failed_execution() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/transactions/by_hash/0xbad")
        .with_status(200)
        .with_body(
            json!({
                "type": "user_transaction",
                "hash": "0xbad",
                "success": false,
                "vm_status": "Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006)",
                "version": "77",
                "gas_used": "12"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server)
        .wait_for_transaction("0xbad", Duration::from_secs(5), Duration::from_millis(5))
        .await
        .unwrap();
    assert_eq!(result.status, TransactionStatus::Failed);
    assert_eq!(result.version, Some(77));
    assert!(result
        .error_detail
        .unwrap()
        .contains("EINSUFFICIENT_BALANCE"));
}

#[tokio::test]
async fn test_get_account_balance() {
    let mut server = Server::new_async().await;
    server
        .mock(
            "GET",
            Matcher::Regex(format!(r"^/accounts/{}/resource/0x1::coin::CoinStore.*$", ADDRESS)),
        )
        .with_status(200)
        .with_body(
            json!({
                "type": "0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>",
                "data": {"coin": {"value": "100000000"}, "frozen": false}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let balance = client(&server).get_account_balance(address()).await.unwrap();
    assert_eq!(balance, 100_000_000);
}
