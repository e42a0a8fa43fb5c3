//! End-to-end submission against a mock node

use entry_submitter::payload::{arg, build_entry_function};
use entry_submitter::{
    Account, ClientError, FaucetClient, PollingConfig, RestClient, SubmitOptions,
    SubmitterConfig, TransactionStatus, TransactionSubmitter,
};

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const PRIVATE_KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";
const SIGNING_MESSAGE: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

fn polling() -> PollingConfig {
    PollingConfig {
        timeout_secs: 5,
        poll_interval_ms: 5,
        max_retries: 2,
        retry_delay_ms: 1,
    }
}

fn rest(server: &ServerGuard) -> Arc<RestClient> {
    Arc::new(
        RestClient::new(server.url())
            .unwrap()
            .with_retry_policy(2, Duration::from_millis(1)),
    )
}

async fn mock_account(server: &mut ServerGuard, account: &Account, sequence: u64) {
    server
        .mock("GET", format!("/accounts/{}", account.address()).as_str())
        .with_status(200)
        .with_body(json!({"sequence_number": sequence.to_string(), "authentication_key": account.address()}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/estimate_gas_price")
        .with_status(200)
        .with_body(r#"{"gas_estimate":100}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/transactions/encode_submission")
        .with_status(200)
        .with_body(format!("\"0x{}\"", hex::encode(SIGNING_MESSAGE)))
        .create_async()
        .await;
}

#[tokio::test]
async fn test_submit_then_confirm() {
    let account = Account::from_hex(PRIVATE_KEY).unwrap();
    let mut server = Server::new_async().await;
    mock_account(&mut server, &account, 5).await;

    let expected_signature = format!("0x{}", hex::encode(account.sign(&SIGNING_MESSAGE)));
    let submit = server
        .mock("POST", "/transactions")
        .match_body(Matcher::PartialJson(json!({
            "sender": account.address(),
            "sequence_number": "5",
            "gas_unit_price": "100",
            "max_gas_amount": "2000",
            "payload": {
                "function": "0x0000000000000000000000000000000000000000000000000000000000000abc::M::f",
                "arguments": ["x", "1"]
            },
            "signature": {
                "type": "ed25519_signature",
                "public_key": format!("0x{}", hex::encode(account.public_key())),
                "signature": expected_signature,
            }
        })))
        .with_status(202)
        .with_body(r#"{"hash":"0xa11ce"}"#)
        .expect(1)
        .create_async()
        .await;

    let pending = server
        .mock("GET", "/transactions/by_hash/0xa11ce")
        .with_status(200)
        .with_body(r#"{"type":"pending_transaction","hash":"0xa11ce"}"#)
        .expect(1)
        .create_async()
        .await;
    let committed = server
        .mock("GET", "/transactions/by_hash/0xa11ce")
        .with_status(200)
        .with_body(
            r#"{"type":"user_transaction","hash":"0xa11ce","success":true,"vm_status":"Executed successfully","version":"100","gas_used":"9"}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let submitter =
        TransactionSubmitter::new(rest(&server), &SubmitterConfig::default(), polling());
    let payload = build_entry_function(
        "0xabc::M",
        "f",
        Vec::<String>::new(),
        vec![arg::string("x"), arg::u64(1)],
    )
    .unwrap();

    let submitted = submitter
        .submit(&account, payload, &SubmitOptions::default())
        .await
        .unwrap();
    assert_eq!(submitted.hash, "0xa11ce");
    assert_eq!(submitted.status, TransactionStatus::Pending);

    let result = submitter.wait(&submitted.hash).await.unwrap();
    assert_eq!(result.hash, "0xa11ce");
    assert_eq!(result.status, TransactionStatus::Committed);
    assert_eq!(result.version, Some(100));

    submit.assert_async().await;
    pending.assert_async().await;
    committed.assert_async().await;
}

#[tokio::test]
async fn test_rejected_submission_is_not_retried() {
    let account = Account::from_hex(PRIVATE_KEY).unwrap();
    let mut server = Server::new_async().await;
    mock_account(&mut server, &account, 5).await;

    let submit = server
        .mock("POST", "/transactions")
        .with_status(400)
        .with_body(r#"{"message":"insufficient balance"}"#)
        .expect(1)
        .create_async()
        .await;

    let submitter =
        TransactionSubmitter::new(rest(&server), &SubmitterConfig::default(), polling());
    let payload = build_entry_function("0xabc::M", "f", Vec::<String>::new(), vec![]).unwrap();

    let err = submitter
        .submit_with_refetch(&account, payload, &SubmitOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::SubmissionRejected { ref detail, .. } if detail == "insufficient balance"
    ));
    submit.assert_async().await;
}

#[tokio::test]
async fn test_faucet_funds_and_waits() {
    let account = Account::generate();
    let mut faucet = Server::new_async().await;
    let mut node = Server::new_async().await;

    let mint = faucet
        .mock("POST", "/mint")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("amount".into(), "100000000".into()),
            Matcher::UrlEncoded("address".into(), account.address().to_string()),
        ]))
        .with_status(200)
        .with_body(r#"["0xf1"]"#)
        .expect(1)
        .create_async()
        .await;
    node.mock("GET", "/transactions/by_hash/0xf1")
        .with_status(200)
        .with_body(r#"{"type":"user_transaction","hash":"0xf1","success":true,"vm_status":"Executed successfully"}"#)
        .create_async()
        .await;

    FaucetClient::new(faucet.url(), rest(&node), polling())
        .fund(account.address(), 100_000_000)
        .await
        .unwrap();
    mint.assert_async().await;
}

#[tokio::test]
async fn test_faucet_error_is_surfaced() {
    let mut faucet = Server::new_async().await;
    let node = Server::new_async().await;

    faucet
        .mock("POST", "/mint")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("faucet drained")
        .create_async()
        .await;

    let err = FaucetClient::new(faucet.url(), rest(&node), polling())
        .fund(Account::generate().address(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Node { status_code: 500, .. }));
}
