// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

//! End-to-end tests driving [`EthClient`] against a scripted server.

use ethxt::{Abi, EthClient, Error, RpcClient, rpc_params};
use ethxt_rpcs::client::mock_transport::mock_connection;
use serde_json::json;

const ERC20: &str = r#"[
    {
        "type": "function",
        "name": "balanceOf",
        "inputs": [{"name": "owner", "type": "address"}],
        "outputs": [{"name": "balance", "type": "uint256"}]
    },
    {
        "type": "event",
        "name": "Transfer",
        "inputs": [
            {"name": "from", "type": "address", "indexed": true},
            {"name": "to", "type": "address", "indexed": true},
            {"name": "value", "type": "uint256", "indexed": false}
        ]
    }
]"#;

const TOKEN: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
const OWNER: &str = "0x0000000000000000000000000000000000000001";

fn client_and_server() -> (EthClient, ethxt_rpcs::client::mock_transport::MockServer) {
    let (connector, server) = mock_connection();
    let rpc = RpcClient::builder().build_with(connector);
    (EthClient::from_rpc_client(rpc), server)
}

#[tokio::test]
async fn eth_call_round_trips_through_the_abi() {
    let (client, mut server) = client_and_server();
    let abi = Abi::from_json(ERC20).unwrap();

    let server_task = tokio::spawn(async move {
        let mut conn = server.next_connection().await;
        let q = conn.next_request().await.unwrap();

        assert_eq!(q["method"], "eth_call");
        assert_eq!(q["params"][1], "latest");
        assert_eq!(q["params"][0]["to"], TOKEN);

        // The call data is the balanceOf(address) selector followed by
        // the zero-padded owner address.
        assert_eq!(
            q["params"][0]["data"],
            "0x70a082310000000000000000000000000000000000000000000000000000000000000001"
        );

        // Return uint256 1000.
        conn.send_json(json!({
            "jsonrpc": "2.0",
            "id": q["id"],
            "result": "0x00000000000000000000000000000000000000000000000000000000000003e8",
        }));
        conn
    });

    let balance = client
        .call(TOKEN, &abi, "balanceOf", &json!({ "owner": OWNER }))
        .await
        .unwrap();
    assert_eq!(balance, json!({ "balance": "1000" }));

    let _conn = server_task.await.unwrap();
}

#[tokio::test]
async fn eth_call_surfaces_node_errors_verbatim() {
    let (client, mut server) = client_and_server();
    let abi = Abi::from_json(ERC20).unwrap();

    let server_task = tokio::spawn(async move {
        let mut conn = server.next_connection().await;
        let q = conn.next_request().await.unwrap();
        conn.send_json(json!({
            "jsonrpc": "2.0",
            "id": q["id"],
            "error": { "code": 3, "message": "execution reverted", "data": "0x" },
        }));
        conn
    });

    let err = client
        .call(TOKEN, &abi, "balanceOf", &json!({ "owner": OWNER }))
        .await
        .unwrap_err();

    match err {
        Error::Rpc(ethxt_rpcs::Error::Server(err)) => assert_eq!(
            err,
            json!({ "code": 3, "message": "execution reverted", "data": "0x" })
        ),
        other => panic!("expected the server's error object, got {other}"),
    }

    let _conn = server_task.await.unwrap();
}

#[tokio::test]
async fn unknown_functions_fail_before_anything_is_sent() {
    let (client, _server) = client_and_server();
    let abi = Abi::from_json(ERC20).unwrap();

    let err = client
        .call(TOKEN, &abi, "mint", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Abi(ethxt::abi::Error::UnknownFunction(_))
    ));
}

#[tokio::test]
async fn subscriptions_stream_through_the_client() {
    let (client, mut server) = client_and_server();

    let server_task = tokio::spawn(async move {
        let mut conn = server.next_connection().await;
        let q = conn.next_request().await.unwrap();
        assert_eq!(q["method"], "eth_subscribe");
        conn.send_json(json!({ "jsonrpc": "2.0", "id": q["id"], "result": "0x07" }));
        conn.send_json(json!({
            "jsonrpc": "2.0", "method": "eth_subscription",
            "params": { "subscription": "0x07", "result": { "number": "0x1" } },
        }));
        conn
    });

    let mut sub = client.subscribe(rpc_params!["newHeads"]).await.unwrap();
    assert_eq!(
        sub.next().await.unwrap().unwrap(),
        json!({ "number": "0x1" })
    );

    let _conn = server_task.await.unwrap();
}
