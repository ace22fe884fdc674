//! Many clients at once: every frame is handled exactly once, in order,
//! and replies never cross connections.

mod common;

use std::collections::HashSet;

use common::*;
use dwauth::prelude::*;
use dwauth_protocol::messages::{LoginResult, ServerIp};

const CONNECTIONS: usize = 16;
const FRAMES_PER_CONNECTION: i32 = 40;

fn directory() -> MemoryDirectory {
    (1..=FRAMES_PER_CONNECTION).fold(MemoryDirectory::new(), |dir, id| {
        dir.with_server(ServerRecord {
            id,
            name: format!("server-{id}"),
            ip: format!("10.0.0.{id}"),
            port: 7000 + id as u16,
        })
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_get_ordered_private_replies() {
    let switch = CipherSwitch::in_memory(true);
    let config = ServerConfig {
        auto_create_accounts: true,
        ..test_config()
    };
    let (server, _) = start(config, directory(), switch.clone()).await;
    let addr = server.local_addr();

    let mut tasks = Vec::new();
    for n in 0..CONNECTIONS {
        let switch = switch.clone();
        tasks.push(tokio::spawn(async move {
            let (mut client, _) = TestClient::connect_greeted(addr, &switch).await;
            client.send(&login_frame(&format!("user{n}"), "pw")).await;
            let login = LoginResult::from_frame(&client.recv().await).unwrap();
            assert_eq!(login, LoginResult::success());

            // All requests back to back, dribbled out in odd-sized writes
            // so frames straddle reads.
            let mut bytes = Vec::new();
            for id in 1..=FRAMES_PER_CONNECTION {
                bytes.extend(client.wire(&server_ip_frame(id)));
            }
            for chunk in bytes.chunks(7) {
                client.send_bytes(chunk).await;
            }

            let mut account = None;
            for id in 1..=FRAMES_PER_CONNECTION {
                let reply = ServerIp::from_frame(&client.recv().await).unwrap();
                assert_eq!(reply.ip, format!("10.0.0.{id}"), "reply out of order");
                assert_eq!(*account.get_or_insert(reply.account_id), reply.account_id);
            }
            // Keep the client so the connection is still live when counted.
            (account.unwrap(), client)
        }));
    }

    let mut accounts = HashSet::new();
    let mut clients = Vec::new();
    for task in tasks {
        let (account, client) = task.await.unwrap();
        accounts.insert(account);
        clients.push(client);
    }
    // One distinct account per connection: no reply reached the wrong client.
    assert_eq!(accounts.len(), CONNECTIONS);
    assert_eq!(server.connection_count().await, CONNECTIONS);

    server.stop().await;
    assert_eq!(server.connection_count().await, 0);
    for mut client in clients {
        assert!(client.closed_by_server().await);
    }
}
