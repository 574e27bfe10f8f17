//! Concurrency tests for `SessionCrypto`.

use std::sync::Arc;

use wyrmgate_crypto::{KeystreamCipher, SessionCrypto, SessionKeys};

fn seeded_pair() -> (Arc<SessionCrypto>, Arc<SessionCrypto>) {
    let keys = SessionKeys::generate();
    let server = SessionCrypto::new();
    let client = SessionCrypto::new();
    server.seed(&KeystreamCipher, &keys).unwrap();
    client.seed(&KeystreamCipher, &keys.mirrored()).unwrap();
    (Arc::new(server), Arc::new(client))
}

#[test]
fn test_encrypt_and_decrypt_run_concurrently_on_one_session() {
    let (server, client) = seeded_pair();

    let inbound: Vec<Vec<u8>> = (0..500u32)
        .map(|i| client.encrypt(&i.to_le_bytes()).unwrap())
        .collect();

    std::thread::scope(|s| {
        let decrypter = Arc::clone(&server);
        s.spawn(move || {
            for (i, frame) in inbound.iter().enumerate() {
                let plain = decrypter.decrypt(frame).unwrap();
                assert_eq!(plain, (i as u32).to_le_bytes());
            }
        });

        let encrypter = Arc::clone(&server);
        s.spawn(move || {
            for i in 0..500u32 {
                encrypter.encrypt(&i.to_le_bytes()).unwrap();
            }
        });
    });
}

#[test]
fn test_sessions_do_not_share_cipher_state() {
    let (server_a, client_a) = seeded_pair();
    let (server_b, client_b) = seeded_pair();

    // Interleaving traffic on B must not disturb A's counters.
    let a1 = client_a.encrypt(b"a1").unwrap();
    let b1 = client_b.encrypt(b"b1").unwrap();
    let b2 = client_b.encrypt(b"b2").unwrap();
    let a2 = client_a.encrypt(b"a2").unwrap();

    assert_eq!(server_b.decrypt(&b1).unwrap(), b"b1");
    assert_eq!(server_a.decrypt(&a1).unwrap(), b"a1");
    assert_eq!(server_a.decrypt(&a2).unwrap(), b"a2");
    assert_eq!(server_b.decrypt(&b2).unwrap(), b"b2");

    // A's frame is meaningless under B's keys.
    let a3 = client_a.encrypt(b"a3").unwrap();
    assert!(server_b.decrypt(&a3).is_err());
}

#[test]
fn test_concurrent_encrypts_each_decrypt_in_lock_order() {
    let (server, client) = seeded_pair();
    let produced = encrypt_from_threads(&server);

    for (expected, frame) in produced {
        assert_eq!(client.decrypt(&frame).unwrap(), expected);
    }
}

// Encrypts from several threads, recording each frame in the order the
// encrypt lock was acquired.
fn encrypt_from_threads(server: &Arc<SessionCrypto>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let log = std::sync::Mutex::new(Vec::new());
    std::thread::scope(|s| {
        for t in 0..4u8 {
            let log = &log;
            let server = Arc::clone(server);
            s.spawn(move || {
                for i in 0..50u8 {
                    let plain = vec![t, i];
                    // Hold the log lock across encrypt so log order matches counter order.
                    let mut log = log.lock().unwrap();
                    let frame = server.encrypt(&plain).unwrap();
                    log.push((plain, frame));
                }
            });
        }
    });
    log.into_inner().unwrap()
}
