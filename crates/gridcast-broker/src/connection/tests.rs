use super::WorkerConnection;
use crate::broker::BrokerOptions;
use gridcast_core::grid::Block;
use gridcast_core::{Error, wire};
use std::time::Duration;
use tokio::net::TcpListener;

fn test_opts() -> BrokerOptions {
    BrokerOptions {
        connect_timeout: Duration::from_secs(1),
        connect_retries: 0,
        connect_retry_delay: Duration::from_millis(10),
        reply_timeout: Duration::from_millis(200),
    }
}

async fn local_pair(opts: &BrokerOptions) -> (WorkerConnection, tokio::net::TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let connect = WorkerConnection::connect("127.0.0.1", port, 2, opts);
    let (conn, accepted) = tokio::join!(connect, listener.accept());
    (conn.unwrap(), accepted.unwrap().0)
}

fn sample_blocks() -> Vec<Block> {
    vec![
        Block::from_cells(3, 3, vec![0, 1, 0, 1, 0, 1, 0, 1, 0]).unwrap(),
        Block::from_cells(3, 4, vec![1; 12]).unwrap(),
    ]
}

#[tokio::test]
async fn payload_round_trip_against_echo_peer() {
    let opts = test_opts();
    let (mut conn, mut peer) = local_pair(&opts).await;

    let peer_task = tokio::spawn(async move {
        let body = wire::read_frame(&mut peer).await.unwrap();
        let blocks = wire::decode_payload(&body).unwrap();
        wire::write_frame(&mut peer, &wire::encode_payload(&blocks))
            .await
            .unwrap();
    });

    let blocks = sample_blocks();
    conn.send_payload(&blocks).await.unwrap();
    assert!(conn.awaiting_reply());
    let results = conn.recv_results(&opts).await.unwrap();
    assert!(!conn.awaiting_reply());
    assert_eq!(results, blocks);
    peer_task.await.unwrap();
}

#[tokio::test]
async fn double_send_violates_alternation() {
    let opts = test_opts();
    let (mut conn, _peer) = local_pair(&opts).await;

    let blocks = sample_blocks();
    conn.send_payload(&blocks).await.unwrap();
    let err = conn.send_payload(&blocks).await.unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "{err}");
}

#[tokio::test]
async fn recv_without_send_violates_alternation() {
    let opts = test_opts();
    let (mut conn, _peer) = local_pair(&opts).await;

    let err = conn.recv_results(&opts).await.unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "{err}");
}

#[tokio::test]
async fn silent_peer_times_out_the_reply() {
    let opts = test_opts();
    let (mut conn, _peer) = local_pair(&opts).await;

    conn.send_payload(&sample_blocks()).await.unwrap();
    let err = conn.recv_results(&opts).await.unwrap_err();
    match err {
        Error::Transport(e) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
        other => panic!("expected transport timeout, got {other}"),
    }
}

#[tokio::test]
async fn reply_count_must_mirror_request() {
    let opts = test_opts();
    let (mut conn, mut peer) = local_pair(&opts).await;

    let peer_task = tokio::spawn(async move {
        let body = wire::read_frame(&mut peer).await.unwrap();
        let mut blocks = wire::decode_payload(&body).unwrap();
        blocks.pop();
        wire::write_frame(&mut peer, &wire::encode_payload(&blocks))
            .await
            .unwrap();
    });

    conn.send_payload(&sample_blocks()).await.unwrap();
    let err = conn.recv_results(&opts).await.unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "{err}");
    peer_task.await.unwrap();
}

#[tokio::test]
async fn exit_sentinel_is_exempt_from_alternation() {
    let opts = test_opts();
    let (mut conn, mut peer) = local_pair(&opts).await;

    // Stuck mid-round: request outstanding, no reply coming.
    conn.send_payload(&sample_blocks()).await.unwrap();
    conn.send_exit().await.unwrap();

    let request = wire::read_frame(&mut peer).await.unwrap();
    assert!(!wire::is_exit(&request));
    let sentinel = wire::read_frame(&mut peer).await.unwrap();
    assert!(wire::is_exit(&sentinel));
}

#[tokio::test]
async fn connect_fails_after_retries_exhausted() {
    // Bind then drop to obtain a port with no listener.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = WorkerConnection::connect("127.0.0.1", port, 1, &test_opts())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err}");
}
