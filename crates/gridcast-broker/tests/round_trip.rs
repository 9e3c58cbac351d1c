//! End-to-end broker rounds against in-process mock workers.

use gridcast_broker::{Broker, BrokerOptions, WorkerConnection};
use gridcast_core::decompose::{Tiling, decompose};
use gridcast_core::grid::Grid;
use gridcast_core::kernel::{Kernel, LifeRule};
use gridcast_core::wire;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn test_opts() -> BrokerOptions {
    BrokerOptions {
        connect_timeout: Duration::from_secs(1),
        connect_retries: 3,
        connect_retry_delay: Duration::from_millis(20),
        reply_timeout: Duration::from_secs(2),
    }
}

/// Serves one connection in the worker's accept/compute/reply cadence and
/// returns how many payload rounds it handled.
fn spawn_mock_worker(listener: TcpListener) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let rule = LifeRule;
        let mut rounds = 0;
        loop {
            let body = match wire::read_frame(&mut stream).await {
                Ok(body) => body,
                Err(_) => break,
            };
            if wire::is_exit(&body) {
                break;
            }
            let blocks = wire::decode_payload(&body).unwrap();
            let results: Vec<_> = blocks.iter().map(|b| rule.apply(b)).collect();
            wire::write_frame(&mut stream, &wire::encode_payload(&results))
                .await
                .unwrap();
            rounds += 1;
        }
        rounds
    })
}

async fn mock_fleet(
    threads_per_worker: &[usize],
    opts: &BrokerOptions,
) -> (Vec<WorkerConnection>, Vec<JoinHandle<usize>>) {
    let mut connections = Vec::new();
    let mut handles = Vec::new();
    for &threads in threads_per_worker {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        handles.push(spawn_mock_worker(listener));
        connections.push(
            WorkerConnection::connect("127.0.0.1", port, threads, opts)
                .await
                .unwrap(),
        );
    }
    (connections, handles)
}

/// 5x5 grid holding a vertical blinker centered at interior (2, 2).
fn blinker_grid() -> Grid {
    let mut interior = vec![0u8; 25];
    for r in 1..4 {
        interior[r * 5 + 2] = 1;
    }
    Grid::from_interior(5, 5, &interior).unwrap()
}

fn horizontal_blinker() -> Vec<u8> {
    let mut interior = vec![0u8; 25];
    for c in 1..4 {
        interior[2 * 5 + c] = 1;
    }
    interior
}

#[tokio::test]
async fn step_advances_a_blinker_across_the_fleet() {
    let opts = test_opts();
    let (connections, handles) = mock_fleet(&[2, 1], &opts).await;
    let mut broker = Broker::from_connections(connections, opts).unwrap();
    assert_eq!(broker.total_threads(), 3);

    let mut grid = blinker_grid();
    broker.step(&mut grid).await.unwrap();
    assert_eq!(grid.interior(), horizontal_blinker());

    // A second step oscillates back to the start state.
    broker.step(&mut grid).await.unwrap();
    assert_eq!(grid.interior(), blinker_grid().interior());

    broker.close().await;
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 2);
    }
}

#[tokio::test]
async fn collect_mirrors_dispatch_length_and_order() {
    let opts = test_opts();
    let (connections, handles) = mock_fleet(&[2, 2], &opts).await;
    let mut broker = Broker::from_connections(connections, opts).unwrap();

    let grid = blinker_grid();
    let tiling = Tiling::for_slots(broker.total_threads());
    let blocks = decompose(&grid, tiling);
    assert_eq!(blocks.len(), 4);

    broker.dispatch(&blocks).await.unwrap();
    let results = broker.collect().await.unwrap();
    assert_eq!(results.len(), blocks.len());
    // Each result keeps its request's position and shape.
    for (sent, got) in blocks.iter().zip(&results) {
        assert_eq!(sent.rows(), got.rows());
        assert_eq!(sent.cols(), got.cols());
    }

    broker.close().await;
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn empty_dispatch_is_a_no_op() {
    let opts = test_opts();
    let (connections, handles) = mock_fleet(&[1], &opts).await;
    let mut broker = Broker::from_connections(connections, opts).unwrap();

    broker.dispatch(&[]).await.unwrap();
    let results = broker.collect().await.unwrap();
    assert!(results.is_empty());

    broker.close().await;
    // No payload round ever reached the worker.
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 0);
    }
}

#[tokio::test]
async fn oversized_dispatch_is_rejected() {
    let opts = test_opts();
    let (connections, handles) = mock_fleet(&[1], &opts).await;
    let mut broker = Broker::from_connections(connections, opts).unwrap();

    let grid = blinker_grid();
    let blocks = decompose(&grid, Tiling::for_slots(4));
    let err = broker.dispatch(&blocks).await.unwrap_err();
    assert!(matches!(err, gridcast_core::Error::Protocol { .. }), "{err}");

    broker.close().await;
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn close_delivers_exit_sentinels() {
    let opts = test_opts();
    let (connections, handles) = mock_fleet(&[1, 1, 1], &opts).await;
    let broker = Broker::from_connections(connections, opts).unwrap();
    broker.close().await;

    // Every mock worker saw the sentinel (not a disconnect) and exited its
    // loop having served zero payload rounds.
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 0);
    }
}

#[tokio::test]
async fn zero_capacity_fleet_is_rejected() {
    let err = Broker::from_connections(Vec::new(), test_opts()).unwrap_err();
    assert!(matches!(err, gridcast_core::Error::Config { .. }));
}
