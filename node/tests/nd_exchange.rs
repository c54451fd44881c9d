use std::sync::Arc;
use std::time::Duration;

use dasquare_native::hash::Digest32;
use dasquare_native::square::{Blob, BlobTx};
use dasquare_native::{encode_block, DataAvailabilityHeader, Namespace, NAMESPACE_SIZE};
use dasquare_node::nd::server::{StoreError, StoredSquare};
use dasquare_node::nd::transport::memory::{incoming, MemoryHost, MemoryNetwork};
use dasquare_node::nd::{Client, EdsStore, Error, MemoryStore, NdMetrics, Parameters, PeerId, RequestStatus, Server};
use tokio::sync::Notify;
use tokio::time::Instant;

fn ns(n: u64) -> Namespace {
    Namespace::from_u64(0x0100_0000 + n)
}

fn block() -> (DataAvailabilityHeader, dasquare_native::ExtendedDataSquare) {
    let txs = vec![
        b"transfer".to_vec(),
        BlobTx::new(b"pfb-1".to_vec(), vec![Blob::new(ns(1), vec![1u8; 1500])]).encode(),
        BlobTx::new(b"pfb-2".to_vec(), vec![Blob::new(ns(7), vec![2u8; 3000])]).encode(),
    ];
    let (_, eds, dah, _) = encode_block(&txs, 2, 64).unwrap();
    (dah, eds)
}

fn params(limit: usize) -> Parameters {
    let mut p = Parameters::default().with_network_id("private");
    p.concurrency_limit = limit;
    p
}

/// Start a server for `store` and return a client wired to it.
fn connect<S: EdsStore>(store: Arc<S>, limit: usize) -> (Client<MemoryHost>, NdMetrics, PeerId) {
    let net = MemoryNetwork::default();
    let server_id = PeerId::new("server");
    let rx = net.listen(server_id.clone(), params(limit).protocol_id(), 16);
    let server = Arc::new(Server::new(params(limit), store).unwrap());
    tokio::spawn(server.serve(incoming(rx)));

    let metrics = NdMetrics::new();
    let client = Client::new(params(limit), net.host()).unwrap().with_metrics(Arc::new(metrics.clone()));
    (client, metrics, server_id)
}

#[tokio::test]
async fn fetches_and_verifies_namespace() {
    let (dah, eds) = block();
    let store = Arc::new(MemoryStore::new());
    store.put(eds).unwrap();
    let (client, metrics, server) = connect(store, 4);

    let shares = client.request_nd(&dah, ns(7), &server, None).await.unwrap();
    shares.verify(&dah, ns(7)).unwrap();
    // 3000 bytes span 6 sparse shares.
    assert_eq!(shares.flatten().len(), 6);
    assert!(shares.flatten().iter().all(|s| s[..NAMESPACE_SIZE] == ns(7).as_bytes()[..]));

    assert_eq!(metrics.requests(RequestStatus::Success), 1);
    assert_eq!(metrics.total(), 1);
}

#[tokio::test]
async fn absent_namespace_comes_with_absence_proofs() {
    let (dah, eds) = block();
    let store = Arc::new(MemoryStore::new());
    store.put(eds).unwrap();
    let (client, metrics, server) = connect(store, 4);

    let shares = client.request_nd(&dah, ns(3), &server, None).await.unwrap();
    assert!(!shares.is_empty());
    assert!(shares.flatten().is_empty());
    shares.verify(&dah, ns(3)).unwrap();
    assert_eq!(metrics.requests(RequestStatus::Success), 1);
}

#[tokio::test]
async fn unknown_root_is_not_found() {
    let (_, eds) = block();
    let store = Arc::new(MemoryStore::new());
    store.put(eds).unwrap();
    let (client, metrics, server) = connect(store, 4);

    let other = DataAvailabilityHeader::min_data_availability_header().unwrap();
    let err = client.request_nd(&other, ns(1), &server, None).await.unwrap_err();
    assert!(matches!(err, Error::NotFound));
    assert_eq!(metrics.requests(RequestStatus::NotFound), 1);
    assert_eq!(metrics.requests(RequestStatus::Success), 0);
}

#[tokio::test]
async fn reserved_namespace_never_reaches_the_network() {
    let (dah, _) = block();
    let (client, metrics, server) = connect(Arc::new(MemoryStore::new()), 4);

    let err = client.request_nd(&dah, Namespace::from_u64(1), &server, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidNamespace(_)));
    assert_eq!(metrics.requests(RequestStatus::InvalidResponse), 1);
    assert_eq!(metrics.total(), 1);
}

/// Parks every lookup until released.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    entered: Notify,
    release: Notify,
}

impl EdsStore for GatedStore {
    async fn get(&self, root_hash: &Digest32) -> Result<Option<Arc<StoredSquare>>, StoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.get(root_hash).await
    }
}

#[tokio::test]
async fn saturated_server_rate_limits() {
    let (dah, eds) = block();
    let store = Arc::new(GatedStore::default());
    store.inner.put(eds).unwrap();
    let (client, metrics, server) = connect(Arc::clone(&store), 1);
    let client = Arc::new(client);

    let first = tokio::spawn({
        let (client, dah, server) = (Arc::clone(&client), dah.clone(), server.clone());
        async move { client.request_nd(&dah, ns(1), &server, None).await }
    });
    store.entered.notified().await;

    let err = client.request_nd(&dah, ns(1), &server, None).await.unwrap_err();
    assert!(matches!(err, Error::RateLimited));

    store.release.notify_one();
    let shares = first.await.unwrap().unwrap();
    shares.verify(&dah, ns(1)).unwrap();

    assert_eq!(metrics.requests(RequestStatus::RateLimited), 1);
    assert_eq!(metrics.requests(RequestStatus::Success), 1);
}

#[tokio::test(start_paused = true)]
async fn caller_deadline_bounds_the_exchange() {
    let (dah, eds) = block();
    let store = Arc::new(GatedStore::default());
    store.inner.put(eds).unwrap();
    let (client, metrics, server) = connect(store, 4);

    let deadline = Instant::now() + Duration::from_secs(1);
    let err = client.request_nd(&dah, ns(1), &server, Some(deadline)).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded));
    assert_eq!(metrics.requests(RequestStatus::Timeout), 1);
}

#[tokio::test]
async fn every_namespace_of_a_random_block_verifies() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0x6e64);
    let blob_txs: Vec<Vec<u8>> = (1..=6u64)
        .map(|n| {
            let len = rng.gen_range(1..2_000);
            BlobTx::new(vec![n as u8], vec![Blob::new(ns(n * 2), vec![rng.gen(); len])]).encode()
        })
        .collect();
    let (_, eds, dah, used) = encode_block(&blob_txs, 2, 64).unwrap();
    assert_eq!(used.len(), blob_txs.len());

    let store = Arc::new(MemoryStore::new());
    store.put(eds).unwrap();
    let (client, metrics, server) = connect(store, 4);

    for n in 1..=13u64 {
        let shares = client.request_nd(&dah, ns(n), &server, None).await.unwrap();
        shares.verify(&dah, ns(n)).unwrap();
        assert_eq!(shares.flatten().is_empty(), n % 2 == 1 || n > 12, "namespace {n}");
    }
    assert_eq!(metrics.requests(RequestStatus::Success), 13);
}
