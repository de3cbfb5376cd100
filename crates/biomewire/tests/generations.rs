//! End-to-end tests: a real client against the toy generator server, once
//! per wire generation.

use std::sync::Arc;
use std::time::Duration;

use biomewire::prelude::*;
use biomewire::protocol::WireCodec;
use biomewire::transport::Transport;
use biomewire::{GeneratorServer, ToyGenerator, WorldGenerator};
use tokio::net::TcpListener;

fn test_config() -> ClientConfig {
    ClientConfig {
        connect_timeout: Some(Duration::from_secs(2)),
        request_timeout: Some(Duration::from_secs(5)),
        ..ClientConfig::default()
    }
}

/// The conversation a map viewer has after connecting.
async fn exercise<T: Transport, C: WireCodec>(
    client: &mut RemoteWorldClient<T, C>,
    generator: &ToyGenerator,
) {
    let created = client
        .create_world(1_234, WorldType::LargeBiomes, "")
        .await
        .expect("world created");
    let known = generator.biome_list().len();
    assert_eq!(created.ids.len(), known);
    assert_eq!(created.added.len(), known);
    assert_eq!(generator.seed(), 1_234);
    assert_eq!(generator.worlds_created(), 1);

    let data = client
        .get_biome_data(-8, 16, 4, 4, true)
        .await
        .expect("biome data");
    assert_eq!(data.len(), 16);
    for id in &data {
        assert!(
            client.registry().contains(BiomeId(*id)),
            "map refers to unregistered biome {id}"
        );
    }

    let colors: Vec<_> = client
        .registry()
        .ids()
        .into_iter()
        .filter_map(|id| client.registry().get(id))
        .map(|biome| biome.color)
        .collect();
    let listed = client.get_biome_list().await.expect("biome list");
    assert!(listed.added.is_empty());
    assert_eq!(listed.already_known, known);
    let colors_after: Vec<_> = client
        .registry()
        .ids()
        .into_iter()
        .filter_map(|id| client.registry().get(id))
        .map(|biome| biome.color)
        .collect();
    assert_eq!(colors, colors_after);

    assert_eq!(client.state(), ClientState::Ready);
}

#[tokio::test]
async fn test_framed_generation_end_to_end() {
    let generator = Arc::new(ToyGenerator::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GeneratorServer::from_arc(Arc::clone(&generator));
    tokio::spawn(async move { server.serve_framed(listener).await });

    let mut client = RemoteWorldClient::builder()
        .config(test_config())
        .connect_framed(&addr.to_string())
        .await
        .unwrap();
    assert_eq!(client.generation(), "framed");

    exercise(&mut client, &generator).await;
    client.close().await;
}

#[tokio::test]
async fn test_rpc_generation_end_to_end() {
    let generator = Arc::new(ToyGenerator::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GeneratorServer::from_arc(Arc::clone(&generator));
    tokio::spawn(async move { server.serve_rpc(listener).await });

    let mut client = RemoteWorldClientBuilder::new()
        .config(test_config())
        .connect_rpc(&format!("ws://{addr}"))
        .await
        .unwrap();
    assert_eq!(client.generation(), "json");

    exercise(&mut client, &generator).await;
    client.close().await;
}

#[tokio::test]
async fn test_zero_copy_generation_end_to_end() {
    let driver = IpcDriver::new();
    let generator = Arc::new(ToyGenerator::new());
    let server = GeneratorServer::from_arc(Arc::clone(&generator));
    let server_driver = driver.clone();
    let serving = tokio::spawn(async move {
        server
            .serve_ipc(&server_driver, "worldgen", IpcConfig::default())
            .await
    });

    let mut client = RemoteWorldClientBuilder::new()
        .config(test_config())
        .connect_ipc(&driver, "worldgen")
        .await
        .unwrap();
    assert_eq!(client.generation(), "zero-copy");
    assert_eq!(client.endpoint(), "worldgen");

    exercise(&mut client, &generator).await;
    client.close().await;

    tokio::time::timeout(Duration::from_secs(2), serving)
        .await
        .expect("server notices the client leaving")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_zero_copy_generator_serves_a_second_client() {
    let driver = IpcDriver::new();
    let generator = Arc::new(ToyGenerator::new());

    for round in 0..2 {
        let server = GeneratorServer::from_arc(Arc::clone(&generator));
        let server_driver = driver.clone();
        let serving = tokio::spawn(async move {
            server
                .serve_ipc(&server_driver, "worldgen", IpcConfig::default())
                .await
        });

        let mut client = RemoteWorldClientBuilder::new()
            .config(test_config())
            .connect_ipc(&driver, "worldgen")
            .await
            .unwrap_or_else(|e| panic!("connect in round {round}: {e}"));
        let report = client.get_biome_list().await.unwrap();
        assert_eq!(report.ids.len(), generator.biome_list().len());
        client.close().await;

        tokio::time::timeout(Duration::from_secs(2), serving)
            .await
            .expect("server notices the client leaving")
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_zero_copy_reply_larger_than_the_stream() {
    let driver = IpcDriver::new();
    let server_driver = driver.clone();
    tokio::spawn(async move {
        GeneratorServer::new(ToyGenerator::new())
            .serve_ipc(&server_driver, "worldgen", IpcConfig::default())
            .await
    });

    let mut client = RemoteWorldClientBuilder::new()
        .config(test_config())
        .connect_ipc(&driver, "worldgen")
        .await
        .unwrap();
    let data = client.get_biome_data(0, 0, 1024, 1024, true).await.unwrap();

    assert_eq!(data.len(), 1024 * 1024);
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.get_biome_data(0, 0, 2, 2, true).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_shared_registry_across_generations() {
    let registry = Arc::new(InMemoryBiomeRegistry::new());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        GeneratorServer::new(ToyGenerator::new())
            .serve_framed(listener)
            .await
    });
    let mut framed = RemoteWorldClient::builder()
        .registry(registry.clone())
        .connect_framed(&addr.to_string())
        .await
        .unwrap();
    framed.get_biome_list().await.unwrap();
    let before = registry.snapshot();

    let driver = IpcDriver::new();
    let server_driver = driver.clone();
    tokio::spawn(async move {
        GeneratorServer::new(ToyGenerator::new())
            .serve_ipc(&server_driver, "shared", IpcConfig::default())
            .await
    });
    let mut zero_copy = RemoteWorldClientBuilder::new()
        .registry(registry.clone())
        .connect_ipc(&driver, "shared")
        .await
        .unwrap();
    let report = zero_copy.get_biome_list().await.unwrap();

    assert!(report.added.is_empty());
    assert_eq!(registry.snapshot(), before);
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RemoteWorldClient::builder()
        .config(test_config())
        .connect_framed(&addr.to_string())
        .await;

    let Err(err) = result else {
        panic!("connected to a closed port");
    };
    assert!(matches!(err, ClientError::ConnectionFailed { .. }));
    assert_eq!(err.step(), Some(Step::Connect));
}
