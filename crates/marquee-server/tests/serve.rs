//! End-to-end tests over a real TCP socket.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use marquee_core::fixtures::{sample_movie, SpyMovieService, StubVerifier};
use marquee_middleware::{Operation, RouteDescriptor, RouteTable, REQUEST_ID_HEADER};
use marquee_server::{Server, ServerSettings, ShutdownSignal};
use tokio::net::{TcpListener, TcpStream};

fn table() -> Arc<RouteTable> {
    let spy = SpyMovieService::new().with_movies(vec![sample_movie(
        "5d9f1140fc13ae1f8d000001",
        "Metropolis",
        &["silent"],
    )]);
    Arc::new(
        RouteTable::builder()
            .verifier(Arc::new(StubVerifier::new()))
            .service(Arc::new(spy))
            .route(RouteDescriptor::new(Operation::ListMovies, Method::GET, "/movies").unguarded())
            .build()
            .unwrap(),
    )
}

async fn get(addr: std::net::SocketAddr, path: &str) -> (StatusCode, bool, serde_json::Value) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await.unwrap();
    tokio::spawn(conn);

    let request = http::Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(http::header::HOST, "localhost")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let has_id = response.headers().contains_key(REQUEST_ID_HEADER);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, has_id, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_serves_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();

    let settings = ServerSettings {
        shutdown_timeout: Duration::from_secs(1),
        ..ServerSettings::default()
    };
    let server = Server::new(settings, table());
    let handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { server.serve(listener, shutdown).await }
    });

    let (status, has_id, body) = get(addr, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(has_id);
    assert_eq!(body["status"], "ok");

    let (status, _, body) = get(addr, "/movies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "Metropolis");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .expect("server should stop after shutdown")
        .expect("server task should not panic");
}
