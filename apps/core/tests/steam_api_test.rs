use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use steamcount_core::steam_api::{CatalogSource, CountSource, FetchError, SteamApi};

/// Serves one canned HTTP response and returns the request line it saw.
fn one_shot_server(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("client should connect");
        let request = read_request_head(&mut stream);
        stream
            .write_all(response.as_bytes())
            .expect("response should be written");
        request.lines().next().unwrap_or_default().to_string()
    });

    (format!("http://{addr}"), handle)
}

/// Accepts one connection and never answers it.
fn silent_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("client should connect");
        let _ = read_request_head(&mut stream);
        thread::sleep(Duration::from_millis(1_500));
    });
    (format!("http://{addr}"), handle)
}

fn read_request_head(stream: &mut std::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0_u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

#[test]
fn fetches_player_count_with_appid_query() {
    let (base, server) = one_shot_server("200 OK", r#"{"response":{"player_count":4812,"result":1}}"#);
    let api = SteamApi::new(&format!("{base}/apps"), &format!("{base}/players"));

    let result = api.fetch_count(367520, Duration::from_secs(5)).unwrap();

    assert_eq!(result.entry_id, 367520);
    assert_eq!(result.count, Some(4812));
    let request_line = server.join().unwrap();
    assert!(request_line.starts_with("GET /players?appid=367520 "), "{request_line}");
}

#[test]
fn response_without_player_count_is_invalid_not_zero() {
    let (base, server) = one_shot_server("200 OK", r#"{"response":{}}"#);
    let api = SteamApi::new(&format!("{base}/apps"), &format!("{base}/players"));

    let result = api.fetch_count(1, Duration::from_secs(5));

    assert!(matches!(result, Err(FetchError::InvalidResponse(_))), "{result:?}");
    server.join().unwrap();
}

#[test]
fn http_error_status_is_a_network_failure() {
    let (base, server) = one_shot_server("503 Service Unavailable", "{}");
    let api = SteamApi::new(&format!("{base}/apps"), &format!("{base}/players"));

    let result = api.fetch_count(1, Duration::from_secs(5));

    match result {
        Err(FetchError::NetworkFailure(message)) => assert!(message.contains("503")),
        other => panic!("unexpected result: {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn unreachable_host_is_a_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = SteamApi::new(&format!("http://{addr}/apps"), &format!("http://{addr}/players"));

    let result = api.fetch_count(1, Duration::from_secs(2));

    assert!(matches!(result, Err(FetchError::NetworkFailure(_))), "{result:?}");
}

#[test]
fn silent_server_times_out() {
    let (base, server) = silent_server();
    let api = SteamApi::new(&format!("{base}/apps"), &format!("{base}/players"));

    let result = api.fetch_count(1, Duration::from_millis(300));

    assert_eq!(result, Err(FetchError::Timeout));
    server.join().unwrap();
}

#[test]
fn loads_catalog_from_applist_body() {
    let body = r#"{"applist":{"apps":[{"appid":620,"name":"Portal 2"},{"appid":400,"name":"Portal"}]}}"#;
    let (base, server) = one_shot_server("200 OK", body);
    let api = SteamApi::new(&format!("{base}/apps"), &format!("{base}/players"));

    let catalog = api.fetch_catalog(Duration::from_secs(5)).unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.entries()[1].name, "Portal");
    server.join().unwrap();
}
