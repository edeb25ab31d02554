//! Feed clients and publisher against a loopback HTTP stub
//!
//! Covers the failure folding of both feeds (timeout, bad status, malformed
//! body) and the two-step Bluesky exchange, without any external network.

#[cfg(test)]
mod feed_http_tests {
    use chrono::{TimeZone, Utc};
    use quakerad::cli::RunMode;
    use quakerad::config::{BlueskyCredentials, MonitorConfig};
    use quakerad::debug_log::{DebugLevel, DebugLogger};
    use quakerad::feeds::{build_http_client, RadiationFeed, SafecastClient, SeismicFeed, UsgsClient};
    use quakerad::publisher::{AlertPublisher, BlueskyPublisher, LogPublisher, PostKind};
    use quakerad::runtime::{self, RunSummary};
    use quakerad::types::Coordinates;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// One canned reply per accepted connection.
    enum Reply {
        Json(u16, String),
        Hang,
    }

    /// Raw request text (head + body) for each accepted connection.
    type Captured = Arc<Mutex<Vec<String>>>;

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    async fn serve(replies: Vec<Reply>) -> (String, Captured) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();

        tokio::spawn(async move {
            for reply in replies {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let request = read_request(&mut socket).await;
                sink.lock().unwrap().push(request);

                match reply {
                    Reply::Json(status, body) => {
                        let response = format!(
                            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        (format!("http://{}", addr), captured)
    }

    fn logger() -> DebugLogger {
        DebugLogger::new(DebugLevel::Trace)
    }

    fn fast_client() -> reqwest::Client {
        build_http_client(Duration::from_millis(300)).unwrap()
    }

    const USGS_BODY: &str = r#"{"type":"FeatureCollection","features":[
        {"id":"nc1","properties":{"mag":1.2,"place":"3 km W of Cobb, CA","time":1714564500000},
         "geometry":{"coordinates":[-122.7563,38.8213,1.5]}}
    ]}"#;

    #[tokio::test]
    async fn test_usgs_request_parameters_and_decode() {
        let (base, captured) = serve(vec![Reply::Json(200, USGS_BODY.to_string())]).await;
        let client = UsgsClient::new(fast_client(), format!("{}/fdsnws/event/1/query", base), logger());

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 11, 45, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let events = client.fetch_recent_events(start, end).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].depth_km, Some(1.5));

        let request = captured.lock().unwrap()[0].clone();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /fdsnws/event/1/query?"));
        assert!(request_line.contains("format=geojson"));
        assert!(request_line.contains("starttime=2024-05-01T11%3A45%3A00"));
        assert!(request_line.contains("endtime=2024-05-01T12%3A00%3A00"));
        assert!(request_line.contains("minmagnitude=0"));
    }

    #[tokio::test]
    async fn test_usgs_timeout_yields_no_events() {
        let (base, _) = serve(vec![Reply::Hang]).await;
        let client = UsgsClient::new(fast_client(), base, logger());

        let now = Utc::now();
        let events = client.fetch_recent_events(now - chrono::Duration::minutes(15), now).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_usgs_failures_yield_no_events() {
        let (base, _) = serve(vec![
            Reply::Json(500, r#"{"error":"down"}"#.to_string()),
            Reply::Json(200, "<html>maintenance</html>".to_string()),
        ])
        .await;
        let client = UsgsClient::new(fast_client(), base, logger());
        let now = Utc::now();

        assert!(client.fetch_recent_events(now, now).await.is_empty());
        assert!(client.fetch_recent_events(now, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_usgs_unreachable_yields_no_events() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UsgsClient::new(fast_client(), format!("http://{}", addr), logger());
        let now = Utc::now();
        assert!(client.fetch_recent_events(now, now).await.is_empty());
    }

    #[tokio::test]
    async fn test_safecast_selects_min_value_sample() {
        let body = r#"[
            {"value": 140, "unit": "cpm", "captured_at": "2024-05-01T11:58:00Z", "latitude": 38.8213, "longitude": -122.7563},
            {"value": 33, "unit": "cpm", "captured_at": "2024-05-01T10:00:00Z", "latitude": 38.95, "longitude": -122.6},
            {"value": 71, "unit": "cpm", "captured_at": "2024-05-01T11:00:00Z"}
        ]"#;
        let (base, captured) = serve(vec![Reply::Json(200, body.to_string())]).await;
        let client = SafecastClient::new(fast_client(), format!("{}/measurements.json", base), logger());

        let sample = client
            .fetch_nearest_sample(Coordinates::new(38.8213, -122.7563), 20.0)
            .await
            .unwrap();
        assert_eq!(sample.value, 33.0);
        assert_eq!(sample.captured_at.as_str(), "2024-05-01T10:00:00Z");

        let request = captured.lock().unwrap()[0].clone();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /measurements.json?"));
        assert!(request_line.contains("distance=20"));
        assert!(request_line.contains("latitude=38.8213"));
        assert!(request_line.contains("longitude=-122.7563"));
    }

    #[tokio::test]
    async fn test_safecast_failures_yield_no_sample() {
        let (base, _) = serve(vec![
            Reply::Json(200, "[]".to_string()),
            Reply::Json(200, "{not json".to_string()),
            Reply::Json(503, "[]".to_string()),
            Reply::Hang,
        ])
        .await;
        let client = SafecastClient::new(fast_client(), base, logger());
        let here = Coordinates::new(1.0, 2.0);

        assert!(client.fetch_nearest_sample(here, 20.0).await.is_none(), "empty");
        assert!(client.fetch_nearest_sample(here, 20.0).await.is_none(), "malformed");
        assert!(client.fetch_nearest_sample(here, 20.0).await.is_none(), "bad status");
        assert!(client.fetch_nearest_sample(here, 20.0).await.is_none(), "timeout");
    }

    #[tokio::test]
    async fn test_bluesky_login_then_post() {
        let (base, captured) = serve(vec![
            Reply::Json(200, r#"{"did":"did:plc:closet","accessJwt":"jwt-123","handle":"closet"}"#.to_string()),
            Reply::Json(
                200,
                r#"{"uri":"at://did:plc:closet/app.bsky.feed.post/3k","cid":"bafy"}"#.to_string(),
            ),
        ])
        .await;
        let publisher = BlueskyPublisher::new(
            fast_client(),
            base,
            Some(BlueskyCredentials {
                handle: "closet.bsky.social".to_string(),
                password: "app-password".to_string(),
            }),
            logger(),
        );

        let receipt = publisher.publish(PostKind::Alert, "⚠️ test alert").await.unwrap();
        assert_eq!(receipt.uri.as_deref(), Some("at://did:plc:closet/app.bsky.feed.post/3k"));

        let requests = captured.lock().unwrap().clone();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("POST /xrpc/com.atproto.server.createSession"));
        assert!(requests[0].contains(r#""identifier":"closet.bsky.social""#));
        assert!(requests[1].starts_with("POST /xrpc/com.atproto.repo.createRecord"));
        assert!(requests[1].to_ascii_lowercase().contains("authorization: bearer jwt-123"));
        assert!(requests[1].contains(r#""repo":"did:plc:closet""#));
        assert!(requests[1].contains(r#""$type":"app.bsky.feed.post""#));
    }

    #[tokio::test]
    async fn test_bluesky_login_rejected() {
        let (base, captured) = serve(vec![Reply::Json(
            401,
            r#"{"error":"AuthenticationRequired"}"#.to_string(),
        )])
        .await;
        let publisher = BlueskyPublisher::new(
            fast_client(),
            base,
            Some(BlueskyCredentials {
                handle: "closet.bsky.social".to_string(),
                password: "wrong".to_string(),
            }),
            logger(),
        );

        assert!(publisher.publish(PostKind::Simulation, "text").await.is_err());
        // No post attempt after a failed login
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_full_monitor_run_against_stubs() {
        let (usgs, _) = serve(vec![Reply::Json(200, USGS_BODY.to_string())]).await;
        let (safecast, _) = serve(vec![Reply::Json(
            200,
            r#"{"measurements":[{"value":130,"unit":"cpm","captured_at":"2024-05-01T11:59:00Z"}]}"#.to_string(),
        )])
        .await;

        let config = MonitorConfig {
            usgs_url: usgs,
            safecast_url: safecast,
            request_timeout: Duration::from_millis(500),
            ..MonitorConfig::default()
        };
        let http = build_http_client(config.request_timeout).unwrap();
        let publisher: Arc<dyn AlertPublisher> = Arc::new(LogPublisher::new(logger()));

        let summary = runtime::run(RunMode::Monitor, &config, &http, publisher, logger()).await;
        match summary {
            RunSummary::Monitor(report) => {
                let alert = report.alert().expect("expected alert");
                assert_eq!(alert.radiation.value, 130.0);
                assert_eq!(report.published, Some(true));
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_records_do_not_hide_a_breach() {
        // Test: broken features/measurements are skipped, the good ones still alert
        let usgs_body = r#"{"type":"FeatureCollection","features":[
            {"id":"bad-coords","properties":{"mag":3.0},"geometry":{"coordinates":null}},
            {"id":"bad-props","properties":null,"geometry":{"coordinates":[0.0,0.0,0.1]}},
            {"id":"nn1","properties":{"mag":2,"place":"Test Site","time":1714564500000},
             "geometry":{"coordinates":[-116.05,37.1,1]}}
        ]}"#;
        let safecast_body = r#"[
            {"value":500,"unit":12,"captured_at":null},
            {"value":210,"unit":"cpm","captured_at":"2024-05-01T11:58:00Z"}
        ]"#;
        let (usgs, _) = serve(vec![Reply::Json(200, usgs_body.to_string())]).await;
        let (safecast, _) = serve(vec![Reply::Json(200, safecast_body.to_string())]).await;

        let config = MonitorConfig {
            usgs_url: usgs,
            safecast_url: safecast,
            request_timeout: Duration::from_millis(500),
            ..MonitorConfig::default()
        };
        let http = build_http_client(config.request_timeout).unwrap();
        let publisher: Arc<dyn AlertPublisher> = Arc::new(LogPublisher::new(logger()));

        match runtime::run(RunMode::Monitor, &config, &http, publisher, logger()).await {
            RunSummary::Monitor(report) => {
                assert_eq!(report.events_fetched, 2);
                let alert = report.alert().expect("expected alert");
                assert_eq!(alert.location, Coordinates::new(37.1, -116.05));
                assert_eq!(alert.radiation.value, 210.0);
                assert_eq!(alert.seismic.as_ref().unwrap().magnitude_label, "2");
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_monitor_run_without_credentials_completes() {
        // Test: missing credentials skip the publish but the run still succeeds
        let (usgs, _) = serve(vec![Reply::Json(200, USGS_BODY.to_string())]).await;
        let (safecast, _) = serve(vec![Reply::Json(200, r#"[{"value":400,"unit":"cpm"}]"#.to_string())]).await;

        let config = MonitorConfig {
            usgs_url: usgs,
            safecast_url: safecast,
            request_timeout: Duration::from_millis(500),
            ..MonitorConfig::default()
        };
        let http = build_http_client(config.request_timeout).unwrap();
        let publisher = runtime::build_publisher(&config, &http, false, logger());
        assert_eq!(publisher.channel(), "bluesky");

        let summary = runtime::run(RunMode::Monitor, &config, &http, publisher, logger()).await;
        match summary {
            RunSummary::Monitor(report) => {
                assert!(report.alert().is_some());
                assert_eq!(report.published, Some(false));
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_simulation_mode_skips_feeds() {
        // Feed URLs point nowhere; simulation must not touch them
        let config = MonitorConfig {
            usgs_url: "http://127.0.0.1:9".to_string(),
            safecast_url: "http://127.0.0.1:9".to_string(),
            ..MonitorConfig::default()
        };
        let http = build_http_client(Duration::from_millis(200)).unwrap();
        let publisher = runtime::build_publisher(&config, &http, true, logger());
        assert_eq!(publisher.channel(), "log");

        let mode = RunMode::Simulation {
            location: Coordinates::new(35.6, 139.7),
            radiation_value: 200.0,
        };
        match runtime::run(mode, &config, &http, publisher, logger()).await {
            RunSummary::Simulation(report) => {
                assert!(report.published);
                assert!(report.breach);
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }
}
