//! Integration tests for the dashboard HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use chrono::Utc;
    use image::GrayImage;
    use pet_monitor::capture::Frame;
    use pet_monitor::config::ServerConfig;
    use pet_monitor::core::{
        BehaviorAnalyzer, BehaviorConfig, BehaviorReport, BehaviorStatus, ClassifierConfig,
        DetectionResult, EncodedFrame, FrameDifferencer, LiveFrame, MotionConfig, PetClassifier,
        PipelineContext, SharedStatus, StatusSnapshot,
    };
    use pet_monitor::detector::NoopDetector;
    use pet_monitor::eventlog::{create_shared_stats, read_lines, EventLog, SharedRunStats};
    use pet_monitor::sensors::{SensorReadings, SensorState};
    use pet_monitor::server::{run, ServerState};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    struct Fixture {
        status: SharedStatus,
        sensors: SensorState,
        live_frame: LiveFrame,
        stats: SharedRunStats,
        log_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                status: SharedStatus::new(Uuid::new_v4(), "camera-test"),
                sensors: SensorState::new(),
                live_frame: LiveFrame::new(),
                stats: create_shared_stats(),
                log_path: std::env::temp_dir()
                    .join("pet-monitor-server-test")
                    .join(format!("{}.txt", Uuid::new_v4())),
            }
        }

        fn write_log(&self, lines: &[&str]) {
            std::fs::create_dir_all(self.log_path.parent().unwrap()).unwrap();
            std::fs::write(&self.log_path, lines.join("\n") + "\n").unwrap();
        }
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            jpeg_quality: 80,
        }
    }

    async fn start(fixture: &Fixture) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
        let state = ServerState::new(
            fixture.status.clone(),
            fixture.sensors.clone(),
            fixture.live_frame.clone(),
            fixture.stats.clone(),
            fixture.log_path.clone(),
        );
        let started = run(&test_config(), state)
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        started
    }

    async fn get_json(addr: SocketAddr, path: &str) -> serde_json::Value {
        let response = reqwest::get(format!("http://{}{}", addr, path))
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success(), "{} failed", path);
        response.json().await.expect("Failed to parse JSON")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        let body = get_json(addr, "/health").await;
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());
        assert_eq!(body["camera_id"], "camera-test");
        assert_eq!(
            body["instance_id"],
            fixture.status.current().instance_id.to_string()
        );

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_status_endpoint_returns_latest_snapshot() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        let current = fixture.status.current();
        fixture.status.publish(StatusSnapshot {
            updated_at: Some(Utc::now()),
            frame_sequence: 42,
            motion_detected: true,
            motion_magnitude: 1800,
            pet: DetectionResult::Detection {
                label: "dog".to_string(),
                confidence: 0.8,
                bbox: None,
            },
            behavior: BehaviorReport {
                score: 75,
                status: BehaviorStatus::HighlyActive,
                alert: None,
                idle_seconds: 0,
            },
            ..current
        });

        let body = get_json(addr, "/status").await;
        assert_eq!(body["frame_sequence"], 42);
        assert_eq!(body["motion_detected"], true);
        assert_eq!(body["pet"]["kind"], "detection");
        assert_eq!(body["pet"]["label"], "dog");
        assert_eq!(body["behavior"]["score"], 75);
        assert_eq!(body["behavior"]["status"], "highly_active");
        assert!(body["behavior"]["alert"].is_null());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_logs_are_newest_first() {
        let fixture = Fixture::new();
        fixture.write_log(&[
            "10:00:01 - Motion detected",
            "10:00:02 - Pet detected: cat (0.91)",
            "10:01:30 - RFID: tag PET123",
        ]);
        let (addr, shutdown_tx) = start(&fixture).await;

        let body = get_json(addr, "/logs").await;
        assert_eq!(
            body,
            serde_json::json!([
                "10:01:30 - RFID: tag PET123",
                "10:00:02 - Pet detected: cat (0.91)",
                "10:00:01 - Motion detected"
            ])
        );

        let body = get_json(addr, "/logs?limit=1").await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let _ = shutdown_tx.send(());
        let _ = std::fs::remove_file(&fixture.log_path);
    }

    async fn post_json(
        addr: SocketAddr,
        path: &str,
        body: serde_json::Value,
    ) -> (reqwest::StatusCode, serde_json::Value) {
        let response = reqwest::Client::new()
            .post(format!("http://{}{}", addr, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request");
        let status = response.status();
        (status, response.json().await.expect("Failed to parse JSON"))
    }

    #[tokio::test]
    async fn test_get_logs_keeps_file_order() {
        let fixture = Fixture::new();
        fixture.write_log(&[
            "10:00:01 - Motion detected",
            "10:00:02 - Pet detected: cat (0.91)",
            "10:01:30 - RFID: tag PET123",
        ]);
        let (addr, shutdown_tx) = start(&fixture).await;

        let body = get_json(addr, "/get_logs").await;
        assert_eq!(
            body,
            serde_json::json!([
                "10:00:01 - Motion detected",
                "10:00:02 - Pet detected: cat (0.91)",
                "10:01:30 - RFID: tag PET123"
            ])
        );

        let _ = shutdown_tx.send(());
        let _ = std::fs::remove_file(&fixture.log_path);
    }

    #[tokio::test]
    async fn test_pushed_readings_update_sensor_status() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        let (status, body) = post_json(addr, "/update_pir", serde_json::json!({"pir": 1})).await;
        assert!(status.is_success());
        assert_eq!(body, serde_json::json!({"status": "ok", "pir": 1}));

        let (status, body) =
            post_json(addr, "/update_rfid", serde_json::json!({"rfid": "PET123"})).await;
        assert!(status.is_success());
        assert_eq!(body, serde_json::json!({"status": "ok", "rfid": "PET123"}));

        let body = get_json(addr, "/sensor_status").await;
        assert_eq!(body["pir"], true);
        assert_eq!(body["rfid"], "PET123");
        assert!(body["sampled_at"].is_string());

        let (_, body) = post_json(addr, "/update_pir", serde_json::json!({"pir": 0})).await;
        assert_eq!(body["pir"], 0);
        let body = get_json(addr, "/sensor_status").await;
        assert_eq!(body["pir"], false);
        assert_eq!(body["rfid"], "PET123");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_invalid_pushed_reading_is_rejected() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        let (status, body) = post_json(addr, "/update_pir", serde_json::json!({"pir": 7})).await;
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SENSOR_VALUE");

        let (status, body) = post_json(addr, "/update_rfid", serde_json::json!({"rfid": 5})).await;
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SENSOR_VALUE");

        assert_eq!(fixture.sensors.current(), SensorReadings::default());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_pushed_readings_reach_snapshot_and_event_log() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        let mut pipeline = PipelineContext::new(
            FrameDifferencer::new(MotionConfig::default()),
            PetClassifier::new(Box::new(NoopDetector), ClassifierConfig::default()),
            BehaviorAnalyzer::new(BehaviorConfig::default()),
            fixture.status.clone(),
        )
        .with_sensors(fixture.sensors.clone())
        .with_event_log(EventLog::new(fixture.log_path.clone()));
        let frame = |seq| Frame::from_gray(GrayImage::new(64, 48), Utc::now(), seq);

        pipeline.process_frame(&frame(0));
        assert!(read_lines(&fixture.log_path).unwrap().is_empty());

        post_json(addr, "/update_pir", serde_json::json!({"pir": 1})).await;
        post_json(addr, "/update_rfid", serde_json::json!({"rfid": "PET123"})).await;
        let snapshot = pipeline.process_frame(&frame(1));

        assert!(snapshot.pir);
        assert_eq!(snapshot.rfid.as_deref(), Some("PET123"));
        let body = get_json(addr, "/status").await;
        assert_eq!(body["pir"], true);
        assert_eq!(body["rfid"], "PET123");

        let lines = read_lines(&fixture.log_path).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - PIR: motion detected"));
        assert!(lines[1].ends_with(" - RFID: tag PET123"));

        // Same readings on the next frame are not logged again
        pipeline.process_frame(&frame(2));
        assert_eq!(read_lines(&fixture.log_path).unwrap().len(), 2);

        let _ = shutdown_tx.send(());
        let _ = std::fs::remove_file(&fixture.log_path);
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        assert_eq!(get_json(addr, "/logs").await, serde_json::json!([]));
        assert_eq!(get_json(addr, "/get_logs").await, serde_json::json!([]));
        assert_eq!(get_json(addr, "/motion_stats").await, serde_json::json!([]));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_motion_stats_groups_by_minute() {
        let fixture = Fixture::new();
        fixture.write_log(&[
            "10:00:01 - Motion detected",
            "10:00:59 - No pet detected",
            "10:02:10 - Motion detected",
        ]);
        let (addr, shutdown_tx) = start(&fixture).await;

        let body = get_json(addr, "/motion_stats").await;
        assert_eq!(
            body,
            serde_json::json!([
                {"time": "10:00", "count": 2},
                {"time": "10:02", "count": 1}
            ])
        );

        let _ = shutdown_tx.send(());
        let _ = std::fs::remove_file(&fixture.log_path);
    }

    #[tokio::test]
    async fn test_sensor_and_camera_status() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        let body = get_json(addr, "/camera_status").await;
        assert_eq!(body["status"], "inactive");
        assert_eq!(body["has_frame"], false);

        fixture.sensors.publish(SensorReadings {
            pir: true,
            rfid: Some("PET123".to_string()),
            sampled_at: Some(Utc::now()),
        });
        let current = fixture.status.current();
        fixture.status.publish(StatusSnapshot {
            updated_at: Some(Utc::now()),
            ..current
        });
        fixture.stats.record_frame_processed();

        let body = get_json(addr, "/sensor_status").await;
        assert_eq!(body["pir"], true);
        assert_eq!(body["rfid"], "PET123");

        let body = get_json(addr, "/camera_status").await;
        assert_eq!(body["status"], "active");
        assert_eq!(body["has_frame"], true);
        assert_eq!(body["frames_processed"], 1);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_video_feed_is_multipart() {
        let fixture = Fixture::new();
        fixture.live_frame.publish(EncodedFrame {
            sequence: 1,
            jpeg: Arc::new(vec![0xFF, 0xD8, 0xFF, 0xD9]),
        });
        let (addr, shutdown_tx) = start(&fixture).await;

        let mut response = reqwest::get(format!("http://{}/video_feed", addr))
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert_eq!(content_type, "multipart/x-mixed-replace; boundary=frame");

        let chunk = tokio::time::timeout(Duration::from_secs(2), response.chunk())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Failed to read stream")
            .expect("Stream ended early");
        assert!(chunk.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));

        drop(response);
        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let fixture = Fixture::new();
        let (addr, shutdown_tx) = start(&fixture).await;

        // Send OPTIONS request to check CORS
        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/status", addr))
            .header("Origin", "http://localhost:3000")
            .header("Access-Control-Request-Method", "GET")
            .send()
            .await
            .expect("Failed to send request");

        // CORS preflight should succeed
        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );

        let _ = shutdown_tx.send(());
    }
}
