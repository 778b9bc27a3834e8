//! Integration tests for pumlgen CLI
//!
//! These tests run whole batches against a throwaway HTTP server on
//! loopback that decodes each request token the way a PlantUML server does.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use pumlgen_cli::{render_command, RenderOptions, ReportFormat};
use pumlgen_diagrams::{decode_payload, BatchDriver, BatchReport, NoopObserver, Settings};
use tempfile::TempDir;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Fake PlantUML server
///
/// Answers `GET /plantuml/png/<token>` with PNG magic followed by the decoded
/// diagram text, or a 500 when the text contains `FAIL`. Records the decoded
/// texts in request order.
struct FakeServer {
    url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let url = format!("http://{}/plantuml", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                handle(stream, &log);
            }
        });

        Self { url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn handle(mut stream: TcpStream, log: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    // Drain headers
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
            break;
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("");
    let token = path.rsplit('/').next().unwrap_or("");
    let (status, body) = match decode_payload(token) {
        Ok(text) => {
            log.lock().unwrap().push(text.clone());
            if text.contains("FAIL") {
                ("500 Internal Server Error", b"syntax error".to_vec())
            } else {
                let mut body = PNG_MAGIC.to_vec();
                body.extend_from_slice(text.as_bytes());
                ("200 OK", body)
            }
        }
        Err(_) => ("400 Bad Request", b"bad token".to_vec()),
    };

    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
    let _ = stream.flush();
}

fn write_sources(dir: &Path, files: &[(&str, String)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn settings_for(root: &TempDir, server_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.batch.input_dir = root.path().join("UML");
    settings.batch.output_dir = root.path().join("Images");
    settings.server.url = server_url.to_string();
    settings.server.timeout_secs = 5;
    settings
}

fn diagram(body: &str) -> String {
    format!("@startuml\n{}\n@enduml\n", body)
}

#[test]
fn test_batch_renders_every_source_in_sorted_order() {
    let server = FakeServer::start();
    let root = TempDir::new().unwrap();
    let settings = settings_for(&root, &server.url);
    write_sources(
        &settings.batch.input_dir,
        &[
            ("b.puml", diagram("B -> C")),
            ("a.puml", diagram("A -> B")),
            ("c.puml", diagram("C -> A")),
        ],
    );

    let driver = BatchDriver::from_settings(&settings).unwrap();
    let report = driver.run(&mut NoopObserver).unwrap();

    let summary = report.summary().expect("batch should complete");
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 3);

    assert_eq!(
        server.requests(),
        vec![diagram("A -> B"), diagram("B -> C"), diagram("C -> A")]
    );

    for (name, body) in [("a", "A -> B"), ("b", "B -> C"), ("c", "C -> A")] {
        let png = fs::read(settings.batch.output_dir.join(format!("{name}.png"))).unwrap();
        assert!(png.starts_with(PNG_MAGIC));
        assert_eq!(&png[PNG_MAGIC.len()..], diagram(body).as_bytes());
    }
}

#[test]
fn test_failed_source_does_not_stop_batch() {
    let server = FakeServer::start();
    let root = TempDir::new().unwrap();
    let settings = settings_for(&root, &server.url);
    write_sources(
        &settings.batch.input_dir,
        &[
            ("a.puml", diagram("A -> B")),
            ("b.puml", diagram("FAIL")),
            ("c.puml", diagram("C -> A")),
        ],
    );

    let driver = BatchDriver::from_settings(&settings).unwrap();
    let report = driver.run(&mut NoopObserver).unwrap();

    let summary = report.summary().unwrap();
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert!(summary.outcomes[1]
        .error
        .as_deref()
        .unwrap()
        .contains("500"));

    let output = &settings.batch.output_dir;
    assert!(output.join("a.png").exists());
    assert!(!output.join("b.png").exists());
    assert!(output.join("c.png").exists());
}

#[test]
fn test_unreachable_server_fails_each_source_without_aborting() {
    let root = TempDir::new().unwrap();
    let settings = settings_for(&root, "http://127.0.0.1:1/plantuml");
    write_sources(
        &settings.batch.input_dir,
        &[("a.puml", diagram("A")), ("b.puml", diagram("B"))],
    );

    let driver = BatchDriver::from_settings(&settings).unwrap();
    let report = driver.run(&mut NoopObserver).unwrap();

    let summary = report.summary().unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 0);
    assert!(summary.outcomes.iter().all(|o| o.error.is_some()));
    // The output directory exists even though nothing was written
    assert!(settings.batch.output_dir.is_dir());
}

#[test]
fn test_second_run_reuses_output_directory() {
    let server = FakeServer::start();
    let root = TempDir::new().unwrap();
    let settings = settings_for(&root, &server.url);
    write_sources(&settings.batch.input_dir, &[("a.puml", diagram("A"))]);

    let driver = BatchDriver::from_settings(&settings).unwrap();
    for _ in 0..2 {
        let report = driver.run(&mut NoopObserver).unwrap();
        assert_eq!(report.summary().unwrap().succeeded, 1);
    }
    assert_eq!(server.requests().len(), 2);
}

#[test]
fn test_empty_input_creates_no_output_directory() {
    let server = FakeServer::start();
    let root = TempDir::new().unwrap();
    let settings = settings_for(&root, &server.url);
    write_sources(&settings.batch.input_dir, &[("notes.txt", "not a diagram".to_string())]);

    let driver = BatchDriver::from_settings(&settings).unwrap();
    let report = driver.run(&mut NoopObserver).unwrap();

    assert_eq!(report, BatchReport::NothingToDo);
    assert!(!settings.batch.output_dir.exists());
    assert!(server.requests().is_empty());
}

#[test]
fn test_render_command_with_config_file() {
    let server = FakeServer::start();
    let root = TempDir::new().unwrap();
    let input = root.path().join("UML");
    let output = root.path().join("Images");
    write_sources(&input, &[("flow.puml", diagram("A -> B"))]);

    let config = root.path().join("pumlgen.toml");
    fs::write(
        &config,
        format!(
            "[batch]\ninput_dir = {:?}\noutput_dir = {:?}\n\n[server]\nurl = {:?}\ntimeout_secs = 5\n",
            input.display().to_string(),
            output.display().to_string(),
            server.url
        ),
    )
    .unwrap();

    let options = RenderOptions {
        config: Some(config),
        ..RenderOptions::default()
    };
    let report = render_command(&options, ReportFormat::Json).unwrap();

    assert_eq!(report.summary().unwrap().succeeded, 1);
    assert!(output.join("flow.png").exists());
}

#[test]
fn test_render_command_missing_input_dir_is_error() {
    let root = TempDir::new().unwrap();
    let options = RenderOptions {
        input: Some(root.path().join("missing")),
        output: Some(root.path().join("Images")),
        server: Some("http://127.0.0.1:1".into()),
        ..RenderOptions::default()
    };

    let err = render_command(&options, ReportFormat::Text).unwrap_err();
    assert!(format!("{:#}", err).contains("Input directory not found"));
}
