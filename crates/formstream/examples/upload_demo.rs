//! Upload demo
//!
//! Streams a few hand-built requests through `stream_upload` and prints the
//! resulting responses. Uploaded files land in a scratch directory that is
//! removed on exit.
//!
//! Run with: RUST_LOG=debug cargo run --example upload_demo -p formstream

use formstream::prelude::*;
use tracing_subscriber::EnvFilter;

const BOUNDARY: &str = "----formstream-demo";

fn request(parts: &[(&str, Option<&str>, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match filename {
            Some(f) => format!("form-data; name=\"{name}\"; filename=\"{f}\""),
            None => format!("form-data; name=\"{name}\""),
        };
        body.extend_from_slice(format!("Content-Disposition: {disposition}\r\n\r\n").as_bytes());
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let scratch = std::env::temp_dir().join(format!("formstream-demo-{}", std::process::id()));
    tokio::fs::create_dir_all(&scratch).await?;
    let sink = FileSink::new(&scratch);
    let options = FormOptions::default().value_count_limit(8);
    let content_type = format!("multipart/form-data; boundary={BOUNDARY}");

    let cases: Vec<(&str, String, Vec<u8>)> = vec![
        (
            "valid upload",
            content_type.clone(),
            request(&[
                ("Name", None, "Alice"),
                ("Age", None, "30"),
                ("file", Some("hello.txt"), "hello, world"),
            ]),
        ),
        (
            "validation failure",
            content_type.clone(),
            request(&[("Age", None, "not a number")]),
        ),
        ("wrong content type", "text/plain".to_string(), b"hi".to_vec()),
    ];

    for (label, content_type, body) in cases {
        let response = stream_upload(&content_type, body.as_slice(), &options, &sink).await;
        println!("{label}: {}", response.status());
        println!("{}", serde_json::to_string_pretty(response.body())?);
    }

    tokio::fs::remove_dir_all(&scratch).await?;
    Ok(())
}
