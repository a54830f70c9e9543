#![cfg(feature = "cdp")]

//! End-to-end capture through a real headless Chrome

use diagshot::capture::run_batch;
use diagshot::cdp::CdpSession;
use diagshot::{CaptureConfig, DiagramJob, LaunchSettings};
use std::fs;

// Static markup shaped like Mermaid output, so no network access is needed.
const DIAGRAM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Diagram</title></head>
<body style="margin:0">
<div class="mermaid">
  <svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
    <rect x="10" y="10" width="180" height="80" fill="steelblue"/>
  </svg>
</div>
</body>
</html>"#;

const EMPTY_PAGE: &str = r#"<!DOCTYPE html>
<html><body><div class="mermaid">graph TD; A-->B</div></body></html>"#;

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn captures_rendered_diagram() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("box.html"), DIAGRAM_PAGE).unwrap();
    fs::write(dir.path().join("empty.html"), EMPTY_PAGE).unwrap();

    let jobs = vec![
        DiagramJob::new("box.html", 320, 240, "Box"),
        DiagramJob::new("empty.html", 320, 240, "Never renders"),
    ];
    let config = CaptureConfig {
        source_dir: dir.path().to_path_buf(),
        settle_ms: 0,
        render_timeout_ms: 1_000,
        launch: LaunchSettings::default().sized_for(&jobs),
        ..Default::default()
    };

    let launch = config.launch.clone();
    let summary = run_batch(&jobs, &config, move || CdpSession::launch(&launch), &mut Vec::<u8>::new())
        .await
        .expect("Failed to run batch");

    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.error_count(), 1);

    let png = fs::read(dir.path().join("images/box.png")).expect("missing box.png");
    assert!(png.len() > 100, "PNG data seems too small");
    assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    // IHDR width/height are big-endian u32s at offsets 16 and 20
    assert_eq!(u32::from_be_bytes(png[16..20].try_into().unwrap()), 320);
    assert_eq!(u32::from_be_bytes(png[20..24].try_into().unwrap()), 240);

    assert!(!dir.path().join("images/empty.png").exists());
}
