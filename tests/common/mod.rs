//! Common test utilities for episode-relay integration tests

use episode_relay::Config;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Body the fake yt-dlp writes for every successful download
pub const EPISODE_CONTENT: &[u8] = b"fake episode payload";

/// Write an executable stand-in for yt-dlp
///
/// Honors `-o <output>`, prints two progress lines and writes
/// [`EPISODE_CONTENT`]. URLs containing `broken` exit non-zero after leaving
/// `.part`, `.ytdl` and per-format files behind, like a real failed download.
#[cfg(unix)]
pub fn fake_ytdlp(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
out=""
url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --*) shift ;;
    *) url="$1"; shift ;;
  esac
done
case "$url" in
  *broken*)
    printf 'partial' > "$out.part"
    printf '{}' > "$out.ytdl"
    printf 'partial' > "${out%.*}.f137.mp4.part"
    echo "ERROR: [generic] Unsupported URL: $url" >&2
    exit 1
    ;;
esac
echo "[download]  40.0% of 20.00KiB at 1.00MiB/s ETA 00:00"
echo "[download] 100.0% of 20.00KiB at 1.00MiB/s ETA 00:00"
printf 'fake episode payload' > "$out"
"#;

    let path = dir.join("yt-dlp");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Configuration pointing at a temp dir, a fake yt-dlp and a mock storage server
#[cfg(unix)]
pub fn test_config(temp_dir: &TempDir, storage: &MockServer) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.logs_dir = temp_dir.path().join("logs");
    config.download.ytdlp_path = Some(fake_ytdlp(temp_dir.path()));
    config.storage.endpoint = storage.uri();
    config.storage.email = Some("relay@example.com".to_string());
    config.storage.password = Some("hunter2".to_string());
    config
}

/// Mount a login endpoint that hands out `token`
pub async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Request path an episode file is uploaded to
pub fn upload_path(file_name: &str) -> String {
    format!("/files/{}", urlencoding::encode(file_name))
}
