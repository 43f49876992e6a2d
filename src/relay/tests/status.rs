use super::*;
use crate::registry::JobSnapshot;

#[tokio::test]
async fn test_status_of_idle_relay() {
    let (relay, _temp_dir) = create_test_relay(FakeFetcher::new(), FakeStorage::new()).await;

    let status = relay.status().await.unwrap();

    assert!(status.downloading_files.is_empty());
    assert!(status.logs.is_empty());
    assert!(status.active_processes.is_empty());
    assert_eq!(status.total_active_processes, 0);
    assert!(status.download_folder.ends_with("downloads"));
}

#[tokio::test]
async fn test_status_lists_active_job_and_partial_file() {
    let url = "https://example.com/ep/1";
    let fetcher = FakeFetcher::new().with(url, Script::Hang);
    let download_started = fetcher.started.clone();
    let (relay, _temp_dir) = create_test_relay(fetcher, FakeStorage::new()).await;

    let batch = tokio::spawn({
        let relay = relay.clone();
        async move { relay.process_batch(&urls(1)).await }
    });
    download_started.notified().await;

    let status = relay.status().await.unwrap();
    assert_eq!(
        status.active_processes,
        vec![JobSnapshot {
            episode: EpisodeId(1),
            status: JobStatus::Downloading,
            is_cancelling: false,
        }]
    );
    assert_eq!(status.total_active_processes, 1);
    let mut expected: Vec<String> = partial_paths(&artifact_path(&relay, 1))
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    expected.sort();
    assert_eq!(status.downloading_files, expected);
    assert_eq!(status.logs.len(), 1);

    relay.cancel_all().await;
    batch.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_status_serializes_camel_case() {
    let (relay, _temp_dir) = create_test_relay(FakeFetcher::new(), FakeStorage::new()).await;
    relay.process_batch(&urls(1)).await.unwrap();

    let json = serde_json::to_value(relay.status().await.unwrap()).unwrap();

    for key in [
        "downloadingFiles",
        "downloadFolder",
        "logs",
        "activeProcesses",
        "totalActiveProcesses",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(json["logs"][0]["filename"].is_string());
    assert!(json["logs"][0]["content"].is_string());
}

#[tokio::test]
async fn test_status_fails_when_download_dir_is_gone() {
    let (relay, temp_dir) = create_test_relay(FakeFetcher::new(), FakeStorage::new()).await;
    std::fs::remove_dir_all(temp_dir.path().join("downloads")).unwrap();

    assert!(matches!(relay.status().await, Err(Error::Io(_))));
}
