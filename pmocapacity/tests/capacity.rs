use pmocapacity::{
    CancellationToken, CapacityError, CappedPlaylist, MemoryPlaylist, PlaylistSizeTracker, TrackId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const CAPACITY: usize = 10;

fn ids(prefix: &str, n: usize) -> Vec<TrackId> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn setup(current: usize) -> (Arc<MemoryPlaylist>, CappedPlaylist<Arc<MemoryPlaylist>>) {
    let remote = Arc::new(MemoryPlaylist::with_page_size(4));
    remote.insert_playlist("pl", ids("old", current));
    let playlist = CappedPlaylist::new(remote.clone()).with_capacity(CAPACITY);
    (remote, playlist)
}

#[tokio::test]
async fn test_no_eviction_below_capacity() {
    let (remote, playlist) = setup(5);

    let report = assert_ok!(playlist.add("pl", &ids("new", 2)).await);

    assert!(report.evicted.is_empty());
    assert_eq!(report.size, Some(7));
    assert_eq!(remote.removal_calls(), 0);
    assert_eq!(remote.len("pl"), 7);
}

#[tokio::test]
async fn test_evicts_oldest_to_reach_capacity() {
    let (remote, playlist) = setup(9);

    let report = assert_ok!(playlist.add("pl", &ids("new", 2)).await);

    assert_eq!(report.evicted, vec!["old0".to_string()]);
    assert_eq!(report.size, Some(10));
    assert_eq!(remote.len("pl"), 10);

    let tracks = remote.tracks("pl").unwrap();
    assert_eq!(tracks.first().map(String::as_str), Some("old1"));
    assert_eq!(&tracks[8..], &ids("new", 2)[..]);
}

#[tokio::test]
async fn test_large_batch_on_small_playlist() {
    let (remote, playlist) = setup(3);

    let report = assert_ok!(playlist.add("pl", &ids("new", 8)).await);

    assert_eq!(report.evicted, vec!["old0".to_string()]);
    assert_eq!(report.size, Some(10));
    assert_eq!(remote.len("pl"), 10);
}

#[tokio::test]
async fn test_batch_larger_than_capacity_is_rejected() {
    let (remote, playlist) = setup(2);

    let err = assert_err!(playlist.add("pl", &ids("new", 20)).await);

    assert!(err.is_capacity_exceeded());
    assert!(matches!(
        err,
        CapacityError::CapacityExceeded {
            requested: 20,
            current: 2,
            capacity: CAPACITY,
            ..
        }
    ));
    assert_eq!(remote.removal_calls(), 0);
    assert_eq!(remote.append_calls(), 0);
    assert_eq!(playlist.tracker().peek("pl").await, Some(2));
}

#[tokio::test]
async fn test_append_failure_keeps_eviction_in_count() {
    let (remote, playlist) = setup(9);
    remote.fail_next_append("Invalid track uri");

    let err = assert_err!(playlist.add("pl", &ids("new", 2)).await);

    match &err {
        CapacityError::RemoteAppendFailed { message, .. } => {
            assert_eq!(message, "Invalid track uri")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_remote());
    assert_eq!(playlist.tracker().peek("pl").await, Some(8));
    assert_eq!(remote.len("pl"), 8);
}

#[tokio::test]
async fn test_partial_append_is_counted() {
    let (remote, playlist) = setup(9);
    remote.fail_next_append_after(1, "second request failed");

    let err = assert_err!(playlist.add("pl", &ids("new", 3)).await);

    assert_eq!(err.remote_error().map(|e| e.applied), Some(1));
    // 9 - 2 retirés + 1 ajouté
    assert_eq!(playlist.tracker().peek("pl").await, Some(8));
    assert_eq!(remote.len("pl"), 8);
    assert_eq!(remote.tracks("pl").unwrap().last().map(String::as_str), Some("new0"));
}

#[tokio::test]
async fn test_append_failure_without_eviction_leaves_count() {
    let (remote, playlist) = setup(5);
    remote.fail_next_append("Forbidden");

    assert_err!(playlist.add("pl", &ids("new", 2)).await);

    assert_eq!(playlist.tracker().peek("pl").await, Some(5));
}

#[tokio::test]
async fn test_removal_failure_leaves_count() {
    let (remote, playlist) = setup(9);
    remote.fail_next_removal("Service unavailable");

    let err = assert_err!(playlist.add("pl", &ids("new", 3)).await);

    assert!(matches!(err, CapacityError::RemoteRemovalFailed { .. }));
    assert_eq!(remote.append_calls(), 0);
    assert_eq!(playlist.tracker().peek("pl").await, Some(9));
    assert_eq!(remote.len("pl"), 9);
}

#[tokio::test]
async fn test_fetch_failure_before_any_mutation() {
    let (remote, playlist) = setup(9);
    remote.fail_next_fetch("Bad gateway");

    let err = assert_err!(playlist.add("pl", &ids("new", 1)).await);

    assert!(matches!(err, CapacityError::RemoteFetchFailed { .. }));
    assert_eq!(playlist.tracker().peek("pl").await, None);
    assert_eq!(remote.append_calls(), 0);
}

#[tokio::test]
async fn test_evicted_set_is_playlist_prefix() {
    let (remote, playlist) = setup(10);

    // 10 + 7 - 10 = 7 titres à retirer, sur deux pages de 4
    let report = assert_ok!(playlist.add("pl", &ids("new", 7)).await);

    assert_eq!(report.evicted, ids("old", 7));
    assert_eq!(remote.removals(), vec![ids("old", 7)]);
}

#[tokio::test]
async fn test_count_walk_happens_once() {
    let (remote, playlist) = setup(6);

    assert_ok!(playlist.add("pl", &ids("a", 1)).await);
    assert_ok!(playlist.add("pl", &ids("b", 1)).await);
    assert_ok!(playlist.add("pl", &ids("c", 1)).await);

    // 6 titres, pages de 4 : deux appels pour le comptage initial seulement
    assert_eq!(remote.fetch_calls(), 2);
    assert_eq!(playlist.size("pl").await.unwrap(), 9);
}

/// Sizes and cache arithmetic over many batches, from many starting sizes
#[tokio::test]
async fn test_tracked_size_never_exceeds_capacity() {
    let mut seed: u64 = 0x5eed;
    let mut next = move |bound: usize| {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((seed >> 33) as usize) % bound
    };

    for start in 0..=CAPACITY {
        let (remote, playlist) = setup(start);

        for round in 0..25 {
            let before = playlist.size("pl").await.unwrap();
            let n = 1 + next(CAPACITY + 3);
            let batch = ids(&format!("r{round}-"), n);

            match playlist.add("pl", &batch).await {
                Ok(report) => {
                    let excess = (before + n).saturating_sub(CAPACITY);
                    assert_eq!(report.evicted.len(), excess);
                    assert_eq!(report.size, Some(before - excess + n));
                }
                Err(CapacityError::CapacityExceeded { .. }) => {
                    assert!(n > CAPACITY);
                    assert_eq!(playlist.tracker().peek("pl").await, Some(before));
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }

            let tracked = playlist.tracker().peek("pl").await.unwrap();
            assert!(tracked <= CAPACITY);
            // identifiants uniques : le cache suit exactement le distant
            assert_eq!(tracked, remote.len("pl"));
        }
    }
}

#[tokio::test]
async fn test_duplicate_identifiers_are_removed_together() {
    let remote = Arc::new(MemoryPlaylist::new());
    let mut tracks = vec!["dup".to_string()];
    tracks.extend(ids("old", 8));
    tracks.push("dup".to_string());
    remote.insert_playlist("pl", tracks);
    let playlist = CappedPlaylist::new(remote.clone()).with_capacity(CAPACITY);

    let report = assert_ok!(playlist.add("pl", &ids("new", 1)).await);

    assert_eq!(report.evicted, vec!["dup".to_string()]);
    // le distant a perdu les deux occurrences, le cache n'en compte qu'une
    assert_eq!(report.size, Some(10));
    assert_eq!(remote.len("pl"), 9);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_adds_on_same_playlist_are_serialized() {
    let remote = Arc::new(MemoryPlaylist::new().with_latency(Duration::from_millis(50)));
    remote.insert_playlist("pl", ids("old", 9));
    let playlist = Arc::new(CappedPlaylist::new(remote.clone()).with_capacity(CAPACITY));

    let first = {
        let playlist = playlist.clone();
        tokio::spawn(async move { playlist.add("pl", &ids("a", 1)).await })
    };
    let second = {
        let playlist = playlist.clone();
        tokio::spawn(async move { playlist.add("pl", &ids("b", 1)).await })
    };

    assert_ok!(first.await.unwrap());
    assert_ok!(second.await.unwrap());

    assert_eq!(playlist.tracker().peek("pl").await, Some(10));
    assert_eq!(remote.len("pl"), 10);
    assert_eq!(remote.removal_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_controllers_sharing_a_tracker_are_serialized() {
    let remote = Arc::new(MemoryPlaylist::new().with_latency(Duration::from_millis(50)));
    remote.insert_playlist("pl", ids("old", 9));
    let tracker = Arc::new(PlaylistSizeTracker::new());
    tracker.seed("pl", 9).await;

    let first = CappedPlaylist::new(remote.clone())
        .with_capacity(CAPACITY)
        .with_tracker(tracker.clone());
    let second = CappedPlaylist::new(remote.clone())
        .with_capacity(CAPACITY)
        .with_tracker(tracker.clone());

    let x = ["x".to_string()];
    let y = ["y".to_string()];
    let (a, b) = tokio::join!(first.add("pl", &x), second.add("pl", &y));
    assert_ok!(a);
    assert_ok!(b);

    assert_eq!(tracker.peek("pl").await, Some(10));
    assert_eq!(remote.len("pl"), 10);
    assert_eq!(remote.removals(), vec![vec!["old0".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_makes_no_call() {
    let (remote, playlist) = setup(9);
    let token = CancellationToken::new();
    token.cancel();

    let err = assert_err!(playlist.add_with_cancel("pl", &ids("new", 2), &token).await);

    assert!(matches!(err, CapacityError::Cancelled { .. }));
    assert_eq!(remote.fetch_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_append_keeps_eviction() {
    let remote = Arc::new(MemoryPlaylist::new().with_latency(Duration::from_millis(50)));
    remote.insert_playlist("pl", ids("old", 9));
    let playlist = CappedPlaylist::new(remote.clone()).with_capacity(CAPACITY);

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        // comptage 0-50, scan 50-100, retrait 100-150, ajout 150-200
        tokio::time::sleep(Duration::from_millis(175)).await;
        trigger.cancel();
    });

    let err = assert_err!(playlist.add_with_cancel("pl", &ids("new", 2), &token).await);

    assert!(matches!(err, CapacityError::Cancelled { .. }));
    assert_eq!(remote.len("pl"), 8);
    assert_eq!(playlist.tracker().peek("pl").await, Some(8));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_during_scan_mutates_nothing() {
    let remote = Arc::new(MemoryPlaylist::new().with_latency(Duration::from_millis(50)));
    remote.insert_playlist("pl", ids("old", 9));
    let playlist = CappedPlaylist::new(remote.clone()).with_capacity(CAPACITY);

    let err = assert_err!(
        playlist
            .add_with_timeout("pl", &ids("new", 2), Duration::from_millis(75))
            .await
    );

    assert!(matches!(err, CapacityError::Cancelled { .. }));
    assert_eq!(remote.removal_calls(), 0);
    assert_eq!(playlist.tracker().peek("pl").await, Some(9));
}

#[tokio::test]
async fn test_tracker_seeded_by_caller() {
    let remote = Arc::new(MemoryPlaylist::new());
    remote.insert_playlist("pl", ids("old", 4));
    let tracker = Arc::new(PlaylistSizeTracker::new());
    tracker.seed("pl", 4).await;

    let playlist = CappedPlaylist::new(remote.clone())
        .with_capacity(CAPACITY)
        .with_tracker(tracker.clone());
    assert_ok!(playlist.add("pl", &ids("new", 1)).await);

    assert_eq!(remote.fetch_calls(), 0);
    assert_eq!(tracker.peek("pl").await, Some(5));
}
