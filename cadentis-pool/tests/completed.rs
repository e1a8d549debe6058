mod common;

use cadentis_pool::{Error, Handle, Pool, TaskState, WaitFor, as_completed, wait};
use common::{UNIT, init_tracing, work};

use std::sync::mpsc;
use std::time::{Duration, Instant};

fn submit_work(pool: &Pool, units: &[u64]) -> Vec<Handle<u64>> {
    units
        .iter()
        .map(|&n| pool.submit(move || work(n)).unwrap())
        .collect()
}

#[test]
fn test_yields_in_completion_order() {
    init_tracing();
    let pool = Pool::new(3).unwrap();
    let handles = submit_work(&pool, &[3, 1, 2]);

    let start = Instant::now();
    let mut seen = Vec::new();

    for handle in pool.stream_completed(handles, None) {
        let handle = handle.unwrap();
        assert!(handle.done());

        let value = handle.get().unwrap();
        let elapsed = start.elapsed();

        // Each result shows up once its own task is done, not later.
        assert!(elapsed >= UNIT * value as u32 - UNIT / 2, "{value} at {elapsed:?}");
        assert!(elapsed < UNIT * (value as u32 + 1), "{value} at {elapsed:?}");
        seen.push(value);
    }

    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn test_each_handle_is_yielded_once() {
    let pool = Pool::new(4).unwrap();
    let handles: Vec<_> = (0..32_u64)
        .map(|n| pool.submit(move || n).unwrap())
        .collect();

    let mut ids: Vec<u64> = as_completed(handles, None)
        .map(|handle| handle.unwrap().id().as_u64())
        .collect();
    ids.sort_unstable();

    assert_eq!(ids, (0..32).collect::<Vec<_>>());
}

#[test]
fn test_terminal_handles_come_out_in_registration_order() {
    let pool = Pool::new(2).unwrap();
    let handles: Vec<_> = (0..5_u32).map(|n| pool.submit(move || n).unwrap()).collect();
    pool.shutdown(true);

    let mut reversed = handles.clone();
    reversed.reverse();

    let values: Vec<u32> = as_completed(reversed, None)
        .map(|handle| handle.unwrap().get().unwrap())
        .collect();

    assert_eq!(values, vec![4, 3, 2, 1, 0]);
}

#[test]
fn test_duplicate_handles_are_watched_once() {
    let pool = Pool::new(1).unwrap();
    let first = pool.submit(|| 1).unwrap();
    let second = pool.submit(|| 2).unwrap();

    let stream = as_completed([first.clone(), second, first], None);
    assert_eq!(stream.len(), 2);
    assert_eq!(stream.count(), 2);
}

#[test]
fn test_timeout_keeps_remaining_handles() {
    let pool = Pool::new(2).unwrap();
    let handles = submit_work(&pool, &[1, 5]);

    let mut stream = pool.stream_completed(handles, Some(UNIT * 2));

    assert_eq!(stream.next().unwrap().unwrap().get().unwrap(), 1);
    assert!(matches!(
        stream.next(),
        Some(Err(Error::Timeout { waited })) if waited == UNIT * 2
    ));
    assert!(stream.next().is_none());

    let remaining = stream.into_remaining();
    assert_eq!(remaining.len(), 1);
    assert!(!remaining[0].done());

    // A fresh stream picks up where the expired one stopped.
    let values: Vec<u64> = as_completed(remaining, None)
        .map(|handle| handle.unwrap().get().unwrap())
        .collect();
    assert_eq!(values, vec![5]);
}

#[test]
fn test_cancelled_handle_is_delivered() {
    let pool = Pool::new(1).unwrap();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let blocker = pool.submit(move || release_rx.recv().unwrap()).unwrap();
    let victim = pool.submit(|| ()).unwrap();

    let mut stream = as_completed([victim.clone()], None);
    assert!(victim.cancel());

    let delivered = stream.next().unwrap().unwrap();
    assert_eq!(delivered.id(), victim.id());
    assert!(delivered.get().unwrap_err().is_cancelled());
    assert!(stream.next().is_none());

    release_tx.send(()).unwrap();
    blocker.get().unwrap();
}

#[test]
fn test_empty_stream_ends_at_once() {
    let mut stream = as_completed(Vec::<Handle<()>>::new(), Some(UNIT));
    assert!(stream.is_empty());
    assert!(stream.next().is_none());
}

#[test]
fn test_wait_first_completed() {
    let pool = Pool::new(2).unwrap();
    let handles = submit_work(&pool, &[3, 1]);

    let set = wait(handles, None, WaitFor::FirstCompleted);

    assert_eq!(set.done.len(), 1);
    assert_eq!(set.done[0].get().unwrap(), 1);
    assert_eq!(set.pending.len(), 1);
    assert!(!set.pending[0].done());
}

#[test]
fn test_wait_first_failure() {
    let pool = Pool::new(3).unwrap();

    let fast = pool.submit(|| work(1)).unwrap();
    let failing = pool
        .try_submit(|| {
            work(2);
            Err::<u64, _>("boom")
        })
        .unwrap();
    let slow = pool.submit(|| work(5)).unwrap();

    let set = wait([fast, failing.clone(), slow], None, WaitFor::FirstFailure);

    assert_eq!(set.done.len(), 2);
    assert_eq!(set.done[1].id(), failing.id());
    assert_eq!(set.done[1].state(), TaskState::Failed);
    assert_eq!(set.pending.len(), 1);
}

#[test]
fn test_wait_all_completed_with_timeout() {
    let pool = Pool::new(2).unwrap();
    let handles = submit_work(&pool, &[1, 5]);

    let start = Instant::now();
    let set = wait(handles, Some(UNIT * 2), WaitFor::AllCompleted);

    // Timing out is not an error: the split reflects what finished.
    assert!(start.elapsed() >= UNIT * 2);
    assert_eq!(set.done.len(), 1);
    assert_eq!(set.pending.len(), 1);
}

#[test]
fn test_wait_all_completed() {
    let pool = Pool::new(2).unwrap();
    let handles = submit_work(&pool, &[2, 1, 1]);

    let set = wait(handles, None, WaitFor::AllCompleted);

    assert!(set.pending.is_empty());
    let values: Vec<u64> = set.done.iter().map(|h| h.get().unwrap()).collect();
    assert_eq!(values.len(), 3);
    assert_eq!(values.iter().sum::<u64>(), 4);
}

#[test]
fn test_unbounded_timeout_is_no_timeout() {
    let pool = Pool::new(2).unwrap();
    let handles = submit_work(&pool, &[1, 1]);

    let values: Vec<u64> = as_completed(handles.clone(), Some(Duration::MAX))
        .map(|handle| handle.unwrap().get().unwrap())
        .collect();
    assert_eq!(values, vec![1, 1]);

    let set = wait(handles, Some(Duration::MAX), WaitFor::AllCompleted);
    assert_eq!(set.done.len(), 2);
    assert!(set.pending.is_empty());
}
