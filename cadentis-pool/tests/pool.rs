mod common;

use cadentis_pool::{Error, Pool, PoolBuilder, ShutdownOptions};
use common::{UNIT, init_tracing, work};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_zero_workers_is_invalid() {
    let err = Pool::new(0).err().expect("size 0 must be rejected");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn test_zero_capacity_is_invalid() {
    let result = PoolBuilder::new().worker_threads(2).queue_capacity(0).build();
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_submit_and_get() {
    init_tracing();
    let pool = Pool::new(2).unwrap();

    let a = pool.submit(|| 2_u64.pow(10)).unwrap();
    let b = pool.submit(|| 3_u64.pow(5)).unwrap();
    let c = pool.submit(|| 4_u64.pow(3)).unwrap();

    assert_eq!(b.get().unwrap(), 243);
    assert_eq!(a.get().unwrap(), 1024);
    assert_eq!(c.get().unwrap(), 64);
}

#[test]
fn test_task_ids_follow_submission_order() {
    let pool = Pool::new(1).unwrap();

    let ids: Vec<u64> = (0..5)
        .map(|_| pool.submit(|| ()).unwrap().id().as_u64())
        .collect();

    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_submit_does_not_wait_for_execution() {
    let pool = Pool::new(1).unwrap();

    let start = Instant::now();
    let slow = pool.submit(|| work(3)).unwrap();
    let queued = pool.submit(|| work(1)).unwrap();

    assert!(start.elapsed() < UNIT, "submit should return immediately");
    assert_eq!(slow.get().unwrap(), 3);
    assert_eq!(queued.get().unwrap(), 1);
}

#[test]
fn test_submit_after_shutdown_is_rejected() {
    let pool = Pool::new(2).unwrap();
    pool.shutdown(true);

    assert!(pool.is_shutdown());
    assert!(matches!(pool.submit(|| 1), Err(Error::ShutDown)));
    assert!(matches!(pool.map_ordered(|x: u8| x, [1, 2]), Err(Error::ShutDown)));
}

#[test]
fn test_shutdown_wait_drains_queue() {
    init_tracing();
    let pool = Pool::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = counter.clone();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(20));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        })
        .collect();

    pool.shutdown(true);

    assert_eq!(counter.load(Ordering::SeqCst), 8);
    assert!(handles.iter().all(|h| h.done()));
    assert_eq!(pool.queued(), 0);
    assert_eq!(pool.active(), 0);
}

#[test]
fn test_shutdown_without_wait_returns_immediately() {
    let pool = Pool::new(1).unwrap();
    let first = pool.submit(|| work(2)).unwrap();
    let second = pool.submit(|| work(1)).unwrap();

    let start = Instant::now();
    pool.shutdown(false);
    assert!(start.elapsed() < UNIT);

    // In-flight and queued tasks still finish.
    assert_eq!(first.get().unwrap(), 2);
    assert_eq!(second.get().unwrap(), 1);
}

#[test]
fn test_shutdown_with_cancel_pending() {
    let pool = Pool::new(1).unwrap();
    let (started_tx, started_rx) = mpsc::channel();

    let running = pool
        .submit(move || {
            started_tx.send(()).unwrap();
            work(2)
        })
        .unwrap();
    started_rx.recv().unwrap();

    let queued: Vec<_> = (0..3).map(|_| pool.submit(|| work(1)).unwrap()).collect();

    let cancelled = pool.shutdown_with(ShutdownOptions {
        wait: true,
        cancel_pending: true,
    });

    assert_eq!(cancelled, 3);
    assert_eq!(running.get().unwrap(), 2);
    for handle in &queued {
        assert!(handle.is_cancelled());
        assert!(handle.get().unwrap_err().is_cancelled());
    }
}

#[test]
fn test_failures_survive_shutdown() {
    let pool = Pool::new(2).unwrap();
    let failing = pool.try_submit(|| Err::<(), _>("broken pipe")).unwrap();

    pool.shutdown(true);

    let err = failing.get().unwrap_err();
    assert!(err.to_string().contains("broken pipe"));
}

#[test]
fn test_drop_waits_for_tasks() {
    let counter = Arc::new(AtomicUsize::new(0));

    {
        let pool = Pool::new(2).unwrap();
        for _ in 0..4 {
            let counter = counter.clone();
            pool.submit(move || {
                thread::sleep(Duration::from_millis(30));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        // Pool is dropped here
    }

    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[test]
fn test_shutdown_is_idempotent() {
    let pool = Pool::new(2).unwrap();
    pool.submit(|| work(1)).unwrap();

    pool.shutdown(false);
    pool.shutdown(true);
    pool.shutdown(true);

    assert!(pool.is_shutdown());
}

#[test]
fn test_concurrent_shutdown_callers_all_wait() {
    let pool = Arc::new(Pool::new(1).unwrap());
    let handle = pool.submit(|| work(2)).unwrap();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let pool = pool.clone();
            let handle = handle.clone();
            thread::spawn(move || {
                pool.shutdown(true);
                handle.done()
            })
        })
        .collect();

    for waiter in waiters {
        assert!(waiter.join().unwrap(), "shutdown(true) returned early");
    }
}

#[test]
fn test_dropping_pool_inside_worker_does_not_deadlock() {
    let pool = Arc::new(Pool::new(2).unwrap());
    let (tx, rx) = mpsc::channel();

    let inner = pool.clone();
    pool.submit(move || {
        inner.shutdown(true);
        tx.send(()).unwrap();
    })
    .unwrap();

    rx.recv_timeout(Duration::from_secs(5))
        .expect("shutdown from a worker must not block");
}

#[test]
fn test_bounded_queue_blocks_submitter() {
    let pool = PoolBuilder::new()
        .worker_threads(1)
        .queue_capacity(1)
        .build()
        .unwrap();
    let (started_tx, started_rx) = mpsc::channel();

    pool.submit(move || {
        started_tx.send(()).unwrap();
        work(2)
    })
    .unwrap();
    started_rx.recv().unwrap();

    // Fills the single queue slot.
    pool.submit(|| 0).unwrap();

    let start = Instant::now();
    let third = pool.submit(|| 3).unwrap();
    assert!(
        start.elapsed() >= UNIT,
        "submit should block while the queue is full"
    );
    assert_eq!(third.get().unwrap(), 3);
}

#[test]
fn test_stats() {
    let pool = Pool::new(1).unwrap();
    assert_eq!(pool.worker_count(), 1);
    assert!(!pool.is_shutdown());

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let blocker = pool
        .submit(move || {
            started_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
    started_rx.recv().unwrap();
    let queued = pool.submit(|| ()).unwrap();

    assert_eq!(pool.active(), 1);
    assert_eq!(pool.queued(), 1);

    release_tx.send(()).unwrap();
    blocker.get().unwrap();
    queued.get().unwrap();
}

#[test]
fn test_task_ids_follow_queue_order_across_submitters() {
    let pool = Arc::new(Pool::new(1).unwrap());
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let blocker = pool.submit(move || release_rx.recv().unwrap()).unwrap();

    let submitters: Vec<_> = (0..4)
        .map(|source| {
            let pool = pool.clone();
            let log = log.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|seq| {
                        let log = log.clone();
                        let token = (source, seq);
                        let handle = pool
                            .submit(move || log.lock().unwrap().push(token))
                            .unwrap();
                        (token, handle.id())
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: std::collections::HashMap<_, _> = submitters
        .into_iter()
        .flat_map(|submitter| submitter.join().unwrap())
        .collect();

    release_tx.send(()).unwrap();
    blocker.get().unwrap();
    pool.shutdown(true);

    // A single worker runs tasks in queue order; their ids must ascend.
    let executed: Vec<u64> = log
        .lock()
        .unwrap()
        .iter()
        .map(|token| ids[token].as_u64())
        .collect();

    assert_eq!(executed.len(), 100);
    assert!(executed.windows(2).all(|pair| pair[0] < pair[1]));
}
