use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::sleep;
use std::time::Duration;
use tempfile::tempdir;

use batch_mover::descriptor::lock;
use batch_mover::{
    plan_descriptor, CompletionSink, MoveJob, MoveScheduler, MoveSettings, MoveStatus,
    ProgressObserver, SchedulerConfig, SchedulerState, SharedDescriptor,
};

#[derive(Default)]
struct Sink {
    ticks: Mutex<Vec<(usize, usize)>>,
    finished: AtomicUsize,
}

impl CompletionSink for Sink {
    fn progress(&self, total: usize, remaining: usize) {
        self.ticks.lock().unwrap().push((total, remaining));
    }
    fn finished(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

/// Stalls in `initialize` to simulate a hung move.
#[derive(Default)]
struct Stall {
    delay: Duration,
    finishes: AtomicUsize,
    statuses: Mutex<Vec<String>>,
}

impl ProgressObserver for Stall {
    fn initialize(&self, _total_bytes: u64) {
        sleep(self.delay);
    }
    fn status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }
    fn finish(&self, _success: bool) {
        self.finishes.fetch_add(1, Ordering::SeqCst);
    }
}

fn config(workers: usize, timeout: Duration) -> SchedulerConfig {
    SchedulerConfig {
        workers,
        item_timeout: timeout,
    }
}

fn source(dir: &Path, name: &str, body: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p
}

fn plan(src: &Path, name: &str, root: &Path) -> SharedDescriptor {
    plan_descriptor(src, Some(name), root, &MoveSettings::default())
        .unwrap()
        .share()
}

#[test]
fn drains_batch_and_numbers_collisions() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let out = base.join("out");
    let small = source(&base.join("in"), "x1.mkv", &[0u8; 200]);
    let big = source(&base.join("in"), "x2.mkv", &[0u8; 500]);
    let other = source(&base.join("in"), "x3.srt", b"sub");

    let ds = vec![
        plan(&small, "Show.S01E01.mkv", &out),
        plan(&big, "Show.S01E01.mkv", &out),
        plan(&other, "Show.S01E01.srt", &out),
    ];

    let sink = Arc::new(Sink::default());
    let settings = MoveSettings {
        duplicates_dir: None,
        ..MoveSettings::default()
    };
    let mut scheduler =
        MoveScheduler::start(config(2, Duration::from_secs(30)), settings, sink.clone()).unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Created);
    scheduler
        .submit(ds.iter().cloned().map(MoveJob::new).collect())
        .unwrap();
    let report = scheduler.wait();

    assert_eq!(report.total, 3);
    assert_eq!(report.renamed, 3);
    assert!(report.all_succeeded());
    assert_eq!(fs::metadata(out.join("Show.S01E01.mkv")).unwrap().len(), 500);
    assert_eq!(fs::metadata(out.join("Show.S01E01 (2).mkv")).unwrap().len(), 200);
    assert!(out.join("Show.S01E01.srt").is_file());
    assert!(ds.iter().all(|d| lock(d).status() == MoveStatus::Renamed));

    assert_eq!(*sink.ticks.lock().unwrap(), vec![(3, 2), (3, 1), (3, 0)]);
    assert_eq!(sink.finished.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_sources_are_reported_not_found() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let src = source(&base.join("in"), "a.txt", b"x");
    let d = plan(&src, "a.txt", &base.join("out"));
    fs::remove_file(&src).unwrap();

    let mut scheduler = MoveScheduler::start(
        config(1, Duration::from_secs(30)),
        MoveSettings::default(),
        Arc::new(Sink::default()),
    )
    .unwrap();
    scheduler.submit(vec![MoveJob::new(d.clone())]).unwrap();
    let report = scheduler.wait();

    assert_eq!(report.not_found, 1);
    assert!(!report.all_succeeded());
    assert_eq!(lock(&d).status(), MoveStatus::NotFound);
}

#[test]
fn stuck_move_times_out_once_and_batch_continues() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let out = base.join("out");
    let slow_src = source(&base.join("in"), "slow.txt", b"s");
    let fast_src = source(&base.join("in"), "fast.txt", b"f");
    let slow = plan(&slow_src, "slow.txt", &out);
    let fast = plan(&fast_src, "fast.txt", &out);

    let stall = Arc::new(Stall {
        delay: Duration::from_millis(1500),
        ..Default::default()
    });
    let sink = Arc::new(Sink::default());
    let mut scheduler = MoveScheduler::start(
        config(2, Duration::from_millis(200)),
        MoveSettings::default(),
        sink.clone(),
    )
    .unwrap();
    scheduler
        .submit(vec![
            MoveJob::new(slow.clone()).with_observer(stall.clone()),
            MoveJob::new(fast.clone()),
        ])
        .unwrap();
    let report = scheduler.wait();

    assert_eq!(report.timed_out, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.renamed, 1);
    assert_eq!(lock(&slow).status(), MoveStatus::Failed);
    assert_eq!(lock(&fast).status(), MoveStatus::Renamed);
    assert_eq!(sink.finished.load(Ordering::SeqCst), 1);
    assert_eq!(stall.finishes.load(Ordering::SeqCst), 1);
    assert!(
        stall.statuses.lock().unwrap().iter().any(|s| s.contains("did not finish within")),
        "observer should hear why the move failed"
    );

    // Let the abandoned worker run to completion; its late result must not be reported.
    sleep(Duration::from_millis(2000));
    assert_eq!(stall.finishes.load(Ordering::SeqCst), 1);
    assert_eq!(lock(&slow).status(), MoveStatus::Failed);
}

#[test]
fn shutdown_discards_queued_moves() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let out = base.join("out");

    let first = plan(&source(&base.join("in"), "0.txt", b"0"), "0.txt", &out);
    let stall = Arc::new(Stall {
        delay: Duration::from_millis(500),
        ..Default::default()
    });
    let queued: Vec<(PathBuf, SharedDescriptor)> = (1..4)
        .map(|i| {
            let src = source(&base.join("in"), &format!("{i}.txt"), b"q");
            let d = plan(&src, &format!("{i}.txt"), &out);
            (src, d)
        })
        .collect();

    let mut scheduler = MoveScheduler::start(
        config(1, Duration::from_secs(30)),
        MoveSettings::default(),
        Arc::new(Sink::default()),
    )
    .unwrap();
    let handle = scheduler.shutdown_handle();
    let mut jobs = vec![MoveJob::new(first).with_observer(stall)];
    jobs.extend(queued.iter().map(|(_, d)| MoveJob::new(d.clone())));
    scheduler.submit(jobs).unwrap();
    handle.trigger();
    assert!(handle.is_requested());
    let report = scheduler.wait();

    assert_eq!(report.total, 4);
    assert!(report.cancelled >= 3, "{report:?}");
    for (src, d) in &queued {
        assert_eq!(lock(d).status(), MoveStatus::Failed);
        assert!(src.is_file(), "queued source must be untouched");
    }
}

/// Sink whose progress callback blows up, taking the coordinator with it.
#[derive(Default)]
struct PanickySink {
    finished: AtomicUsize,
}

impl CompletionSink for PanickySink {
    fn progress(&self, _total: usize, _remaining: usize) {
        panic!("progress sink failure");
    }
    fn finished(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn finished_is_signalled_even_if_coordinator_panics() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let src = source(&base.join("in"), "a.txt", b"x");
    let d = plan(&src, "a.txt", &base.join("out"));

    let sink = Arc::new(PanickySink::default());
    let mut scheduler = MoveScheduler::start(
        config(1, Duration::from_secs(30)),
        MoveSettings::default(),
        sink.clone(),
    )
    .unwrap();
    scheduler.submit(vec![MoveJob::new(d)]).unwrap();
    let report = scheduler.wait();

    assert_eq!(report, batch_mover::DrainReport::default());
    assert_eq!(sink.finished.load(Ordering::SeqCst), 1);
}

#[test]
fn in_batch_index_collision_never_clobbers() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let out = base.join("out");
    let a = source(&base.join("in"), "a.mkv", b"literal");
    let b = source(&base.join("in"), "b.mkv", b"biggest one");
    let c = source(&base.join("in"), "c.mkv", b"small");
    let ds = vec![
        plan(&a, "x (2).mkv", &out),
        plan(&b, "x.mkv", &out),
        plan(&c, "x.mkv", &out),
    ];

    let settings = MoveSettings {
        duplicates_dir: None,
        ..MoveSettings::default()
    };
    let mut scheduler = MoveScheduler::start(
        config(3, Duration::from_secs(30)),
        settings,
        Arc::new(Sink::default()),
    )
    .unwrap();
    scheduler
        .submit(ds.iter().cloned().map(MoveJob::new).collect())
        .unwrap();
    let report = scheduler.wait();

    assert_eq!(report.renamed, 3, "{report:?}");
    assert_eq!(fs::read(out.join("x (2).mkv")).unwrap(), b"literal");
    assert_eq!(fs::read(out.join("x.mkv")).unwrap(), b"biggest one");
    assert_eq!(fs::read(out.join("x (3).mkv")).unwrap(), b"small");
}

#[test]
fn submit_twice_is_rejected() {
    let mut scheduler = MoveScheduler::start(
        config(1, Duration::from_secs(1)),
        MoveSettings::default(),
        Arc::new(Sink::default()),
    )
    .unwrap();
    scheduler.submit(Vec::new()).unwrap();
    assert_ne!(scheduler.state(), SchedulerState::Created);
    assert!(scheduler.submit(Vec::new()).is_err());
    let report = scheduler.wait();
    assert_eq!(report.total, 0);
}

#[test]
fn zero_workers_is_an_error() {
    assert!(
        MoveScheduler::start(
            config(0, Duration::from_secs(1)),
            MoveSettings::default(),
            Arc::new(Sink::default()),
        )
        .is_err()
    );
}
