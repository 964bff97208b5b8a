use progress_task::event::{Event, forwarders};
use progress_task::ui::{PipeOptions, display_progress_pipe};
use progress_task::{
    CancellationSignal, DisplayState, Outcome, Progress, TaskConfig, TaskError, start,
};
use std::time::Duration;
use tokio::sync::mpsc;

fn step(index: usize) -> Event {
    Event::Progress(Progress::Step {
        index,
        value: index as f64,
    })
}

fn lines(buf: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(buf).lines().map(str::to_string).collect()
}

#[tokio::test]
async fn text_output_for_a_completed_run() {
    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..3 {
        tx.send(step(i)).unwrap();
    }
    tx.send(Event::Progress(Progress::Complete)).unwrap();
    tx.send(Event::Finished(Outcome::Completed)).unwrap();

    let signal = CancellationSignal::new();
    let mut state = DisplayState::default();
    state.try_begin();
    let mut out = Vec::new();
    let outcome = display_progress_pipe(rx, &signal, &mut state, PipeOptions::default(), &mut out)
        .await
        .unwrap();

    assert_eq!(outcome, Some(Outcome::Completed));
    assert_eq!(
        lines(&out),
        vec![
            "Starting",
            "[  0%] step 0",
            "[  1%] step 1",
            "[  2%] step 2",
            "Complete",
            "Done",
        ]
    );
    assert!(!state.busy);
    assert_eq!(state.value, 100.0);
}

#[tokio::test]
async fn cancel_after_requests_cancellation_once() {
    let (tx, rx) = mpsc::unbounded_channel();
    for i in 0..5 {
        tx.send(step(i)).unwrap();
    }
    tx.send(Event::Progress(Progress::Canceled)).unwrap();
    tx.send(Event::Finished(Outcome::Canceled)).unwrap();

    let signal = CancellationSignal::new();
    let mut state = DisplayState::default();
    state.try_begin();
    let opts = PipeOptions {
        json: false,
        cancel_after: Some(2),
    };
    let mut out = Vec::new();
    let outcome = display_progress_pipe(rx, &signal, &mut state, opts, &mut out)
        .await
        .unwrap();

    assert!(signal.is_cancelled());
    assert_eq!(outcome, Some(Outcome::Canceled));
    let printed = lines(&out);
    assert_eq!(
        printed.iter().filter(|l| *l == "Waiting to cancel...").count(),
        1
    );
    assert_eq!(printed.last().map(String::as_str), Some("Canceled"));
}

#[tokio::test]
async fn external_cancel_shows_waiting_status_before_the_run_reports() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(step(0)).unwrap();

    let signal = CancellationSignal::new();
    let requester = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        requester.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = tx.send(Event::Progress(Progress::Canceled));
        let _ = tx.send(Event::Finished(Outcome::Canceled));
    });

    let mut state = DisplayState::default();
    state.try_begin();
    let mut out = Vec::new();
    let outcome = display_progress_pipe(rx, &signal, &mut state, PipeOptions::default(), &mut out)
        .await
        .unwrap();

    assert_eq!(outcome, Some(Outcome::Canceled));
    assert_eq!(
        lines(&out),
        vec!["Starting", "[  0%] step 0", "Waiting to cancel...", "Canceled", "Canceled"]
    );
    assert_eq!(state.status, "Canceled");
}

#[tokio::test]
async fn cancel_after_records_waiting_status_in_state() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(step(0)).unwrap();
    tx.send(step(1)).unwrap();
    drop(tx);

    let signal = CancellationSignal::new();
    let mut state = DisplayState::default();
    state.try_begin();
    let opts = PipeOptions {
        json: false,
        cancel_after: Some(1),
    };
    let mut out = Vec::new();
    let outcome = display_progress_pipe(rx, &signal, &mut state, opts, &mut out)
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert!(signal.is_cancelled());
    assert_eq!(state.status, "Waiting to cancel...");
    assert_eq!(lines(&out).last().map(String::as_str), Some("Waiting to cancel..."));
}

#[tokio::test]
async fn json_lines_carry_kinds_and_errors() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(step(0)).unwrap();
    tx.send(Event::Finished(Outcome::Failed(TaskError::InjectedFailure {
        index: 1,
        threshold: 0,
    })))
    .unwrap();

    let signal = CancellationSignal::new();
    let mut state = DisplayState::default();
    let opts = PipeOptions {
        json: true,
        cancel_after: None,
    };
    let mut out = Vec::new();
    display_progress_pipe(rx, &signal, &mut state, opts, &mut out)
        .await
        .unwrap();

    let parsed: Vec<serde_json::Value> = lines(&out)
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = parsed.iter().map(|v| v["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["status", "step", "outcome"]);
    assert_eq!(parsed[2]["outcome"], "failed");
    assert_eq!(parsed[2]["error"], "Step 1 exceeds failure threshold 0");
}

#[tokio::test]
async fn closed_channel_without_outcome_returns_none() {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    drop(tx);
    let mut state = DisplayState::default();
    let mut out = Vec::new();
    let outcome = display_progress_pipe(
        rx,
        &CancellationSignal::new(),
        &mut state,
        PipeOptions::default(),
        &mut out,
    )
    .await
    .unwrap();
    assert_eq!(outcome, None);
}

#[tokio::test]
async fn forwarders_deliver_outcome_after_last_notification() {
    let cfg = TaskConfig::new(10, Duration::from_millis(1));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (sink, on_outcome) = forwarders(tx);
    let mut handle = start(&cfg, sink, CancellationSignal::new(), on_outcome).unwrap();
    handle.wait(None).await;

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    assert_eq!(events.len(), 12);
    assert_eq!(events[10], Event::Progress(Progress::Complete));
    assert_eq!(events[11], Event::Finished(Outcome::Completed));
}
