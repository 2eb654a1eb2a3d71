//! RequestCorrelator - handle による応答の対応付け
//!
//! Coordinator の 1 回の呼び出しごとに 1 つ作る、呼び出し単位のコンテキストです。
//! プロセス全体で共有する「最後に発行した handle」は持ちません。
//!
//! # フロー
//! 1. `subscribe()` で共有イベントストリームを購読（発行より先）
//! 2. `issue()` でクエリを発行し、返ってきた handle を応答種別ごとに記録
//! 3. `await_response()` で一致する handle のイベントだけを受け取る
//!    - 一致しないイベントは古い応答として読み捨てる
//!    - タイムアウト・ストリーム終了は `QueryFailure` になる
//!
//! `round_trip()` は発行と待機を 1 つの期限で囲みます。handle が返ってこない
//! scheduler でも期限が来れば `QueryFailure::TimedOut` で終わります。
//!
//! 1 リクエストにつき応答は 1 つ。一致したイベントを受け取った時点で
//! 記録していた handle は消えます。

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::domain::{
    QueryFailure, RequestHandle, ResponseKind, SchedulerError, SchedulerEvent, SchedulerFault,
};
use crate::ports::SchedulerService;

/// How the correlator judged one incoming event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// Matches the awaited handle and carries data.
    Accepted,
    /// Matches the awaited handle but the scheduler reported an error.
    Faulted(SchedulerFault),
    /// Does not match the awaited handle for its kind.
    Stale,
}

pub struct RequestCorrelator {
    events: broadcast::Receiver<SchedulerEvent>,
    awaited: HashMap<ResponseKind, RequestHandle>,
    timeout: Duration,
}

impl RequestCorrelator {
    pub fn new(events: broadcast::Receiver<SchedulerEvent>, timeout: Duration) -> Self {
        Self {
            events,
            awaited: HashMap::new(),
            timeout,
        }
    }

    /// Subscribe to `scheduler` before any query of this invocation is issued.
    pub fn subscribe(scheduler: &dyn SchedulerService, timeout: Duration) -> Self {
        Self::new(scheduler.subscribe(), timeout)
    }

    pub fn awaited(&self, kind: ResponseKind) -> Option<RequestHandle> {
        self.awaited.get(&kind).copied()
    }

    /// Issue a query and remember its handle as the one awaited for `kind`.
    ///
    /// A handle still awaited for the same kind is superseded.
    pub async fn issue<F>(&mut self, kind: ResponseKind, query: F) -> Result<RequestHandle, QueryFailure>
    where
        F: Future<Output = Result<RequestHandle, SchedulerError>>,
    {
        let deadline = Instant::now() + self.timeout;
        self.issue_until(kind, query, deadline).await
    }

    async fn issue_until<F>(
        &mut self,
        kind: ResponseKind,
        query: F,
        deadline: Instant,
    ) -> Result<RequestHandle, QueryFailure>
    where
        F: Future<Output = Result<RequestHandle, SchedulerError>>,
    {
        let handle = tokio::time::timeout_at(deadline, query)
            .await
            .map_err(|_| QueryFailure::TimedOut(self.timeout))??;
        if let Some(previous) = self.awaited.insert(kind, handle) {
            debug!(%previous, %handle, ?kind, "superseded awaited handle");
        }
        trace!(%handle, ?kind, "query issued");
        Ok(handle)
    }

    /// Judge one event. A matching event clears the awaited handle.
    pub fn classify(&mut self, event: &SchedulerEvent) -> Acceptance {
        let kind = event.kind();
        if self.awaited.get(&kind) != Some(&event.handle()) {
            return Acceptance::Stale;
        }
        self.awaited.remove(&kind);
        match event.error() {
            Some(fault) => Acceptance::Faulted(fault.clone()),
            None => Acceptance::Accepted,
        }
    }

    /// True only for the awaited, error-free response of the event's kind.
    pub fn accept(&mut self, event: &SchedulerEvent) -> bool {
        self.classify(event) == Acceptance::Accepted
    }

    /// Wait for the response to the query awaited for `kind`.
    pub async fn await_response(&mut self, kind: ResponseKind) -> Result<SchedulerEvent, QueryFailure> {
        let deadline = Instant::now() + self.timeout;
        self.await_until(kind, deadline).await
    }

    async fn await_until(
        &mut self,
        kind: ResponseKind,
        deadline: Instant,
    ) -> Result<SchedulerEvent, QueryFailure> {
        let Some(handle) = self.awaited(kind) else {
            return Err(QueryFailure::NotAwaited(kind));
        };

        loop {
            let event = match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Err(_) => {
                    self.awaited.remove(&kind);
                    return Err(QueryFailure::TimedOut(self.timeout));
                }
                Ok(Err(RecvError::Closed)) => {
                    self.awaited.remove(&kind);
                    return Err(QueryFailure::StreamClosed);
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    warn!(%handle, skipped, "scheduler event stream lagged");
                    continue;
                }
                Ok(Ok(event)) => event,
            };

            if event.kind() != kind {
                continue;
            }
            match self.classify(&event) {
                Acceptance::Accepted => return Ok(event),
                Acceptance::Faulted(fault) => return Err(QueryFailure::Fault(fault)),
                Acceptance::Stale => {
                    trace!(awaited = %handle, got = %event.handle(), "ignoring stale response");
                }
            }
        }
    }

    /// Issue a query and wait for its response, both under one deadline.
    pub async fn round_trip<F>(&mut self, kind: ResponseKind, query: F) -> Result<SchedulerEvent, QueryFailure>
    where
        F: Future<Output = Result<RequestHandle, SchedulerError>>,
    {
        let deadline = Instant::now() + self.timeout;
        self.issue_until(kind, query, deadline).await?;
        self.await_until(kind, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OptionsResult, OverlapResult, TaskId};

    fn overlap(handle: u128, error: Option<&str>, ids: &[u128]) -> SchedulerEvent {
        SchedulerEvent::Overlap(OverlapResult {
            handle: RequestHandle::new(handle),
            error: error.map(SchedulerFault::new),
            overlapping_task_ids: ids.iter().copied().map(TaskId::new).collect(),
        })
    }

    fn options(handle: u128) -> SchedulerEvent {
        SchedulerEvent::Options(OptionsResult {
            handle: RequestHandle::new(handle),
            error: None,
            task_option_groups: vec![],
            all_task_ids: vec![],
            all_task_kinds: vec![],
        })
    }

    fn correlator() -> (broadcast::Sender<SchedulerEvent>, RequestCorrelator) {
        let (tx, rx) = broadcast::channel(16);
        (tx, RequestCorrelator::new(rx, Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn accept_only_matches_the_awaited_handle_once() {
        let (_tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(7)) })
            .await
            .unwrap();

        assert!(!correlator.accept(&overlap(6, None, &[])));
        assert!(!correlator.accept(&options(7)));
        assert!(correlator.accept(&overlap(7, None, &[])));
        // one response per request
        assert!(!correlator.accept(&overlap(7, None, &[])));
        assert_eq!(correlator.awaited(ResponseKind::Overlap), None);
    }

    #[tokio::test]
    async fn faulted_response_is_not_accepted_but_clears_handle() {
        let (_tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(1)) })
            .await
            .unwrap();

        let verdict = correlator.classify(&overlap(1, Some("tuner busy"), &[]));
        assert_eq!(verdict, Acceptance::Faulted(SchedulerFault::new("tuner busy")));
        assert_eq!(correlator.awaited(ResponseKind::Overlap), None);
    }

    #[tokio::test]
    async fn newer_issue_supersedes_older_handle() {
        let (_tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Options, async { Ok::<_, SchedulerError>(RequestHandle::new(1)) })
            .await
            .unwrap();
        correlator
            .issue(ResponseKind::Options, async { Ok::<_, SchedulerError>(RequestHandle::new(2)) })
            .await
            .unwrap();

        assert!(!correlator.accept(&options(1)));
        assert!(correlator.accept(&options(2)));
    }

    #[tokio::test]
    async fn await_response_skips_stale_events() {
        let (tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(5)) })
            .await
            .unwrap();

        tx.send(overlap(4, None, &[99])).unwrap();
        tx.send(options(5)).unwrap();
        tx.send(overlap(5, None, &[2, 3])).unwrap();

        let event = correlator.await_response(ResponseKind::Overlap).await.unwrap();
        assert_eq!(event, overlap(5, None, &[2, 3]));
    }

    #[tokio::test]
    async fn await_response_surfaces_fault() {
        let (tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(5)) })
            .await
            .unwrap();
        tx.send(overlap(5, Some("no signal"), &[])).unwrap();

        let err = correlator.await_response(ResponseKind::Overlap).await.unwrap_err();
        assert!(matches!(err, QueryFailure::Fault(fault) if fault.message == "no signal"));
    }

    #[tokio::test(start_paused = true)]
    async fn await_response_times_out_when_nothing_matches() {
        let (tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(5)) })
            .await
            .unwrap();
        tx.send(overlap(4, None, &[])).unwrap();

        let err = correlator.await_response(ResponseKind::Overlap).await.unwrap_err();
        assert!(matches!(err, QueryFailure::TimedOut(d) if d == Duration::from_secs(1)));
        assert_eq!(correlator.awaited(ResponseKind::Overlap), None);
    }

    #[tokio::test]
    async fn await_response_reports_closed_stream() {
        let (tx, mut correlator) = correlator();
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(5)) })
            .await
            .unwrap();
        drop(tx);

        let err = correlator.await_response(ResponseKind::Overlap).await.unwrap_err();
        assert!(matches!(err, QueryFailure::StreamClosed));
    }

    #[tokio::test]
    async fn lagged_stream_keeps_waiting() {
        let (tx, rx) = broadcast::channel(2);
        let mut correlator = RequestCorrelator::new(rx, Duration::from_secs(1));
        correlator
            .issue(ResponseKind::Overlap, async { Ok::<_, SchedulerError>(RequestHandle::new(5)) })
            .await
            .unwrap();

        // capacity 2: the first event is overwritten before it is read
        tx.send(overlap(1, None, &[])).unwrap();
        tx.send(overlap(2, None, &[])).unwrap();
        tx.send(overlap(5, None, &[7])).unwrap();

        let event = correlator.await_response(ResponseKind::Overlap).await.unwrap();
        assert_eq!(event, overlap(5, None, &[7]));
    }

    #[tokio::test]
    async fn issue_failure_is_propagated_and_nothing_is_awaited() {
        let (_tx, mut correlator) = correlator();
        let err = correlator
            .round_trip(ResponseKind::Overlap, async {
                Err::<RequestHandle, _>(SchedulerError::Unavailable("offline".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, QueryFailure::Issue(SchedulerError::Unavailable(_))));
        assert_eq!(correlator.awaited(ResponseKind::Overlap), None);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_issue_times_out_within_round_trip() {
        let (_tx, mut correlator) = correlator();
        let err = correlator
            .round_trip(
                ResponseKind::Overlap,
                std::future::pending::<Result<RequestHandle, SchedulerError>>(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, QueryFailure::TimedOut(d) if d == Duration::from_secs(1)));
        assert_eq!(correlator.awaited(ResponseKind::Overlap), None);
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_shares_one_deadline() {
        let (tx, mut correlator) = correlator();
        tokio::spawn(async move {
            // 200 ms past the deadline shared by issuing and waiting
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            let _ = tx.send(overlap(5, None, &[1]));
        });

        let err = correlator
            .round_trip(ResponseKind::Overlap, async {
                tokio::time::sleep(Duration::from_millis(700)).await;
                Ok::<_, SchedulerError>(RequestHandle::new(5))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QueryFailure::TimedOut(_)));
    }

    #[tokio::test]
    async fn await_without_issue_is_rejected() {
        let (_tx, mut correlator) = correlator();
        let err = correlator.await_response(ResponseKind::Options).await.unwrap_err();
        assert!(matches!(err, QueryFailure::NotAwaited(ResponseKind::Options)));
    }
}
