//! ScriptedScheduler - 開発用・テスト用のスケジューラ
//!
//! 実際の録画スケジューラの代わりに、あらかじめ登録した応答（script）を
//! 共有イベントストリームに流します。
//!
//! # 学習ポイント
//! - `tokio::sync::broadcast` による 1 対多のイベント配信
//! - 応答の遅延・欠落・エラー・古い応答の混入を再現できる
//! - 呼び出し履歴（`calls()`）をスパイとして検証に使う
//!
//! 登録されていないクエリには空の結果で応答します。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};
use tracing::trace;

use crate::domain::{
    OptionGroup, OptionsResult, OverlapResult, RequestHandle, SchedulerError, SchedulerEvent,
    SchedulerFault, TaskId, TaskKind,
};
use crate::ports::{IdGenerator, OverlapOptionFlags, SchedulerService, SequentialGenerator};

const EVENT_CAPACITY: usize = 64;

/// How the scheduler reacts to one scripted query.
#[derive(Debug, Clone, PartialEq)]
pub enum Script<T> {
    /// Emit a successful response carrying `T`.
    Respond(T),
    /// Emit a response carrying a transport-level error.
    Fault(String),
    /// Accept the query but never answer it.
    Silent,
    /// Fail while issuing; no handle is returned.
    RejectIssue(String),
}

/// Scripted answer to an all-options-at-time query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeOptions {
    pub groups: Vec<OptionGroup>,
    pub tasks: Vec<(TaskId, TaskKind)>,
}

impl TimeOptions {
    pub fn new(groups: Vec<OptionGroup>, tasks: Vec<(TaskId, TaskKind)>) -> Self {
        Self { groups, tasks }
    }

    /// Remove excluded ids and kinds; groups left empty are dropped.
    ///
    /// Group ids absent from `tasks` have no known kind and are only removed
    /// by id.
    fn excluding(&self, exclude_ids: &[TaskId], exclude_kinds: &[TaskKind]) -> Self {
        let excluded = |id: &TaskId, kind: Option<&TaskKind>| {
            exclude_ids.contains(id) || kind.is_some_and(|kind| exclude_kinds.contains(kind))
        };
        let tasks: Vec<(TaskId, TaskKind)> = self
            .tasks
            .iter()
            .copied()
            .filter(|(id, kind)| !excluded(id, Some(kind)))
            .collect();
        let known: HashMap<TaskId, TaskKind> = self.tasks.iter().copied().collect();
        let groups = self
            .groups
            .iter()
            .map(|group| {
                group
                    .task_ids()
                    .iter()
                    .copied()
                    .filter(|id| !excluded(id, known.get(id)))
                    .collect::<Vec<_>>()
            })
            .filter(|ids| !ids.is_empty())
            .map(OptionGroup::from)
            .collect();
        Self { groups, tasks }
    }
}

/// One recorded call, for spying.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerCall {
    OverlapsForTask(TaskId),
    AllOptionsAtTime {
        at: DateTime<Utc>,
        exclude_ids: Vec<TaskId>,
        exclude_kinds: Vec<TaskKind>,
    },
    OverlapOptionsForTask {
        task_id: TaskId,
        flags: OverlapOptionFlags,
    },
}

#[derive(Default)]
struct ScriptState {
    overlaps: HashMap<TaskId, Script<Vec<TaskId>>>,
    overlap_options: HashMap<TaskId, Script<Vec<OptionGroup>>>,
    options_at: HashMap<DateTime<Utc>, Script<TimeOptions>>,
    default_fault: Option<String>,
    stale_noise: Option<Vec<TaskId>>,
    response_delay: Option<Duration>,
    calls: Vec<SchedulerCall>,
}

pub struct ScriptedScheduler {
    events: broadcast::Sender<SchedulerEvent>,
    ids: Arc<dyn IdGenerator>,
    state: Mutex<ScriptState>,
}

impl ScriptedScheduler {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(SequentialGenerator::new()))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            ids,
            state: Mutex::new(ScriptState::default()),
        }
    }

    pub async fn script_overlaps(&self, task_id: TaskId, script: Script<Vec<TaskId>>) {
        self.state.lock().await.overlaps.insert(task_id, script);
    }

    /// Shorthand for `Script::Respond` on an overlaps query.
    pub async fn set_overlaps(&self, task_id: TaskId, overlapping: Vec<TaskId>) {
        self.script_overlaps(task_id, Script::Respond(overlapping)).await;
    }

    pub async fn script_overlap_options(&self, task_id: TaskId, script: Script<Vec<OptionGroup>>) {
        self.state.lock().await.overlap_options.insert(task_id, script);
    }

    pub async fn script_options_at(&self, at: DateTime<Utc>, script: Script<TimeOptions>) {
        self.state.lock().await.options_at.insert(at, script);
    }

    /// Answer every unscripted query with this transport error.
    pub async fn fail_all(&self, message: impl Into<String>) {
        self.state.lock().await.default_fault = Some(message.into());
    }

    /// Before each real response, emit a response of the same kind under a
    /// handle nobody awaits, carrying `noise` as its payload.
    pub async fn inject_stale_responses(&self, noise: Vec<TaskId>) {
        self.state.lock().await.stale_noise = Some(noise);
    }

    /// Deliver responses from a background task after `delay`.
    pub async fn delay_responses(&self, delay: Duration) {
        self.state.lock().await.response_delay = Some(delay);
    }

    pub async fn calls(&self) -> Vec<SchedulerCall> {
        self.state.lock().await.calls.clone()
    }

    /// Emit an arbitrary event on the shared stream.
    pub fn emit(&self, event: SchedulerEvent) {
        // no subscribers is fine: nobody is waiting
        let _ = self.events.send(event);
    }

    fn deliver(&self, events: Vec<SchedulerEvent>, delay: Option<Duration>) {
        match delay {
            None => {
                for event in events {
                    self.emit(event);
                }
            }
            Some(delay) => {
                let sender = self.events.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for event in events {
                        let _ = sender.send(event);
                    }
                });
            }
        }
    }

    /// Resolve a script into the handle to return and the events to emit.
    fn answer<T>(
        &self,
        state: &ScriptState,
        script: Option<Script<T>>,
        respond: impl Fn(RequestHandle, Option<SchedulerFault>, Option<T>) -> SchedulerEvent,
    ) -> Result<RequestHandle, SchedulerError> {
        let script = match (script, &state.default_fault) {
            (Some(script), _) => Some(script),
            (None, Some(message)) => Some(Script::Fault(message.clone())),
            (None, None) => None,
        };

        let handle = self.ids.generate_handle();
        let response = match script {
            Some(Script::RejectIssue(reason)) => return Err(SchedulerError::Rejected(reason)),
            Some(Script::Silent) => None,
            Some(Script::Fault(message)) => {
                Some(respond(handle, Some(SchedulerFault::new(message)), None))
            }
            Some(Script::Respond(payload)) => Some(respond(handle, None, Some(payload))),
            None => Some(respond(handle, None, None)),
        };

        let mut events = Vec::new();
        if let Some(response) = response {
            if let Some(noise) = &state.stale_noise {
                events.push(stale_copy(&response, self.ids.generate_handle(), noise));
            }
            events.push(response);
        }
        trace!(%handle, count = events.len(), "scripted scheduler answering");
        self.deliver(events, state.response_delay);
        Ok(handle)
    }
}

impl Default for ScriptedScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn stale_copy(response: &SchedulerEvent, handle: RequestHandle, noise: &[TaskId]) -> SchedulerEvent {
    match response {
        SchedulerEvent::Overlap(_) => SchedulerEvent::Overlap(OverlapResult {
            handle,
            error: None,
            overlapping_task_ids: noise.to_vec(),
        }),
        SchedulerEvent::Options(_) => SchedulerEvent::Options(OptionsResult {
            handle,
            error: None,
            task_option_groups: noise.iter().map(|id| OptionGroup::new(vec![*id])).collect(),
            all_task_ids: noise.to_vec(),
            all_task_kinds: vec![TaskKind::Recording; noise.len()],
        }),
    }
}

#[async_trait]
impl SchedulerService for ScriptedScheduler {
    fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    async fn query_overlaps_for_task(
        &self,
        task_id: TaskId,
    ) -> Result<RequestHandle, SchedulerError> {
        let mut state = self.state.lock().await;
        state.calls.push(SchedulerCall::OverlapsForTask(task_id));
        let script = state.overlaps.get(&task_id).cloned();
        self.answer(&state, script, |handle, error, payload| {
            SchedulerEvent::Overlap(OverlapResult {
                handle,
                error,
                overlapping_task_ids: payload.unwrap_or_default(),
            })
        })
    }

    async fn query_all_options_at_time(
        &self,
        at: DateTime<Utc>,
        exclude_ids: &[TaskId],
        exclude_kinds: &[TaskKind],
    ) -> Result<RequestHandle, SchedulerError> {
        let mut state = self.state.lock().await;
        state.calls.push(SchedulerCall::AllOptionsAtTime {
            at,
            exclude_ids: exclude_ids.to_vec(),
            exclude_kinds: exclude_kinds.to_vec(),
        });
        let script = state.options_at.get(&at).cloned().map(|script| match script {
            Script::Respond(options) => Script::Respond(options.excluding(exclude_ids, exclude_kinds)),
            other => other,
        });
        self.answer(&state, script, |handle, error, payload| {
            let options = payload.unwrap_or_default();
            let (all_task_ids, all_task_kinds) = options.tasks.into_iter().unzip();
            SchedulerEvent::Options(OptionsResult {
                handle,
                error,
                task_option_groups: options.groups,
                all_task_ids,
                all_task_kinds,
            })
        })
    }

    async fn query_overlap_options_for_task(
        &self,
        task_id: TaskId,
        flags: OverlapOptionFlags,
    ) -> Result<RequestHandle, SchedulerError> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(SchedulerCall::OverlapOptionsForTask { task_id, flags });
        let script = state.overlap_options.get(&task_id).cloned();
        self.answer(&state, script, |handle, error, payload| {
            SchedulerEvent::Options(OptionsResult {
                handle,
                error,
                task_option_groups: payload.unwrap_or_default(),
                all_task_ids: Vec::new(),
                all_task_kinds: Vec::new(),
            })
        })
    }
}
