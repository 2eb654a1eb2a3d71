//! ConflictAccumulator - 逐次ファンアウトの状態機械
//!
//! 候補タスクのリストを 1 件ずつ overlap クエリにかけ、見つかった競合タスクを
//! ID で重複排除しながら集める。
//!
//! # 状態遷移
//! - `Probing { index }`: index 番目の候補のクエリ応答を待っている
//! - 応答を `absorb()` → index+1 へ進む or `Complete`
//! - `Complete`: 全候補を処理済み（以降の `absorb()` は何もしない）
//!
//! # 除外ルール
//! - 現在の subject（最初は呼び出し元が指定、以降は処理中の候補）
//! - 候補リストに含まれるすべての ID（候補同士は競合として報告しない）
//! - すでに見つかった ID（最初の出現が勝つ）
//!
//! 状態はこの構造体の中だけにあり、呼び出しごとに新しく作る。

use std::collections::HashSet;

use crate::domain::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Probing { index: usize },
    Complete,
}

/// Result of absorbing one overlap response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Query this task next.
    Next(TaskId),
    /// Every candidate has been queried.
    Done,
}

#[derive(Debug)]
pub struct ConflictAccumulator {
    candidates: Vec<TaskId>,
    candidate_set: HashSet<TaskId>,
    subject: TaskId,
    state: AccumulatorState,
    seen: HashSet<TaskId>,
    conflicts: Vec<TaskId>,
}

impl ConflictAccumulator {
    /// Start a fan-out over `candidates`, never reporting `subject`.
    pub fn new(candidates: Vec<TaskId>, subject: TaskId) -> Self {
        let state = if candidates.is_empty() {
            AccumulatorState::Complete
        } else {
            AccumulatorState::Probing { index: 0 }
        };
        Self {
            candidate_set: candidates.iter().copied().collect(),
            candidates,
            subject,
            state,
            seen: HashSet::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == AccumulatorState::Complete
    }

    /// Id excluded from the response currently being processed.
    pub fn subject(&self) -> TaskId {
        self.subject
    }

    /// The single task whose overlap query must be in flight now.
    pub fn current_probe(&self) -> Option<TaskId> {
        match self.state {
            AccumulatorState::Probing { index } => self.candidates.get(index).copied(),
            AccumulatorState::Complete => None,
        }
    }

    /// Record the overlaps reported for the current probe and advance.
    pub fn absorb(&mut self, overlaps: &[TaskId]) -> Progress {
        let AccumulatorState::Probing { index } = self.state else {
            return Progress::Done;
        };
        self.subject = self.candidates[index];

        for &id in overlaps {
            if id == self.subject || self.candidate_set.contains(&id) {
                continue;
            }
            if self.seen.insert(id) {
                self.conflicts.push(id);
            }
        }

        let next = index + 1;
        match self.candidates.get(next) {
            Some(&task_id) => {
                self.state = AccumulatorState::Probing { index: next };
                Progress::Next(task_id)
            }
            None => {
                self.state = AccumulatorState::Complete;
                Progress::Done
            }
        }
    }

    /// Conflicts found so far, in first-discovered order.
    pub fn conflicts(&self) -> &[TaskId] {
        &self.conflicts
    }

    pub fn into_conflicts(self) -> Vec<TaskId> {
        self.conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u128]) -> Vec<TaskId> {
        values.iter().copied().map(TaskId::new).collect()
    }

    #[test]
    fn empty_candidates_start_complete() {
        let acc = ConflictAccumulator::new(Vec::new(), TaskId::new(1));
        assert!(acc.is_complete());
        assert_eq!(acc.current_probe(), None);
        assert!(acc.into_conflicts().is_empty());
    }

    #[test]
    fn probes_candidates_in_order_and_completes_once() {
        let mut acc = ConflictAccumulator::new(ids(&[10, 20, 30]), TaskId::new(10));

        assert_eq!(acc.current_probe(), Some(TaskId::new(10)));
        assert_eq!(acc.absorb(&[]), Progress::Next(TaskId::new(20)));
        assert_eq!(acc.current_probe(), Some(TaskId::new(20)));
        assert_eq!(acc.absorb(&[]), Progress::Next(TaskId::new(30)));
        assert_eq!(acc.absorb(&[]), Progress::Done);
        assert!(acc.is_complete());

        // absorbing after completion changes nothing
        assert_eq!(acc.absorb(&ids(&[99])), Progress::Done);
        assert!(acc.conflicts().is_empty());
    }

    #[test]
    fn dedups_and_excludes_candidates() {
        let mut acc = ConflictAccumulator::new(ids(&[10, 20]), TaskId::new(10));

        acc.absorb(&ids(&[20, 30]));
        acc.absorb(&ids(&[10, 30]));

        assert_eq!(acc.into_conflicts(), ids(&[30]));
    }

    #[test]
    fn subject_advances_with_probe() {
        let mut acc = ConflictAccumulator::new(ids(&[1, 2]), TaskId::new(1));
        assert_eq!(acc.subject(), TaskId::new(1));

        acc.absorb(&ids(&[5]));
        assert_eq!(acc.subject(), TaskId::new(1));
        acc.absorb(&ids(&[2, 6]));
        assert_eq!(acc.subject(), TaskId::new(2));

        assert_eq!(acc.into_conflicts(), ids(&[5, 6]));
    }

    #[test]
    fn probe_itself_and_repeats_are_dropped() {
        let mut acc = ConflictAccumulator::new(ids(&[1]), TaskId::new(99));
        acc.absorb(&ids(&[1, 4, 4, 5]));
        assert_eq!(acc.into_conflicts(), ids(&[4, 5]));
    }

    #[test]
    fn first_discovery_order_is_kept() {
        let mut acc = ConflictAccumulator::new(ids(&[1, 2, 3]), TaskId::new(1));
        acc.absorb(&ids(&[9, 7]));
        acc.absorb(&ids(&[8, 9]));
        acc.absorb(&ids(&[7, 6]));
        assert_eq!(acc.into_conflicts(), ids(&[9, 7, 8, 6]));
    }

    #[test]
    fn duplicate_candidates_are_each_probed() {
        let mut acc = ConflictAccumulator::new(ids(&[1, 1]), TaskId::new(1));
        assert_eq!(acc.absorb(&ids(&[2])), Progress::Next(TaskId::new(1)));
        assert_eq!(acc.absorb(&ids(&[2, 3])), Progress::Done);
        assert_eq!(acc.into_conflicts(), ids(&[2, 3]));
    }
}
