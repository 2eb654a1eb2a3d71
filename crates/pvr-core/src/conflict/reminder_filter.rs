//! Reminder filtering for option groups.
//!
//! Reminders hold no tuner and no recording slot, so a grouping that only
//! exists because a reminder is in it is not a resource conflict.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::{OptionGroup, TaskId, TaskKind};

/// Build the id -> kind table from the parallel arrays of an options response.
pub fn kind_index(all_task_ids: &[TaskId], all_task_kinds: &[TaskKind]) -> HashMap<TaskId, TaskKind> {
    debug_assert_eq!(
        all_task_ids.len(),
        all_task_kinds.len(),
        "options response id and kind tables differ in length"
    );
    all_task_ids
        .iter()
        .copied()
        .zip(all_task_kinds.iter().copied())
        .collect()
}

/// Drop every group that contains at least one reminder.
///
/// Surviving groups keep their relative order. Ids missing from `kinds` are
/// treated as resource-consuming, so they never hide a conflict.
pub fn filter_reminder_groups(
    kinds: &HashMap<TaskId, TaskKind>,
    groups: Vec<OptionGroup>,
) -> Vec<OptionGroup> {
    groups
        .into_iter()
        .filter(|group| !contains_reminder(kinds, group))
        .collect()
}

fn contains_reminder(kinds: &HashMap<TaskId, TaskKind>, group: &OptionGroup) -> bool {
    group.task_ids().iter().any(|id| {
        let Some(kind) = kinds.get(id) else {
            warn!(%id, "option group references a task missing from the kind table");
            return false;
        };
        !kind.consumes_resources()
    })
}

/// More than one viable grouping means no single allocation serves every task.
pub fn indicates_conflict(groups: &[OptionGroup]) -> bool {
    groups.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(ids: &[u128]) -> OptionGroup {
        OptionGroup::new(ids.iter().copied().map(TaskId::new).collect())
    }

    fn kinds(entries: &[(u128, TaskKind)]) -> HashMap<TaskId, TaskKind> {
        let ids: Vec<TaskId> = entries.iter().map(|(id, _)| TaskId::new(*id)).collect();
        let kinds: Vec<TaskKind> = entries.iter().map(|(_, kind)| *kind).collect();
        kind_index(&ids, &kinds)
    }

    #[test]
    fn group_differing_only_by_reminder_collapses() {
        let kinds = kinds(&[(1, TaskKind::Recording), (2, TaskKind::Reminder)]);
        let filtered = filter_reminder_groups(&kinds, vec![group(&[1]), group(&[1, 2])]);

        assert_eq!(filtered, vec![group(&[1])]);
        assert!(!indicates_conflict(&filtered));
    }

    #[test]
    fn genuine_conflict_survives_and_keeps_order() {
        let kinds = kinds(&[
            (1, TaskKind::Recording),
            (2, TaskKind::Recording),
            (3, TaskKind::Reminder),
            (4, TaskKind::Live),
        ]);
        let groups = vec![group(&[2, 4]), group(&[3]), group(&[1, 4]), group(&[1, 2])];
        let filtered = filter_reminder_groups(&kinds, groups);

        assert_eq!(filtered, vec![group(&[2, 4]), group(&[1, 4]), group(&[1, 2])]);
        assert!(indicates_conflict(&filtered));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let filtered = filter_reminder_groups(&HashMap::new(), Vec::new());
        assert!(filtered.is_empty());
        assert!(!indicates_conflict(&filtered));
    }

    #[test]
    fn group_with_unknown_kind_is_kept() {
        let kinds = kinds(&[(1, TaskKind::Recording), (3, TaskKind::Reminder)]);
        let filtered = filter_reminder_groups(&kinds, vec![group(&[1]), group(&[2]), group(&[2, 3])]);

        assert_eq!(filtered, vec![group(&[1]), group(&[2])]);
        assert!(filtered[1].contains(TaskId::new(2)));
    }

    #[test]
    fn review_buffer_and_live_are_kept() {
        let kinds = kinds(&[(1, TaskKind::ReviewBufferRecording), (2, TaskKind::Live)]);
        let filtered = filter_reminder_groups(&kinds, vec![group(&[1]), group(&[2])]);
        assert_eq!(filtered.len(), 2);
    }
}
