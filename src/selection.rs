use crate::host::{HostAction, HostRecord, HostSelection, RecordId, SelectionMode, SelectionValue};
use crate::provider::TreeDataProvider;

/// Summary of one selection push.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// Identifiers considered (one at most in single mode).
    pub requested: usize,
    /// Identifiers that resolved to host records.
    pub resolved: usize,
}

/// Forwards engine selection changes into the host selection binding.
pub struct SelectionBridge<A = crate::host::NoAction> {
    on_change: Option<A>,
}

impl Default for SelectionBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionBridge {
    pub const fn new() -> Self {
        Self { on_change: None }
    }
}

impl<A: HostAction> SelectionBridge<A> {
    /// Bridge that also executes `action` after every selection change.
    pub const fn with_action(action: A) -> Self {
        Self {
            on_change: Some(action),
        }
    }

    pub const fn action_mut(&mut self) -> Option<&mut A> {
        self.on_change.as_mut()
    }

    /// Resolves `ids` and pushes the result into `host`.
    ///
    /// The host is notified exactly once per call, whether or not any id
    /// resolved. Without a provider (nothing materialized yet) every id is
    /// unresolved.
    pub fn apply<R, S>(
        &mut self,
        ids: &[RecordId],
        provider: Option<&TreeDataProvider<R>>,
        host: &mut S,
    ) -> SelectionOutcome
    where
        R: HostRecord,
        S: HostSelection<R> + ?Sized,
    {
        let resolve = |id: &RecordId| provider.and_then(|provider| provider.resolve(*id)).cloned();

        let (selection, outcome) = match host.mode() {
            SelectionMode::Single => {
                if ids.len() > 1 {
                    tracing::debug!(count = ids.len(), "single selection keeps the first id only");
                }
                let record = ids.first().and_then(resolve);
                let outcome = SelectionOutcome {
                    requested: ids.len().min(1),
                    resolved: usize::from(record.is_some()),
                };
                (SelectionValue::Single(record), outcome)
            }
            SelectionMode::Multiple => {
                let records: Vec<R> = ids.iter().filter_map(resolve).collect();
                let outcome = SelectionOutcome {
                    requested: ids.len(),
                    resolved: records.len(),
                };
                (SelectionValue::Multiple(records), outcome)
            }
        };

        if outcome.resolved < outcome.requested {
            tracing::debug!(
                requested = outcome.requested,
                resolved = outcome.resolved,
                "selection contains unknown ids"
            );
        }
        host.set_selection(selection);
        host.notify_changed();
        if let Some(action) = self.on_change.as_mut()
            && action.can_execute()
        {
            action.execute();
        }
        tracing::debug!(resolved = outcome.resolved, "selection pushed to host");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{OrphanPolicy, TreeIndex};
    use crate::projection::project;
    use crate::testing::{FakeSelection, Row, counting_action, mapping, row};

    fn provider(rows: &[Row]) -> TreeDataProvider<Row> {
        TreeDataProvider::new(TreeIndex::materialize(
            RecordId::from_u128(0),
            project(rows, &mapping()),
            OrphanPolicy::Drop,
        ))
    }

    fn id(n: u128) -> RecordId {
        RecordId::from_u128(n)
    }

    #[test]
    fn single_valid_id_reaches_the_host_once() {
        let loader = provider(&[row(1, "A", None), row(2, "B", Some("A"))]);
        let mut host = FakeSelection::new(SelectionMode::Single);
        let mut bridge = SelectionBridge::new();

        let outcome = bridge.apply(&[id(2)], Some(&loader), &mut host);

        assert_eq!(outcome, SelectionOutcome { requested: 1, resolved: 1 });
        assert_eq!(host.pushed.len(), 1);
        assert_eq!(host.last(), Some(&SelectionValue::Single(Some(row(2, "B", None)))));
        assert_eq!(host.notifications, 1);
    }

    #[test]
    fn empty_selection_clears_the_host() {
        let loader = provider(&[row(1, "A", None)]);
        let mut host = FakeSelection::new(SelectionMode::Single);
        let mut bridge = SelectionBridge::new();

        bridge.apply(&[], Some(&loader), &mut host);

        assert_eq!(host.last(), Some(&SelectionValue::Single(None)));
        assert_eq!(host.notifications, 1);
    }

    #[test]
    fn unknown_id_still_notifies() {
        let loader = provider(&[row(1, "A", None)]);
        let mut host = FakeSelection::new(SelectionMode::Single);
        let mut bridge = SelectionBridge::new();

        let outcome = bridge.apply(&[id(42)], Some(&loader), &mut host);

        assert_eq!(outcome.resolved, 0);
        assert_eq!(host.last(), Some(&SelectionValue::Single(None)));
        assert_eq!(host.notifications, 1);
    }

    #[test]
    fn single_mode_keeps_first_id() {
        let loader = provider(&[row(1, "A", None), row(2, "B", None)]);
        let mut host = FakeSelection::new(SelectionMode::Single);
        let mut bridge = SelectionBridge::new();

        bridge.apply(&[id(2), id(1)], Some(&loader), &mut host);

        assert_eq!(host.last(), Some(&SelectionValue::Single(Some(row(2, "", None)))));
    }

    #[test]
    fn multiple_mode_forwards_every_resolved_record() {
        let loader = provider(&[row(1, "A", None), row(2, "B", None), row(3, "C", None)]);
        let mut host = FakeSelection::new(SelectionMode::Multiple);
        let mut bridge = SelectionBridge::new();

        let outcome = bridge.apply(&[id(3), id(9), id(1)], Some(&loader), &mut host);

        assert_eq!(outcome, SelectionOutcome { requested: 3, resolved: 2 });
        assert_eq!(
            host.last(),
            Some(&SelectionValue::Multiple(vec![row(3, "", None), row(1, "", None)]))
        );
        assert_eq!(host.notifications, 1);
    }

    #[test]
    fn on_change_action_runs_once_per_push() {
        let loader = provider(&[row(1, "A", None)]);
        let mut host = FakeSelection::new(SelectionMode::Single);
        let (action, count) = counting_action();
        let mut bridge = SelectionBridge::with_action(action);

        bridge.apply(&[id(1)], Some(&loader), &mut host);
        bridge.apply(&[], Some(&loader), &mut host);

        assert_eq!(count.get(), 2);
        assert_eq!(host.notifications, 2);
    }

    #[test]
    fn nothing_resolves_before_materialization() {
        let mut host = FakeSelection::new(SelectionMode::Multiple);
        let mut bridge = SelectionBridge::new();

        let outcome = bridge.apply::<Row, _>(&[id(1)], None, &mut host);

        assert_eq!(outcome.resolved, 0);
        assert_eq!(host.last(), Some(&SelectionValue::Multiple(Vec::new())));
        assert_eq!(host.notifications, 1);
    }
}
