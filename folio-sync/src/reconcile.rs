//! Local → remote reconciliation by stable id.

use std::collections::HashSet;

use folio_core::{BlockId, Node};

use crate::error::RemoteError;
use crate::remote::RemoteList;

/// Remote writes issued by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub deleted: usize,
    pub set: usize,
}

impl ReconcileReport {
    pub fn writes(&self) -> usize {
        self.inserted + self.deleted + self.set
    }
}

/// Brings the remote list in line with the local top-level children.
pub trait Reconcile: Send {
    fn reconcile(
        &self,
        local: &[Node],
        remote: &mut dyn RemoteList,
    ) -> Result<ReconcileReport, RemoteError>;
}

/// Full positional comparison, linear in document size.
///
/// 1. Insert local blocks whose id the remote list lacks, at their local index.
/// 2. Delete remote entries whose id is gone locally.
/// 3. `Set` every position where the values differ.
///
/// Remote entries past the local length are then trimmed. Not isolated
/// from remote batches that land while it runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveReconciler;

impl Reconcile for NaiveReconciler {
    fn reconcile(
        &self,
        local: &[Node],
        remote: &mut dyn RemoteList,
    ) -> Result<ReconcileReport, RemoteError> {
        let mut report = ReconcileReport::default();
        let mut mirror = remote.to_vec()?;

        let remote_ids: HashSet<BlockId> = mirror.iter().filter_map(|n| n.id.clone()).collect();
        for (index, node) in local.iter().enumerate() {
            let known = node.id.as_ref().is_some_and(|id| remote_ids.contains(id));
            if known {
                continue;
            }
            let at = index.min(mirror.len());
            remote.insert(at, node.clone())?;
            mirror.insert(at, node.clone());
            report.inserted += 1;
        }

        let local_ids: HashSet<&BlockId> = local.iter().filter_map(|n| n.id.as_ref()).collect();
        let mut index = 0;
        while index < mirror.len() {
            let kept = mirror[index]
                .id
                .as_ref()
                .is_some_and(|id| local_ids.contains(id));
            if kept {
                index += 1;
            } else {
                remote.delete(index)?;
                mirror.remove(index);
                report.deleted += 1;
            }
        }

        for (index, node) in local.iter().enumerate() {
            match mirror.get(index) {
                Some(current) if current == node => {}
                Some(_) => {
                    remote.set(index, node.clone())?;
                    mirror[index] = node.clone();
                    report.set += 1;
                }
                None => {
                    remote.insert(index, node.clone())?;
                    mirror.push(node.clone());
                    report.inserted += 1;
                }
            }
        }

        while mirror.len() > local.len() {
            let last = mirror.len() - 1;
            remote.delete(last)?;
            mirror.pop();
            report.deleted += 1;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRoom;
    use uuid::Uuid;

    fn block(id: &str, text: &str) -> Node {
        Node::paragraph(text).with_id(id)
    }

    fn reconcile(local: &[Node], remote: Vec<Node>) -> (ReconcileReport, Vec<Node>) {
        let room = MemoryRoom::with_items(remote);
        let mut list = room.join(Uuid::new_v4());
        let report = NaiveReconciler.reconcile(local, &mut list).unwrap();
        (report, list.to_vec().unwrap())
    }

    #[test]
    fn test_changed_content_is_single_set() {
        let local = vec![block("a1", "a"), block("b1", "new"), block("c1", "c")];
        let remote = vec![block("a1", "a"), block("b1", "old"), block("c1", "c")];
        let (report, after) = reconcile(&local, remote);
        assert_eq!(
            report,
            ReconcileReport {
                inserted: 0,
                deleted: 0,
                set: 1
            }
        );
        assert_eq!(after, local);
    }

    #[test]
    fn test_new_and_removed_blocks() {
        let local = vec![block("a1", "a"), block("n1", "new"), block("c1", "c")];
        let remote = vec![block("a1", "a"), block("b1", "b"), block("c1", "c")];
        let (report, after) = reconcile(&local, remote);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.set, 0);
        assert_eq!(after, local);
    }

    #[test]
    fn test_split_inserts_and_sets() {
        let local = vec![block("a1", "Hello"), block("n1", "World")];
        let remote = vec![block("a1", "HelloWorld")];
        let (report, after) = reconcile(&local, remote);
        assert_eq!(
            report,
            ReconcileReport {
                inserted: 1,
                deleted: 0,
                set: 1
            }
        );
        assert_eq!(after, local);
    }

    #[test]
    fn test_duplicate_remote_ids_are_trimmed() {
        let local = vec![block("a1", "a")];
        let remote = vec![block("a1", "a"), block("a1", "a")];
        let (report, after) = reconcile(&local, remote);
        assert_eq!(report.deleted, 1);
        assert_eq!(after, local);
    }

    #[test]
    fn test_in_sync_issues_nothing() {
        let local = vec![block("a1", "a"), block("b1", "b")];
        let (report, _) = reconcile(&local, local.clone());
        assert_eq!(report.writes(), 0);
    }
}
