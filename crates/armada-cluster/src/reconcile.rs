//! Worker-set reconciliation
//!
//! Computes the minimal add/remove operations that move an observed
//! worker fleet to a desired one. Purely computational: no I/O, no
//! errors, every input combination produces a well-defined (possibly
//! empty) delta.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::types::{NodeShape, WorkerGroup, WorkerSetDelta};

/// Compute the incremental operations moving `observed` to `desired`.
///
/// Per shape, the delta is net: a growing shape lands in `to_add`, a
/// shrinking one in `to_remove`, never both. Shapes present in observed
/// but absent from desired are removed in full; an empty desired fleet
/// therefore removes everything.
///
/// Callers must not pass duplicate shapes within one input; if they do,
/// the last-seen count for a shape wins, mirroring map construction
/// semantics (counts are never summed).
///
/// Output ordering follows the iteration order of the inputs and is not
/// significant for correctness, only for readable diff reporting.
pub fn reconcile(observed: &[WorkerGroup], desired: &[WorkerGroup]) -> WorkerSetDelta {
    let observed_by_shape: HashMap<&NodeShape, u32> =
        observed.iter().map(|g| (&g.shape, g.count)).collect();
    let desired_by_shape: HashMap<&NodeShape, u32> =
        desired.iter().map(|g| (&g.shape, g.count)).collect();

    let mut delta = WorkerSetDelta::default();
    let mut consumed: HashSet<&NodeShape> = HashSet::new();
    let mut handled: HashSet<&NodeShape> = HashSet::new();

    for group in desired {
        let shape = &group.shape;
        if !handled.insert(shape) {
            continue;
        }
        let want = desired_by_shape[shape];

        match observed_by_shape.get(shape) {
            Some(&have) => {
                consumed.insert(shape);
                if want > have {
                    delta.to_add.push(WorkerGroup::new(shape.clone(), want - have));
                } else if want < have {
                    delta.to_remove.push(WorkerGroup::new(shape.clone(), have - want));
                }
            }
            None if want > 0 => {
                delta.to_add.push(WorkerGroup::new(shape.clone(), want));
            }
            None => {}
        }
    }

    // Shapes present in observed but absent from desired go away entirely.
    let mut seen: HashSet<&NodeShape> = HashSet::new();
    for group in observed {
        let shape = &group.shape;
        if !seen.insert(shape) || consumed.contains(shape) {
            continue;
        }
        let have = observed_by_shape[shape];
        if have > 0 {
            delta.to_remove.push(WorkerGroup::new(shape.clone(), have));
        }
    }

    debug!(delta = %delta, "reconciled worker set");
    delta
}
