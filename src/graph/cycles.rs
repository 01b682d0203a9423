//! Depth-first cycle discovery over an explicit frame stack.
//!
//! Shared by the graph builder (cycles between node ids) and the resolver
//! (cycles between workflow documents).

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Every back-edge found while walking from `roots` in order yields one cycle:
/// the stack slice from the re-entered node, closed with that node again.
pub fn find_cycles<N, I, F>(roots: I, mut successors: F) -> Vec<Vec<N>>
where
    N: Clone + Eq + Hash,
    I: IntoIterator<Item = N>,
    F: FnMut(&N) -> Vec<N>,
{
    let mut visited: HashSet<N> = HashSet::new();
    // Depth of each node currently on the path.
    let mut on_path: HashMap<N, usize> = HashMap::new();
    let mut cycles = Vec::new();

    for root in roots {
        if visited.contains(&root) {
            continue;
        }
        visited.insert(root.clone());
        on_path.insert(root.clone(), 0);
        let mut frames = vec![Frame::enter(root, &mut successors)];

        while let Some(frame) = frames.last_mut() {
            let Some(next) = frame.pending.next() else {
                if let Some(done) = frames.pop() {
                    on_path.remove(&done.node);
                }
                continue;
            };
            if let Some(&pos) = on_path.get(&next) {
                let mut cycle: Vec<N> = frames[pos..].iter().map(|f| f.node.clone()).collect();
                cycle.push(next);
                cycles.push(cycle);
            } else if visited.insert(next.clone()) {
                on_path.insert(next.clone(), frames.len());
                frames.push(Frame::enter(next, &mut successors));
            }
        }
    }
    cycles
}

/// A node on the current DFS path and the successors still to try.
struct Frame<N> {
    node: N,
    pending: std::vec::IntoIter<N>,
}

impl<N> Frame<N> {
    fn enter<F: FnMut(&N) -> Vec<N>>(node: N, successors: &mut F) -> Self {
        let pending = successors(&node).into_iter();
        Frame { node, pending }
    }
}
