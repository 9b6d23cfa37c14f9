//! CFG utilities shared by the verifier and the optimizer.
//!
//! Generic graph operations on [`Function`] live here so that passes do not
//! import from each other.

use smallvec::{smallvec, SmallVec};

use crate::ir::{BlockId, Terminator};
use crate::Function;

/// Extract successor block IDs from a terminator.
///
/// Returns `SmallVec<[BlockId; 2]>`: no terminator has more than two
/// successors.
pub fn successors(terminator: &Terminator) -> SmallVec<[BlockId; 2]> {
    match terminator {
        Terminator::Return { .. } | Terminator::Unreachable => SmallVec::new(),
        Terminator::Jump { target, .. } => smallvec![*target],
        Terminator::Branch {
            then_block,
            else_block,
            ..
        } => smallvec![*then_block, *else_block],
    }
}

/// Compute a postorder traversal of the CFG starting from the entry block.
///
/// Uses an iterative DFS with an explicit stack to avoid recursion depth
/// issues on deeply nested CFGs. Only visits reachable blocks.
pub fn compute_postorder(func: &Function) -> Vec<BlockId> {
    let num_blocks = func.num_blocks();
    let mut visited = vec![false; num_blocks];
    let mut postorder = Vec::with_capacity(num_blocks);

    // Stack entries: (block, children_pushed).
    let mut stack: Vec<(BlockId, bool)> = vec![(func.entry(), false)];

    while let Some(&mut (block, ref mut children_done)) = stack.last_mut() {
        if *children_done {
            postorder.push(block);
            stack.pop();
            continue;
        }
        *children_done = true;

        if block.index() >= num_blocks || visited[block.index()] {
            stack.pop();
            continue;
        }
        visited[block.index()] = true;

        let succs = successors(func.block(block).terminator());
        // Reverse so the first successor is explored first.
        for succ in succs.into_iter().rev() {
            if succ.index() < num_blocks && !visited[succ.index()] {
                stack.push((succ, false));
            }
        }
    }

    postorder
}

/// Reverse postorder: every block appears before its successors, except
/// along back edges.
pub fn reverse_postorder(func: &Function) -> Vec<BlockId> {
    let mut rpo = compute_postorder(func);
    rpo.reverse();
    rpo
}
