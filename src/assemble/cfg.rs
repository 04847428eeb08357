//! Non-exceptional control-flow graph over a three-address body.
//!
//! Leaders are the first statement, every branch target and every statement following a
//! branching or terminal statement. Blocks cover the statement list contiguously, so
//! emission in block order preserves the original statement order and every fall-through
//! edge lands on the block that physically follows.

use std::collections::{BTreeSet, HashMap};

use crate::{
    model::TacBody,
    Result,
};

/// One basic block: a contiguous statement range with single entry and exit.
#[derive(Debug, Clone)]
pub struct TacBlock {
    /// Block id, equal to the block's position in statement order
    pub id: usize,
    /// Index of the first statement
    pub start: usize,
    /// Index one past the last statement
    pub end: usize,
    /// Successor block ids: branch targets first, fall-through last
    pub successors: Vec<usize>,
}

/// The control-flow graph of one three-address body.
#[derive(Debug, Clone)]
pub struct TacGraph {
    /// Blocks in statement order; block 0 is the entry
    pub blocks: Vec<TacBlock>,
}

impl TacGraph {
    /// Builds the graph for a body.
    ///
    /// # Errors
    ///
    /// Fails if any branch targets a statement index outside the body.
    pub fn build(body: &TacBody) -> Result<TacGraph> {
        if body.statements.is_empty() {
            return Ok(TacGraph { blocks: Vec::new() });
        }

        let mut leaders: BTreeSet<usize> = BTreeSet::new();
        leaders.insert(0);
        for (index, statement) in body.statements.iter().enumerate() {
            for target in statement.targets() {
                if target >= body.statements.len() {
                    return Err(malformed_error!(
                        "statement {} branches to non-existent statement {}",
                        index,
                        target
                    ));
                }
                leaders.insert(target);
            }
            let splits = !statement.targets().is_empty() || statement.is_terminal();
            if splits && index + 1 < body.statements.len() {
                leaders.insert(index + 1);
            }
        }

        let starts: Vec<usize> = leaders.iter().copied().collect();
        let block_of_start: HashMap<usize, usize> = starts
            .iter()
            .enumerate()
            .map(|(id, start)| (*start, id))
            .collect();

        let mut blocks = Vec::with_capacity(starts.len());
        for (id, start) in starts.iter().enumerate() {
            let end = starts.get(id + 1).copied().unwrap_or(body.statements.len());
            let last = &body.statements[end - 1];

            let mut successors: Vec<usize> = last
                .targets()
                .into_iter()
                .map(|target| block_of_start[&target])
                .collect();
            if !last.is_terminal() && end < body.statements.len() {
                successors.push(block_of_start[&end]);
            }

            blocks.push(TacBlock {
                id,
                start: *start,
                end,
                successors,
            });
        }

        Ok(TacGraph { blocks })
    }

    /// Forward visit order: reverse postorder over the reachable blocks, then any
    /// unreachable blocks in statement order.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<usize> {
        if self.blocks.is_empty() {
            return Vec::new();
        }

        let mut visited = vec![false; self.blocks.len()];
        let mut postorder = Vec::with_capacity(self.blocks.len());
        // Iterative DFS; the second stack element tracks the next successor to try.
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        visited[0] = true;

        while let Some((block, successor_index)) = stack.pop() {
            match self.blocks[block].successors.get(successor_index) {
                Some(&successor) => {
                    stack.push((block, successor_index + 1));
                    if !visited[successor] {
                        visited[successor] = true;
                        stack.push((successor, 0));
                    }
                }
                None => postorder.push(block),
            }
        }

        let mut order: Vec<usize> = postorder.into_iter().rev().collect();
        for (block, seen) in visited.iter().enumerate() {
            if !seen {
                order.push(block);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TacStatement, TacValue, VariableSlot};

    fn body(statements: Vec<TacStatement>) -> TacBody {
        TacBody::from_statements(statements)
    }

    #[test]
    fn straight_line_code_is_one_block() {
        let graph = TacGraph::build(&body(vec![
            TacStatement::Assign {
                dest: VariableSlot::local(0),
                value: TacValue::i4(1),
            },
            TacStatement::Return { value: None },
        ]))
        .unwrap();

        assert_eq!(graph.blocks.len(), 1);
        assert!(graph.blocks[0].successors.is_empty());
    }

    #[test]
    fn branches_split_blocks_and_wire_edges() {
        // 0: if local0 goto 3
        // 1: local1 = 1
        // 2: goto 4
        // 3: local1 = 2
        // 4: return
        let graph = TacGraph::build(&body(vec![
            TacStatement::BranchIf {
                condition: crate::model::BranchCondition::True,
                unsigned: false,
                left: TacValue::local(0),
                right: None,
                target: 3,
            },
            TacStatement::Assign {
                dest: VariableSlot::local(1),
                value: TacValue::i4(1),
            },
            TacStatement::Branch { target: 4 },
            TacStatement::Assign {
                dest: VariableSlot::local(1),
                value: TacValue::i4(2),
            },
            TacStatement::Return { value: None },
        ]))
        .unwrap();

        assert_eq!(graph.blocks.len(), 4);
        // Entry branches to the else block and falls through.
        assert_eq!(graph.blocks[0].successors, vec![2, 1]);
        // Both arms converge on the return block.
        assert_eq!(graph.blocks[1].successors, vec![3]);
        assert_eq!(graph.blocks[2].successors, vec![3]);

        let order = graph.reverse_postorder();
        assert_eq!(order[0], 0);
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn out_of_range_target_is_rejected() {
        let result = TacGraph::build(&body(vec![TacStatement::Branch { target: 9 }]));
        assert!(result.is_err());
    }
}
