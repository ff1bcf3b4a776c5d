//! Update schedules.
//!
//! A synchronous round is one pass in which every node sends and every
//! free node receives. A coloured round runs one pass per colour class:
//! members of a class share no Markov blanket, so updating them together
//! is equivalent to updating them one at a time.

use bn_common::NodeId;

use crate::expfamily::EfModel;

/// One pass of a round: who sends and who may receive.
#[derive(Debug, Clone)]
pub struct Pass {
    /// Nodes whose outgoing messages are computed.
    pub senders: Vec<NodeId>,
    /// `accepts[i]` is true when node `i` is updated in this pass.
    pub accepts: Vec<bool>,
}

impl Pass {
    pub fn receivers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.accepts
            .iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(i, _)| NodeId(i))
    }
}

/// Single pass touching every free node.
pub fn synchronous(model: &EfModel, pinned: &[bool]) -> Vec<Pass> {
    vec![Pass {
        senders: (0..model.len()).map(NodeId).collect(),
        accepts: pinned.iter().map(|p| !p).collect(),
    }]
}

/// Greedy colouring of the free nodes in id order.
///
/// Each class sends from its members and their children, since those are
/// the only factors mentioning a member.
pub fn colored(model: &EfModel, pinned: &[bool]) -> Vec<Pass> {
    let n = model.len();
    let mut color: Vec<Option<usize>> = vec![None; n];
    let mut classes: Vec<Vec<NodeId>> = Vec::new();

    for i in 0..n {
        if pinned[i] {
            continue;
        }
        let id = NodeId(i);
        let mut taken = vec![false; classes.len()];
        for other in model.markov_blanket(id) {
            if let Some(c) = color[other.index()] {
                taken[c] = true;
            }
        }
        let c = taken.iter().position(|t| !t).unwrap_or(classes.len());
        if c == classes.len() {
            classes.push(Vec::new());
        }
        color[i] = Some(c);
        classes[c].push(id);
    }

    classes
        .into_iter()
        .map(|members| {
            let mut accepts = vec![false; n];
            let mut senders = Vec::with_capacity(members.len());
            let mut is_sender = vec![false; n];
            for &m in &members {
                accepts[m.index()] = true;
                for &s in std::iter::once(&m).chain(model.children(m)) {
                    if !is_sender[s.index()] {
                        is_sender[s.index()] = true;
                        senders.push(s);
                    }
                }
            }
            senders.sort_unstable();
            Pass { senders, accepts }
        })
        .collect()
}
