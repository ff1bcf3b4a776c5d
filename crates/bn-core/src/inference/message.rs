//! Messages and their per-target reduction.
//!
//! Messages addressed to the same node within one pass are summed in
//! natural-parameter space. Addition is associative and commutative, so
//! partial buffers built on different threads can be merged in any order.

use bn_common::NodeId;
use std::collections::hash_map::{Entry, HashMap};

/// Natural-parameter message addressed to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub target: NodeId,
    pub natural: Vec<f64>,
}

impl Message {
    pub fn new(target: NodeId, natural: Vec<f64>) -> Self {
        Self { target, natural }
    }

    /// Fold another message for the same target into this one.
    pub fn combine(&mut self, other: &Message) {
        debug_assert_eq!(self.target, other.target);
        add_into(&mut self.natural, &other.natural);
    }
}

/// Combined messages of one pass, keyed by target.
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    combined: HashMap<NodeId, Message>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        match self.combined.entry(message.target) {
            Entry::Occupied(mut total) => total.get_mut().combine(&message),
            Entry::Vacant(slot) => {
                slot.insert(message);
            }
        }
    }

    /// Union of two buffers, summing shared targets.
    pub fn merge(self, other: MessageBuffer) -> MessageBuffer {
        let (mut big, small) = if self.combined.len() >= other.combined.len() {
            (self, other)
        } else {
            (other, self)
        };
        for message in small.combined.into_values() {
            big.add(message);
        }
        big
    }

    pub fn get(&self, target: NodeId) -> Option<&[f64]> {
        self.combined.get(&target).map(|m| m.natural.as_slice())
    }

    pub fn len(&self) -> usize {
        self.combined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combined.is_empty()
    }
}

impl Extend<Message> for MessageBuffer {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        for message in iter {
            self.add(message);
        }
    }
}

fn add_into(total: &mut Vec<f64>, part: &[f64]) {
    if total.len() < part.len() {
        total.resize(part.len(), 0.0);
    }
    total.iter_mut().zip(part).for_each(|(t, p)| *t += p);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_to_same_target_are_summed() {
        let mut buffer = MessageBuffer::new();
        buffer.add(Message::new(NodeId(1), vec![1.0, -0.5]));
        buffer.add(Message::new(NodeId(2), vec![3.0]));
        buffer.add(Message::new(NodeId(1), vec![0.5, -0.25]));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(NodeId(1)), Some(&[1.5, -0.75][..]));
        assert_eq!(buffer.get(NodeId(3)), None);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let parts = [
            Message::new(NodeId(0), vec![1.0, 2.0]),
            Message::new(NodeId(1), vec![4.0]),
            Message::new(NodeId(0), vec![0.25, 0.5]),
            Message::new(NodeId(0), vec![-1.0, 1.0]),
        ];
        let mut left = MessageBuffer::new();
        left.extend(parts[..2].iter().cloned());
        let mut right = MessageBuffer::new();
        right.extend(parts[2..].iter().cloned());

        let ab = left.clone().merge(right.clone());
        let ba = right.merge(left);
        assert_eq!(ab.get(NodeId(0)), ba.get(NodeId(0)));
        assert_eq!(ab.get(NodeId(0)), Some(&[0.25, 3.5][..]));
        assert_eq!(ab.get(NodeId(1)), Some(&[4.0][..]));
    }

    #[test]
    fn test_buffer_agrees_with_pairwise_combine() {
        let parts = [
            Message::new(NodeId(4), vec![1.0, 1.0]),
            Message::new(NodeId(4), vec![2.0, -3.0]),
            Message::new(NodeId(4), vec![0.5, 0.5]),
        ];
        let mut folded = parts[0].clone();
        for part in &parts[1..] {
            folded.combine(part);
        }
        assert_eq!(folded.natural, vec![3.5, -1.5]);

        let mut buffer = MessageBuffer::new();
        buffer.extend(parts.iter().cloned());
        assert_eq!(buffer.get(NodeId(4)), Some(folded.natural.as_slice()));
    }
}
