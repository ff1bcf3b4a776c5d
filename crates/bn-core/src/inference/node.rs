//! Message-passing nodes.
//!
//! A node holds the natural parameters of one variational posterior and
//! the cached moments its neighbours read. Within a pass every node first
//! reads a stable snapshot of all moments ([`Node::compute_messages`]),
//! then receives one combined message ([`Node::update_combined_message`]).

use bn_common::{Error, NodeId, Result};

use crate::expfamily::{Factor, Family, MomentSource, NodeSpec};
use crate::inference::message::Message;
use crate::inference::posterior::Posterior;
use crate::model::Value;

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    label: String,
    family: Family,
    factor: Factor,
    neighbors: Vec<NodeId>,
    natural: Vec<f64>,
    moments: Vec<f64>,
    observed: Option<Value>,
    last_change: f64,
    local_iterations: usize,
}

impl MomentSource for [Node] {
    fn moments(&self, node: NodeId) -> &[f64] {
        &self[node.index()].moments
    }
}

impl Node {
    /// Fresh node with placeholder parameters; callers initialise it.
    pub(crate) fn from_spec(id: NodeId, spec: &NodeSpec) -> Self {
        let natural = spec.family.placeholder();
        let moments = spec.family.moments(&natural).unwrap_or_default();
        Self {
            id,
            label: spec.label.clone(),
            family: spec.family,
            factor: spec.factor.clone(),
            neighbors: spec.factor.neighbors(),
            natural,
            moments,
            observed: None,
            last_change: f64::INFINITY,
            local_iterations: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn factor(&self) -> &Factor {
        &self.factor
    }

    pub fn natural(&self) -> &[f64] {
        &self.natural
    }

    pub fn moments(&self) -> &[f64] {
        &self.moments
    }

    /// Whether the node is fixed to an observed value.
    pub fn is_pinned(&self) -> bool {
        self.observed.is_some()
    }

    pub fn observed(&self) -> Option<Value> {
        self.observed
    }

    pub fn local_iterations(&self) -> usize {
        self.local_iterations
    }

    /// Largest absolute natural-parameter change in the last update.
    pub fn last_change(&self) -> f64 {
        self.last_change
    }

    /// Fix the node to an observed value.
    pub(crate) fn pin(&mut self, value: Value) -> Result<()> {
        let moments = self
            .family
            .observed_moments(value)
            .ok_or_else(|| Error::InvalidEvidence {
                variable: self.label.clone(),
                reason: format!("{:?} is not a value of a {} node", value, self.family),
            })?;
        self.moments = moments;
        self.observed = Some(value);
        self.last_change = 0.0;
        Ok(())
    }

    /// Set initial parameters without counting an update.
    pub(crate) fn initialize(&mut self, natural: Vec<f64>) -> Result<()> {
        self.moments = self.checked_moments(&natural)?;
        self.natural = natural;
        self.last_change = f64::INFINITY;
        self.local_iterations = 0;
        Ok(())
    }

    /// Outgoing messages to every free node this node's factor touches,
    /// itself included. Lazy; nothing is computed until iterated.
    pub fn compute_messages<'a>(&'a self, nodes: &'a [Node]) -> impl Iterator<Item = Message> + 'a {
        self.messages_where(nodes, move |target| !nodes[target.index()].is_pinned())
    }

    /// Outgoing messages restricted to targets accepted by `keep`.
    pub(crate) fn messages_where<'a, F>(
        &'a self,
        nodes: &'a [Node],
        keep: F,
    ) -> impl Iterator<Item = Message> + 'a
    where
        F: Fn(NodeId) -> bool + 'a,
    {
        std::iter::once(self.id)
            .chain(self.neighbors.iter().copied())
            .filter(move |target| keep(*target))
            .map(move |target| {
                let natural = if target == self.id {
                    self.factor.self_message(nodes)
                } else {
                    self.factor.message_to(self.id, target, nodes)
                };
                Message::new(target, natural)
            })
    }

    /// Replace the natural parameters by an already combined message.
    /// Pinned nodes ignore messages.
    pub fn update_combined_message(&mut self, natural: &[f64]) -> Result<()> {
        if self.is_pinned() {
            return Ok(());
        }
        let moments = self.checked_moments(natural)?;
        self.last_change = self
            .natural
            .iter()
            .zip(natural)
            .map(|(old, new)| (old - new).abs())
            .fold(0.0, f64::max);
        self.natural.clear();
        self.natural.extend_from_slice(natural);
        self.moments = moments;
        self.local_iterations += 1;
        Ok(())
    }

    /// Parameters stopped moving, the local cap was hit, or the node is pinned.
    pub fn is_done(&self, threshold: f64, max_local_iterations: Option<usize>) -> bool {
        self.is_pinned()
            || self.last_change < threshold
            || max_local_iterations.is_some_and(|cap| self.local_iterations >= cap)
    }

    /// `E_q[ln f] + H[q]`; pinned nodes contribute no entropy.
    pub fn compute_elbo(&self, nodes: &[Node]) -> f64 {
        let expected_log = self.factor.expected_log(self.id, nodes);
        if self.is_pinned() {
            expected_log
        } else {
            expected_log + self.family.entropy(&self.natural)
        }
    }

    /// Current posterior in standard parameterisation.
    pub fn posterior(&self) -> Result<Posterior> {
        if let Some(value) = self.observed {
            return Ok(Posterior::Observed { value });
        }
        Posterior::from_natural(self.family, &self.natural).ok_or_else(|| {
            Error::NumericalInstability(format!("{} has improper parameters", self.label))
        })
    }

    fn checked_moments(&self, natural: &[f64]) -> Result<Vec<f64>> {
        self.family.moments(natural).ok_or_else(|| {
            Error::NumericalInstability(format!(
                "{} ({}) received improper natural parameters {:?}",
                self.label, self.family, natural
            ))
        })
    }
}
