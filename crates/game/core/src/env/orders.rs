use std::collections::VecDeque;

use crate::state::{EntityHandle, PlayerId, RootId, TemplateId};

/// Answer to a prompt raised by a waiting proposal window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    Pass,
    Negate,
    /// Respond by chaining the given template.
    ActivateEffect(TemplateId),
}

/// Inbound decision for the window correlated by `root`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionOrder {
    pub root: RootId,
    pub player: PlayerId,
    pub decision: Decision,
}

/// Outbound prompt asking a player to decide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderRequest {
    pub root: RootId,
    pub player: PlayerId,
    /// Entity whose listener raised the prompt.
    pub responder: EntityHandle,
    /// Template id of the effect being challenged.
    pub prompt_tag: TemplateId,
    /// Decisions the window still waits for.
    pub expected: u32,
}

/// Order channel between the response-chain engine and whoever answers prompts.
#[derive(Clone, Debug)]
pub struct OrderQueue {
    inbound: VecDeque<DecisionOrder>,
    outbound: Vec<OrderRequest>,
    capacity: usize,
    dropped: u64,
}

impl OrderQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inbound: VecDeque::with_capacity(capacity),
            outbound: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn submit(&mut self, order: DecisionOrder) -> bool {
        if self.inbound.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.inbound.push_back(order);
        true
    }

    /// Consumes the oldest decision for `root`; others stay queued.
    pub fn take_for(&mut self, root: RootId) -> Option<DecisionOrder> {
        let position = self.inbound.iter().position(|order| order.root == root)?;
        self.inbound.remove(position)
    }

    /// Drops every decision for `root`, returning how many were discarded.
    pub fn discard_for(&mut self, root: RootId) -> usize {
        let before = self.inbound.len();
        self.inbound.retain(|order| order.root != root);
        before - self.inbound.len()
    }

    pub fn request(&mut self, request: OrderRequest) -> bool {
        if self.outbound.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.outbound.push(request);
        true
    }

    pub fn requests(&self) -> &[OrderRequest] {
        &self.outbound
    }

    pub fn drain_requests(&mut self) -> impl Iterator<Item = OrderRequest> + '_ {
        self.outbound.drain(..)
    }

    pub fn pending_decisions(&self) -> usize {
        self.inbound.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for OrderQueue {
    fn default() -> Self {
        Self::with_capacity(crate::config::CoreConfig::DEFAULT_ORDER_CAPACITY)
    }
}
