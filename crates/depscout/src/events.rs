//! Progress checkpoints of an analysis run.

use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::aggregate::DiscoverySet;
use crate::reconcile::{ResolvedVersion, SuspectEntry};

/// Intermediate results, sent in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisEvent {
    /// Raw discovery finished; normalized names before reconciliation
    Dependencies(DiscoverySet),
    /// Installed-tree search finished; versions before reduction
    Search(BTreeMap<String, ResolvedVersion>),
    /// Reduction finished. Not sent when reduction is disabled.
    Reduce {
        kept: BTreeMap<String, ResolvedVersion>,
        suspect: BTreeMap<String, SuspectEntry>,
    },
}

/// Sending half registered with `Analyzer::events`.
pub type EventSender = mpsc::UnboundedSender<AnalysisEvent>;

/// Receiving half for subscribers.
pub type EventReceiver = mpsc::UnboundedReceiver<AnalysisEvent>;

/// Create a subscription channel.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
