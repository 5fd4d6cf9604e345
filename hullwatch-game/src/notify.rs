//! Outbound notifications for renderers and automation.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::events::PendingInteractive;
use crate::modifiers::DamageModifier;
use crate::state::GameState;

/// Something a renderer may want to react to after a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    EventFired {
        description: String,
        is_positive: bool,
    },
    /// Emitted only when the modifier set differs by value from the previous turn.
    ModifiersChanged { modifiers: Vec<DamageModifier> },
    InteractivePending { pending: PendingInteractive },
    SelectionModeEntered { eligible: Vec<String> },
    SelectionModeExited,
    ActionRejected { reason: String },
    GameEnded { win: bool },
}

/// Per-transition notice buffer; most turns produce only a handful.
pub type Notices = SmallVec<[Notice; 4]>;

/// Receives notifications from a [`crate::ShipSession`].
///
/// `state_changed` fires once after every transition, including rejected ones.
pub trait TurnObserver {
    fn state_changed(&mut self, _state: &GameState) {}

    fn notice(&mut self, _notice: &Notice) {}
}

/// Observer that records everything it sees. Useful for tests and headless tools.
#[derive(Debug, Default, Clone)]
pub struct NoticeLog {
    pub notices: Vec<Notice>,
    pub state_changes: usize,
}

impl NoticeLog {
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Notice) -> bool) -> usize {
        self.notices.iter().filter(|notice| predicate(notice)).count()
    }
}

impl TurnObserver for NoticeLog {
    fn state_changed(&mut self, _state: &GameState) {
        self.state_changes += 1;
    }

    fn notice(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}
