//! Voice interaction state machine (idle/listening/speaking).
//!
//! Only one interaction runs at a time. Pressing the mic while one is active
//! cancels it.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Listening,
    Speaking,
}

impl InteractionState {
    pub fn is_active(self) -> bool {
        !matches!(self, InteractionState::Idle)
    }
}

/// Handle for one running interaction.
#[derive(Debug, Clone)]
pub struct Interaction {
    id: u64,
    token: CancellationToken,
}

impl Interaction {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Result of pressing the mic button.
#[derive(Debug)]
pub enum Press {
    Started(Interaction),
    /// The active interaction was cancelled.
    Stopped,
}

#[derive(Debug, Default)]
struct Inner {
    state: InteractionState,
    active: Option<Interaction>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct VoiceInteractions {
    inner: Mutex<Inner>,
}

impl VoiceInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.inner.lock().state
    }

    pub fn press(&self) -> Press {
        let mut inner = self.inner.lock();
        if inner.state.is_active() {
            if let Some(active) = inner.active.take() {
                active.token.cancel();
            }
            inner.state = InteractionState::Idle;
            tracing::debug!("Voice interaction cancelled");
            return Press::Stopped;
        }

        inner.next_id += 1;
        let interaction = Interaction {
            id: inner.next_id,
            token: CancellationToken::new(),
        };
        inner.active = Some(interaction.clone());
        inner.state = InteractionState::Listening;
        Press::Started(interaction)
    }

    /// Listening -> Speaking. False if `interaction` is no longer current.
    pub fn mark_speaking(&self, interaction: &Interaction) -> bool {
        let mut inner = self.inner.lock();
        if !inner.owns(interaction) || inner.state != InteractionState::Listening {
            return false;
        }
        inner.state = InteractionState::Speaking;
        true
    }

    /// Back to idle. Stale handles are ignored.
    pub fn finish(&self, interaction: &Interaction) -> bool {
        let mut inner = self.inner.lock();
        if !inner.owns(interaction) {
            return false;
        }
        inner.active = None;
        inner.state = InteractionState::Idle;
        true
    }
}

impl Inner {
    fn owns(&self, interaction: &Interaction) -> bool {
        self.active.as_ref().is_some_and(|a| a.id == interaction.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(guard: &VoiceInteractions) -> Interaction {
        match guard.press() {
            Press::Started(i) => i,
            Press::Stopped => panic!("expected a new interaction"),
        }
    }

    #[test]
    fn idle_press_starts_listening() {
        let guard = VoiceInteractions::new();
        assert_eq!(guard.state(), InteractionState::Idle);
        let interaction = start(&guard);
        assert_eq!(guard.state(), InteractionState::Listening);
        assert!(!interaction.is_cancelled());
    }

    #[test]
    fn second_press_cancels_active_interaction() {
        let guard = VoiceInteractions::new();
        let interaction = start(&guard);
        assert!(matches!(guard.press(), Press::Stopped));
        assert!(interaction.is_cancelled());
        assert_eq!(guard.state(), InteractionState::Idle);
    }

    #[test]
    fn press_while_speaking_cancels() {
        let guard = VoiceInteractions::new();
        let interaction = start(&guard);
        assert!(guard.mark_speaking(&interaction));
        assert_eq!(guard.state(), InteractionState::Speaking);
        assert!(matches!(guard.press(), Press::Stopped));
        assert!(interaction.token().is_cancelled());
    }

    #[test]
    fn finish_returns_to_idle() {
        let guard = VoiceInteractions::new();
        let interaction = start(&guard);
        guard.mark_speaking(&interaction);
        assert!(guard.finish(&interaction));
        assert_eq!(guard.state(), InteractionState::Idle);
    }

    #[test]
    fn stale_handle_is_ignored() {
        let guard = VoiceInteractions::new();
        let old = start(&guard);
        guard.press();
        let current = start(&guard);

        assert!(!guard.mark_speaking(&old));
        assert!(!guard.finish(&old));
        assert_eq!(guard.state(), InteractionState::Listening);
        assert!(guard.finish(&current));
    }

    #[test]
    fn mark_speaking_requires_listening() {
        let guard = VoiceInteractions::new();
        let interaction = start(&guard);
        assert!(guard.mark_speaking(&interaction));
        assert!(!guard.mark_speaking(&interaction));
    }
}
