//! Per-marker hover/focus/click state machine.
//!
//! The machine is pure: it consumes events and returns the effects a host must carry
//! out (start or cancel a timer, show or hide the overlay). Every timer it asks for
//! carries a [`TimerToken`]; a firing whose token is not the one currently pending is
//! ignored, so a timer cancelled too late still has no effect.

use std::time::Duration;

use tracing::trace;

use crate::config::TooltipConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    PendingOpen,
    Open,
    PendingClose,
}

impl InteractionState {
    /// The overlay is on screen in these states.
    pub fn is_visible(self) -> bool {
        matches!(self, InteractionState::Open | InteractionState::PendingClose)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    generation: u64,
    kind: TimerKind,
}

impl TimerToken {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    PointerEnterMarker,
    PointerLeaveMarker,
    PointerEnterOverlay,
    PointerLeaveOverlay,
    FocusIn,
    FocusOut,
    Click,
    /// The overlay's detail link was followed, or the marker is going away.
    Dismiss,
    TimerFired(TimerToken),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartTimer { token: TimerToken, delay: Duration },
    CancelTimer(TimerToken),
    ShowOverlay,
    HideOverlay,
}

#[derive(Debug, Clone)]
pub struct InteractionMachine {
    state: InteractionState,
    pending: Option<TimerToken>,
    generation: u64,
    open_delay: Duration,
    close_delay: Duration,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(&TooltipConfig::default())
    }
}

impl InteractionMachine {
    pub fn new(config: &TooltipConfig) -> Self {
        Self {
            state: InteractionState::Idle,
            pending: None,
            generation: 0,
            open_delay: config.open_delay(),
            close_delay: config.close_delay(),
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.pending
    }

    pub fn handle(&mut self, event: InteractionEvent) -> Vec<Effect> {
        use InteractionEvent as E;
        use InteractionState as S;

        let before = self.state;
        let mut effects = Vec::new();
        match (self.state, event) {
            (S::Idle, E::PointerEnterMarker | E::FocusIn) => {
                self.start_timer(TimerKind::Open, &mut effects);
                self.state = S::PendingOpen;
            }
            (S::PendingOpen, E::PointerLeaveMarker | E::FocusOut) => {
                self.cancel_timer(&mut effects);
                self.state = S::Idle;
            }
            (S::Open, E::PointerLeaveMarker | E::PointerLeaveOverlay | E::FocusOut) => {
                self.start_timer(TimerKind::Close, &mut effects);
                self.state = S::PendingClose;
            }
            (S::PendingClose, E::PointerEnterMarker | E::PointerEnterOverlay | E::FocusIn) => {
                self.cancel_timer(&mut effects);
                self.state = S::Open;
            }
            (S::PendingOpen, E::TimerFired(token)) if self.is_pending(token, TimerKind::Open) => {
                self.pending = None;
                self.state = S::Open;
                effects.push(Effect::ShowOverlay);
            }
            (S::PendingClose, E::TimerFired(token)) if self.is_pending(token, TimerKind::Close) => {
                self.pending = None;
                self.state = S::Idle;
                effects.push(Effect::HideOverlay);
            }
            (S::Idle | S::PendingOpen, E::Click) => {
                self.cancel_timer(&mut effects);
                self.state = S::Open;
                effects.push(Effect::ShowOverlay);
            }
            (S::Open | S::PendingClose, E::Click | E::Dismiss) => {
                self.cancel_timer(&mut effects);
                self.state = S::Idle;
                effects.push(Effect::HideOverlay);
            }
            (S::PendingOpen, E::Dismiss) => {
                self.cancel_timer(&mut effects);
                self.state = S::Idle;
            }
            (_, E::TimerFired(token)) => {
                trace!(?token, state = ?self.state, "ignoring stale tooltip timer");
            }
            _ => {}
        }
        if before != self.state {
            trace!(from = ?before, to = ?self.state, ?event, "tooltip transition");
        }
        effects
    }

    fn is_pending(&self, token: TimerToken, kind: TimerKind) -> bool {
        token.kind == kind && self.pending == Some(token)
    }

    fn start_timer(&mut self, kind: TimerKind, effects: &mut Vec<Effect>) {
        self.cancel_timer(effects);
        self.generation += 1;
        let token = TimerToken {
            generation: self.generation,
            kind,
        };
        let delay = match kind {
            TimerKind::Open => self.open_delay,
            TimerKind::Close => self.close_delay,
        };
        self.pending = Some(token);
        effects.push(Effect::StartTimer { token, delay });
    }

    fn cancel_timer(&mut self, effects: &mut Vec<Effect>) {
        if let Some(token) = self.pending.take() {
            effects.push(Effect::CancelTimer(token));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InteractionEvent as E;
    use InteractionState as S;

    fn started(effects: &[Effect]) -> TimerToken {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::StartTimer { token, .. } => Some(*token),
                _ => None,
            })
            .expect("a timer was started")
    }

    fn open(machine: &mut InteractionMachine) {
        let token = started(&machine.handle(E::PointerEnterMarker));
        assert_eq!(machine.handle(E::TimerFired(token)), vec![Effect::ShowOverlay]);
        assert_eq!(machine.state(), S::Open);
    }

    #[test]
    fn hover_opens_after_delay() {
        let mut machine = InteractionMachine::default();
        let effects = machine.handle(E::PointerEnterMarker);
        assert_eq!(machine.state(), S::PendingOpen);
        let Effect::StartTimer { token, delay } = effects[0] else {
            panic!("expected timer, got {effects:?}");
        };
        assert_eq!(token.kind(), TimerKind::Open);
        assert_eq!(delay, Duration::from_millis(200));
        assert_eq!(machine.handle(E::TimerFired(token)), vec![Effect::ShowOverlay]);
        assert_eq!(machine.state(), S::Open);
        assert_eq!(machine.pending_timer(), None);
    }

    #[test]
    fn leaving_before_open_delay_never_opens() {
        let mut machine = InteractionMachine::default();
        let token = started(&machine.handle(E::PointerEnterMarker));
        assert_eq!(machine.handle(E::PointerLeaveMarker), vec![Effect::CancelTimer(token)]);
        assert_eq!(machine.state(), S::Idle);
        // The host lost the race and fired anyway.
        assert!(machine.handle(E::TimerFired(token)).is_empty());
        assert_eq!(machine.state(), S::Idle);
    }

    #[test]
    fn leave_then_close_delay_returns_to_idle() {
        let mut machine = InteractionMachine::default();
        open(&mut machine);
        let effects = machine.handle(E::PointerLeaveMarker);
        let token = started(&effects);
        assert_eq!(token.kind(), TimerKind::Close);
        assert_eq!(machine.state(), S::PendingClose);
        assert_eq!(machine.handle(E::TimerFired(token)), vec![Effect::HideOverlay]);
        assert_eq!(machine.state(), S::Idle);
    }

    #[test]
    fn moving_onto_overlay_keeps_it_open() {
        let mut machine = InteractionMachine::default();
        open(&mut machine);
        let token = started(&machine.handle(E::PointerLeaveMarker));
        assert_eq!(machine.handle(E::PointerEnterOverlay), vec![Effect::CancelTimer(token)]);
        assert_eq!(machine.state(), S::Open);
        assert!(machine.handle(E::TimerFired(token)).is_empty());
        assert_eq!(machine.state(), S::Open);

        // Leaving the overlay starts the close countdown again.
        let token = started(&machine.handle(E::PointerLeaveOverlay));
        assert_eq!(machine.state(), S::PendingClose);
        machine.handle(E::TimerFired(token));
        assert_eq!(machine.state(), S::Idle);
    }

    #[test]
    fn reentering_marker_cancels_close() {
        let mut machine = InteractionMachine::default();
        open(&mut machine);
        machine.handle(E::PointerLeaveMarker);
        machine.handle(E::PointerEnterMarker);
        assert_eq!(machine.state(), S::Open);
        assert_eq!(machine.pending_timer(), None);
    }

    #[test]
    fn click_toggles_without_delays() {
        let mut machine = InteractionMachine::default();
        assert_eq!(machine.handle(E::Click), vec![Effect::ShowOverlay]);
        assert_eq!(machine.state(), S::Open);
        assert_eq!(machine.handle(E::Click), vec![Effect::HideOverlay]);
        assert_eq!(machine.state(), S::Idle);
    }

    #[test]
    fn click_cancels_in_flight_timers() {
        let mut machine = InteractionMachine::default();
        let token = started(&machine.handle(E::PointerEnterMarker));
        assert_eq!(
            machine.handle(E::Click),
            vec![Effect::CancelTimer(token), Effect::ShowOverlay]
        );
        assert!(machine.handle(E::TimerFired(token)).is_empty());

        let close = started(&machine.handle(E::PointerLeaveMarker));
        assert_eq!(
            machine.handle(E::Click),
            vec![Effect::CancelTimer(close), Effect::HideOverlay]
        );
        assert_eq!(machine.state(), S::Idle);
    }

    #[test]
    fn focus_mirrors_pointer() {
        let mut machine = InteractionMachine::default();
        let token = started(&machine.handle(E::FocusIn));
        machine.handle(E::TimerFired(token));
        assert_eq!(machine.state(), S::Open);
        let token = started(&machine.handle(E::FocusOut));
        machine.handle(E::TimerFired(token));
        assert_eq!(machine.state(), S::Idle);
    }

    #[test]
    fn dismiss_closes_immediately() {
        let mut machine = InteractionMachine::default();
        open(&mut machine);
        assert_eq!(machine.handle(E::Dismiss), vec![Effect::HideOverlay]);
        assert_eq!(machine.state(), S::Idle);
        assert!(machine.handle(E::Dismiss).is_empty());
    }

    #[test]
    fn repeated_enter_while_pending_keeps_single_timer() {
        let mut machine = InteractionMachine::default();
        let token = started(&machine.handle(E::PointerEnterMarker));
        assert!(machine.handle(E::FocusIn).is_empty());
        assert_eq!(machine.pending_timer(), Some(token));
    }

    #[test]
    fn configured_delays_are_used() {
        let config = TooltipConfig {
            open_delay_ms: 10,
            close_delay_ms: 5,
            ..TooltipConfig::default()
        };
        let mut machine = InteractionMachine::new(&config);
        let effects = machine.handle(E::PointerEnterMarker);
        assert!(matches!(effects[0], Effect::StartTimer { delay, .. } if delay == Duration::from_millis(10)));
        machine.handle(E::Click);
        let effects = machine.handle(E::PointerLeaveMarker);
        assert!(matches!(effects[0], Effect::StartTimer { delay, .. } if delay == Duration::from_millis(5)));
    }
}
