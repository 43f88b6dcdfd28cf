//! The agent's root state machine (§4.4 "State machine (agent root)").
//!
//! Transitions are enforced by a single `Mutex<AgentState>` rather than a
//! dedicated actor: the agent has exactly one root state at a time, and every
//! transition here is a cheap compare-and-set guarding a few milliseconds of
//! UI work, not a long-lived resource.

use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    Initializing,
    Ready,
    Handling(String),
    Picking(String),
    ShuttingDown,
}

pub struct AgentStateMachine {
    state: Mutex<AgentState>,
}

impl Default for AgentStateMachine {
    fn default() -> Self {
        Self {
            state: Mutex::new(AgentState::Initializing),
        }
    }
}

impl AgentStateMachine {
    pub fn current(&self) -> AgentState {
        self.state.lock().unwrap().clone()
    }

    /// `Initializing` -> `Ready`, once the server health check succeeds.
    pub fn mark_ready(&self) {
        let mut guard = self.state.lock().unwrap();
        if *guard == AgentState::Initializing {
            *guard = AgentState::Ready;
        }
    }

    /// `Ready` -> `Handling(hotkey)`. Concurrent handlers don't contend for
    /// this slot: it only records that *a* handler is in flight for display
    /// and shutdown-gating purposes, not which one.
    pub fn begin_handling(&self, hotkey: &str) {
        let mut guard = self.state.lock().unwrap();
        if matches!(*guard, AgentState::Ready) {
            *guard = AgentState::Handling(hotkey.to_string());
        }
    }

    pub fn finish_handling(&self) {
        let mut guard = self.state.lock().unwrap();
        if matches!(*guard, AgentState::Handling(_)) {
            *guard = AgentState::Ready;
        }
    }

    pub fn begin_picking(&self, field_name: &str) {
        let mut guard = self.state.lock().unwrap();
        if matches!(*guard, AgentState::Ready) {
            *guard = AgentState::Picking(field_name.to_string());
        }
    }

    pub fn finish_picking(&self) {
        let mut guard = self.state.lock().unwrap();
        if matches!(*guard, AgentState::Picking(_)) {
            *guard = AgentState::Ready;
        }
    }

    pub fn begin_shutdown(&self) {
        *self.state.lock().unwrap() = AgentState::ShuttingDown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializing_moves_to_ready() {
        let machine = AgentStateMachine::default();
        machine.mark_ready();
        assert_eq!(machine.current(), AgentState::Ready);
    }

    #[test]
    fn ready_to_handling_and_back() {
        let machine = AgentStateMachine::default();
        machine.mark_ready();
        machine.begin_handling("CTRL+ALT+V");
        assert_eq!(machine.current(), AgentState::Handling("CTRL+ALT+V".to_string()));
        machine.finish_handling();
        assert_eq!(machine.current(), AgentState::Ready);
    }

    #[test]
    fn picking_transitions_round_trip() {
        let machine = AgentStateMachine::default();
        machine.mark_ready();
        machine.begin_picking("diagnosis");
        assert_eq!(machine.current(), AgentState::Picking("diagnosis".to_string()));
        machine.finish_picking();
        assert_eq!(machine.current(), AgentState::Ready);
    }

    #[test]
    fn shutdown_overrides_any_state() {
        let machine = AgentStateMachine::default();
        machine.mark_ready();
        machine.begin_handling("CTRL+ALT+V");
        machine.begin_shutdown();
        assert_eq!(machine.current(), AgentState::ShuttingDown);
    }
}
