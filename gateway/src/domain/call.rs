/// Per-call lifecycle: `Idle -> Resolving -> Invoking -> Formatting -> Idle`.
///
/// A resolution miss skips `Invoking` and formats the error response
/// directly; every call ends back in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    Resolving,
    Invoking,
    Formatting,
}

#[derive(Debug, Clone)]
pub struct CallRun {
    pub id: uuid::Uuid,
    pub phase: CallPhase,
}

impl CallRun {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            phase: CallPhase::Idle,
        }
    }

    pub fn begin_resolving(&mut self) {
        assert!(matches!(self.phase, CallPhase::Idle));
        self.phase = CallPhase::Resolving;
    }

    pub fn begin_invoking(&mut self) {
        assert!(matches!(self.phase, CallPhase::Resolving));
        self.phase = CallPhase::Invoking;
    }

    pub fn begin_formatting(&mut self) {
        assert!(matches!(
            self.phase,
            CallPhase::Resolving | CallPhase::Invoking
        ));
        self.phase = CallPhase::Formatting;
    }

    pub fn finish(&mut self) {
        assert!(!matches!(self.phase, CallPhase::Idle));
        self.phase = CallPhase::Idle;
    }
}

impl Default for CallRun {
    fn default() -> Self {
        Self::new()
    }
}

impl CallPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPhase::Idle => "idle",
            CallPhase::Resolving => "resolving",
            CallPhase::Invoking => "invoking",
            CallPhase::Formatting => "formatting",
        }
    }
}
