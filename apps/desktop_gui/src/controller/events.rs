pub enum UiEvent {
    Info(String),
    /// Optimistic value change, including the initial load.
    CounterChanged(u64),
    /// A durable write for the given value completed.
    CounterPersisted(u64),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    LoadCounter,
    Persistence,
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            UiErrorContext::BackendStartup => "Startup",
            UiErrorContext::LoadCounter => "Load",
            UiErrorContext::Persistence => "Persistence",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    pub context: UiErrorContext,
    pub message: String,
}

impl UiError {
    pub fn new(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }
}
