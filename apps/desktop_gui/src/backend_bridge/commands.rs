pub enum BackendCommand {
    Increment,
    Reset,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Increment => "increment",
            BackendCommand::Reset => "reset",
        }
    }
}
