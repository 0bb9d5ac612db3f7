use haltpoint_engine::host::Exception;

/// Exception raised in the simulated runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimException {
    pub(crate) identity: u64,
    pub(crate) class: String,
    pub(crate) ancestors: Vec<String>,
}

impl SimException {
    /// Class of the exception.
    pub fn class(&self) -> &str {
        &self.class
    }
}

impl Exception for SimException {
    fn identity(&self) -> u64 {
        self.identity
    }

    fn ancestors(&self) -> Vec<String> {
        self.ancestors.clone()
    }
}
