/// Controls validator behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum bytes of schema content accepted by parse-and-store.
    pub max_schema_size: usize,
    /// Maximum number of individual errors joined into one failure message.
    pub max_error_details: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_schema_size: 1024 * 1024,
            max_error_details: 4,
        }
    }
}
