use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealingError {
    #[error("service {0} is not registered")]
    UnknownService(String),

    #[error("service {service} has no healing strategies")]
    NoStrategies { service: String },

    /// Every strategy in the chain failed.
    #[error("all {} strategies failed for {service}: {}", failures.len(), failures.join("; "))]
    Exhausted {
        service: String,
        failures: Vec<String>,
    },
}

pub type HealingResult<T> = Result<T, HealingError>;
