use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("decision model returned action index {0}; expected 0..4")]
    InvalidAction(usize),

    #[error("invalid controller configuration: {0}")]
    Config(String),
}

pub type ControlResult<T> = Result<T, ControlError>;
