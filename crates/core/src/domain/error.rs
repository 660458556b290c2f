// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid member state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid share link: {0}")]
    InvalidLink(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
