// cliprate-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Failed to generate a unique participant id after {0} attempts")]
    #[diagnostic(
        code(cliprate::domain::id_exhausted),
        help("The 4-letter + 2-digit id space is close to saturation. Archive old participants.")
    )]
    UserIdExhausted(usize),

    #[error("Illegal page transition: {event} from '{page}'")]
    #[diagnostic(code(cliprate::domain::flow))]
    IllegalTransition { page: String, event: String },
}
