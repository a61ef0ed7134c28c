pub mod device;
pub mod error;
pub mod flow;
pub mod metadata;
pub mod participant;
pub mod rating;
pub mod sampler;
pub mod scale;
pub mod validator;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use error::DomainError;
