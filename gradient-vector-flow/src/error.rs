use thiserror::Error;

/// Errors produced by the boundary operators and the GVF solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GvfError {
    #[error("field is {rows}x{cols}; mirror boundary needs at least 3 rows and 3 columns")]
    Shape { rows: usize, cols: usize },

    #[error("vector field components differ in shape: u is {u:?}, v is {v:?}")]
    ComponentMismatch { u: (usize, usize), v: (usize, usize) },

    #[error("edge map is constant (every value is {value}); cannot normalize a zero range")]
    DegenerateInput { value: f64 },

    #[error("edge map contains NaN or infinite values")]
    NonFiniteInput,

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("relaxation diverged at iteration {iteration}")]
    Diverged { iteration: usize },
}

pub type Result<T> = std::result::Result<T, GvfError>;
