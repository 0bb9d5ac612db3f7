/// Error returned when evaluating a condition expression.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The expression refers to a name not bound in the scope.
    #[error("undefined local variable `{0}`")]
    UnknownName(String),

    /// The expression compares a value which is not an integer.
    #[error("`{0}` is not an integer")]
    NotAnInteger(String),

    /// The expression cannot be parsed.
    #[error("malformed expression `{0}`")]
    Malformed(String),
}
