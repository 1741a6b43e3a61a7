use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("missing environment variable: {name}")]
pub struct MissingEnvVarError {
    /// Name of the variable that was requested.
    pub name: String,
    #[source]
    source: std::env::VarError,
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|source| MissingEnvVarError {
        name: name.to_string(),
        source,
    })
}
