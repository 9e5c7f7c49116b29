/// Errors of the session lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The generated session id already exists. Issuing is not retried.
    #[error("a session with the generated id already exists")]
    SessionIdExists,

    /// The given cookie has a wrong length.
    #[error("the given cookie has length {actual}, but is expected to have length {expected}")]
    WrongCookieLength {
        /// The expected cookie length.
        expected: usize,
        /// The actual cookie length.
        actual: usize,
    },

    /// An error occurred in the session store connector.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of the credential store.
///
/// Store errors are fatal to the current request only and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database driver reported an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

mod expect_impl_error {
    trait ExpectImplError: std::error::Error {}

    impl ExpectImplError for super::Error {}
    impl ExpectImplError for super::StoreError {}
}
