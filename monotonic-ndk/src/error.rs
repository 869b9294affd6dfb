#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("jni error: {0}")]
    Jni(#[from] jni::errors::Error),
    #[error(transparent)]
    Tester(#[from] monotonic_core::Error),
}
