use thiserror::Error;

/// The one failure this crate reports while turning a parse tree into a
/// molecule. Every cause is fatal for the name being built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Structure building failure: {reason}")]
pub struct StructureBuildingError {
    pub reason: String,
}

impl StructureBuildingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = StructureBuildingError> = std::result::Result<T, E>;

/// Format a [`StructureBuildingError`].
#[macro_export]
macro_rules! build_error {
    ($($arg:tt)*) => {
        $crate::StructureBuildingError::new(format!($($arg)*))
    };
}

/// Return early with a [`StructureBuildingError`].
#[macro_export]
macro_rules! bail_build {
    ($($arg:tt)*) => {
        return Err($crate::build_error!($($arg)*))
    };
}
