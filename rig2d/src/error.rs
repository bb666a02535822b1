use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate bone name: {name}")]
    DuplicateBone { name: String },

    #[error("unknown bone: {name}")]
    UnknownBone { name: String },

    #[error("invalid bone index: {index}")]
    InvalidBoneIndex { index: usize },

    #[error("parent bone {parent} must precede bone '{bone}' in the skeleton")]
    ParentOrder { bone: String, parent: usize },

    #[error("parenting bone '{bone}' under bone {parent} would create a cycle")]
    BoneCycle { bone: String, parent: usize },

    #[error("invalid vertex index: {index}")]
    InvalidVertexIndex { index: usize },

    #[error("invalid triangle index: {index}")]
    InvalidTriangleIndex { index: usize },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[cfg(feature = "json")]
    #[error("failed to encode JSON: {message}")]
    Json { message: String },
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}
