//! Error types for asset loading

/// Errors raised by the addressable [`HandleCache`](super::HandleCache)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The key was empty or only whitespace
    InvalidKey,
    /// The backend failed to load the asset
    LoadFailure {
        /// Address that failed
        key: String,
    },
    /// The backend failed to instantiate the prefab
    InstantiateFailure {
        /// Address that failed
        key: String,
    },
    /// The cached asset has a different type than requested
    TypeMismatch {
        /// Address of the cached asset
        key: String,
        /// Type the caller asked for
        expected: &'static str,
    },
    /// The cache was already torn down
    Closed,
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "Address must be a non-empty string"),
            Self::LoadFailure { key } => write!(f, "Failed to load addressable asset at '{key}'"),
            Self::InstantiateFailure { key } => {
                write!(f, "Failed to instantiate addressable prefab at '{key}'")
            }
            Self::TypeMismatch { key, expected } => {
                write!(f, "Asset at '{key}' is not of type {expected}")
            }
            Self::Closed => write!(f, "Asset cache has been torn down"),
        }
    }
}

impl std::error::Error for AssetError {}

/// Errors raised by the [`SimpleResourceLoader`](super::SimpleResourceLoader)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The path was empty or only whitespace
    InvalidPath,
    /// No resource exists at the path
    NotFound {
        /// Requested resource path
        path: String,
    },
    /// An asynchronous load was requested without a completion callback
    NullCallback,
    /// The cached resource has a different type than requested
    TypeMismatch {
        /// Requested resource path
        path: String,
        /// Type the caller asked for
        expected: &'static str,
    },
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath => write!(f, "Resource path cannot be null or empty"),
            Self::NotFound { path } => write!(f, "Failed to load asset at path '{path}'"),
            Self::NullCallback => write!(f, "Asynchronous load requires a completion callback"),
            Self::TypeMismatch { path, expected } => {
                write!(f, "Resource at '{path}' is not of type {expected}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Check that an identifier has at least one non-whitespace character
pub(crate) fn is_blank(identifier: &str) -> bool {
    identifier.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_identifiers() {
        assert!(is_blank(""));
        assert!(is_blank("   \t\n"));
        assert!(!is_blank(" icons/sword "));
    }

    #[test]
    fn test_display_includes_identifier() {
        let err = ResourceError::NotFound {
            path: "icons/sword".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load asset at path 'icons/sword'");

        let err = AssetError::LoadFailure {
            key: "brick_texture".to_string(),
        };
        assert!(err.to_string().contains("brick_texture"));
    }
}
