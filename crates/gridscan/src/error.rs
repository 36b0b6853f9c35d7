use std::fmt;

/// Shader stage named in compile diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures the pipeline reports to the lifecycle manager.
///
/// None of these reach the host: the lifecycle logs them and degrades to an
/// absent effect.
#[derive(Debug, thiserror::Error)]
pub enum GridScanError {
    #[error("GPU context unavailable: {0}")]
    ContextUnavailable(String),
    #[error("{stage} shader failed to compile: {message}")]
    ShaderCompile {
        stage: ShaderStageKind,
        message: String,
    },
    #[error("shader program failed to link: {0}")]
    ShaderLink(String),
    #[error("ignoring degenerate resize to {width}x{height}")]
    DegenerateResize { width: f64, height: f64 },
    #[error("presentation surface lost or outdated")]
    SurfaceLost,
    #[error("GPU ran out of memory")]
    OutOfMemory,
}

impl GridScanError {
    /// True for failures that must tear the effect down instead of skipping a frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GridScanError::DegenerateResize { .. } | GridScanError::SurfaceLost
        )
    }
}
