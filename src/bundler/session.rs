//! Incremental build handles
//!
//! A development build keeps its [`Bundler`] alive behind a handle so the
//! watch loop can rebuild cheaply and the lifecycle manager can release it.

use std::sync::Arc;

use async_trait::async_trait;

use super::{BuildOutput, Bundler};
use crate::error::BuildError;

/// Something that can be rebuilt on change and disposed at shutdown
#[async_trait]
pub trait IncrementalBuild: Send + Sync {
    /// Rebuild with the original options, writing to the same outputs
    async fn rebuild(&self) -> Result<BuildOutput, BuildError>;

    /// Release the build's resources; calling it again is a no-op
    fn dispose(&self);
}

/// Handle returned by an incremental build
#[derive(Clone)]
pub struct BuildHandle {
    bundler: Arc<Bundler>,
}

impl BuildHandle {
    pub(super) fn new(bundler: Arc<Bundler>) -> Self {
        Self { bundler }
    }

    pub fn is_disposed(&self) -> bool {
        self.bundler.is_disposed()
    }
}

#[async_trait]
impl IncrementalBuild for BuildHandle {
    async fn rebuild(&self) -> Result<BuildOutput, BuildError> {
        self.bundler.build().await
    }

    fn dispose(&self) {
        self.bundler.dispose();
    }
}

impl std::fmt::Debug for BuildHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
