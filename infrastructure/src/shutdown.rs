//! Sentinel-file shutdown signal
//!
//! The challenge stops issuing questions once a file with the configured
//! name exists. Operators create it (`touch shutdown`) to wind the run
//! down without killing the process; in-flight rounds still drain.

use gauntlet_application::ShutdownSignal;
use std::path::{Path, PathBuf};

pub struct SentinelFileShutdown {
    path: PathBuf,
}

impl SentinelFileShutdown {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl ShutdownSignal for SentinelFileShutdown {
    fn is_signaled(&self) -> bool {
        self.path.exists()
    }
}
