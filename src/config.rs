//! Build configuration handed to backend compilers.
//!
//! Host compiler names and include/library directories for the array
//! library and the native/accelerator toolchain. A value is built once
//! (defaults or a JSON file) and passed by reference into the backend;
//! nothing else reads it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read build configuration '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid build configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Host C++ compiler, e.g. `/usr/bin/g++-12`
    pub cxx: String,
    /// Host C compiler
    pub cc: String,
    pub boost_inc_dir: Option<PathBuf>,
    pub boost_lib_dir: Option<PathBuf>,
    /// Must match the compiler the host interpreter was built with
    pub boost_python_libname: String,
    pub cuda_inc_dir: Option<PathBuf>,
    pub cuda_lib_dir: Option<PathBuf>,
    /// Numeric-array library headers
    pub np_inc_dir: Option<PathBuf>,
    pub tbb_inc_dir: Option<PathBuf>,
    pub tbb_lib_dir: Option<PathBuf>,
    pub thrust_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cxx: "g++".to_string(),
            cc: "gcc".to_string(),
            boost_inc_dir: None,
            boost_lib_dir: None,
            boost_python_libname: "boost_python".to_string(),
            cuda_inc_dir: Some(PathBuf::from("/usr/local/cuda/include")),
            cuda_lib_dir: Some(PathBuf::from("/usr/local/cuda/lib64")),
            np_inc_dir: Some(PathBuf::from("/usr/lib/python3/dist-packages/numpy/core/include")),
            tbb_inc_dir: None,
            tbb_lib_dir: None,
            thrust_dir: Some(PathBuf::from("/usr/local/cuda/include/thrust")),
        }
    }
}

impl BuildConfig {
    /// Load a configuration file; keys it leaves out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Stable `key=value` lines describing the toolchain, used for hashing.
    pub fn fingerprint(&self) -> Vec<String> {
        fn dir(path: &Option<PathBuf>) -> String {
            path.as_ref().map(|p| p.display().to_string()).unwrap_or_default()
        }

        vec![
            format!("cxx={}", self.cxx),
            format!("cc={}", self.cc),
            format!("boost_inc_dir={}", dir(&self.boost_inc_dir)),
            format!("boost_lib_dir={}", dir(&self.boost_lib_dir)),
            format!("boost_python_libname={}", self.boost_python_libname),
            format!("cuda_inc_dir={}", dir(&self.cuda_inc_dir)),
            format!("cuda_lib_dir={}", dir(&self.cuda_lib_dir)),
            format!("np_inc_dir={}", dir(&self.np_inc_dir)),
            format!("tbb_inc_dir={}", dir(&self.tbb_inc_dir)),
            format!("tbb_lib_dir={}", dir(&self.tbb_lib_dir)),
            format!("thrust_dir={}", dir(&self.thrust_dir)),
        ]
    }
}
