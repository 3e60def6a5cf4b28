/// Artifact writer - persists compiled variants to disk
///
/// Output layout for a root directory `root`:
///
/// ```text
/// root/<source file>          provenance copy, only when a source path is given
/// root/<name>/<name>.py       interpreted variant
/// root/<name>/<name>.cpp      native variant
/// root/<name>/<name>.cu       accelerator variant
/// ```
///
/// Directories are created check-then-create and existing files are
/// overwritten, so persisting the same callables twice yields the same tree.
/// The writer assumes it is the only process touching `root`.
use crate::manifest::{CompiledCallable, VariantTag};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    working_dir: PathBuf,
    preferred: Option<VariantTag>,
}

impl Default for ArtifactWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactWriter {
    /// Writer rooted at the process working directory.
    pub fn new() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            preferred: None,
        }
    }

    /// Use `dir` instead of the working directory when no source path is given.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: dir.into(),
            preferred: None,
        }
    }

    pub fn prefer(mut self, tag: impl Into<VariantTag>) -> Self {
        self.preferred = Some(tag.into());
        self
    }

    /// Root directory for a persist call: the source path minus its
    /// extension, or the working directory.
    pub fn destination_root(&self, source_path: Option<&Path>) -> PathBuf {
        match source_path {
            Some(path) => path.with_extension(""),
            None => self.working_dir.clone(),
        }
    }

    pub fn persist<C: CompiledCallable>(
        &self,
        callables: &BTreeMap<String, C>,
        source_path: Option<&Path>,
    ) -> IoResult<()> {
        let root = self.destination_root(source_path);
        ensure_dir(&root)?;

        if let Some(source) = source_path {
            let file_name = source.file_name().ok_or_else(|| {
                IoError::new(
                    ErrorKind::InvalidInput,
                    format!("source path '{}' has no file name", source.display()),
                )
            })?;
            fs::copy(source, root.join(file_name))?;
            debug!(source = %source.display(), root = %root.display(), "copied source for provenance");
        }

        for (name, callable) in callables {
            let Some((tag, bundle)) = callable.code().select(self.preferred.as_ref()) else {
                warn!(callable = %name, "no compiled variants, skipping");
                continue;
            };

            let dir = root.join(name);
            ensure_dir(&dir)?;

            let mut written = Vec::with_capacity(3);
            for (extension, source) in bundle.files() {
                let path = dir.join(format!("{}{}", name, extension));
                let mut file = File::create(&path)?;
                file.write_all(source.as_bytes())?;
                written.push(path);
            }

            debug!(callable = %name, files = ?written, "wrote variant files");
            info!(callable = %name, variant = %tag, dir = %dir.display(), "persisted");
        }

        Ok(())
    }
}

/// Persist `callables` with a default writer rooted at the working directory.
pub fn persist<C: CompiledCallable>(callables: &BTreeMap<String, C>, source_path: Option<&Path>) -> IoResult<()> {
    ArtifactWriter::new().persist(callables, source_path)
}

fn ensure_dir(path: &Path) -> IoResult<()> {
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
