use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Result;

use crate::errors::HarnessError;

pub const RESULTS_DIR_NAME: &str = "Results";

/// rwxr-xr-x, for both directories and result files.
const RESULT_MODE: u32 = 0o755;

/// Owns `<benchmark-dir>/Results` and the per-allocator directories below it.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Ensure `<benchmark_dir>/Results` exists. Fails if something other than
    /// a directory already sits at that path.
    pub fn open(benchmark_dir: &Path) -> Result<Self> {
        let root = benchmark_dir.join(RESULTS_DIR_NAME);
        ensure_dir(&root)?;
        Ok(ResultStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allocator_dir(&self, allocator: &str) -> PathBuf {
        self.root.join(allocator)
    }

    /// `Results/<allocator>/<benchmark>-<threads>`
    pub fn result_path(&self, allocator: &str, benchmark: &str, threads: u32) -> PathBuf {
        self.allocator_dir(allocator)
            .join(format!("{}-{}", benchmark, threads))
    }

    pub fn ensure_allocator_dir(&self, allocator: &str) -> Result<PathBuf> {
        let dir = self.allocator_dir(allocator);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    /// Open (truncating) the result file for one (allocator, threads) pair.
    pub fn open_result_file(
        &self,
        allocator: &str,
        benchmark: &str,
        threads: u32,
    ) -> Result<ResultFile> {
        let path = self.result_path(allocator, benchmark, threads);

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(RESULT_MODE);
        }

        let file = options
            .open(&path)
            .map_err(|source| HarnessError::OpenResultError {
                path: path.clone(),
                source,
            })?;

        Ok(ResultFile { path, file })
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(HarnessError::ResultsNotDirectory {
                path: path.to_path_buf(),
            }
            .into());
        }
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(RESULT_MODE);
    }

    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(HarnessError::CreateDirError {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}

/// Open handle on one result file. Dropping it closes the file, so every
/// exit path out of a thread-count loop releases it.
#[derive(Debug)]
pub struct ResultFile {
    path: PathBuf,
    file: File,
}

impl ResultFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stdout and stderr for a child, both writing into this file.
    pub fn child_stdio(&self) -> Result<(Stdio, Stdio)> {
        let stdout = self.duplicate()?;
        let stderr = self.duplicate()?;
        Ok((Stdio::from(stdout), Stdio::from(stderr)))
    }

    fn duplicate(&self) -> Result<File> {
        self.file
            .try_clone()
            .map_err(|source| self.write_error(source).into())
    }

    /// Append one line and flush it to the file.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.file, "{}", line)
            .and_then(|()| self.file.flush())
            .map_err(|source| self.write_error(source))?;
        Ok(())
    }

    /// Flush and close.
    pub fn close(mut self) -> Result<()> {
        self.file.flush().map_err(|source| self.write_error(source))?;
        Ok(())
    }

    fn write_error(&self, source: io::Error) -> HarnessError {
        HarnessError::WriteResultError {
            path: self.path.clone(),
            source,
        }
    }
}
