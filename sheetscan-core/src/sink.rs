use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Marker for lines the result file ignores on reload
pub const COMMENT_MARKER: char = '#';

/// Append-only destination for discovered match paths
pub trait MatchSink {
    /// Durably record one path before returning
    fn append(&mut self, path: &str) -> io::Result<()>;

    /// Paths recorded by previous runs
    fn load_existing(&self) -> io::Result<HashSet<String>>;
}

/// Line-oriented text file of match paths
///
/// Every append is written and synced immediately, so a path survives a
/// crash even if the checkpoint covering its file was never flushed.
#[derive(Debug)]
pub struct PathSink {
    path: PathBuf,
    file: File,
}

impl PathSink {
    /// Open (or create) a result file for appending.
    ///
    /// A new file starts with a comment header naming `title`.
    pub fn open(path: impl Into<PathBuf>, title: &str) -> io::Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len == 0 {
            let header = format!("{COMMENT_MARKER} {title}\n{COMMENT_MARKER} Format: path\n");
            file.write_all(header.as_bytes())?;
            file.sync_data()?;
        } else if !ends_with_newline(&mut file, len)? {
            // A kill mid-append left a partial last line; terminate it
            file.write_all(b"\n")?;
            file.sync_data()?;
        }

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MatchSink for PathSink {
    fn append(&mut self, path: &str) -> io::Result<()> {
        // One write per line, so a kill never splits a path from its newline
        self.file.write_all(format!("{path}\n").as_bytes())?;
        self.file.sync_data()
    }

    fn load_existing(&self) -> io::Result<HashSet<String>> {
        read_paths(&self.path)
    }
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read the recorded paths from a result file; a missing file yields none
pub fn read_paths(path: &Path) -> io::Result<HashSet<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e),
    };

    let mut paths = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() && !line.starts_with(COMMENT_MARKER) {
            paths.insert(line.to_string());
        }
    }
    Ok(paths)
}
