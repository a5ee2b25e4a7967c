use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{ShellError, ShellResult};

/// Append-only log of executed command lines, one per record.
#[derive(Debug)]
pub struct History {
	file: File,
}

impl History {
	pub fn open(path: &Path, truncate: bool) -> ShellResult<History> {
		let file = OpenOptions::new()
			.read(true)
			.append(true)
			.create(true)
			.open(path)
			.and_then(|f| {
				if truncate {
					f.set_len(0)?;
				}
				Ok(f)
			})
			.map_err(ShellError::HistoryUnavailable)?;
		debug!(path = %path.display(), truncate, "opened history");
		Ok(History { file: file })
	}

	pub fn append(&mut self, line: &str) -> ShellResult<()> {
		writeln!(self.file, "{}", line.trim_end_matches(&['\n', '\r'][..]))
			.and_then(|_| self.file.flush())
			.map_err(ShellError::HistoryUnavailable)
	}

	pub fn read_all(&mut self) -> ShellResult<Vec<String>> {
		let read = |file: &mut File| -> io::Result<Vec<String>> {
			file.seek(SeekFrom::Start(0))?;
			BufReader::new(file).lines().collect()
		};
		read(&mut self.file).map_err(ShellError::HistoryUnavailable)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn append_and_read_back() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("history.txt");
		let mut h = History::open(&path, true).unwrap();
		assert!(h.read_all().unwrap().is_empty());
		h.append("ls -l\n").unwrap();
		h.append("cd /tmp").unwrap();
		assert_eq!(h.read_all().unwrap(), vec!["ls -l", "cd /tmp"]);
		// reading does not disturb appends
		h.append("myjobs").unwrap();
		assert_eq!(h.read_all().unwrap(), vec!["ls -l", "cd /tmp", "myjobs"]);
		assert_eq!(fs::read_to_string(&path).unwrap(), "ls -l\ncd /tmp\nmyjobs\n");
	}

	#[test]
	fn truncate_or_keep() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("history.txt");
		fs::write(&path, "old\n").unwrap();
		assert_eq!(History::open(&path, false).unwrap().read_all().unwrap(), vec!["old"]);
		assert!(History::open(&path, true).unwrap().read_all().unwrap().is_empty());
	}

	#[test]
	fn unopenable_path() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("no-such-dir").join("history.txt");
		match History::open(&path, true) {
			Err(e) => assert!(e.is_fatal()),
			Ok(_) => panic!("opened {:?}", path),
		}
	}
}
