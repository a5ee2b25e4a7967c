use std::fs;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::fcntl::{self, FcntlArg};
use nix::unistd;
use tracing::{debug, error};

use crate::error::{ShellError, ShellResult};
use crate::types::{OpenMode, Redirect};

/// Opens the file backing a redirect. Output targets are created with
/// mode 0666 (before umask) and truncated.
pub fn open_target(redirect: &Redirect) -> ShellResult<OwnedFd> {
	let mut oopt = fs::OpenOptions::new();
	let _ = match redirect.mode {
		OpenMode::ReadOnly => oopt.read(true),
		OpenMode::WriteCreateTruncate => oopt.write(true).create(true).truncate(true),
	};
	let file = oopt.open(&redirect.target).map_err(|e| ShellError::RedirectTargetUnavailable {
		path: redirect.target.clone(),
		source: e,
	})?;
	Ok(OwnedFd::from(file))
}

const SAVED_FD_MIN: RawFd = 10;

#[derive(Debug, PartialEq, Eq)]
struct PendingFdRestore {
	saved: RawFd,
	affected: RawFd,
}

/// Redirections the shell applied to its own descriptors. Each entry keeps
/// a duplicate of the original binding until `restore` puts it back.
#[derive(Debug, Default)]
pub struct RestoreList {
	pending: Vec<PendingFdRestore>,
}

impl RestoreList {
	pub fn new() -> RestoreList {
		RestoreList { pending: vec![] }
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Binds `target` onto `affected` after saving the current binding.
	/// `target` is closed once it has been duplicated. The saved copy is
	/// close-on-exec and kept above the low descriptors, so children spawned
	/// while the redirect is active never inherit it.
	pub fn apply(&mut self, affected: RawFd, target: OwnedFd) -> ShellResult<()> {
		let saved = fcntl::fcntl(affected, FcntlArg::F_DUPFD_CLOEXEC(SAVED_FD_MIN))
			.map_err(|e| ShellError::FdRestoreFailed { fd: affected, source: e })?;
		if let Err(e) = unistd::dup2(target.as_raw_fd(), affected) {
			let _ = unistd::close(saved);
			return Err(ShellError::FdRestoreFailed { fd: affected, source: e });
		}
		debug!(affected, saved, "redirected shell descriptor");
		self.pending.push(PendingFdRestore { saved: saved, affected: affected });
		Ok(())
	}

	/// Puts every saved binding back and closes the saved duplicates. The
	/// list is empty afterwards even if a step fails.
	pub fn restore(&mut self) -> ShellResult<()> {
		let mut result = Ok(());
		for entry in self.pending.drain(..).rev() {
			let r = unistd::dup2(entry.saved, entry.affected).and_then(|_| unistd::close(entry.saved));
			if let Err(e) = r {
				let _ = unistd::close(entry.saved);
				if result.is_ok() {
					result = Err(ShellError::FdRestoreFailed { fd: entry.affected, source: e });
				}
			} else {
				debug!(affected = entry.affected, "restored shell descriptor");
			}
		}
		result
	}
}

impl Drop for RestoreList {
	fn drop(&mut self) {
		if !self.pending.is_empty() {
			if let Err(e) = self.restore() {
				error!("{}", e);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs::File;
	use std::io::{Read, Write};

	fn write_through(mut stream: &File, data: &[u8]) {
		stream.write_all(data).unwrap();
	}

	#[test]
	fn open_missing_input_fails() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.txt");
		match open_target(&Redirect::input(missing.to_str().unwrap())) {
			Err(ShellError::RedirectTargetUnavailable { path, .. }) => assert!(path.ends_with("missing.txt")),
			r => panic!("unexpected {:?}", r),
		}
	}

	#[test]
	fn open_output_truncates() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out.txt");
		fs::write(&path, b"old contents").unwrap();
		let fd = open_target(&Redirect::output(path.to_str().unwrap())).unwrap();
		drop(fd);
		assert_eq!(fs::read(&path).unwrap(), b"");
	}

	#[test]
	fn apply_then_restore() {
		let dir = tempfile::tempdir().unwrap();
		let original = dir.path().join("original.txt");
		let first = dir.path().join("first.txt");
		let second = dir.path().join("second.txt");

		// stands in for the shell's stdout
		let stream = File::create(&original).unwrap();
		let fd = stream.as_raw_fd();
		let mut list = RestoreList::new();

		for (path, data) in &[(&first, b"one\n"), (&second, b"two\n")] {
			let target = open_target(&Redirect::output(path.to_str().unwrap())).unwrap();
			list.apply(fd, target).unwrap();
			assert!(!list.is_empty());
			write_through(&stream, *data);
			list.restore().unwrap();
			assert!(list.is_empty());
		}
		write_through(&stream, b"three\n");
		drop(stream);

		let mut s = String::new();
		File::open(&original).unwrap().read_to_string(&mut s).unwrap();
		assert_eq!(s, "three\n");
		assert_eq!(fs::read_to_string(&first).unwrap(), "one\n");
		assert_eq!(fs::read_to_string(&second).unwrap(), "two\n");
	}

	#[test]
	fn saved_copy_is_close_on_exec() {
		let dir = tempfile::tempdir().unwrap();
		let stream = File::create(dir.path().join("original.txt")).unwrap();
		let other = dir.path().join("other.txt");
		let mut list = RestoreList::new();
		let target = open_target(&Redirect::output(other.to_str().unwrap())).unwrap();
		list.apply(stream.as_raw_fd(), target).unwrap();

		let saved = list.pending[0].saved;
		assert!(saved >= SAVED_FD_MIN);
		let flags = fcntl::fcntl(saved, FcntlArg::F_GETFD).unwrap();
		assert!(fcntl::FdFlag::from_bits_truncate(flags).contains(fcntl::FdFlag::FD_CLOEXEC));
		// the redirected descriptor itself stays inheritable
		let flags = fcntl::fcntl(stream.as_raw_fd(), FcntlArg::F_GETFD).unwrap();
		assert!(!fcntl::FdFlag::from_bits_truncate(flags).contains(fcntl::FdFlag::FD_CLOEXEC));
		list.restore().unwrap();
	}

	#[test]
	fn drop_restores_pending() {
		let dir = tempfile::tempdir().unwrap();
		let original = dir.path().join("original.txt");
		let other = dir.path().join("other.txt");
		let mut stream = File::create(&original).unwrap();
		{
			let mut list = RestoreList::new();
			let target = open_target(&Redirect::output(other.to_str().unwrap())).unwrap();
			list.apply(stream.as_raw_fd(), target).unwrap();
		}
		stream.write_all(b"back\n").unwrap();
		drop(stream);
		assert_eq!(fs::read_to_string(&original).unwrap(), "back\n");
		assert_eq!(fs::read_to_string(&other).unwrap(), "");
	}
}
