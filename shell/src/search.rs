use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use nix::unistd::{self, AccessFlags};

use crate::error::{ShellError, ShellResult};

const PATH_KEY: &str = "PATH";

fn is_executable(path: &Path) -> bool {
	path.is_file() && unistd::access(path, AccessFlags::X_OK).is_ok()
}

/// Finds the executable for `name`: the name itself first, then each
/// directory of `path_list` in order.
pub fn resolve_in(name: &str, path_list: Option<&OsStr>) -> ShellResult<PathBuf> {
	let direct = Path::new(name);
	if is_executable(direct) {
		return Ok(direct.to_path_buf());
	}
	if !name.contains('/') {
		if let Some(list) = path_list.filter(|l| !l.is_empty()) {
			for dir in env::split_paths(list) {
				let candidate = dir.join(name);
				if is_executable(&candidate) {
					return Ok(candidate);
				}
			}
		}
	}
	Err(ShellError::CommandNotFound(name.to_owned()))
}

pub fn resolve(name: &str) -> ShellResult<PathBuf> {
	let path_list = env::var_os(PATH_KEY);
	resolve_in(name, path_list.as_deref())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use std::os::unix::fs::PermissionsExt;

	fn make_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
		let path = dir.join(name);
		fs::write(&path, b"#!/bin/sh\n").unwrap();
		fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
		path
	}

	#[test]
	fn first_match_in_list_order_wins() {
		let a = tempfile::tempdir().unwrap();
		let b = tempfile::tempdir().unwrap();
		make_file(a.path(), "tool", 0o644);
		let in_b = make_file(b.path(), "tool", 0o755);
		let c = tempfile::tempdir().unwrap();
		make_file(c.path(), "tool", 0o755);

		let list = env::join_paths(&[a.path(), b.path(), c.path()]).unwrap();
		assert_eq!(resolve_in("tool", Some(list.as_os_str())).unwrap(), in_b);
	}

	#[test]
	fn direct_path() {
		let dir = tempfile::tempdir().unwrap();
		let tool = make_file(dir.path(), "tool", 0o755);
		assert_eq!(resolve_in(tool.to_str().unwrap(), None).unwrap(), tool);
	}

	#[test]
	fn unset_or_empty_path_is_not_found() {
		for list in &[None, Some(OsStr::new(""))] {
			match resolve_in("ish-no-such-command", *list) {
				Err(ShellError::CommandNotFound(name)) => assert_eq!(name, "ish-no-such-command"),
				r => panic!("unexpected {:?}", r),
			}
		}
	}

	#[test]
	fn directories_are_not_commands() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir(dir.path().join("sub")).unwrap();
		let list = dir.path().as_os_str();
		assert!(resolve_in("sub", Some(list)).is_err());
	}
}
