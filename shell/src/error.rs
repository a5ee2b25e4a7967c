use std::io;

use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
	/// Bad input line. Reported, the line is dropped.
	Parse,
	/// Pipe, fork or file-open failure. Nothing of the line runs.
	Resource,
	/// Lookup or built-in failure.
	Dispatch,
	/// The shell's own descriptor table or history may be inconsistent.
	Fatal,
}

#[derive(Debug, Error)]
pub enum ShellError {
	#[error("syntax error near '|': empty command in pipeline")]
	MalformedPipeline,
	#[error("missing file name after '{0}'")]
	MissingRedirectTarget(&'static str),
	#[error("argument contains a NUL byte: {0:?}")]
	NulInArgument(String),
	#[error("{path}: {source}")]
	RedirectTargetUnavailable { path: String, source: io::Error },
	#[error("pipe: {0}")]
	PipeAllocationFailed(nix::Error),
	#[error("fork: {0}")]
	ForkFailed(nix::Error),
	#[error("{0}: command not found")]
	CommandNotFound(String),
	#[error("{0}: missing argument")]
	MissingArgument(&'static str),
	#[error("cd: {dir}: {source}")]
	DirectoryChangeFailed { dir: String, source: nix::Error },
	#[error("failed to restore fd {fd}: {source}")]
	FdRestoreFailed { fd: i32, source: nix::Error },
	#[error("history: {0}")]
	HistoryUnavailable(io::Error),
}

impl ShellError {
	pub fn kind(&self) -> ErrorKind {
		match *self {
			ShellError::MalformedPipeline
			| ShellError::MissingRedirectTarget(_)
			| ShellError::NulInArgument(_) => ErrorKind::Parse,
			ShellError::RedirectTargetUnavailable { .. }
			| ShellError::PipeAllocationFailed(_)
			| ShellError::ForkFailed(_) => ErrorKind::Resource,
			ShellError::CommandNotFound(_)
			| ShellError::MissingArgument(_)
			| ShellError::DirectoryChangeFailed { .. } => ErrorKind::Dispatch,
			ShellError::FdRestoreFailed { .. }
			| ShellError::HistoryUnavailable(_) => ErrorKind::Fatal,
		}
	}

	pub fn is_fatal(&self) -> bool {
		self.kind() == ErrorKind::Fatal
	}
}

pub type ShellResult<T> = Result<T, ShellError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_follow_taxonomy() {
		assert_eq!(ShellError::MalformedPipeline.kind(), ErrorKind::Parse);
		assert_eq!(ShellError::MissingRedirectTarget(">").kind(), ErrorKind::Parse);
		assert_eq!(ShellError::PipeAllocationFailed(nix::Error::EMFILE).kind(), ErrorKind::Resource);
		assert_eq!(ShellError::CommandNotFound("nope".into()).kind(), ErrorKind::Dispatch);
		assert_eq!(ShellError::MissingArgument("cd").kind(), ErrorKind::Dispatch);
		assert!(ShellError::FdRestoreFailed { fd: 1, source: nix::Error::EBADF }.is_fatal());
		assert!(!ShellError::ForkFailed(nix::Error::EAGAIN).is_fatal());
	}

	#[test]
	fn messages() {
		assert_eq!(ShellError::CommandNotFound("frob".into()).to_string(), "frob: command not found");
		assert_eq!(ShellError::MissingArgument("cd").to_string(), "cd: missing argument");
		assert_eq!(ShellError::MissingRedirectTarget("<").to_string(), "missing file name after '<'");
	}
}
