use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::{fcntl, unistd};

use crate::error::{ShellError, ShellResult};

/// The N-1 pipes joining N stages. Pipe `i` carries stage `i`'s output to
/// stage `i+1`'s input. Every end is close-on-exec, so a stage only keeps
/// the ends it duplicated onto its standard streams.
#[derive(Debug)]
pub struct Topology {
	pipes: Vec<(OwnedFd, OwnedFd)>,
}

impl Topology {
	pub fn build(stage_count: usize) -> ShellResult<Topology> {
		let count = stage_count.saturating_sub(1);
		let mut pipes = Vec::with_capacity(count);
		for _ in 0 .. count {
			// on failure the pipes built so far are dropped, hence closed
			let pipe = unistd::pipe2(fcntl::OFlag::O_CLOEXEC).map_err(ShellError::PipeAllocationFailed)?;
			pipes.push(pipe);
		}
		Ok(Topology { pipes: pipes })
	}

	/// Read end stage `i` takes as its standard input.
	pub fn stdin_for(&self, i: usize) -> Option<RawFd> {
		if i == 0 {
			None
		} else {
			self.pipes.get(i - 1).map(|(r, _)| r.as_raw_fd())
		}
	}

	/// Write end stage `i` takes as its standard output.
	pub fn stdout_for(&self, i: usize) -> Option<RawFd> {
		self.pipes.get(i).map(|(_, w)| w.as_raw_fd())
	}

	pub fn endpoints(&self) -> impl Iterator<Item = RawFd> + '_ {
		self.pipes.iter().flat_map(|(r, w)| vec![r.as_raw_fd(), w.as_raw_fd()])
	}

	/// Closes every endpoint in the calling process.
	pub fn close_all(self) {
		drop(self.pipes);
	}
}
