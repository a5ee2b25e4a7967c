use std::fmt;

use nix::errno::Errno;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, Pid};
use tracing::{debug, warn};

use crate::error::{ShellError, ShellResult};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Stopped, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
	fn code(self) -> Option<i32>;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) => State::Terminated,
			WaitStatus::Signaled(..) => State::Terminated,
			WaitStatus::Stopped(..) => State::Stopped,
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceEvent(..) => State::Stopped,
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceSyscall(..) => State::Stopped,
			WaitStatus::Continued(..) => State::Active,
			WaitStatus::StillAlive => State::Active,
		}
	}

	/// Shell-style status: the exit code, or 128 plus the signal number.
	fn code(self) -> Option<i32> {
		match self {
			WaitStatus::Exited(_, code) => Some(code),
			WaitStatus::Signaled(_, sig, _) => Some(128 + sig as i32),
			_ => None,
		}
	}
}

/// Collects the children forked for one pipeline, in spawn order.
#[derive(Debug, Default)]
pub struct JobBuilder {
	pids: Vec<Pid>,
}

impl JobBuilder {
	pub fn new(size_hint: usize) -> JobBuilder {
		JobBuilder { pids: Vec::with_capacity(size_hint) }
	}

	/// # Safety
	/// The child must only call async-signal-safe functions until it execs
	/// or exits.
	pub unsafe fn push_fork(&mut self) -> ShellResult<unistd::ForkResult> {
		let r = unistd::fork().map_err(ShellError::ForkFailed)?;
		if let unistd::ForkResult::Parent { child } = r {
			debug!(pid = child.as_raw(), "forked");
			self.pids.push(child);
		}
		Ok(r)
	}

	pub fn pids(&self) -> &[Pid] {
		&self.pids
	}

	pub fn last(&self) -> Option<Pid> {
		self.pids.last().copied()
	}
}

fn wait_terminated(pid: Pid) -> Option<WaitStatus> {
	loop {
		match wait::waitpid(pid, None) {
			Ok(status) if status.state() == State::Terminated => { return Some(status); },
			Ok(_) | Err(Errno::EINTR) => {},
			Err(e) => {
				warn!(pid = pid.as_raw(), "waitpid: {}", e);
				return None;
			},
		}
	}
}

/// Blocks until every pid has terminated. Returns the status of the last one.
pub fn reap_all(pids: &[Pid]) -> Option<WaitStatus> {
	let mut last = None;
	for &pid in pids {
		last = wait_terminated(pid);
		debug!(pid = pid.as_raw(), status = ?last, "reaped");
	}
	last
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Job {
	pub pid: Pid,
	pub command_line: String,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct JobStatus {
	pub pid: Pid,
	pub command_line: String,
	pub state: State,
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let state = match self.state {
			State::Active => "running",
			State::Stopped => "stopped",
			State::Terminated => "done",
		};
		write!(f, "pid: {} || cmd: {} || status: {}", self.pid, self.command_line, state)
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum JobReport {
	NoBackgroundProcesses,
	Running(Vec<JobStatus>),
}

impl fmt::Display for JobReport {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			JobReport::NoBackgroundProcesses => writeln!(f, "No background processes"),
			JobReport::Running(ref jobs) => {
				for job in jobs {
					writeln!(f, "{}", job)?;
				}
				Ok(())
			},
		}
	}
}

/// Background jobs, in launch order. Only the final stage of a background
/// pipeline is tracked; earlier stages are neither awaited nor reported.
#[derive(Debug, Default)]
pub struct JobTracker {
	jobs: Vec<Job>,
}

impl JobTracker {
	pub fn new() -> JobTracker {
		JobTracker { jobs: vec![] }
	}

	pub fn track(&mut self, pid: Pid, command_line: &str) {
		debug!(pid = pid.as_raw(), command_line, "tracking background job");
		self.jobs.push(Job { pid: pid, command_line: command_line.to_owned() });
	}

	fn poll(pid: Pid) -> Option<State> {
		match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
			Ok(status) => Some(status.state()).filter(|&s| s != State::Terminated),
			Err(Errno::ECHILD) => None,
			Err(e) => {
				warn!(pid = pid.as_raw(), "waitpid: {}", e);
				None
			},
		}
	}

	/// Reaps finished jobs and reports the rest.
	pub fn report_and_reap(&mut self) -> JobReport {
		let mut running = vec![];
		self.jobs.retain(|job| {
			match JobTracker::poll(job.pid) {
				Some(state) => {
					running.push(JobStatus { pid: job.pid, command_line: job.command_line.clone(), state: state });
					true
				},
				None => {
					debug!(pid = job.pid.as_raw(), "background job finished");
					false
				},
			}
		});
		if running.is_empty() {
			JobReport::NoBackgroundProcesses
		} else {
			JobReport::Running(running)
		}
	}
}
