use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;

use nix::errno::Errno;
use nix::unistd::{self, ForkResult, Pid};
use tracing::debug;

use crate::builtin;
use crate::error::{ShellError, ShellResult};
use crate::expand;
use crate::global;
use crate::job::{self, JobBuilder, WaitStatusExt};
use crate::parser;
use crate::redirect::{self, RestoreList};
use crate::search;
use crate::topology::Topology;
use crate::types::*;

#[derive(Debug, PartialEq, Eq)]
pub enum EvalResult {
	/// Blank line.
	Empty,
	/// `exit` was entered.
	Exit,
	/// Foreground pipeline or built-in finished, with the last stage's status.
	Done(Option<i32>),
	/// Background pipeline started; the pid of its last stage is tracked.
	Background(Pid),
}

/// Redirect targets of one stage, opened before anything is spawned.
#[derive(Debug, Default)]
struct StageFds {
	input: Option<OwnedFd>,
	output: Option<OwnedFd>,
}

impl StageFds {
	fn open(stage: &Stage) -> ShellResult<StageFds> {
		let mut fds = StageFds::default();
		for r in stage.redirects() {
			let fd = redirect::open_target(r)?;
			match r.stream {
				StdStream::Stdin => fds.input = Some(fd),
				StdStream::Stdout => fds.output = Some(fd),
			}
		}
		Ok(fds)
	}

	fn raw_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
		self.input.iter().chain(self.output.iter()).map(|fd| fd.as_raw_fd())
	}
}

/// A resolved program image with its argv, built before forking so the
/// child does not allocate.
#[derive(Debug)]
struct Exec {
	path: CString,
	argv: Vec<CString>,
}

impl Exec {
	fn prepare(stage: &Stage) -> ShellResult<Exec> {
		let cstring = |s: &[u8]| CString::new(s).map_err(|_| ShellError::NulInArgument(String::from_utf8_lossy(s).into_owned()));
		let path = search::resolve(&stage.program)?;
		let path = cstring(path.as_os_str().as_bytes())?;
		let mut argv = Vec::with_capacity(stage.arguments.len() + 1);
		argv.push(cstring(stage.program.as_bytes())?);
		for arg in &stage.arguments {
			argv.push(cstring(arg.as_bytes())?);
		}
		Ok(Exec { path: path, argv: argv })
	}
}

fn child_fail(what: &CString, e: Errno, code: i32) -> ! {
	let _ = writeln!(&mut io::stderr(), "ish: {}: {}", what.to_string_lossy(), e);
	unsafe { libc::_exit(code) }
}

/// Runs in the forked child for stage `i`; never returns to shell logic.
fn exec_stage(i: usize, topology: &Topology, fds: &[StageFds], exec: &Exec) -> ! {
	let bind = |from: RawFd, to: RawFd| {
		if let Err(e) = unistd::dup2(from, to) {
			child_fail(&exec.argv[0], e, 126);
		}
	};
	if let Some(r) = topology.stdin_for(i) {
		bind(r, StdStream::Stdin.fd());
	}
	if let Some(w) = topology.stdout_for(i) {
		bind(w, StdStream::Stdout.fd());
	}
	if let Some(own) = fds.get(i) {
		if let Some(ref fd) = own.input {
			bind(fd.as_raw_fd(), StdStream::Stdin.fd());
		}
		if let Some(ref fd) = own.output {
			bind(fd.as_raw_fd(), StdStream::Stdout.fd());
		}
	}
	// the child never runs destructors, so close by number
	for fd in topology.endpoints().chain(fds.iter().flat_map(|f| f.raw_fds())) {
		let _ = unistd::close(fd);
	}
	let e = match unistd::execv(&exec.path, &exec.argv) {
		Err(e) => e,
		Ok(never) => match never {},
	};
	let code = if e == Errno::ENOENT { 127 } else { 126 };
	child_fail(&exec.path, e, code)
}

fn finish(state: &mut global::State, job_builder: &JobBuilder, is_background: bool, line: &str) -> EvalResult {
	if is_background {
		match job_builder.last() {
			Some(pid) => {
				state.job_tracker.track(pid, line.trim());
				EvalResult::Background(pid)
			},
			None => EvalResult::Done(None),
		}
	} else {
		let status = job::reap_all(job_builder.pids());
		EvalResult::Done(status.and_then(|s| s.code()))
	}
}

fn run_single(state: &mut global::State, stage: &Stage, fds: StageFds, restore: &mut RestoreList,
              line: &str) -> ShellResult<EvalResult> {
	if let Some(fd) = fds.input {
		restore.apply(StdStream::Stdin.fd(), fd)?;
	}
	if let Some(fd) = fds.output {
		let _ = io::stdout().flush();
		restore.apply(StdStream::Stdout.fd(), fd)?;
	}
	if let Some(func) = builtin::match_builtin(&stage.program) {
		func(state, stage)?;
		return Ok(EvalResult::Done(Some(0)));
	}

	let exec = Exec::prepare(stage)?;
	let topology = Topology::build(1)?;
	let mut job_builder = JobBuilder::new(1);
	match unsafe { job_builder.push_fork()? } {
		ForkResult::Child => exec_stage(0, &topology, &[], &exec),
		ForkResult::Parent { .. } => {},
	}
	Ok(finish(state, &job_builder, stage.is_background, line))
}

/// A single stage runs against the shell's own streams, redirected for the
/// duration of the command and restored before returning.
fn eval_single(state: &mut global::State, stage: &Stage, fds: StageFds, line: &str) -> ShellResult<EvalResult> {
	let mut restore = RestoreList::new();
	let result = run_single(state, stage, fds, &mut restore, line);
	let _ = io::stdout().flush();
	restore.restore()?;
	result
}

fn eval_multi(state: &mut global::State, pipeline: &Pipeline, fds: Vec<StageFds>, line: &str) -> ShellResult<EvalResult> {
	let stages = &pipeline.stages;
	let execs: Vec<Exec> = stages.iter().map(Exec::prepare).collect::<ShellResult<_>>()?;
	let topology = Topology::build(stages.len())?;

	let mut job_builder = JobBuilder::new(stages.len());
	let mut spawn_error = None;
	for (i, exec) in execs.iter().enumerate() {
		match unsafe { job_builder.push_fork() } {
			Ok(ForkResult::Child) => exec_stage(i, &topology, &fds, exec),
			Ok(ForkResult::Parent { .. }) => {},
			Err(e) => {
				spawn_error = Some(e);
				break;
			},
		}
	}
	topology.close_all();
	drop(fds);

	if let Some(e) = spawn_error {
		// started stages see end-of-stream and exit on their own
		job::reap_all(job_builder.pids());
		return Err(e);
	}
	Ok(finish(state, &job_builder, pipeline.is_background(), line))
}

fn eval_pipeline(state: &mut global::State, pipeline: &Pipeline, line: &str) -> ShellResult<EvalResult> {
	debug_assert!(!pipeline.is_empty());
	let fds: Vec<StageFds> = pipeline.stages.iter().map(StageFds::open).collect::<ShellResult<_>>()?;
	debug!(stages = pipeline.stages.len(), background = pipeline.is_background(), "evaluating");
	if pipeline.stages.len() == 1 {
		let fds = fds.into_iter().next().unwrap_or_default();
		eval_single(state, &pipeline.stages[0], fds, line)
	} else {
		eval_multi(state, pipeline, fds, line)
	}
}

pub fn eval(state: &mut global::State, line: &str) -> ShellResult<EvalResult> {
	let mut pipeline = parser::parse(line)?;
	if pipeline.is_empty() {
		return Ok(EvalResult::Empty);
	}
	if pipeline.stages.len() == 1 && pipeline.stages[0].program == "exit" {
		return Ok(EvalResult::Exit);
	}
	expand::substitute(&mut pipeline);
	let result = eval_pipeline(state, &pipeline, line);
	// recorded after dispatch, so `myhistory` lists only earlier lines
	state.history.append(line)?;
	result
}
