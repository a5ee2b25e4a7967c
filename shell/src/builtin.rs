use std::io::{self, Write};
use std::path::Path;

use nix::unistd;

use crate::error::{ShellError, ShellResult};
use crate::global;
use crate::types::Stage;

pub type Builtin = fn(&mut global::State, &Stage) -> ShellResult<()>;

pub fn builtin_cd(_: &mut global::State, stage: &Stage) -> ShellResult<()> {
	let dir = stage.arguments.first().ok_or(ShellError::MissingArgument("cd"))?;
	unistd::chdir(Path::new(dir)).map_err(|e| ShellError::DirectoryChangeFailed { dir: dir.clone(), source: e })
}

pub fn builtin_myjobs(state: &mut global::State, _: &Stage) -> ShellResult<()> {
	let report = state.job_tracker.report_and_reap();
	let mut stdout = io::stdout();
	let _ = write!(stdout, "{}", report);
	let _ = stdout.flush();
	Ok(())
}

pub fn builtin_myhistory(state: &mut global::State, _: &Stage) -> ShellResult<()> {
	let lines = state.history.read_all()?;
	let mut stdout = io::stdout();
	for line in lines {
		let _ = writeln!(stdout, "{}", line);
	}
	let _ = stdout.flush();
	Ok(())
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"myjobs" => Some(builtin_myjobs),
		"myhistory" => Some(builtin_myhistory),
		_ => None,
	}
}
