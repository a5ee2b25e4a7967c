use crate::config::Config;
use crate::error::ShellResult;
use crate::history::History;
use crate::job::JobTracker;

/// Everything the read loop carries from one line to the next.
pub struct State {
	pub config: Config,
	pub history: History,
	pub job_tracker: JobTracker,
}

impl State {
	pub fn new(config: Config) -> ShellResult<State> {
		let history = History::open(&config.history_path, config.truncate_history)?;
		let job_tracker = JobTracker::new();
		Ok(State { config: config, history: history, job_tracker: job_tracker })
	}
}
