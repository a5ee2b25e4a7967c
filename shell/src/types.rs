use libc::c_int;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StdStream { Stdin, Stdout }

impl StdStream {
	pub fn fd(self) -> c_int {
		match self {
			StdStream::Stdin => libc::STDIN_FILENO,
			StdStream::Stdout => libc::STDOUT_FILENO,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OpenMode { ReadOnly, WriteCreateTruncate }

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
	pub stream: StdStream,
	pub target: String,
	pub mode: OpenMode,
}

impl Redirect {
	pub fn input(target: &str) -> Redirect {
		Redirect { stream: StdStream::Stdin, target: target.to_owned(), mode: OpenMode::ReadOnly }
	}

	pub fn output(target: &str) -> Redirect {
		Redirect { stream: StdStream::Stdout, target: target.to_owned(), mode: OpenMode::WriteCreateTruncate }
	}
}

/// One command of a pipeline. At most one redirect per stream survives
/// parsing; a later `<` or `>` replaces the earlier one.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Stage {
	pub program: String,
	pub arguments: Vec<String>,
	pub input: Option<Redirect>,
	pub output: Option<Redirect>,
	pub is_background: bool,
}

impl Stage {
	pub fn redirects(&self) -> impl Iterator<Item = &Redirect> {
		self.input.iter().chain(self.output.iter())
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Pipeline {
	pub stages: Vec<Stage>,
}

impl Pipeline {
	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	pub fn is_background(&self) -> bool {
		self.stages.last().map_or(false, |s| s.is_background)
	}
}
