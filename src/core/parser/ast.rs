use std::fmt;

/// Maximum number of arguments kept for a single command.
pub const MAX_ARGUMENTS: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Empty, whitespace-only, or comment line.
    Blank,
    Simple(SimpleCommand),
}

/// `name [args...] [< input] [> output] [&]`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimpleCommand {
    pub name: String,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub background: bool,
}

impl Command {
    pub fn is_blank(&self) -> bool {
        match *self {
            Command::Blank => true,
            Command::Simple(_) => false,
        }
    }
}

impl SimpleCommand {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn input<S: Into<String>>(self, path: S) -> Self {
        Self {
            input: Some(path.into()),
            ..self
        }
    }

    pub fn output<S: Into<String>>(self, path: S) -> Self {
        Self {
            output: Some(path.into()),
            ..self
        }
    }

    pub fn background(self, background: bool) -> Self {
        Self { background, ..self }
    }

    /// `name` followed by `args`, in order.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        Some(self.name.as_str())
            .into_iter()
            .chain(self.args.iter().map(String::as_str))
    }
}

impl fmt::Display for SimpleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().collect::<Vec<_>>().join(" "))?;
        if let Some(ref input) = self.input {
            write!(f, " < {}", input)?;
        }
        if let Some(ref output) = self.output {
            write!(f, " > {}", output)?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}
