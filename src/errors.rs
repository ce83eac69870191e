//! Error module. See the [error-chain](https://crates.io/crates/error-chain) crate for details.

#![allow(missing_docs)]

error_chain! {
    foreign_links {
        Io(::std::io::Error);
        Nix(::nix::Error);
        Readline(::rustyline::error::ReadlineError);
    }

    errors {
        NoSuchDirectory(attempted: Vec<String>) {
            description("no such file or directory")
            display("cd: no such file or directory (tried {})", attempted.join(", "))
        }

        HomeDirectoryNotFound {
            description("home directory not found")
            display("cd: HOME not set")
        }

        ForkFailed(attempts: u32) {
            description("fork failed")
            display("fork: resource temporarily unavailable after {} attempts", attempts)
        }

        InvalidArgument(arg: String) {
            description("argument contains an interior NUL byte")
            display("{:?}: argument contains an interior NUL byte", arg)
        }
    }
}

impl Error {
    pub(crate) fn no_such_directory<I, S>(attempted: I) -> Error
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ErrorKind::NoSuchDirectory(
            attempted
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
        ).into()
    }

    pub(crate) fn invalid_argument<T: AsRef<str>>(arg: T) -> Error {
        ErrorKind::InvalidArgument(arg.as_ref().to_string()).into()
    }
}
