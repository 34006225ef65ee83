//! Command-line parsing

use std::fmt;

use loyalty_common::AppError;

const USAGE: &str = "usage: loyalty-worker [watch | pull [--force-clean] | push | unify | clear]";

/// One-shot tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Pull { force_clean: bool },
    Push,
    Unify,
    /// Wipe the device cache and its session
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Pull, then follow remote and local changes until interrupted
    Watch,
    Once(Task),
}

impl Command {
    /// Parse the arguments after the program name
    pub fn parse<I, S>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let words: Vec<&str> = args.iter().map(AsRef::as_ref).collect();

        match words.as_slice() {
            [] | ["watch"] => Ok(Self::Watch),
            ["pull"] => Ok(Self::Once(Task::Pull { force_clean: false })),
            ["pull", "--force-clean"] => Ok(Self::Once(Task::Pull { force_clean: true })),
            ["push"] => Ok(Self::Once(Task::Push)),
            ["unify"] => Ok(Self::Once(Task::Unify)),
            ["clear"] => Ok(Self::Once(Task::Clear)),
            _ => Err(AppError::validation(USAGE)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Watch => f.write_str("watch"),
            Self::Once(Task::Pull { force_clean: false }) => f.write_str("pull"),
            Self::Once(Task::Pull { force_clean: true }) => f.write_str("pull --force-clean"),
            Self::Once(Task::Push) => f.write_str("push"),
            Self::Once(Task::Unify) => f.write_str("unify"),
            Self::Once(Task::Clear) => f.write_str("clear"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_watch() {
        assert_eq!(Command::parse(Vec::<String>::new()).unwrap(), Command::Watch);
        assert_eq!(Command::parse(["watch"]).unwrap(), Command::Watch);
    }

    #[test]
    fn test_one_shot_commands() {
        assert_eq!(
            Command::parse(["pull", "--force-clean"]).unwrap(),
            Command::Once(Task::Pull { force_clean: true })
        );
        assert_eq!(Command::parse(["unify"]).unwrap(), Command::Once(Task::Unify));
        assert_eq!(Command::parse(["push"]).unwrap().to_string(), "push");
        assert_eq!(Command::parse(["clear"]).unwrap(), Command::Once(Task::Clear));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(matches!(
            Command::parse(["unify", "now"]),
            Err(AppError::Validation(_))
        ));
        assert!(Command::parse(["--master-key"]).is_err());
    }
}
