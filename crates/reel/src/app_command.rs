use reel_core::PointerStyle;

/// Commands read from the terminal and handled by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Start capturing.
    Start,
    /// Stop capturing.
    Stop,
    /// Throw away the finished recording.
    Discard,
    /// Persist the finished recording.
    Save,
    /// Print saved recordings, newest first.
    List,
    /// Delete a saved recording.
    Remove {
        /// Position in the printed list, starting at 1.
        number: usize,
    },
    /// Reveal a saved recording in the file manager.
    Open {
        /// Position in the printed list, starting at 1.
        number: usize,
    },
    /// Print the capture settings and the choices offered.
    Options,
    /// Change the frame rate.
    FrameRate {
        /// Frames per second.
        fps: u32,
    },
    /// Change the output resolution.
    Resolution {
        /// Position in the printed resolution list, starting at 1.
        number: usize,
    },
    /// Change how the pointer is drawn.
    Pointer {
        /// Requested pointer style.
        style: PointerStyle,
    },
    /// Request application shutdown.
    Quit,
    /// Input that is not a command.
    Invalid {
        /// The line as typed.
        input: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl AppCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?;
        let argument = words.next();

        let invalid = |reason: &str| AppCommand::Invalid {
            input: line.trim().to_string(),
            reason: reason.to_string(),
        };

        if words.next().is_some() {
            return Some(invalid("too many arguments"));
        }

        let command = match (name.to_ascii_lowercase().as_str(), argument) {
            ("start", None) => AppCommand::Start,
            ("stop", None) => AppCommand::Stop,
            ("discard", None) => AppCommand::Discard,
            ("save", None) => AppCommand::Save,
            ("list", None) => AppCommand::List,
            ("options", None) => AppCommand::Options,
            ("quit" | "exit", None) => AppCommand::Quit,
            ("remove", Some(arg)) => match parse_number(arg) {
                Some(number) => AppCommand::Remove { number },
                None => invalid("expected a recording number from `list`"),
            },
            ("open", Some(arg)) => match parse_number(arg) {
                Some(number) => AppCommand::Open { number },
                None => invalid("expected a recording number from `list`"),
            },
            ("res", Some(arg)) => match parse_number(arg) {
                Some(number) => AppCommand::Resolution { number },
                None => invalid("expected a resolution number from `options`"),
            },
            ("fps", Some(arg)) => match arg.parse::<u32>() {
                Ok(fps) if fps > 0 => AppCommand::FrameRate { fps },
                _ => invalid("expected a positive frame rate"),
            },
            ("pointer", Some(arg)) => match arg.parse().ok().and_then(PointerStyle::from_wire_index)
            {
                Some(style) => AppCommand::Pointer { style },
                None => invalid("expected a pointer number from `options`"),
            },
            (
                "start" | "stop" | "discard" | "save" | "list" | "options" | "quit" | "exit",
                Some(_),
            ) => invalid("takes no argument"),
            ("remove" | "open" | "res" | "fps" | "pointer", None) => invalid("missing argument"),
            _ => invalid("unknown command"),
        };

        Some(command)
    }
}

/// A 1-based list position.
fn parse_number(arg: &str) -> Option<usize> {
    arg.parse().ok().filter(|number| *number > 0)
}
