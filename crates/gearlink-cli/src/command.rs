//! Line-oriented command parser.

use std::str::FromStr;

use thiserror::Error;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Blank line
    Empty,
    /// Re-register listeners after `destroy`
    Init,
    /// Start connecting
    Connect,
    /// Disconnect and notify
    Disconnect,
    /// Silent teardown
    Destroy,
    /// Clear a transport failure
    Reset,
    /// Finger down
    TouchStart(i32, i32),
    /// Finger moved
    TouchMove(i32, i32),
    /// Finger up
    TouchEnd,
    /// Tap
    Click(i32, i32),
    /// Rotary detent in a direction string
    Rotary(String),
    /// Swipe in a direction string
    Swipe(String),
    /// Back button
    Back,
    /// Stop
    Quit,
}

/// Why a line could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First word is not a command
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command needs more arguments
    #[error("{command}: missing {argument}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Missing argument name
        argument: &'static str,
    },

    /// Coordinate is not an integer
    #[error("{command}: invalid coordinate {value:?}")]
    InvalidCoordinate {
        /// Command name
        command: &'static str,
        /// Rejected text
        value: String,
    },

    /// Extra words after the arguments
    #[error("{command}: unexpected argument {value:?}")]
    UnexpectedArgument {
        /// Command name
        command: &'static str,
        /// First extra word
        value: String,
    },
}

struct Words<'a> {
    command: &'static str,
    rest: std::str::SplitWhitespace<'a>,
}

impl<'a> Words<'a> {
    fn word(&mut self, argument: &'static str) -> Result<&'a str, ParseError> {
        self.rest.next().ok_or(ParseError::MissingArgument { command: self.command, argument })
    }

    fn coordinate(&mut self, argument: &'static str) -> Result<i32, ParseError> {
        let value = self.word(argument)?;
        value.parse().map_err(|_| ParseError::InvalidCoordinate {
            command: self.command,
            value: value.into(),
        })
    }

    fn point(&mut self) -> Result<(i32, i32), ParseError> {
        Ok((self.coordinate("x")?, self.coordinate("y")?))
    }

    fn finish<T>(mut self, line: T) -> Result<T, ParseError> {
        match self.rest.next() {
            Some(extra) => {
                Err(ParseError::UnexpectedArgument { command: self.command, value: extra.into() })
            },
            None => Ok(line),
        }
    }
}

impl FromStr for Line {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut rest = input.split_whitespace();
        let Some(first) = rest.next() else {
            return Ok(Self::Empty);
        };
        let words = |command: &'static str| Words { command, rest: rest.clone() };

        match first.to_ascii_lowercase().as_str() {
            "init" => words("init").finish(Self::Init),
            "connect" => words("connect").finish(Self::Connect),
            "disconnect" => words("disconnect").finish(Self::Disconnect),
            "destroy" => words("destroy").finish(Self::Destroy),
            "reset" => words("reset").finish(Self::Reset),
            "touch-start" => {
                let mut args = words("touch-start");
                let (x, y) = args.point()?;
                args.finish(Self::TouchStart(x, y))
            },
            "touch-move" => {
                let mut args = words("touch-move");
                let (x, y) = args.point()?;
                args.finish(Self::TouchMove(x, y))
            },
            "touch-end" => words("touch-end").finish(Self::TouchEnd),
            "click" => {
                let mut args = words("click");
                let (x, y) = args.point()?;
                args.finish(Self::Click(x, y))
            },
            "rotary" => {
                let mut args = words("rotary");
                let direction = args.word("direction")?;
                args.finish(Self::Rotary(direction.to_string()))
            },
            "swipe" => {
                let mut args = words("swipe");
                let direction = args.word("direction")?;
                args.finish(Self::Swipe(direction.to_string()))
            },
            "back" => words("back").finish(Self::Back),
            "quit" | "exit" => words("quit").finish(Self::Quit),
            _ => Err(ParseError::UnknownCommand(first.to_string())),
        }
    }
}
