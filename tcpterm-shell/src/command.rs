//! The commands understood on standard input.
use std::fmt;
use std::str::FromStr;

use tcpterm::wire::Ipv4Address;

/// A parsed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `send:<dst addr>:<dst port>:<src port>:<data>`
    Send {
        remote: Ipv4Address,
        remote_port: u16,
        local_port: u16,
        data: String,
    },
    /// `reply:<data>`, answering the flow of the last received segment.
    Reply {
        data: String,
    },
    /// `connect:<addr>:<port>:<src port>`
    Connect {
        remote: Ipv4Address,
        remote_port: u16,
        local_port: u16,
    },
}

/// The line was not a valid command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidCommand;

/// Printed on startup.
pub const MANUAL: &str = "\
Command Manual:
send:<dst ipAddr>:<dst port>:<src port>:<data to send>
reply:<text>
connect:<ip>:<port>:<src port>
";

impl FromStr for Command {
    type Err = InvalidCommand;

    fn from_str(line: &str) -> Result<Self, InvalidCommand> {
        if let Some(data) = line.strip_prefix("reply:") {
            return Ok(Command::Reply { data: data.to_string() });
        }

        let tokens: Vec<&str> = line.split(':').collect();
        match tokens.as_slice() {
            ["send", remote, remote_port, local_port, data] => Ok(Command::Send {
                remote: remote.parse().map_err(|_| InvalidCommand)?,
                remote_port: remote_port.parse().map_err(|_| InvalidCommand)?,
                local_port: local_port.parse().map_err(|_| InvalidCommand)?,
                data: data.to_string(),
            }),
            ["connect", remote, remote_port, local_port] => Ok(Command::Connect {
                remote: remote.parse().map_err(|_| InvalidCommand)?,
                remote_port: remote_port.parse().map_err(|_| InvalidCommand)?,
                local_port: local_port.parse().map_err(|_| InvalidCommand)?,
            }),
            _ => Err(InvalidCommand),
        }
    }
}

impl fmt::Display for InvalidCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[TCP Shell] Invalid Command")
    }
}

impl std::error::Error for InvalidCommand {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send() {
        assert_eq!("send:192.168.0.1:8080:4000:hello world".parse(), Ok(Command::Send {
            remote: Ipv4Address::new(192, 168, 0, 1),
            remote_port: 8080,
            local_port: 4000,
            data: "hello world".to_string(),
        }));
    }

    #[test]
    fn send_needs_exactly_five_fields() {
        assert_eq!("send:192.168.0.1:8080:4000".parse::<Command>(), Err(InvalidCommand));
        assert_eq!("send:192.168.0.1:8080:4000:a:b".parse::<Command>(), Err(InvalidCommand));
    }

    #[test]
    fn reply_keeps_the_whole_rest() {
        assert_eq!("reply:a:b c".parse(), Ok(Command::Reply { data: "a:b c".to_string() }));
        assert_eq!("reply:".parse(), Ok(Command::Reply { data: String::new() }));
    }

    #[test]
    fn connect() {
        assert_eq!("connect:10.0.0.2:80:5555".parse(), Ok(Command::Connect {
            remote: Ipv4Address::new(10, 0, 0, 2),
            remote_port: 80,
            local_port: 5555,
        }));
    }

    #[test]
    fn rejects_malformed_fields() {
        for line in &[
            "",
            "send",
            "hello",
            "send:300.0.0.1:80:80:x",
            "send:10.0.0.1:port:80:x",
            "send:10.0.0.1:80:70000:x",
            "connect:10.0.0.1:80",
            "connect:10.0.0.1:80:-1",
            "Connect:10.0.0.1:80:81",
        ] {
            assert_eq!(line.parse::<Command>(), Err(InvalidCommand), "{:?}", line);
        }
    }
}
