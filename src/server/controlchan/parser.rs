//! Parses a single CRLF-terminated control-channel line into a [`Command`].

use super::command::{Command, HostPort, TypeParam};

use bytes::BytesMut;
use derive_more::Display;
use std::net::IpAddr;
use thiserror::Error;

/// The error type returned by [`parse`].
#[derive(Debug, Error, Display, PartialEq, Eq, Clone)]
pub(crate) enum ParseError {
    #[display("invalid command")]
    InvalidCommand,
    #[display("non-UTF8 character in command")]
    InvalidUtf8,
}

/// Returns true for printable ASCII excluding control characters, matching the token
/// characters RFC 959 command lines are made of.
fn is_valid_token_char(b: u8) -> bool {
    (0x1F < b) && (b < 0x7F)
}

/// Parses a single line (including its trailing `\r\n` or bare `\n`) into a [`Command`].
pub(crate) fn parse(line: BytesMut) -> Result<Command, ParseError> {
    if !line.iter().all(|&b| is_valid_token_char(b) || b == b'\r' || b == b'\n') {
        return Err(ParseError::InvalidUtf8);
    }
    let line = std::str::from_utf8(&line).map_err(|_| ParseError::InvalidUtf8)?;
    let line = line.trim_end_matches(['\r', '\n']);

    let (verb, rest) = match line.find(' ') {
        Some(idx) => (&line[..idx], line[idx + 1..].trim()),
        None => (line, ""),
    };
    let verb = verb.to_uppercase();

    let require_arg = |rest: &str| -> Result<String, ParseError> {
        if rest.is_empty() {
            Err(ParseError::InvalidCommand)
        } else {
            Ok(rest.to_string())
        }
    };
    let optional_arg = |rest: &str| -> Option<String> {
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    };

    Ok(match verb.as_str() {
        "USER" => Command::User { username: require_arg(rest)? },
        "PASS" => Command::Pass {
            password: rest.to_string(),
        },
        "QUIT" => Command::Quit,
        "SYST" => Command::Syst,
        "FEAT" => Command::Feat,
        "PWD" | "XPWD" => Command::Pwd,
        "CWD" | "XCWD" => Command::Cwd { path: require_arg(rest)? },
        "CDUP" | "XCUP" => Command::Cdup,
        "TYPE" => {
            let param = rest.split_whitespace().next().unwrap_or("");
            match param.to_uppercase().as_str() {
                "A" => Command::Type { param: TypeParam::Ascii },
                "I" | "L" => Command::Type { param: TypeParam::Image },
                _ => return Err(ParseError::InvalidCommand),
            }
        }
        "MODE" => {
            if rest.eq_ignore_ascii_case("S") || rest.is_empty() {
                Command::Mode
            } else {
                return Err(ParseError::InvalidCommand);
            }
        }
        "STRU" => {
            if rest.eq_ignore_ascii_case("F") || rest.is_empty() {
                Command::Stru
            } else {
                return Err(ParseError::InvalidCommand);
            }
        }
        "PASV" => Command::Pasv,
        "EPSV" => Command::Epsv,
        "PORT" => Command::Port {
            endpoint: parse_port_arg(rest)?,
        },
        "EPRT" => Command::Eprt {
            endpoint: parse_eprt_arg(rest)?,
        },
        "LIST" => Command::List { path: optional_arg(rest) },
        "NLST" => Command::Nlst { path: optional_arg(rest) },
        "RETR" => Command::Retr { path: require_arg(rest)? },
        "STOR" => Command::Stor { path: require_arg(rest)? },
        "APPE" => Command::Appe { path: require_arg(rest)? },
        "DELE" => Command::Dele { path: require_arg(rest)? },
        "MKD" | "XMKD" => Command::Mkd { path: require_arg(rest)? },
        "RMD" | "XRMD" => Command::Rmd { path: require_arg(rest)? },
        "RNFR" => Command::Rnfr { path: require_arg(rest)? },
        "RNTO" => Command::Rnto { path: require_arg(rest)? },
        "SIZE" => Command::Size { path: require_arg(rest)? },
        "MDTM" => Command::Mdtm { path: require_arg(rest)? },
        "NOOP" => Command::Noop,
        "REST" => Command::Rest {
            offset: rest.parse().map_err(|_| ParseError::InvalidCommand)?,
        },
        "ABOR" => Command::Abor,
        "" => return Err(ParseError::InvalidCommand),
        other => Command::Other {
            command_name: other.to_string(),
            arguments: rest.to_string(),
        },
    })
}

fn parse_port_arg(rest: &str) -> Result<HostPort, ParseError> {
    let parts: Vec<&str> = rest.split(',').collect();
    if parts.len() != 6 {
        return Err(ParseError::InvalidCommand);
    }
    let nums: Result<Vec<u8>, _> = parts.iter().map(|p| p.trim().parse::<u8>()).collect();
    let nums = nums.map_err(|_| ParseError::InvalidCommand)?;
    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + nums[5] as u16;
    Ok(HostPort { ip, port })
}

fn parse_eprt_arg(rest: &str) -> Result<HostPort, ParseError> {
    // |1|132.235.1.2|6275| (af=1 IPv4, af=2 IPv6)
    let parts: Vec<&str> = rest.split('|').collect();
    if parts.len() < 4 {
        return Err(ParseError::InvalidCommand);
    }
    let ip: IpAddr = parts[2].parse().map_err(|_| ParseError::InvalidCommand)?;
    let port: u16 = parts[3].parse().map_err(|_| ParseError::InvalidCommand)?;
    Ok(HostPort { ip, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> BytesMut {
        BytesMut::from(format!("{}\r\n", s).as_bytes())
    }

    #[test]
    fn parses_user() {
        assert_eq!(parse(line("USER alice")).unwrap(), Command::User { username: "alice".to_string() });
    }

    #[test]
    fn verb_is_case_insensitive() {
        assert_eq!(parse(line("user alice")).unwrap(), Command::User { username: "alice".to_string() });
    }

    #[test]
    fn type_image_accepts_i() {
        assert_eq!(parse(line("TYPE I")).unwrap(), Command::Type { param: TypeParam::Image });
    }

    #[test]
    fn unknown_command_falls_through_to_other() {
        match parse(line("FOOBAR baz")).unwrap() {
            Command::Other { command_name, arguments } => {
                assert_eq!(command_name, "FOOBAR");
                assert_eq!(arguments, "baz");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn cwd_without_argument_is_invalid() {
        assert_eq!(parse(line("CWD")).unwrap_err(), ParseError::InvalidCommand);
    }

    #[test]
    fn port_parses_address_and_port() {
        let cmd = parse(line("PORT 127,0,0,1,195,149")).unwrap();
        assert_eq!(
            cmd,
            Command::Port {
                endpoint: HostPort {
                    ip: "127.0.0.1".parse().unwrap(),
                    port: 195 * 256 + 149,
                }
            }
        );
    }

    #[test]
    fn eprt_parses_ipv4() {
        let cmd = parse(line("EPRT |1|127.0.0.1|49200|")).unwrap();
        assert_eq!(
            cmd,
            Command::Eprt {
                endpoint: HostPort {
                    ip: "127.0.0.1".parse().unwrap(),
                    port: 49200,
                }
            }
        );
    }

    #[test]
    fn rest_parses_offset() {
        assert_eq!(parse(line("REST 1234")).unwrap(), Command::Rest { offset: 1234 });
    }
}
