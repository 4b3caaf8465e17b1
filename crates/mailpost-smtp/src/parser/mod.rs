//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its response lines.
///
/// Replies are single-line (`250 OK`) or multi-line
/// (`250-first`, `250-second`, `250 last`).
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("empty reply".into()));
    };
    if first.len() < 3 {
        return Err(Error::Protocol(format!("reply too short: {first}")));
    }

    let code_str = &first[0..3];
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("invalid reply code: {code_str}")))?;

    let mut message = Vec::new();
    for line in lines {
        if line.len() > 4 {
            // Skip code and separator ("250-" or "250 ")
            message.push(line[4..].to_string());
        } else if line.len() == 3 {
            message.push(String::new());
        } else {
            return Err(Error::Protocol(format!("malformed reply line: {line}")));
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// True when `line` terminates a (possibly multi-line) reply.
///
/// Continuation lines carry `-` after the code; the final line a space.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() >= 4 && line.as_bytes()[3] == b' '
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn single_line_reply() {
        let reply = parse_reply(&["250 OK".to_string()]).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["OK"]);
        assert!(reply.is_success());
    }

    #[test]
    fn multi_line_reply() {
        let lines = vec![
            "250-mail.example.com".to_string(),
            "250-STARTTLS".to_string(),
            "250 AUTH PLAIN LOGIN".to_string(),
        ];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message.len(), 3);
    }

    #[test]
    fn bare_code_reply() {
        let reply = parse_reply(&["250".to_string()]).unwrap();
        assert_eq!(reply.message, vec![String::new()]);
    }

    #[test]
    fn last_line_detection() {
        assert!(is_last_reply_line("250 OK"));
        assert!(!is_last_reply_line("250-continuing"));
        assert!(!is_last_reply_line("250"));
    }

    #[test]
    fn malformed_replies_are_rejected() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&["25".to_string()]).is_err());
        assert!(parse_reply(&["ABC OK".to_string()]).is_err());
    }
}
