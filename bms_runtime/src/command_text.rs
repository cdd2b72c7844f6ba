use std::num::ParseIntError;

use thiserror::Error;

use crate::{CommandError, CommandRequest};

#[derive(Debug, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("invalid integer '{value}' for {context}: {source}")]
    InvalidInteger {
        value: String,
        context: &'static str,
        source: ParseIntError,
    },
    #[error("unknown pack id {0}")]
    UnknownPack(u32),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Parse a typed command such as `charge_on 2` or `discharge_off_all`.
///
/// The optional second token is a pack id (resolved to the pack's display
/// name through `resolve_pack`) or `all` for a cluster-wide request.
pub fn parse_command_line<F>(
    input: &str,
    resolve_pack: F,
) -> Result<CommandRequest, CommandParseError>
where
    F: Fn(u32) -> Option<String>,
{
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CommandParseError::Empty);
    }

    let mut parts = trimmed.split_whitespace();
    let verb = parts
        .next()
        .map(|v| v.to_ascii_lowercase())
        .ok_or(CommandParseError::Empty)?;

    let pack = match parts.next() {
        None => None,
        Some(token) if token.eq_ignore_ascii_case("all") => None,
        Some(token) => {
            let id = parse_u32(token, "pack id")?;
            Some(resolve_pack(id).ok_or(CommandParseError::UnknownPack(id))?)
        }
    };

    if let Some(extra) = parts.next() {
        return Err(CommandParseError::UnexpectedArgument(extra.to_string()));
    }

    let request = match pack {
        Some(name) => CommandRequest::new(verb, Some(name))?,
        None => CommandRequest::cluster(verb)?,
    };
    Ok(request)
}

fn parse_u32(value: &str, context: &'static str) -> Result<u32, CommandParseError> {
    value
        .parse::<u32>()
        .map_err(|source| CommandParseError::InvalidInteger {
            value: value.to_string(),
            context,
            source,
        })
}
