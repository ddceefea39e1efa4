// Draw Lottery - Token Codec
//
// A token packs a whole run into one ASCII string:
//
//   LOTTERY-v1.<base64url(percent-encoded JSON)>
//
// Tokens written before versioning carry no `v<N>.` segment and use the
// padded standard base64 alphabet. Neither base64 alphabet contains `.`,
// so the two layouts cannot be confused.
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::debug;

use crate::error::{LotteryError, LotteryResult};
use crate::state::Run;

/// Prefix every token starts with
pub const TOKEN_TAG: &str = "LOTTERY-";

/// Payload layout written by `encode`
pub const FORMAT_VERSION: u32 = 1;

/// Token layouts `decode` understands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenFormat {
    /// No version segment, standard base64
    Legacy,
    /// `v<N>.` segment, url-safe base64 without padding
    Versioned(u32),
}

/// Pack a run into a self-describing token
pub fn encode(run: &Run) -> LotteryResult<String> {
    let json = serde_json::to_string(run)?;
    let escaped = utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string();
    let body = URL_SAFE_NO_PAD.encode(escaped.as_bytes());
    Ok(format!("{}v{}.{}", TOKEN_TAG, FORMAT_VERSION, body))
}

/// Identify the layout of a token without decoding its body
pub fn token_format(token: &str) -> LotteryResult<TokenFormat> {
    split_token(token).map(|(format, _)| format)
}

/// Unpack a token and check the run it carries.
/// Any malformed input is reported as `LotteryError::Decode`.
pub fn decode(token: &str) -> LotteryResult<Run> {
    let (format, body) = split_token(token)?;
    if body.is_empty() {
        return Err(LotteryError::Decode("Token has an empty payload".into()));
    }

    let bytes = match format {
        TokenFormat::Legacy => STANDARD.decode(body)?,
        TokenFormat::Versioned(_) => URL_SAFE_NO_PAD.decode(body)?,
    };
    let escaped = String::from_utf8(bytes)
        .map_err(|_| LotteryError::Decode("Payload is not ASCII text".into()))?;
    let json = percent_decode_str(&escaped)
        .decode_utf8()
        .map_err(|_| LotteryError::Decode("Payload is not valid UTF-8".into()))?;

    let run: Run = serde_json::from_str(&json)?;
    run.validate()
        .map_err(|e| LotteryError::Decode(e.to_string()))?;

    debug!(
        "Decoded {:?} token: {} participants, {} prizes",
        format,
        run.participants.len(),
        run.prizes.len()
    );
    Ok(run)
}

fn split_token(token: &str) -> LotteryResult<(TokenFormat, &str)> {
    let rest = token
        .trim()
        .strip_prefix(TOKEN_TAG)
        .ok_or_else(|| LotteryError::Decode(format!("Token must start with {}", TOKEN_TAG)))?;

    let (head, body) = match rest.split_once('.') {
        Some(parts) => parts,
        None => return Ok((TokenFormat::Legacy, rest)),
    };

    let version = head
        .strip_prefix('v')
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| LotteryError::Decode(format!("Malformed version segment {:?}", head)))?;
    if version != FORMAT_VERSION {
        return Err(LotteryError::Decode(format!(
            "Unsupported token version {}",
            version
        )));
    }
    Ok((TokenFormat::Versioned(version), body))
}
