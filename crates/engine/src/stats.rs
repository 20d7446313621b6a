//! Message body statistics and limits.

use serde::Serialize;

use herald_common::error::AppError;

/// Longest body accepted for a campaign, in characters.
pub const MAX_BODY_CHARS: usize = 1600;

/// Characters that fit in a single SMS segment.
const SINGLE_SEGMENT_CHARS: usize = 160;

/// Characters per segment once a message is split.
const MULTIPART_SEGMENT_CHARS: usize = 153;

/// Size of a message body as the provider will bill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageStats {
    pub characters: usize,
    pub segments: usize,
}

impl MessageStats {
    pub fn of(body: &str) -> Self {
        let characters = body.chars().count();
        let segments = if characters <= SINGLE_SEGMENT_CHARS {
            1
        } else {
            characters.div_ceil(MULTIPART_SEGMENT_CHARS)
        };
        Self {
            characters,
            segments,
        }
    }
}

/// Reject bodies that are blank or longer than `MAX_BODY_CHARS`.
pub fn validate_body(body: &str) -> Result<MessageStats, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::Validation("Message body must not be empty".to_string()));
    }
    let stats = MessageStats::of(body);
    if stats.characters > MAX_BODY_CHARS {
        return Err(AppError::Validation(format!(
            "Message body is {} characters; the limit is {}",
            stats.characters, MAX_BODY_CHARS
        )));
    }
    Ok(stats)
}
