use crate::emotion::Emotion;
use crate::segment::TextSegment;
use tracing::debug;

/// One lexed piece of the input: either plain text or a `[word]` marker.
enum Token<'a> {
    Literal(&'a str),
    Marker(&'a str),
}

/// Splits the input on emotion markers, keeping both the markers and the
/// text between them. A marker is `[` followed by one or more letters,
/// digits, or underscores (Unicode alphanumerics included) and a closing
/// `]`; anything else stays literal text.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < text.len() {
        if text[i..].starts_with('[') {
            if let Some(close) = marker_close(text, i) {
                if literal_start < i {
                    tokens.push(Token::Literal(&text[literal_start..i]));
                }
                tokens.push(Token::Marker(&text[i + 1..close]));
                i = close + 1;
                literal_start = i;
                continue;
            }
        }
        i += text[i..].chars().next().map_or(1, char::len_utf8);
    }
    if literal_start < text.len() {
        tokens.push(Token::Literal(&text[literal_start..]));
    }
    tokens
}

/// Byte offset of the `]` closing a marker opened at `open`, if the run
/// between the brackets is a non-empty word.
fn marker_close(text: &str, open: usize) -> Option<usize> {
    let word_len: usize = text[open + 1..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum();
    if word_len == 0 {
        return None;
    }
    let close = open + 1 + word_len;
    text[close..].starts_with(']').then_some(close)
}

/// Parses raw input into an ordered, non-empty segment sequence.
///
/// Leading text before the first marker becomes a neutral segment.
/// Each (marker, following-text) pair becomes one segment with the
/// trimmed following text; blank pairs are dropped, as is a trailing
/// marker with nothing after it. If nothing at all survives, the whole
/// trimmed input is returned as a single neutral segment.
pub fn parse_segments(text: &str) -> Vec<TextSegment> {
    let mut tokens = tokenize(text).into_iter().peekable();
    let mut spans: Vec<(Emotion, String)> = Vec::new();

    if let Some(Token::Literal(lead)) = tokens.peek() {
        let lead = lead.trim();
        if !lead.is_empty() {
            spans.push((Emotion::Neutral, lead.to_owned()));
        }
        tokens.next();
    }

    while let Some(token) = tokens.next() {
        let Token::Marker(label) = token else {
            continue;
        };
        let emotion = Emotion::from_label(label);
        let content = match tokens.peek() {
            Some(Token::Literal(following)) => {
                let trimmed = following.trim().to_owned();
                tokens.next();
                trimmed
            }
            _ => String::new(),
        };
        if !content.is_empty() {
            spans.push((emotion, content));
        }
    }

    if spans.is_empty() {
        spans.push((Emotion::Neutral, text.trim().to_owned()));
    }

    debug!(segments = spans.len(), "parsed emotion markers");

    spans
        .into_iter()
        .enumerate()
        .map(|(order, (emotion, text))| TextSegment::new(emotion, text, order))
        .collect()
}
