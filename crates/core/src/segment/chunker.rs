use crate::segment::TextSegment;
use tracing::debug;

/// Splits `text` into word-aligned chunks of at most `threshold`
/// characters, packing whole words greedily. A single word longer than
/// the threshold is never split and forms its own oversized chunk.
pub fn chunk_text(text: &str, threshold: usize) -> Vec<String> {
    if text.chars().count() <= threshold {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        // One extra for the separating space.
        let word_len = word.chars().count() + 1;
        if current_len + word_len > threshold && !current.is_empty() {
            chunks.push(current.join(" "));
            current = vec![word];
            current_len = word_len;
        } else {
            current.push(word);
            current_len += word_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

/// Re-splits any segment whose text exceeds `threshold`, keeping the
/// emotion and renumbering `order` so the result stays sequential.
pub fn chunk_segments(segments: Vec<TextSegment>, threshold: usize) -> Vec<TextSegment> {
    let mut out: Vec<TextSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.text.chars().count() <= threshold {
            let order = out.len();
            out.push(TextSegment::new(segment.emotion, segment.text, order));
        } else {
            debug!(
                order = segment.order,
                emotion = %segment.emotion,
                chars = segment.text.chars().count(),
                "splitting oversized segment"
            );
            for piece in chunk_text(&segment.text, threshold) {
                let order = out.len();
                out.push(TextSegment::new(segment.emotion, piece, order));
            }
        }
    }
    out
}
