//! Placeholder text codecs: a character-code embedding and a template
//! decoder. Neither carries meaning; they only keep observation and action
//! shapes honest until real language models are plugged in.

pub const TEMPLATES: [&str; 8] = [
    "Hello! How can I help?",
    "That's interesting!",
    "I agree with that.",
    "Can you tell me more?",
    "Thanks for sharing!",
    "Great point!",
    "I'm processing that information.",
    "Let me think about it.",
];

pub const EMOJIS: [&str; 10] = ["👍", "❤️", "😄", "🎉", "👏", "🚀", "✅", "⭐", "🔥", "💯"];

pub fn simple_embedding(text: &str, dim: usize) -> Vec<f32> {
    let mut embedding = vec![0.0; dim];
    for (slot, ch) in embedding.iter_mut().zip(text.chars()) {
        *slot = (u32::from(ch) % 256) as f32 / 256.0;
    }
    embedding
}

pub fn template_index(embedding: &[f32]) -> usize {
    let sum: f32 = embedding.iter().sum();
    let scaled = (sum * 100.0).trunc() as i64;
    scaled.rem_euclid(TEMPLATES.len() as i64) as usize
}

pub fn decode_message(embedding: &[f32]) -> &'static str {
    TEMPLATES[template_index(embedding)]
}

pub fn emoji(index: usize) -> &'static str {
    EMOJIS[index % EMOJIS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_embedding() {
        let e = simple_embedding("Hi", 4);
        assert_eq!(e, vec![72.0 / 256.0, 105.0 / 256.0, 0.0, 0.0]);
        assert_eq!(simple_embedding("truncated text", 3).len(), 3);
        assert!(simple_embedding("", 5).iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_decode_message() {
        assert_eq!(decode_message(&[]), "Hello! How can I help?");
        assert_eq!(decode_message(&[0.0625]), "I'm processing that information.");
        assert_eq!(template_index(&[0.125, 0.125]), 1);
        // Negative sums wrap around instead of indexing backwards.
        assert_eq!(template_index(&[-0.0625]), 2);
        assert_eq!(template_index(&[-0.125]), 4);
    }

    #[test]
    fn test_emoji_wraps() {
        assert_eq!(emoji(0), "👍");
        assert_eq!(emoji(15), "🚀");
    }
}
