//! Sentence-boundary text chunker.
//!
//! Splits corpus text into passages bounded by a configurable
//! whitespace-delimited word count. Splitting occurs on the sentence
//! terminator (`.`) so each chunk stays grammatically terminated and
//! retrieval granularity follows sentence structure.
//!
//! # Algorithm
//!
//! 1. Split the input on `.`.
//! 2. Discard empty and whitespace-only sentences.
//! 3. Greedily append sentences (terminator restored) to a running
//!    buffer, measuring size in whitespace-delimited words.
//! 4. When the next sentence would push the buffer past `max_words`,
//!    seal the buffer as a chunk and start a new buffer with that
//!    sentence.
//! 5. A single sentence longer than `max_words` is emitted alone,
//!    unsplit. That chunk exceeds the bound; this is accepted rather
//!    than breaking mid-sentence.
//!
//! Pure function of its inputs; no side effects.

/// Default chunk size bound, in whitespace-delimited words.
pub const DEFAULT_MAX_WORDS: usize = 100;

/// Split corpus text into sentence-aligned chunks of at most `max_words`
/// words each.
///
/// Chunk ids are positional: chunk *i* of the returned sequence becomes
/// mapping id *i* at index-build time.
///
/// # Guarantees
///
/// - Every chunk ends with the sentence terminator.
/// - No chunk exceeds `max_words` words, except a chunk holding a single
///   sentence that itself exceeds the bound.
/// - Every non-empty sentence of the input appears in exactly one chunk,
///   in corpus order (whitespace around sentences is normalized).
/// - Empty or terminator-free whitespace input yields an empty vector;
///   the build pipeline treats that as a precondition failure.
pub fn split_sentences(text: &str, max_words: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_words = 0usize;

    for sentence in text.split('.') {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let words = sentence.split_whitespace().count();

        if !buf.is_empty() && buf_words + words > max_words {
            chunks.push(std::mem::take(&mut buf));
            buf_words = 0;
        }

        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(sentence);
        buf.push('.');
        buf_words += words;
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_count(chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split_sentences("", 100).is_empty());
        assert!(split_sentences("   \n  ", 100).is_empty());
        assert!(split_sentences("...", 100).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_sentences("One sentence. Another one.", 100);
        assert_eq!(chunks, vec!["One sentence. Another one."]);
    }

    #[test]
    fn test_chunk_bound_respected() {
        let text = (0..30)
            .map(|i| format!("Sentence number {} has five words", i))
            .collect::<Vec<_>>()
            .join(". ");
        let chunks = split_sentences(&text, 12);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                word_count(chunk) <= 12,
                "chunk exceeds bound: {:?}",
                chunk
            );
        }
    }

    #[test]
    fn test_oversized_sentence_emitted_alone() {
        let long = "one two three four five six seven eight nine ten";
        let text = format!("Short. {}. Tail.", long);
        let chunks = split_sentences(&text, 5);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Short.");
        assert_eq!(chunks[1], format!("{}.", long));
        assert_eq!(chunks[2], "Tail.");
    }

    #[test]
    fn test_coverage_no_sentence_dropped() {
        let text = "Alpha beta. Gamma delta epsilon. Zeta. Eta theta iota kappa.";
        let chunks = split_sentences(text, 3);
        let rejoined = chunks.join(" ");
        for sentence in ["Alpha beta.", "Gamma delta epsilon.", "Zeta.", "Eta theta iota kappa."] {
            assert!(rejoined.contains(sentence), "missing {:?}", sentence);
        }
    }

    #[test]
    fn test_whitespace_only_sentences_discarded() {
        let chunks = split_sentences("First. .   . Second.", 100);
        assert_eq!(chunks, vec!["First. Second."]);
    }

    #[test]
    fn test_terminator_restored_on_each_chunk() {
        let chunks = split_sentences("No trailing period here", 100);
        assert_eq!(chunks, vec!["No trailing period here."]);
    }

    #[test]
    fn test_deterministic() {
        let text = "A b c. D e f. G h i. J k l.";
        assert_eq!(split_sentences(text, 4), split_sentences(text, 4));
    }

    #[test]
    fn test_historical_corpus_example() {
        let text = "Soekarno lahir di Surabaya. Ia menjadi presiden pertama Indonesia. \
                    Hatta adalah wakil presiden pertama.";
        let chunks = split_sentences(text, 10);
        assert!(
            (2..=3).contains(&chunks.len()),
            "expected 2-3 chunks, got {:?}",
            chunks
        );
        assert!(chunks[0].contains("presiden pertama Indonesia"));
    }
}
