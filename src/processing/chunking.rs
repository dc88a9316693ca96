//! Recursive separator chunking with token-bounded overlap.
//!
//! Text is split on a priority-ordered separator list (paragraph break, line
//! break, space, character level), then adjacent pieces are greedily merged
//! back together under the token budget. Separators stay attached to the
//! piece they terminate, so concatenating the emitted chunks while ignoring
//! the overlap windows reconstructs the input byte for byte.
//!
//! Token counts are never summed across pieces; every candidate merge is
//! recounted because tokenizers may merge or split at piece boundaries.

use super::tokenizer::TokenCounter;
use super::types::{Chunk, ChunkingError};

/// Separator priority used by the recursive splitter.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split text into an ordered sequence of token-bounded chunks.
///
/// `overlap_tokens` worth of trailing content from each emitted chunk seeds
/// the next one, clamped below `max_tokens` so a chunk is never pure overlap.
/// Identical inputs and parameters always produce an identical sequence.
pub fn split_text(
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
    counter: &dyn TokenCounter,
) -> Result<Vec<Chunk>, ChunkingError> {
    if max_tokens == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let overlap = overlap_tokens.min(max_tokens.saturating_sub(1));
    let atoms = split_recursive(text, max_tokens, &SEPARATORS, counter);
    Ok(merge_atoms(atoms, max_tokens, overlap, counter))
}

/// Break text into pieces that each fit the budget, descending through the
/// separator priority list. A piece that no separator can reduce is returned
/// as-is and later emitted as its own oversized chunk.
fn split_recursive(
    text: &str,
    max_tokens: usize,
    separators: &[&str],
    counter: &dyn TokenCounter,
) -> Vec<String> {
    if counter.count(text) <= max_tokens {
        return vec![text.to_string()];
    }

    match separators
        .iter()
        .position(|separator| text.contains(separator))
    {
        Some(index) => {
            let mut atoms = Vec::new();
            for piece in split_keeping_separator(text, separators[index]) {
                if counter.count(piece) <= max_tokens {
                    atoms.push(piece.to_string());
                } else {
                    atoms.extend(split_recursive(
                        piece,
                        max_tokens,
                        &separators[index + 1..],
                        counter,
                    ));
                }
            }
            atoms
        }
        // Character level: the merge step packs these back under the budget.
        None => text.chars().map(String::from).collect(),
    }
}

/// Split on `separator`, keeping the separator attached to the preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    while let Some(found) = text[start..].find(separator) {
        let end = start + found + separator.len();
        pieces.push(&text[start..end]);
        start = end;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Greedily merge atoms into chunks under the budget, carrying a token-bounded
/// overlap window across each cut.
fn merge_atoms(
    atoms: Vec<String>,
    max_tokens: usize,
    overlap: usize,
    counter: &dyn TokenCounter,
) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut window: Vec<String> = Vec::new();

    for atom in atoms {
        if !window.is_empty() {
            let mut candidate = window.concat();
            candidate.push_str(&atom);
            if counter.count(&candidate) > max_tokens {
                emit(&mut chunks, window.concat(), counter);
                window = overlap_tail(&window, overlap, counter);
                // The overlap window must leave room for the incoming atom.
                while !window.is_empty() {
                    let mut with_atom = window.concat();
                    with_atom.push_str(&atom);
                    if counter.count(&with_atom) <= max_tokens {
                        break;
                    }
                    window.remove(0);
                }
            }
        }
        window.push(atom);
    }

    if !window.is_empty() {
        emit(&mut chunks, window.concat(), counter);
    }

    chunks
}

/// Longest run of trailing atoms whose recounted total stays within `overlap`.
fn overlap_tail(window: &[String], overlap: usize, counter: &dyn TokenCounter) -> Vec<String> {
    let mut tail: Vec<String> = Vec::new();
    for previous in window.iter().rev() {
        let mut candidate = previous.clone();
        candidate.push_str(&tail.concat());
        if counter.count(&candidate) > overlap {
            break;
        }
        tail.insert(0, previous.clone());
    }
    tail
}

fn emit(chunks: &mut Vec<Chunk>, text: String, counter: &dyn TokenCounter) {
    let token_count = counter.count(&text);
    chunks.push(Chunk {
        sequence_index: chunks.len(),
        text,
        token_count,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::tokenizer::WhitespaceCounter;

    struct CharCounter;

    impl TokenCounter for CharCounter {
        fn count(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    #[test]
    fn short_input_yields_one_identical_chunk() {
        let text = "A. B. C.";
        let chunks = split_text(text, 1000, 200, &WhitespaceCounter).expect("chunks");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].sequence_index, 0);
        // Regression: tail sentences must survive splitting.
        assert!(chunks[0].text.contains("C."));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = split_text("", 4, 0, &WhitespaceCounter).expect("chunks");
        assert!(chunks.is_empty());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let error = split_text("hello", 0, 0, &WhitespaceCounter).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn chunks_respect_the_token_budget() {
        let text = "one two three four five";
        let chunks = split_text(text, 2, 0, &WhitespaceCounter).expect("chunks");
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(WhitespaceCounter.count(&chunk.text) <= 2);
        }
    }

    #[test]
    fn concatenation_without_overlap_reconstructs_input() {
        let text = "First paragraph with several words.\n\nSecond paragraph here.\nThird line of it.\n\nFinal paragraph.";
        let chunks = split_text(text, 4, 0, &WhitespaceCounter).expect("chunks");
        assert!(chunks.len() > 1);
        let rebuilt: String = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn paragraph_breaks_are_preferred_over_word_breaks() {
        let text = "alpha beta\n\ngamma delta";
        let chunks = split_text(text, 2, 0, &WhitespaceCounter).expect("chunks");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "alpha beta\n\n");
        assert_eq!(chunks[1].text, "gamma delta");
    }

    #[test]
    fn overlap_repeats_trailing_content() {
        let text = "one two three four five";
        let chunks = split_text(text, 3, 1, &WhitespaceCounter).expect("chunks");
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["one two three ", "three four five"]);
        for chunk in &chunks {
            assert!(chunk.token_count <= 3);
        }
    }

    #[test]
    fn sequence_indexes_are_contiguous() {
        let text = "a b c d e f g h";
        let chunks = split_text(text, 2, 1, &WhitespaceCounter).expect("chunks");
        for (expected, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, expected);
        }
    }

    #[test]
    fn unbroken_text_falls_back_to_character_packing() {
        let text = "abcdef";
        let chunks = split_text(text, 2, 0, &CharCounter).expect("chunks");
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn irreducible_pieces_are_emitted_alone() {
        struct InflatedCounter;
        impl TokenCounter for InflatedCounter {
            fn count(&self, text: &str) -> usize {
                if text.is_empty() { 0 } else { 3 }
            }
        }

        // Every atom exceeds the budget on its own; each must still be
        // emitted instead of looping forever.
        let chunks = split_text("ab", 2, 0, &InflatedCounter).expect("chunks");
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn identical_inputs_chunk_identically() {
        let text = "alpha beta gamma delta epsilon zeta";
        let first = split_text(text, 3, 1, &WhitespaceCounter).expect("first");
        let second = split_text(text, 3, 1, &WhitespaceCounter).expect("second");
        assert_eq!(first, second);
    }
}
