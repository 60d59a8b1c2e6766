use super::estimate_token_count as estimate_token_count_impl;
use super::*;

fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        chunk_overlap,
    }
}

#[test]
fn estimate_token_count() {
    assert_eq!(estimate_token_count_impl("hello world"), 2);
    assert_eq!(estimate_token_count_impl("This is a test."), 5);
    assert_eq!(estimate_token_count_impl(""), 0);
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = split_text(
        "  Every validator must have type, message, and active fields.\n",
        &ChunkingConfig::default(),
    );
    assert_eq!(
        chunks,
        vec!["Every validator must have type, message, and active fields.".to_string()]
    );
}

#[test]
fn blank_text_produces_no_chunks() {
    assert!(split_text("", &ChunkingConfig::default()).is_empty());
    assert!(split_text("\n\n   \n", &ChunkingConfig::default()).is_empty());
}

#[test]
fn paragraphs_are_preferred_boundaries() {
    let chunks = split_text("aaaa bbbb\n\ncccc dddd", &config(15, 0));
    assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd"]);
}

#[test]
fn paragraphs_that_fit_are_merged() {
    let chunks = split_text("aaaa bbbb\n\ncccc dddd", &config(20, 0));
    assert_eq!(chunks, vec!["aaaa bbbb\n\ncccc dddd"]);
}

#[test]
fn overlap_repeats_trailing_words() {
    let chunks = split_text("one two three four five six", &config(10, 4));
    assert_eq!(chunks, vec!["one two", "two three", "four five", "five six"]);
}

#[test]
fn unbroken_text_falls_back_to_characters() {
    let chunks = split_text("abcdefghijklmnopqrstuvwxy", &config(10, 0));
    assert_eq!(chunks, vec!["abcdefghij", "klmnopqrst", "uvwxy"]);
}

#[test]
fn lengths_are_counted_in_characters() {
    let text = "é".repeat(25);
    let chunks = split_text(&text, &config(10, 0));
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
}

#[test]
fn chunks_never_exceed_chunk_size() {
    let paragraph = "Validators describe rules. Every validator must have type, message, and active fields.\nA schema lists its validators in order. ";
    let document = (0..40)
        .map(|i| format!("## Section {}\n\n{}", i, paragraph.repeat(i % 5 + 1)))
        .collect::<Vec<_>>()
        .join("\n\n");

    let config = ChunkingConfig::default();
    let chunks = split_text(&document, &config);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(
            chunk.chars().count() <= config.chunk_size,
            "chunk of {} characters exceeds limit",
            chunk.chars().count()
        );
        assert_eq!(chunk.trim(), chunk);
    }
    assert!(chunks.iter().any(|c| c.contains("Section 39")));
}
