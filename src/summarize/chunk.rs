//! Splits long article text into overlapping chunks for the map-reduce
//! summarization path (§4.6). Boundaries fall on paragraph breaks first,
//! sentence breaks second, and only cut mid-word as a last resort, using
//! `unicode-segmentation` the way the teacher leans on it for entity token
//! matching rather than a byte-offset splitter.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

pub fn chunk_text(text: &str, cfg: &ChunkingConfig) -> Vec<String> {
    if text.chars().count() <= cfg.chunking_threshold {
        return vec![text.to_string()];
    }

    let paragraphs: Vec<&str> = text.split("\n\n").filter(|p| !p.trim().is_empty()).collect();
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        if current.chars().count() + paragraph.chars().count() > cfg.max_chunk_size && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.chars().count() > cfg.max_chunk_size {
            for piece in split_by_sentence(paragraph, cfg.chunk_size) {
                chunks.push(piece);
            }
            continue;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);

        if current.chars().count() >= cfg.chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    apply_overlap(chunks, cfg.chunk_overlap)
}

fn split_by_sentence(paragraph: &str, target_size: usize) -> Vec<String> {
    let sentences: Vec<&str> = paragraph.unicode_sentences().collect();
    let mut out = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if current.chars().count() + sentence.chars().count() > target_size && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        current.push_str(sentence);
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

/// Prepends the tail of the previous chunk to each subsequent chunk so the
/// summarizer never loses context sitting right on a chunk boundary.
fn apply_overlap(chunks: Vec<String>, overlap: usize) -> Vec<String> {
    if chunks.len() <= 1 || overlap == 0 {
        return chunks;
    }

    let mut out = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push(chunk.clone());
            continue;
        }
        let prev = &chunks[i - 1];
        let tail: String = prev.chars().rev().take(overlap).collect::<Vec<_>>().into_iter().rev().collect();
        out.push(format!("{}{}", tail, chunk));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ChunkingConfig {
        ChunkingConfig {
            chunking_threshold: 50,
            chunk_size: 40,
            max_chunk_size: 60,
            chunk_overlap: 5,
        }
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = chunk_text("short text", &cfg());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_text_splits_into_multiple_chunks() {
        let text = "Paragraph one is here.\n\nParagraph two follows right after it.\n\nAnd a third paragraph completes the set.";
        let chunks = chunk_text(text, &cfg());
        assert!(chunks.len() > 1);
    }
}
