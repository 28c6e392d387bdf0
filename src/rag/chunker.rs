pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub index: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Word-window chunking with overlap. Sizes are word counts.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        let mut index = 0;

        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            let chunk_words = &words[start..end];
            let content = chunk_words.join(" ");

            if !content.trim().is_empty() {
                chunks.push(Chunk { content, index });
                index += 1;
            }

            if end >= words.len() {
                break;
            }

            start = end.saturating_sub(self.chunk_overlap);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_produces_no_chunks() {
        let chunker = TextChunker::new(100, 10);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t ").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = TextChunker::new(100, 10);
        let chunks = chunker.chunk("alpha beta gamma");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "alpha beta gamma");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn long_text_overlaps_between_chunks() {
        let chunker = TextChunker::new(10, 2);
        let words: Vec<String> = (0..25).map(|i| format!("w{}", i)).collect();
        let chunks = chunker.chunk(&words.join(" "));

        assert!(chunks.len() > 1);
        // Last two words of a chunk reappear at the start of the next.
        let first: Vec<&str> = chunks[0].content.split_whitespace().collect();
        let second: Vec<&str> = chunks[1].content.split_whitespace().collect();
        assert_eq!(&first[first.len() - 2..], &second[..2]);
        assert_eq!(chunks[1].index, 1);
    }
}
