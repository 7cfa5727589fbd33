// Line-window chunking for the text search store

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Extension (without dot) to language tag
static EXTENSION_LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("py", "python"),
        ("pyi", "python"),
        ("js", "javascript"),
        ("jsx", "javascript"),
        ("mjs", "javascript"),
        ("cjs", "javascript"),
        ("ts", "typescript"),
        ("mts", "typescript"),
        ("cts", "typescript"),
        ("tsx", "typescript"),
        ("go", "go"),
        ("rs", "rust"),
        ("java", "java"),
        ("kt", "kotlin"),
        ("scala", "scala"),
        ("c", "c"),
        ("h", "c"),
        ("cpp", "cpp"),
        ("cc", "cpp"),
        ("hpp", "cpp"),
        ("cs", "csharp"),
        ("rb", "ruby"),
        ("php", "php"),
        ("swift", "swift"),
        ("lua", "lua"),
        ("md", "markdown"),
        ("mdx", "markdown"),
        ("rst", "rst"),
        ("html", "html"),
        ("htm", "html"),
        ("json", "json"),
        ("toml", "toml"),
        ("yaml", "yaml"),
        ("yml", "yaml"),
        ("proto", "proto"),
    ])
});

/// Language tag for a path, by extension
pub fn detect_language(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_LANGUAGES.get(ext.as_str()).copied()
}

/// A contiguous slice of a file, 1-based inclusive lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub file_path: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: Option<String>,
}

/// Splits file content into ordered chunks
pub trait Chunker: Send + Sync {
    fn chunk(&self, path: &str, content: &str) -> Vec<Chunk>;
}

/// Packs whole lines into windows of at most `chunk_size` bytes (a single
/// longer line becomes its own chunk). Consecutive windows share up to
/// `chunk_overlap` bytes of trailing lines.
#[derive(Debug, Clone)]
pub struct LineChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl LineChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }
}

impl Default for LineChunker {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl Chunker for LineChunker {
    fn chunk(&self, path: &str, content: &str) -> Vec<Chunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = content.lines().collect();
        let language = detect_language(path).map(str::to_string);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < lines.len() {
            let mut end = start;
            let mut size = 0;
            while end < lines.len() {
                let len = lines[end].len() + 1;
                if end > start && size + len > self.chunk_size {
                    break;
                }
                size += len;
                end += 1;
            }

            chunks.push(Chunk {
                file_path: path.to_string(),
                content: lines[start..end].join("\n"),
                start_line: start + 1,
                end_line: end,
                language: language.clone(),
            });

            if end >= lines.len() {
                break;
            }

            // Step back over trailing lines that fit in the overlap, always
            // moving forward by at least one line
            let mut next = end;
            let mut overlap = 0;
            while next > start + 1 {
                let len = lines[next - 1].len() + 1;
                if overlap + len > self.chunk_overlap {
                    break;
                }
                overlap += len;
                next -= 1;
            }
            start = next;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("src/main.rs"), Some("rust"));
        assert_eq!(detect_language("App.TSX"), Some("typescript"));
        assert_eq!(detect_language("Makefile"), None);
    }

    #[test]
    fn test_empty_content_has_no_chunks() {
        let chunker = LineChunker::default();
        assert!(chunker.chunk("a.py", "").is_empty());
        assert!(chunker.chunk("a.py", "\n\n  \n").is_empty());
    }

    #[test]
    fn test_small_file_is_one_chunk() {
        let chunker = LineChunker::default();
        let chunks = chunker.chunk("a.py", "def f():\n    pass\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
        assert_eq!(chunks[0].language.as_deref(), Some("python"));
        assert_eq!(chunks[0].content, "def f():\n    pass");
    }

    #[test]
    fn test_windows_overlap() {
        // Ten 9-byte lines (with newline), 30-byte windows, 10-byte overlap
        let content: String = (0..10).map(|i| format!("line {:03}\n", i)).collect();
        let chunks = LineChunker::new(30, 10).chunk("notes.md", &content);

        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (3, 5));
        assert_eq!(chunks.last().unwrap().end_line, 10);
    }

    #[test]
    fn test_long_line_is_not_split() {
        let long = "x".repeat(50);
        let content = format!("a\n{}\nb\n", long);
        let chunks = LineChunker::new(10, 0).chunk("a.txt", &content);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, long);
        assert_eq!(chunks[1].language, None);
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_file_in_order(
            lines in prop::collection::vec("[a-z ]{0,40}", 1..80),
            size in 1usize..200,
            overlap in 0usize..100,
        ) {
            let content = lines.join("\n");
            prop_assume!(!content.trim().is_empty());
            let total = content.lines().count();
            let chunks = LineChunker::new(size, overlap).chunk("f.py", &content);

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].start_line, 1);
            prop_assert_eq!(chunks.last().unwrap().end_line, total);
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].start_line > pair[0].start_line);
                prop_assert!(pair[1].start_line <= pair[0].end_line + 1);
            }
            for chunk in &chunks {
                prop_assert!(chunk.start_line <= chunk.end_line);
            }
        }
    }
}
