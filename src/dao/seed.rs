//! Static dictionary source loaded once at startup.

use std::{fs, io::ErrorKind, path::Path};

use tracing::{info, warn};

/// Environment variable pointing at the one-phrase-per-line dictionary file.
pub const DICT_PATH_ENV: &str = "DICT_PATH";
/// Dictionary file used when [`DICT_PATH_ENV`] is unset.
pub const DEFAULT_DICT_PATH: &str = "dict_vi.txt";

/// Small built-in phrase list used when no dictionary file is available.
const FALLBACK_SEED: &[&str] = &[
    "xinh xắn",
    "hiền hậu",
    "mạnh mẽ",
    "hoa hồng",
    "hoa cúc",
    "bánh mì",
    "nước mía",
    "cà phê",
    "bờ biển",
    "trường học",
    "công viên",
    "bầu trời",
    "mặt trăng",
    "con mèo",
    "con chó",
];

/// Parse dictionary text: one entry per line, lowercased, skipping blank lines
/// and lines made only of digits, whitespace or punctuation.
pub fn parse_dictionary(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|line| line.chars().any(char::is_alphabetic))
        .collect()
}

/// Load the dictionary at `path`, falling back to the built-in seed when the
/// file is missing, unreadable or empty.
pub fn load_dictionary(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let words = parse_dictionary(&contents);
            if !words.is_empty() {
                info!(path = %path.display(), count = words.len(), "loaded dictionary");
                return words;
            }
            warn!(path = %path.display(), "dictionary file is empty; using fallback seed");
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "dictionary file not found; using fallback seed");
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read dictionary; using fallback seed");
        }
    }
    FALLBACK_SEED.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_noise_and_normalizes() {
        let words = parse_dictionary("Con  Mèo\n\n123\n--- ;\nbánh mì\n");
        assert_eq!(words, vec!["con mèo".to_string(), "bánh mì".to_string()]);
    }

    #[test]
    fn missing_file_uses_fallback() {
        let words = load_dictionary(Path::new("/definitely/not/here.txt"));
        assert!(words.contains(&"con mèo".to_string()));
        assert_eq!(words.len(), FALLBACK_SEED.len());
    }
}
