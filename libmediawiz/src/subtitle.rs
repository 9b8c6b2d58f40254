use crate::errors::{MwError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tokio::fs;

/// Upper bound on duplicate-removal passes. Each pass can expose a new duplicate.
const MAX_CLEANING_PASSES: usize = 5;

lazy_static! {
    static ref SRT_BLOCK: Regex = Regex::new(
        r"(?m)(\d+)\s*\n(\d{2}:\d{2}:\d{2},\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2},\d{3})\s*\n((?:.+\n?)+?)(?:\n\s*\n|$)"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub number: usize,
    pub start: String,
    pub end: String,
    pub lines: Vec<String>,
}

impl SubtitleEntry {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    fn text_lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter().filter(|l| !l.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    pub original_entries: usize,
    pub cleaned_entries: usize,
}

pub fn parse_srt(content: &str) -> Vec<SubtitleEntry> {
    let content = content.replace("\r\n", "\n");
    SRT_BLOCK
        .captures_iter(&content)
        .filter_map(|caps| {
            let number = caps[1].parse::<usize>().ok()?;
            Some(SubtitleEntry {
                number,
                start: caps[2].to_string(),
                end: caps[3].to_string(),
                lines: caps[4]
                    .split('\n')
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// One pass: drops the first line of an entry when it repeats the last text line
/// of the entry before it, and drops entries emptied that way.
pub fn remove_duplicates(mut entries: Vec<SubtitleEntry>) -> Vec<SubtitleEntry> {
    let mut keep = vec![true; entries.len()];
    for i in 1..entries.len() {
        let (head, tail) = entries.split_at_mut(i);
        let prev = &head[i - 1];
        let current = &mut tail[0];
        if prev.is_empty() || current.is_empty() {
            continue;
        }
        if current.text_lines().next() == prev.text_lines().last() {
            current.lines.remove(0);
            if current.is_empty() {
                keep[i] = false;
            }
        }
    }
    entries
        .into_iter()
        .zip(keep)
        .filter_map(|(entry, kept)| kept.then_some(entry))
        .collect()
}

pub fn deep_clean(entries: Vec<SubtitleEntry>) -> Vec<SubtitleEntry> {
    let mut cleaned = entries;
    for _ in 0..MAX_CLEANING_PASSES {
        let before = cleaned.len();
        cleaned = remove_duplicates(cleaned);
        if cleaned.len() == before {
            break;
        }
    }
    cleaned.retain(|e| !e.is_empty());
    for (i, entry) in cleaned.iter_mut().enumerate() {
        entry.number = i + 1;
    }
    cleaned
}

pub fn format_srt(entries: &[SubtitleEntry]) -> String {
    let mut lines = Vec::new();
    for entry in entries {
        lines.push(entry.number.to_string());
        lines.push(format!("{} --> {}", entry.start, entry.end));
        lines.extend(entry.lines.iter().cloned());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Reads `input`, removes repeated lines and writes the result to `output`.
#[tracing::instrument]
pub async fn clean_file(input: &Path, output: &Path) -> Result<CleanStats> {
    let raw = fs::read(input).await.map_err(|e| MwError::file_op(input, e))?;
    let entries = parse_srt(&String::from_utf8_lossy(&raw));
    let original_entries = entries.len();
    let cleaned = deep_clean(entries);
    if let Err(e) = fs::write(output, format_srt(&cleaned)).await {
        tracing::error!("Error writing to file : {}\nError : {}", output.display(), e);
        return Err(MwError::file_op(output, e));
    }
    tracing::debug!(
        "Cleaned {} : {} entries -> {}",
        input.display(),
        original_entries,
        cleaned.len()
    );
    Ok(CleanStats {
        original_entries,
        cleaned_entries: cleaned.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLING: &str = "1\n00:00:01,000 --> 00:00:02,000\nhello there\n\n\
2\n00:00:02,000 --> 00:00:03,000\nhello there\ngeneral kenobi\n\n\
3\n00:00:03,000 --> 00:00:04,000\ngeneral kenobi\n\n\
4\n00:00:04,000 --> 00:00:05,000\nyou are a bold one\n";

    #[test]
    fn test_parse_blocks() {
        let entries = parse_srt(ROLLING);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].start, "00:00:02,000");
        assert_eq!(entries[1].lines, vec!["hello there", "general kenobi"]);
        assert_eq!(entries[3].lines, vec!["you are a bold one"]);
    }

    #[test]
    fn test_parse_crlf() {
        let entries = parse_srt(&ROLLING.replace('\n', "\r\n"));
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].lines, vec!["hello there"]);
    }

    #[test]
    fn test_deep_clean_removes_rolling_duplicates() {
        let cleaned = deep_clean(parse_srt(ROLLING));
        let texts: Vec<Vec<String>> = cleaned.iter().map(|e| e.lines.clone()).collect();
        assert_eq!(
            texts,
            vec![
                vec!["hello there".to_string()],
                vec!["general kenobi".to_string()],
                vec!["you are a bold one".to_string()],
            ]
        );
        let numbers: Vec<usize> = cleaned.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_format_round_trips_layout() {
        let cleaned = deep_clean(parse_srt(ROLLING));
        let text = format_srt(&cleaned);
        assert!(text.starts_with("1\n00:00:01,000 --> 00:00:02,000\nhello there\n\n2\n"));
        assert!(text.ends_with("you are a bold one\n"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_srt("").is_empty());
        assert!(deep_clean(Vec::new()).is_empty());
        assert_eq!(format_srt(&[]), "");
    }

    #[tokio::test]
    async fn test_clean_file_writes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("a.en.srt");
        let output = tmp.path().join("a.clean.srt");
        std::fs::write(&input, ROLLING).unwrap();
        let stats = clean_file(&input, &output).await.unwrap();
        assert_eq!(
            stats,
            CleanStats {
                original_entries: 4,
                cleaned_entries: 3
            }
        );
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(parse_srt(&written).len(), 3);
    }

    #[tokio::test]
    async fn test_clean_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let res = clean_file(&tmp.path().join("nope.srt"), &tmp.path().join("out.srt")).await;
        assert!(matches!(res, Err(MwError::FileOperationError { .. })));
    }
}
