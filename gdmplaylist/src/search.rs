//! Playlist filtering by name
//!
//! A track matches when its name contains the query (case-insensitive) or
//! when the query spells the start of consecutive syllables of the
//! romanized name. Han characters romanize to toneless pinyin, so `zg`,
//! `zhongg` and `zhongguo` all find `中国`.

use crate::Track;
use pinyin::ToPinyin;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Tracks of `tracks` matching `query`, in their original order
///
/// A blank query returns every track.
pub fn filter_tracks<'a>(tracks: &'a [Track], query: &str) -> Vec<&'a Track> {
    let query = query.trim();
    if query.is_empty() {
        return tracks.iter().collect();
    }

    let matcher = Matcher::new(query);
    tracks.iter().filter(|t| matcher.matches(&t.name)).collect()
}

/// Owned variant of [`filter_tracks`]
pub fn search(tracks: &[Track], query: &str) -> Vec<Track> {
    filter_tracks(tracks, query).into_iter().cloned().collect()
}

/// Precomputed query
#[derive(Debug, Clone)]
pub struct Matcher {
    lowered: String,
    folded: Vec<char>,
}

impl Matcher {
    pub fn new(query: &str) -> Self {
        let query = query.trim();
        Self {
            lowered: query.to_lowercase(),
            folded: romanize(query),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.lowered.is_empty() || name.to_lowercase().contains(&self.lowered) {
            return true;
        }
        if self.folded.is_empty() {
            return false;
        }
        spells_syllables(&self.folded, &syllables(name))
    }
}

/// Lower-cased ASCII letters and digits, diacritics removed
fn fold(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

/// Query as it is compared with syllables: Han characters spelled in
/// pinyin, other letters and digits folded, the rest dropped
fn romanize(query: &str) -> Vec<char> {
    let mut out = Vec::new();
    for c in query.chars() {
        match c.to_pinyin() {
            Some(py) => out.extend(py.plain().chars()),
            None => out.extend(fold_char(c)),
        }
    }
    out
}

/// Folded ASCII letters and digits of one character
fn fold_char(c: char) -> Vec<char> {
    let mut buf = [0u8; 4];
    fold(c.encode_utf8(&mut buf))
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Romanized syllables of `name`
///
/// Each Han character is one syllable, runs of other letters or digits form
/// one syllable per word. Everything else separates syllables.
pub fn syllables(name: &str) -> Vec<Vec<char>> {
    let mut out: Vec<Vec<char>> = Vec::new();
    let mut word: Vec<char> = Vec::new();

    for c in name.chars() {
        if let Some(py) = c.to_pinyin() {
            if !word.is_empty() {
                out.push(std::mem::take(&mut word));
            }
            out.push(py.plain().chars().collect());
            continue;
        }

        let folded = fold_char(c);
        if folded.is_empty() {
            if !word.is_empty() {
                out.push(std::mem::take(&mut word));
            }
        } else {
            word.extend(folded);
        }
    }
    if !word.is_empty() {
        out.push(word);
    }
    out
}

/// Whether `query` splits into non-empty prefixes of consecutive syllables
fn spells_syllables(query: &[char], syllables: &[Vec<char>]) -> bool {
    let n = query.len();
    // reachable[p]: query[..p] spelled by prefixes of the syllables seen so far
    let mut reachable = vec![false; n + 1];

    for syllable in syllables {
        reachable[0] = true;
        let mut next = vec![false; n + 1];
        for p in 0..n {
            if !reachable[p] {
                continue;
            }
            for (k, c) in syllable.iter().enumerate() {
                if p + k >= n || query[p + k] != *c {
                    break;
                }
                next[p + k + 1] = true;
            }
        }
        if next[n] {
            return true;
        }
        reachable = next;
    }
    false
}
