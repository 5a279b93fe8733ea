//! ROM database lookups
//!
//! Database files are plain text with one entry per line. An entry is keyed either by a
//! lowercase MD5 hex string or by `ID:` followed by a cart ID pattern where '_' matches any
//! character. The key is followed by whitespace and a tag list, optionally terminated by a `#`
//! or `;` comment.
//!
//! ```text
//! 0123456789abcdef0123456789abcdef sram32k|cpak    # comment
//! ID:NSM___ eeprom512|rpak
//! ID:ND        cic6105
//! ```

use crate::header::CartId;
use n64_common::frontend::ResourceReader;
use regex::Regex;
use std::sync::LazyLock;

/// Databases in search order: the user's overrides first, then the bundled database.
pub const DATABASE_FILE_NAMES: &[&str] = &["N64-database_user.txt", "N64-database.txt"];

const HASH_HEX_LEN: usize = 32;
const CART_ID_PREFIX: &str = "ID:";

static TAG_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]+([^ \t#;][^#;]*)").unwrap());

/// Whether `line` begins with the given lowercase hex digest (compared case-insensitively).
#[must_use]
pub fn hash_matches(line: &str, hash_hex: &str) -> bool {
    let line = line.as_bytes();
    line.len() >= HASH_HEX_LEN
        && hash_hex.len() == HASH_HEX_LEN
        && line[..HASH_HEX_LEN]
            .iter()
            .zip(hash_hex.as_bytes())
            .all(|(&l, &h)| l.to_ascii_lowercase() == h)
}

/// Match a database line against a cart ID.
///
/// Returns 0 if the line is not an ID entry or does not match, the number of pattern characters
/// consumed if the pattern ends early (whitespace after at least one character), or
/// [`CartId::LEN`] for a complete match.
#[must_use]
pub fn cart_id_is_match(line: &str, cart_id: &CartId) -> usize {
    let Some(pattern) = line.strip_prefix(CART_ID_PREFIX) else {
        return 0;
    };

    for (i, (&p, &c)) in pattern.as_bytes().iter().zip(cart_id.as_bytes()).enumerate() {
        if i != 0 && p.is_ascii_whitespace() {
            return i;
        }

        if p != b'_' && p != c {
            return 0;
        }
    }

    CartId::LEN
}

/// Extract the tag list from the remainder of a line after its key.
#[must_use]
pub fn extract_tags(rest: &str) -> Option<&str> {
    TAG_FIELD_RE.captures(rest).and_then(|captures| captures.get(1)).map(|m| m.as_str().trim_end())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    pub file_name: &'static str,
    pub tags: String,
}

/// Search `contents` line by line; `key_len` returns the key length of a matching line.
fn find_entry(
    file_name: &'static str,
    contents: &str,
    key: &str,
    key_len: impl Fn(&str) -> Option<usize>,
) -> Option<DatabaseEntry> {
    for line in contents.lines() {
        let Some(len) = key_len(line) else { continue };

        match line.get(len..).and_then(extract_tags) {
            Some(tags) => {
                log::info!("Found ROM entry for [{key}] in {file_name}: {tags}");
                return Some(DatabaseEntry { file_name, tags: tags.into() });
            }
            None => {
                log::warn!(
                    "Found ROM entry for [{key}] in {file_name}, but the tag was malformed: {line}"
                );
            }
        }
    }

    None
}

pub struct KnowledgeBase<'a, R> {
    reader: &'a mut R,
    file_names: &'static [&'static str],
}

impl<'a, R: ResourceReader> KnowledgeBase<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Self::with_file_names(reader, DATABASE_FILE_NAMES)
    }

    pub fn with_file_names(reader: &'a mut R, file_names: &'static [&'static str]) -> Self {
        Self { reader, file_names }
    }

    fn search(
        &mut self,
        key: &str,
        key_len: impl Fn(&str) -> Option<usize>,
    ) -> Option<DatabaseEntry> {
        for &file_name in self.file_names {
            let contents = match self.reader.read_text(file_name) {
                Ok(contents) => contents,
                Err(err) => {
                    log::warn!("Failed to open N64 database file {file_name}: {err}");
                    continue;
                }
            };

            if let Some(entry) = find_entry(file_name, &contents, key, &key_len) {
                return Some(entry);
            }
        }

        None
    }

    /// Look up an entry by MD5 hash (lowercase hex).
    pub fn find_by_hash(&mut self, hash_hex: &str) -> Option<DatabaseEntry> {
        self.search(hash_hex, |line| hash_matches(line, hash_hex).then_some(HASH_HEX_LEN))
    }

    /// Look up an entry by cart ID. IDs that are not fully alphanumeric are never looked up.
    pub fn find_by_cart_id(&mut self, cart_id: &CartId) -> Option<DatabaseEntry> {
        if !cart_id.is_lookup_eligible() {
            log::info!("Not a valid Cart ID: [{cart_id}]");
            return None;
        }

        self.search(cart_id.as_str(), |line| match cart_id_is_match(line, cart_id) {
            0 => None,
            matched => Some(CART_ID_PREFIX.len() + matched),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemResources;
    use test_log::test;

    const HASH: &str = "0123456789abcdef0123456789abcdef";

    fn cart_id(s: &str) -> CartId {
        let mut chunk = [0_u8; 0x40];
        chunk[0x3B..0x3F].copy_from_slice(&s.as_bytes()[..4]);
        chunk[0x3F] = u8::from_str_radix(&s[4..6], 16).unwrap();
        CartId::from_header(&chunk).unwrap()
    }

    #[test]
    fn hash_match_is_case_insensitive() {
        assert!(hash_matches(&format!("{} sram32k", HASH.to_uppercase()), HASH));
        assert!(hash_matches(HASH, HASH));
        assert!(!hash_matches(&HASH[..31], HASH));
        assert!(!hash_matches("ID:NSME00 eeprom512", HASH));
    }

    #[test]
    fn cart_id_full_and_wildcard_matches() {
        let id = cart_id("NSME00");
        assert_eq!(cart_id_is_match("ID:NSME00 eeprom512", &id), 6);
        assert_eq!(cart_id_is_match("ID:NS__0_ eeprom512", &id), 6);
        assert_eq!(cart_id_is_match("ID:______ eeprom512", &id), 6);
        assert_eq!(cart_id_is_match("ID:NSMP00 eeprom512", &id), 0);
        assert_eq!(cart_id_is_match("NSME00 eeprom512", &id), 0);
    }

    #[test]
    fn cart_id_early_termination() {
        let id = cart_id("NSME00");
        assert_eq!(cart_id_is_match("ID:NSM eeprom512", &id), 3);
        assert_eq!(cart_id_is_match("ID:N\teeprom512", &id), 1);
        // Leading whitespace is a mismatch, not an early termination
        assert_eq!(cart_id_is_match("ID: NSME00", &id), 0);
    }

    #[test]
    fn cart_id_match_agrees_with_char_comparison() {
        let id = cart_id("CZLE10");
        let id_bytes = id.as_bytes();

        // Every wildcard mask over the 6 positions, with and without an early terminator
        for mask in 0..64_u32 {
            let pattern: String = (0..6)
                .map(|i| if mask & (1 << i) != 0 { '_' } else { char::from(id_bytes[i]) })
                .collect();
            assert_eq!(cart_id_is_match(&format!("ID:{pattern} tags"), &id), 6);

            for len in 1..6 {
                let line = format!("ID:{} tags", &pattern[..len]);
                assert_eq!(cart_id_is_match(&line, &id), len, "{line}");
            }

            let mut mismatched = pattern.into_bytes();
            let position = (mask % 6) as usize;
            mismatched[position] = b'X';
            let line = format!("ID:{} tags", String::from_utf8(mismatched).unwrap());
            assert_eq!(cart_id_is_match(&line, &id), 0, "{line}");
        }
    }

    #[test]
    fn tag_extraction() {
        assert_eq!(extract_tags(" sram32k|cpak # comment"), Some("sram32k|cpak"));
        assert_eq!(extract_tags("\t\teeprom2k;comment"), Some("eeprom2k"));
        assert_eq!(extract_tags("sram32k"), None);
        assert_eq!(extract_tags("   # only a comment"), None);
        assert_eq!(extract_tags(""), None);
    }

    #[test]
    fn user_database_takes_precedence() {
        let mut resources = MemResources::default()
            .with("N64-database_user.txt", &format!("{HASH} flash128k\n"))
            .with("N64-database.txt", &format!("{HASH} sram32k\n"));

        let entry = KnowledgeBase::new(&mut resources).find_by_hash(HASH).unwrap();
        assert_eq!(entry.file_name, "N64-database_user.txt");
        assert_eq!(entry.tags, "flash128k");
    }

    #[test]
    fn missing_database_falls_through() {
        let mut resources =
            MemResources::default().with("N64-database.txt", "ID:NSM sram32k|rpak\n");

        let entry = KnowledgeBase::new(&mut resources).find_by_cart_id(&cart_id("NSME00")).unwrap();
        assert_eq!(entry.file_name, "N64-database.txt");
        assert_eq!(entry.tags, "sram32k|rpak");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let mut resources = MemResources::default().with(
            "N64-database.txt",
            &format!("{HASH}#nothing here\n{HASH}   eeprom512|cpak   ; trailing\n"),
        );

        let entry = KnowledgeBase::new(&mut resources).find_by_hash(HASH).unwrap();
        assert_eq!(entry.tags, "eeprom512|cpak");
    }

    #[test]
    fn blank_tag_field_is_malformed() {
        assert_eq!(extract_tags("    # todo"), None);
        assert_eq!(extract_tags(" \t ;"), None);
        assert_eq!(extract_tags("  \t  "), None);

        let mut resources = MemResources::default()
            .with("N64-database_user.txt", &format!("{HASH}    # todo\n"))
            .with("N64-database.txt", &format!("{HASH} sram32k\n"));

        let entry = KnowledgeBase::new(&mut resources).find_by_hash(HASH).unwrap();
        assert_eq!(entry.file_name, "N64-database.txt");
        assert_eq!(entry.tags, "sram32k");
    }

    #[test]
    fn ineligible_cart_ids_are_not_looked_up() {
        let mut resources = MemResources::default().with("N64-database.txt", "ID:______ sram32k\n");

        let mut id_chunk = [0_u8; 0x40];
        id_chunk[0x3B..0x3F].copy_from_slice(b"N-ME");
        let id = CartId::from_header(&id_chunk).unwrap();

        assert_eq!(KnowledgeBase::new(&mut resources).find_by_cart_id(&id), None);
    }
}
