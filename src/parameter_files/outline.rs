use crate::errors::CverError;
use std::path::Path;

const INDENT_WIDTH: usize = 2;
const UTF8_BOM: char = '\u{feff}';

/// One `key=value` line of an outline-format parameter file.
#[derive(Clone, Debug, PartialEq)]
pub struct OutlineEntry {
    pub key: String,
    pub value: String,
    /// Nesting depth, from the number of leading two-space indents.
    pub level: usize,
    /// Key of the closest enclosing entry one level up, if any.
    pub section: Option<String>,
}

/// Ordered key/value content of a `.PAN` or `.OND` file.
///
/// Keys may repeat (every curve point of every section is called `Point_n`), so entries keep
/// file order and lookups return either the first match or all of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
}

impl Outline {
    /// Read a parameter file from disk, decoding it as UTF-8 and falling back to ISO-8859-1.
    pub fn from_path(path: &Path) -> Result<Self, CverError> {
        let bytes = std::fs::read(path).map_err(|e| CverError::MalformedParameterFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let text = decode_text(&bytes).ok_or_else(|| CverError::MalformedParameterFile {
            path: path.to_path_buf(),
            reason: "content is neither valid UTF-8 nor ISO-8859-1 text".to_string(),
        })?;
        Self::parse(&text).map_err(|reason| CverError::MalformedParameterFile {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse outline text. A line with more than two `=` separators has no defined key and
    /// rejects the whole file.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        // key of the latest entry seen at each depth
        let mut open_sections: Vec<String> = vec![];
        let mut entries = vec![];

        for (index, line) in text.lines().enumerate() {
            let stripped = line.trim_start_matches(' ');
            let level = (line.len() - stripped.len()) / INDENT_WIDTH;

            let parts: Vec<&str> = stripped.split('=').collect();
            let (key, value) = match parts.as_slice() {
                [key, value] => (key.trim().to_string(), value.trim().to_string()),
                [first, second, value] => (
                    format!("{} {}", first.trim(), second.trim()),
                    value.trim().to_string(),
                ),
                [_] => continue,
                _ => {
                    return Err(format!(
                        "line {}: '{}' has more than two '=' separators",
                        index + 1,
                        stripped.trim_end()
                    ))
                }
            };

            open_sections.truncate(level);
            let section = level
                .checked_sub(1)
                .and_then(|parent| open_sections.get(parent))
                .cloned();
            while open_sections.len() < level {
                open_sections.push(String::new());
            }
            open_sections.push(key.clone());

            entries.push(OutlineEntry {
                key,
                value,
                level,
                section,
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a OutlineEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.key == key)
    }

    /// Entries nested directly under a section whose key equals `section`.
    pub fn section(&self, section: &str) -> Vec<&OutlineEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.section.as_deref() == Some(section))
            .collect()
    }
}

/// Decode bytes as UTF-8, or failing that as ISO-8859-1.
///
/// ISO-8859-1 maps every byte to a code point, so the fallback only accepts printable text:
/// NUL and the C1 control range (0x80-0x9F) mark the content as binary rather than Latin-1.
pub(crate) fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }
    if bytes.iter().any(|&b| b == 0 || (0x80..=0x9f).contains(&b)) {
        return None;
    }
    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Parse a `x,y` pair such as a curve point value.
pub(crate) fn parse_point(value: &str) -> Option<(f64, f64)> {
    let mut parts = value.split(',');
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn pan_excerpt() -> String {
        [
            "\u{feff}PVObject_=pvModule",
            "  Version=7.2.8",
            "  Technol=mtSiMono",
            "  PVObject_IAM=pvIAM",
            "    Flags=$00",
            "    IAMMode=UserProfile",
            "    IAMProfile=TCubicProfile",
            "      NPtsMax=9",
            "      Point_1=0.0,1.00000",
            "      Point_2=40.0,0.99900",
            "    End of TCubicProfile",
            "  End of PVObject_IAM",
            "  Remarks, Count=2",
            "  OperPoints, list of=2 tOperPoint",
            "    Point_1=False=800,25.0",
            "End of PVObject pvModule",
        ]
        .join("\r\n")
    }

    #[rstest]
    fn test_parse_strips_bom_and_reads_keys(pan_excerpt: String) {
        let outline = Outline::parse(&pan_excerpt).unwrap();
        assert_eq!(outline.entries()[0].key, "PVObject_");
        assert_eq!(outline.first("Technol"), Some("mtSiMono"));
        assert_eq!(outline.first("Version"), Some("7.2.8"));
    }

    #[rstest]
    fn test_parse_tracks_level_and_section(pan_excerpt: String) {
        let outline = Outline::parse(&pan_excerpt).unwrap();
        let point = outline.all("Point_2").next().unwrap();
        assert_eq!(point.level, 3);
        assert_eq!(point.section.as_deref(), Some("IAMProfile"));
        assert_eq!(outline.section("IAMProfile").len(), 3);
    }

    #[rstest]
    fn test_three_part_line_joins_first_two_parts(pan_excerpt: String) {
        let outline = Outline::parse(&pan_excerpt).unwrap();
        assert_eq!(outline.first("OperPoints, list of"), Some("2 tOperPoint"));
        assert_eq!(outline.first("Point_1 False"), Some("800,25.0"));
    }

    #[rstest]
    fn test_lines_without_separator_are_skipped(pan_excerpt: String) {
        let outline = Outline::parse(&pan_excerpt).unwrap();
        assert!(outline
            .entries()
            .iter()
            .all(|entry| !entry.key.starts_with("End of")));
    }

    #[rstest]
    fn test_line_with_four_parts_is_rejected() {
        let error = Outline::parse("PVObject_=pvModule\n  Point_1=False=800=25.0").unwrap_err();
        assert!(error.starts_with("line 2:"), "{error}");
    }

    #[rstest]
    fn test_file_with_four_part_line_is_malformed() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("broken.PAN");
        std::fs::write(&path, "PVObject_=pvModule\n  a=b=c=d\n").unwrap();
        assert!(matches!(
            Outline::from_path(&path),
            Err(CverError::MalformedParameterFile { .. })
        ));
    }

    #[rstest]
    fn test_decode_text_falls_back_to_latin1() {
        assert_eq!(decode_text(b"Remarks=M\xf3dulo").unwrap(), "Remarks=Módulo");
    }

    #[rstest]
    fn test_decode_text_rejects_binary_content() {
        assert_eq!(decode_text(&[0x50, 0x00, 0x81, 0xff]), None);
    }

    #[rstest]
    #[case("10.0,0.98", Some((10., 0.98)))]
    #[case("abc", None)]
    fn test_parse_point(#[case] value: &str, #[case] expected: Option<(f64, f64)>) {
        assert_eq!(parse_point(value), expected);
    }
}
