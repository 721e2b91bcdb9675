// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Control file primitives.

Control files are RFC 822 style text: paragraphs of `Name: value` fields
separated by blank lines. A value continues on following lines that begin
with a space or tab. See
<https://www.debian.org/doc/debian-policy/ch-controlfields.html>.
*/

use {
    crate::error::{DebianError, Result},
    std::{
        borrow::Cow,
        fmt::{Display, Formatter},
        io::{BufRead, Write},
    },
};

/// A `Name: value` pair.
///
/// The value is stored as it appears after the colon, continuation lines
/// included.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlField<'a> {
    name: Cow<'a, str>,
    value: Cow<'a, str>,
}

impl<'a> ControlField<'a> {
    pub fn new(name: Cow<'a, str>, value: Cow<'a, str>) -> Self {
        Self { name, value }
    }

    /// Construct a multiline field from logical lines.
    ///
    /// Lines after the first are indented by a space. Empty lines are encoded
    /// as ` .`.
    pub fn from_lines(name: Cow<'a, str>, lines: impl Iterator<Item = String>) -> Self {
        let mut value = String::new();

        for (i, line) in lines.enumerate() {
            if i > 0 {
                value.push('\n');
                value.push_str(if line.trim().is_empty() { " ." } else { " " });
            }
            if !line.trim().is_empty() {
                value.push_str(&line);
            }
        }

        Self {
            name,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw value, including continuation lines and their indentation.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The value as logical lines.
    ///
    /// This inverts [Self::from_lines]: indentation is removed from
    /// continuation lines and ` .` becomes an empty line.
    pub fn logical_lines(&self) -> Vec<String> {
        let mut lines = self.value.lines();
        let mut res = vec![];

        if let Some(first) = lines.next() {
            res.push(first.to_string());
        }

        for line in lines {
            let line = match line.chars().next() {
                Some(' ') | Some('\t') => &line[1..],
                _ => line,
            };

            res.push(if line.trim() == "." {
                String::new()
            } else {
                line.to_string()
            });
        }

        res
    }
}

impl<'a> Display for ControlField<'a> {
    /// Blank continuation lines would end the paragraph and are dropped.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.name)?;

        for (i, line) in self.value.lines().enumerate() {
            if i == 0 {
                if !line.is_empty() {
                    write!(f, " {}", line)?;
                }
            } else if !line.trim().is_empty() {
                write!(f, "\n{}", line)?;
            }
        }

        writeln!(f)
    }
}

/// An ordered set of fields.
///
/// Names compare case insensitively. Setting a field that is already present
/// replaces it.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ControlParagraph<'a> {
    fields: Vec<ControlField<'a>>,
}

impl<'a> ControlParagraph<'a> {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Set a field, replacing any field of the same name.
    pub fn set_field(&mut self, field: ControlField<'a>) {
        self.fields
            .retain(|existing| !existing.name.eq_ignore_ascii_case(&field.name));
        self.fields.push(field);
    }

    pub fn set_field_from_string(&mut self, name: Cow<'a, str>, value: Cow<'a, str>) {
        self.set_field(ControlField::new(name, value));
    }

    /// Set a field unless its value is blank.
    pub fn set_field_if_not_empty(&mut self, name: &'a str, value: impl Into<Cow<'a, str>>) {
        let value = value.into();

        if !value.trim().is_empty() {
            self.set_field_from_string(Cow::Borrowed(name), value);
        }
    }

    /// Fields in insertion order.
    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField<'a>> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&ControlField<'a>> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(ControlField::value)
    }

    /// A field interpreted as a boolean: `yes` is true, anything else false.
    pub fn field_bool(&self, name: &str) -> Option<bool> {
        self.field_str(name).map(|v| v == "yes")
    }

    pub fn field_u64(&self, name: &str) -> Option<Result<u64>> {
        self.field_str(name).map(|v| {
            v.parse::<u64>().map_err(|e| {
                DebianError::ControlParseError(format!("field {} is not an integer: {}", name, e))
            })
        })
    }

    /// Write the paragraph. No blank line is written after the last field.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write!(writer, "{}", self)
    }
}

impl<'a> Display for ControlParagraph<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for field in &self.fields {
            write!(f, "{}", field)?;
        }

        Ok(())
    }
}

/// Classification of a line of control text.
enum Line<'l> {
    Blank,
    Continuation(&'l str),
    Field(&'l str, &'l str),
}

impl<'l> Line<'l> {
    fn classify(line: &'l str) -> Result<Self> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        if line.trim().is_empty() {
            Ok(Self::Blank)
        } else if line.starts_with(' ') || line.starts_with('\t') {
            Ok(Self::Continuation(line))
        } else {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                DebianError::ControlParseError(format!("missing colon in line '{}'", line))
            })?;

            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(DebianError::ControlParseError(format!(
                    "invalid field name '{}'",
                    name
                )));
            }

            Ok(Self::Field(name, value.trim()))
        }
    }
}

/// A streaming reader of control paragraphs.
///
/// Iteration yields one paragraph per run of field lines. Multiple blank
/// lines between paragraphs are tolerated.
pub struct ControlParagraphReader<R: BufRead> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> ControlParagraphReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_paragraph(&mut self) -> Result<Option<ControlParagraph<'static>>> {
        let mut paragraph = ControlParagraph::default();
        let mut pending: Option<(String, String)> = None;

        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                self.finished = true;
                break;
            }

            match Line::classify(&self.line)? {
                Line::Blank if pending.is_none() && paragraph.is_empty() => {}
                Line::Blank => break,
                Line::Continuation(text) => match pending.as_mut() {
                    Some((_, value)) => {
                        value.push('\n');
                        value.push_str(text);
                    }
                    None => {
                        return Err(DebianError::ControlParseError(format!(
                            "continuation line without a field: {}",
                            text.trim()
                        )))
                    }
                },
                Line::Field(name, value) => {
                    if let Some((name, value)) = pending.take() {
                        paragraph.set_field_from_string(name.into(), value.into());
                    }
                    pending = Some((name.to_string(), value.to_string()));
                }
            }
        }

        if let Some((name, value)) = pending {
            paragraph.set_field_from_string(name.into(), value.into());
        }

        Ok(if paragraph.is_empty() {
            None
        } else {
            Some(paragraph)
        })
    }
}

impl<R: BufRead> Iterator for ControlParagraphReader<R> {
    type Item = Result<ControlParagraph<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let res = self.read_paragraph();
        if res.is_err() {
            self.finished = true;
        }

        res.transpose()
    }
}

/// A sequence of paragraphs.
#[derive(Clone, Debug, Default)]
pub struct ControlFile<'a> {
    paragraphs: Vec<ControlParagraph<'a>>,
}

impl<'a> ControlFile<'a> {
    /// Parse control text.
    pub fn parse_str(s: &str) -> Result<Self> {
        let paragraphs = ControlParagraphReader::new(s.as_bytes()).collect::<Result<Vec<_>>>()?;

        Ok(Self { paragraphs })
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &ControlParagraph<'a>> {
        self.paragraphs.iter()
    }

    pub fn into_paragraphs(self) -> impl Iterator<Item = ControlParagraph<'a>> {
        self.paragraphs.into_iter()
    }

    /// Write all paragraphs, each followed by a blank line.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for p in &self.paragraphs {
            p.write(writer)?;
            writer.write_all(b"\n")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    #[test]
    fn field_replacement() {
        let mut p = ControlParagraph::default();

        p.set_field_from_string("foo".into(), "bar".into());
        p.set_field_from_string("foo".into(), "baz".into());
        assert_eq!(p.field_str("foo"), Some("baz"));

        p.set_field_from_string("FOO".into(), "bar".into());
        assert_eq!(p.field_str("foo"), Some("bar"));
        assert_eq!(p.iter_fields().count(), 1);
        assert_eq!(p.field("foo").map(ControlField::name), Some("FOO"));

        p.set_field_if_not_empty("Empty", "  ");
        assert!(p.field("Empty").is_none());
    }

    #[test]
    fn parse_continuations() -> Result<()> {
        let control = ControlFile::parse_str(concat!(
            "Package: hello\n",
            "Installed-Size: 12\n",
            "Description: greets\n",
            " First paragraph.\n",
            " .\n",
            "\tSecond paragraph.\n",
            "Essential: yes\n",
        ))?;

        let paragraphs = control.paragraphs().collect::<Vec<_>>();
        assert_eq!(paragraphs.len(), 1);

        let p = paragraphs[0];
        assert_eq!(p.field_str("package"), Some("hello"));
        assert_eq!(p.field_u64("Installed-Size").transpose()?, Some(12));
        assert_eq!(p.field_bool("Essential"), Some(true));
        assert_eq!(
            p.field("Description").map(ControlField::logical_lines),
            Some(vec![
                "greets".to_string(),
                "First paragraph.".to_string(),
                "".to_string(),
                "Second paragraph.".to_string()
            ])
        );

        Ok(())
    }

    #[test]
    fn parse_multiple_paragraphs() -> Result<()> {
        let data = indoc! {"
            Package: a
            Status: install ok installed

            Package: b
            Status: install ok installed


            Package: c
        "};

        let names = ControlParagraphReader::new(std::io::Cursor::new(data))
            .map(|p| p.map(|p| p.field_str("Package").unwrap_or_default().to_string()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(names, vec!["a", "b", "c"]);

        Ok(())
    }

    #[test]
    fn parse_errors() {
        assert!(ControlFile::parse_str(" leading continuation\n").is_err());
        assert!(ControlFile::parse_str("no colon here\n").is_err());
        assert!(ControlFile::parse_str("bad name: x\n").is_err());
    }

    #[test]
    fn write_dotted_blank_lines() -> Result<()> {
        let mut p = ControlParagraph::default();
        p.set_field_from_string("Package".into(), "hello".into());
        p.set_field(ControlField::from_lines(
            "Description".into(),
            vec!["summary", "para one", "", "para two"]
                .into_iter()
                .map(|s| s.to_string()),
        ));
        p.set_field_from_string("Broken".into(), "a\n\n b".into());

        let mut buf = vec![];
        p.write(&mut buf)?;

        assert_eq!(
            String::from_utf8_lossy(&buf),
            "Package: hello\nDescription: summary\n para one\n .\n para two\nBroken: a\n b\n"
        );

        Ok(())
    }
}
