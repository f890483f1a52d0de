use super::SourceError;

/// A schema URL template with `{name}` and `{version}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Name,
    Version,
}

impl UrlTemplate {
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let err = |message: String| SourceError::Template {
            template: raw.to_string(),
            message,
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut placeholder = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if c == '{' {
                            return Err(err("nested '{'".to_string()));
                        }
                        placeholder.push(c);
                    }
                    if !closed {
                        return Err(err("unclosed '{'".to_string()));
                    }

                    let part = match placeholder.trim() {
                        "name" => Part::Name,
                        "version" => Part::Version,
                        other => return Err(err(format!("unknown placeholder {other:?}"))),
                    };
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                '}' => return Err(err("unmatched '}'".to_string())),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, name: &str, version: &str) -> String {
        let mut out = String::with_capacity(self.raw.len() + name.len() + version.len());
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Name => out.push_str(name),
                Part::Version => out.push_str(version),
            }
        }
        out
    }
}
