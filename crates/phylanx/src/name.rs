//! Canonical primitive name parts.
//!
//! Every primitive's display name decomposes into the parts below; the printed form is a
//! canonical string from which `parse` recovers exactly the same parts that `compose`
//! produced (used both as a debug identifier and as a graph key).

use std::fmt;

/// The decomposed parts of a primitive's globally-unique name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    /// The primitive kind, e.g. `"variable"`, `"function"`, `"lambda"`, `"add"`.
    pub primitive: String,
    /// Monotone per-kind, per-compile-unit counter.
    pub sequence_number: u32,
    /// Disambiguates multiple instances compiled from the same call site (rare; defaults to 0).
    pub instance: u32,
    /// Optional free-form tag (e.g. an argument index for `access-argument`).
    pub tag: Option<String>,
    /// Source column of the expression this primitive was compiled from.
    pub col: usize,
    /// Identifies the compiler invocation that produced this name.
    pub compile_id: u32,
}

impl NameParts {
    #[must_use]
    pub fn new(primitive: impl Into<String>, sequence_number: u32, col: usize, compile_id: u32) -> Self {
        Self {
            primitive: primitive.into(),
            sequence_number,
            instance: 0,
            tag: None,
            col,
            compile_id,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    /// Renders the canonical string form, e.g. `variable$0$0$$col3@1`.
    #[must_use]
    pub fn compose(&self) -> String {
        self.to_string()
    }

    /// Parses a canonical name string back into its constituent parts.
    ///
    /// # Errors
    /// Returns `Err` with a human-readable message if `text` is not a well-formed
    /// canonical name (round-trip of [`Self::compose`]).
    pub fn parse(text: &str) -> Result<Self, String> {
        let rest = text.strip_prefix('$').map_or(text, |_| text);
        // Format: `<primitive>$<sequence>$<instance>$<tag?>$col<col>@<compile_id>`
        let (head, compile_id_str) = rest
            .rsplit_once('@')
            .ok_or_else(|| format!("missing '@compile_id' in name {text:?}"))?;
        let compile_id: u32 = compile_id_str
            .parse()
            .map_err(|_| format!("invalid compile_id in name {text:?}"))?;

        let (head, col_str) = head
            .rsplit_once("$col")
            .ok_or_else(|| format!("missing '$col' marker in name {text:?}"))?;
        let col: usize = col_str.parse().map_err(|_| format!("invalid col in name {text:?}"))?;

        let mut parts = head.splitn(4, '$');
        let primitive = parts.next().ok_or_else(|| format!("missing primitive in name {text:?}"))?;
        let sequence_number: u32 = parts
            .next()
            .ok_or_else(|| format!("missing sequence number in name {text:?}"))?
            .parse()
            .map_err(|_| format!("invalid sequence number in name {text:?}"))?;
        let instance: u32 = parts
            .next()
            .ok_or_else(|| format!("missing instance in name {text:?}"))?
            .parse()
            .map_err(|_| format!("invalid instance in name {text:?}"))?;
        let tag = parts.next().filter(|s| !s.is_empty()).map(str::to_owned);

        Ok(Self {
            primitive: primitive.to_owned(),
            sequence_number,
            instance,
            tag,
            col,
            compile_id,
        })
    }
}

impl fmt::Display for NameParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}${}${}${}$col{}@{}",
            self.primitive,
            self.sequence_number,
            self.instance,
            self.tag.as_deref().unwrap_or(""),
            self.col,
            self.compile_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_tag() {
        let parts = NameParts::new("variable", 3, 12, 1);
        let composed = parts.compose();
        assert_eq!(NameParts::parse(&composed).unwrap(), parts);
    }

    #[test]
    fn round_trips_with_tag_and_instance() {
        let parts = NameParts::new("access-argument", 7, 4, 2).with_tag("1").with_instance(5);
        let composed = parts.compose();
        assert_eq!(NameParts::parse(&composed).unwrap(), parts);
    }
}
