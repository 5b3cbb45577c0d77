//! Parsed tile URI templates.
//!
//! A template such as `http://host/{layers}/{z}/{x}/{y}.pbf` is split once
//! into literal text and placeholders. Rendering fills placeholders from
//! typed values, so a value can never introduce a new placeholder or be
//! substituted twice.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::SourceError;
use crate::source::TileCoord;

/// Where a rendered template points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileLocation {
    /// Local file, from a `file://` template.
    File(PathBuf),
    /// Remote resource, from an `http://` or `https://` template.
    Http(Url),
}

impl fmt::Display for TileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file://{}", path.display()),
            Self::Http(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    File,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Z,
    X,
    Y,
    Layers,
}

/// A tile URI template with `{z}`, `{x}`, `{y}` and `{layers}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTemplate {
    raw: String,
    scheme: Scheme,
    segments: Vec<Segment>,
}

const FILE_PREFIX: &str = "file://";

impl TileTemplate {
    /// Parses a template.
    ///
    /// For `file://` templates the remainder is taken as a local path as
    /// written, so `file://test/fixtures/x.pbf` names a relative path.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidDescriptor`] for unsupported schemes,
    /// unknown placeholders, or an unclosed `{`.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let (scheme, body) = if let Some(path) = raw.strip_prefix(FILE_PREFIX) {
            (Scheme::File, path)
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            (Scheme::Http, raw)
        } else {
            return Err(SourceError::InvalidDescriptor(format!(
                "unsupported tile template scheme in '{raw}'"
            )));
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = body;
        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                SourceError::InvalidDescriptor(format!("unclosed placeholder in '{raw}'"))
            })?;
            let placeholder = match &after[..close] {
                "z" => Segment::Z,
                "x" => Segment::X,
                "y" => Segment::Y,
                "layers" => Segment::Layers,
                other => {
                    return Err(SourceError::InvalidDescriptor(format!(
                        "unknown placeholder '{{{other}}}' in '{raw}'"
                    )))
                }
            };
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(placeholder);
            rest = &after[close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            segments,
        })
    }

    /// Template text as configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the template reads from local storage.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.scheme == Scheme::File
    }

    /// Fills the placeholders for one tile.
    ///
    /// `layers` is inserted as given; callers pass it through
    /// [`encode_layer_names`] first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Fetch`] if an HTTP template renders to text
    /// that is not a valid URL.
    pub fn render(&self, coord: TileCoord, layers: &str) -> Result<TileLocation, SourceError> {
        let mut out = String::with_capacity(self.raw.len() + layers.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Z => out.push_str(&coord.z.to_string()),
                Segment::X => out.push_str(&coord.x.to_string()),
                Segment::Y => out.push_str(&coord.y.to_string()),
                Segment::Layers => out.push_str(layers),
            }
        }
        match self.scheme {
            Scheme::File => Ok(TileLocation::File(PathBuf::from(out))),
            Scheme::Http => Url::parse(&out)
                .map(TileLocation::Http)
                .map_err(|e| SourceError::fetch(out, e)),
        }
    }
}

/// Encodes layer names for the `{layers}` placeholder.
///
/// Each name is percent-encoded, so separators such as `/`, `?`, `#` and
/// `,` inside a name cannot change the shape of the rendered URI. Spaces
/// become `%20`, which reads the same in file paths and URLs. Names made
/// only of dots are encoded in full so they cannot act as `.` or `..` path
/// segments. Names are joined with `,`.
#[must_use]
pub fn encode_layer_names<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(encode_layer_name)
        .collect::<Vec<_>>()
        .join(",")
}

fn encode_layer_name(name: &str) -> String {
    if !name.is_empty() && name.bytes().all(|b| b == b'.') {
        return "%2E".repeat(name.len());
    }
    // A literal `+` is already `%2B`, so every remaining `+` is a space.
    url::form_urlencoded::byte_serialize(name.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
