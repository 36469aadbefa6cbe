use std::sync::LazyLock;

use engine_logging::job_warn;
use regex::Regex;

use crate::{decode_text, encode_text, ProgressReporter, ReduceError, Reducer, SourceFile};

/// Minification grammar, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Script,
    Stylesheet,
    Html,
    /// XML and SVG.
    Markup,
    Json,
}

impl Dialect {
    pub fn detect(file_name: &str, declared_type: &str) -> Option<Self> {
        let ext = compactor_core::file_extension(file_name);
        match ext.as_str() {
            "js" | "mjs" | "javascript" => Some(Dialect::Script),
            "css" => Some(Dialect::Stylesheet),
            "html" | "htm" => Some(Dialect::Html),
            "xml" | "svg" => Some(Dialect::Markup),
            "json" => Some(Dialect::Json),
            _ if compactor_core::mime_essence(declared_type) == "image/svg+xml" => {
                Some(Dialect::Markup)
            }
            _ => None,
        }
    }
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("static regex is valid"));
    };
}

pattern!(BLOCK_COMMENT, r"/\*[\s\S]*?\*/");
pattern!(SCRIPT_COMMENT, r"(?m)/\*[\s\S]*?\*/|([^\\:]|^)//.*$");
pattern!(MARKUP_COMMENT, r"<!--[\s\S]*?-->");
pattern!(WHITESPACE, r"\s+");
pattern!(WHITESPACE_RUN, r"\s{2,}");
pattern!(LINE_BREAK, r"[\r\n]");
pattern!(BETWEEN_TAGS, r">\s+<");
pattern!(STYLE_PUNCTUATION, r"\s*([:;{}])\s*");

const SCRIPT_PUNCTUATION: &str = "=+-*/{}();,:";

/// Removes single spaces next to script punctuation. A space survives when
/// its neighbours would otherwise fuse into a comment opener or `++`/`--`.
fn squeeze_script_spaces(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' && i > 0 && i + 1 < chars.len() {
            let (prev, next) = (chars[i - 1], chars[i + 1]);
            let touches = SCRIPT_PUNCTUATION.contains(prev) || SCRIPT_PUNCTUATION.contains(next);
            let fuses = matches!(
                (prev, next),
                ('/', '/') | ('/', '*') | ('*', '/') | ('+', '+') | ('-', '-')
            );
            if touches && !fuses {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Repeats `pass` until the text stops changing. Every pass either shortens
/// the text or leaves it as is.
fn settle(text: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = pass(text);
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Strips comments and insignificant whitespace. Only JSON can fail, because it
/// is parsed rather than pattern-matched.
pub fn minify(dialect: Dialect, text: &str) -> Result<String, serde_json::Error> {
    let minified = match dialect {
        Dialect::Script => {
            let text = SCRIPT_COMMENT.replace_all(text, "${1}");
            let text = WHITESPACE.replace_all(&text, " ");
            squeeze_script_spaces(text.trim())
        }
        Dialect::Stylesheet => {
            let text = BLOCK_COMMENT.replace_all(text, "");
            let text = WHITESPACE.replace_all(&text, " ");
            STYLE_PUNCTUATION
                .replace_all(text.trim(), "${1}")
                .replace(";}", "}")
        }
        // Stripping can join the halves of a split `<!--`, so markup is
        // minified until nothing more changes.
        Dialect::Html => settle(text, |text| {
            let text = MARKUP_COMMENT.replace_all(text, "");
            let text = BETWEEN_TAGS.replace_all(&text, "><");
            WHITESPACE.replace_all(&text, " ").trim().to_string()
        }),
        Dialect::Markup => settle(text, |text| {
            let text = MARKUP_COMMENT.replace_all(text, "");
            let text = BETWEEN_TAGS.replace_all(&text, "><");
            let text = WHITESPACE_RUN.replace_all(&text, " ");
            LINE_BREAK.replace_all(&text, "").into_owned()
        }),
        Dialect::Json => {
            let value: serde_json::Value = serde_json::from_str(text)?;
            serde_json::to_string(&value)?
        }
    };
    Ok(minified)
}

/// Text minifier for scripts, stylesheets, markup and JSON. Internal errors
/// degrade to returning the input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeReducer;

impl CodeReducer {
    fn try_minify(file: &SourceFile) -> Result<Option<Vec<u8>>, String> {
        let Some(dialect) = Dialect::detect(&file.name, &file.declared_type) else {
            return Ok(None);
        };
        let decoded = decode_text(&file.bytes, &file.declared_type).map_err(|e| e.to_string())?;
        let minified = minify(dialect, &decoded.text).map_err(|e| e.to_string())?;
        let encoded = encode_text(&minified, decoded.encoding).map_err(|e| e.to_string())?;
        Ok(Some(encoded))
    }
}

#[async_trait::async_trait]
impl Reducer for CodeReducer {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError> {
        progress.report(50);
        let owned = file.clone();
        let attempt = tokio::task::spawn_blocking(move || Self::try_minify(&owned))
            .await
            .unwrap_or_else(|err| Err(err.to_string()));
        let output = match attempt {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                job_warn!(progress.job_id(), "no minifier for {:?}", file.name);
                file.bytes.to_vec()
            }
            Err(message) => {
                job_warn!(
                    progress.job_id(),
                    "minification of {:?} failed, keeping original: {}",
                    file.name,
                    message
                );
                file.bytes.to_vec()
            }
        };
        progress.report(100);
        Ok(output)
    }
}
