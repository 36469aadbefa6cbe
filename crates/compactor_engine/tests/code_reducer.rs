use std::sync::Mutex;

use compactor_engine::reducers::{minify, CodeReducer, Dialect};
use compactor_engine::{EngineEvent, ProgressReporter, ProgressSink, Reducer, SourceFile};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Recorder(Mutex<Vec<u8>>);

impl ProgressSink for Recorder {
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Progress(progress) = event {
            self.0.lock().unwrap().push(progress.percent);
        }
    }
}

async fn reduce(name: &str, mime: &str, text: &str) -> (Vec<u8>, Vec<u8>) {
    let sink = Recorder::default();
    let reporter = ProgressReporter::new(1, &sink);
    let file = SourceFile::new(name, mime, text.as_bytes().to_vec());
    let output = CodeReducer.reduce(&file, &reporter).await.unwrap();
    let progress = sink.0.lock().unwrap().clone();
    (output, progress)
}

#[test]
fn stylesheet_comments_and_spacing_are_removed() {
    let css = "body {\n  color: red;\n  margin: 0;\n}\n/* note */\n";
    assert_eq!(
        minify(Dialect::Stylesheet, css).unwrap(),
        "body{color:red;margin:0}"
    );
}

#[test]
fn script_comments_and_spacing_are_removed() {
    let js = "// header\nfunction add(a, b) {\n  return a + b; // sum\n}\n";
    assert_eq!(
        minify(Dialect::Script, js).unwrap(),
        "function add(a,b){return a+b;}"
    );
}

#[test]
fn html_whitespace_between_tags_is_collapsed() {
    let html = "<div>\n  <p>Hi  there</p>\n  <!-- c -->\n</div>";
    assert_eq!(
        minify(Dialect::Html, html).unwrap(),
        "<div><p>Hi there</p></div>"
    );
}

#[test]
fn markup_keeps_single_spaces_inside_text() {
    let xml = "<root>\n  <item a=\"1\">one  two</item>\n</root>\n";
    assert_eq!(
        minify(Dialect::Markup, xml).unwrap(),
        "<root><item a=\"1\">one two</item></root>"
    );
}

#[test]
fn minifying_twice_changes_nothing() {
    for (dialect, text) in [
        (Dialect::Stylesheet, "a { b: c; }\n\n/* x */ d { e: f }"),
        (Dialect::Script, "let x = 1;\n// y\nlet z = x + 2;"),
        (Dialect::Script, "const n = total / /x/.source.length;"),
        (Dialect::Script, "let y = a * /re/.exec(s) - -b + +c;"),
        (Dialect::Html, "<ul>\n<li>a</li>\n<li>b</li>\n</ul>"),
        (Dialect::Html, "<p>a</p><!-<!-- x -->- y -->"),
        (Dialect::Markup, "<root>\n  <!\n-- note -->\n  <a/>\n</root>"),
        (Dialect::Markup, "<svg>\n  <g>  <path d=\"M0 0\"/>\n  </g>\n</svg>"),
        (Dialect::Json, "{ \"k\": [1, 2, 3] }"),
    ] {
        let once = minify(dialect, text).unwrap();
        let twice = minify(dialect, &once).unwrap();
        assert_eq!(once, twice, "{dialect:?}");
    }
}

#[test]
fn script_spacing_never_fuses_into_comments_or_operators() {
    assert_eq!(
        minify(Dialect::Script, "const n = total / /x/.source.length;").unwrap(),
        "const n=total/ /x/.source.length;"
    );
    assert_eq!(minify(Dialect::Script, "a - -b + +c").unwrap(), "a- -b+ +c");
}

#[test]
fn comments_revealed_by_stripping_are_removed_too() {
    assert_eq!(
        minify(Dialect::Markup, "<root>\n  <!\n-- note -->\n  <a/>\n</root>").unwrap(),
        "<root><a/></root>"
    );
    assert_eq!(
        minify(Dialect::Html, "<p>a</p><!-<!-- x -->- y -->").unwrap(),
        "<p>a</p>"
    );
}

#[test]
fn dialect_follows_extension_and_svg_type() {
    assert_eq!(Dialect::detect("app.MJS", ""), Some(Dialect::Script));
    assert_eq!(Dialect::detect("icon.svg", ""), Some(Dialect::Markup));
    assert_eq!(Dialect::detect("icon", "image/svg+xml"), Some(Dialect::Markup));
    assert_eq!(
        Dialect::detect("icon", "image/svg+xml; charset=utf-8"),
        Some(Dialect::Markup)
    );
    assert_eq!(Dialect::detect("data.json", ""), Some(Dialect::Json));
    assert_eq!(Dialect::detect("notes.txt", "text/plain"), None);
}

#[tokio::test]
async fn padded_json_is_compacted_with_key_order_kept() {
    let mut text = String::from("{\"a\": 1,  \"b\": 2}");
    while text.len() < 10_000 {
        text.push(' ');
    }
    let (output, progress) = reduce("data.json", "application/json", &text).await;
    assert_eq!(output, b"{\"a\":1,\"b\":2}".to_vec());
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test]
async fn invalid_json_comes_back_unchanged() {
    let text = "{\"a\": 1,, }";
    let (output, progress) = reduce("broken.json", "application/json", text).await;
    assert_eq!(output, text.as_bytes().to_vec());
    assert_eq!(progress, vec![50, 100]);
}

#[tokio::test]
async fn latin1_stylesheet_keeps_its_encoding() {
    let sink = Recorder::default();
    let reporter = ProgressReporter::new(2, &sink);
    let mut bytes = b"p {\n  content: \"".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"\";\n}\n");
    let file = SourceFile::new("style.css", "text/css; charset=ISO-8859-1", bytes);

    let output = CodeReducer.reduce(&file, &reporter).await.unwrap();

    let mut expected = b"p{content:\"".to_vec();
    expected.push(0xE9);
    expected.extend_from_slice(b"\"}");
    assert_eq!(output, expected);
}
