/// One way of locating a structured payload inside a transcript.
///
/// Returns the candidate text, or `None` to let the next strategy try.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn find<'a>(&self, transcript: &'a str) -> Option<&'a str>;
}

/// A markdown fenced block. `body` excludes the fence lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fence<'a> {
    pub info: &'a str,
    pub body: &'a str,
    pub closed: bool,
}

impl Fence<'_> {
    /// First word of the info string, e.g. `json` for "```json title".
    pub fn language(&self) -> &str {
        self.info.split_whitespace().next().unwrap_or("")
    }
}

/// Every fenced block in `text`, in order of appearance.
///
/// A fence opens on a line starting (after indentation) with three backticks
/// and closes on a line made only of backticks. An unclosed fence at the end
/// of a truncated transcript runs to the end of the text.
pub fn fences(text: &str) -> Vec<Fence<'_>> {
    let mut out = Vec::new();
    let mut open: Option<(&str, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim();

        match open {
            None => {
                if let Some(info) = trimmed.strip_prefix("```") {
                    open = Some((info.trim_start_matches('`').trim(), offset));
                }
            }
            Some((info, body_start)) => {
                if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`') {
                    out.push(Fence {
                        info,
                        body: strip_line_ending(&text[body_start..line_start]),
                        closed: true,
                    });
                    open = None;
                }
            }
        }
    }

    if let Some((info, body_start)) = open {
        out.push(Fence {
            info,
            body: &text[body_start.min(text.len())..],
            closed: false,
        });
    }
    out
}

fn strip_line_ending(body: &str) -> &str {
    let body = body.strip_suffix('\n').unwrap_or(body);
    body.strip_suffix('\r').unwrap_or(body)
}

/// A fence explicitly tagged with a language, e.g. ```json.
pub struct TaggedFence {
    pub language: &'static str,
}

impl ExtractionStrategy for TaggedFence {
    fn name(&self) -> &'static str {
        "tagged-fence"
    }

    fn find<'a>(&self, transcript: &'a str) -> Option<&'a str> {
        fences(transcript)
            .into_iter()
            .filter(|f| f.language().eq_ignore_ascii_case(self.language))
            .map(|f| f.body)
            .find(|body| !body.trim().is_empty())
    }
}

/// Any fence whose body looks like an object, whatever its tag.
pub struct AnyFence;

impl ExtractionStrategy for AnyFence {
    fn name(&self) -> &'static str {
        "any-fence"
    }

    fn find<'a>(&self, transcript: &'a str) -> Option<&'a str> {
        fences(transcript)
            .into_iter()
            .map(|f| f.body)
            .find(|body| body.trim_start().starts_with('{'))
    }
}

/// From the first `{` to the last `}` in the text.
pub struct BraceSpan;

impl ExtractionStrategy for BraceSpan {
    fn name(&self) -> &'static str {
        "brace-span"
    }

    fn find<'a>(&self, transcript: &'a str) -> Option<&'a str> {
        let start = transcript.find('{')?;
        let end = transcript.rfind('}')?;
        (end > start).then(|| &transcript[start..=end])
    }
}
