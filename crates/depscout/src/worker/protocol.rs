//! Line protocol spoken by the probe harness.
//!
//! stdout: `__!load::<specifier>` for every distinct request.
//! stderr: `__!err::<kind>::<message>` once, when loading the module fails.
//! Any other output is the probed program's own and is not interpreted.

/// Prefix of a module-request line.
pub const LOAD_PREFIX: &str = "__!load::";

/// Prefix of a load-failure line.
pub const ERR_PREFIX: &str = "__!err::";

/// How the probed module failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Thrown,
    Falsey,
    StackOverflow,
    Syntax,
}

impl FailureKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "falsey" => FailureKind::Falsey,
            "stack_overflow" => FailureKind::StackOverflow,
            "syntax" => FailureKind::Syntax,
            _ => FailureKind::Thrown,
        }
    }
}

/// A protocol message decoded from one output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeMessage {
    Load(String),
    Failed { kind: FailureKind, message: String },
    /// Unrecognized stderr output, kept for diagnostics
    Stderr(String),
}

/// Decode a stdout line. Lines without the prefix are program output.
pub fn parse_stdout_line(line: &str) -> Option<ProbeMessage> {
    let start = line.find(LOAD_PREFIX)?;
    let specifier = &line[start + LOAD_PREFIX.len()..];
    if specifier.is_empty() {
        return None;
    }
    Some(ProbeMessage::Load(specifier.to_string()))
}

/// Decode a stderr line.
pub fn parse_stderr_line(line: &str) -> ProbeMessage {
    let Some(start) = line.find(ERR_PREFIX) else {
        return ProbeMessage::Stderr(line.to_string());
    };

    let rest = &line[start + ERR_PREFIX.len()..];
    let (kind, message) = rest.split_once("::").unwrap_or((rest, ""));
    ProbeMessage::Failed {
        kind: FailureKind::parse(kind),
        message: message.to_string(),
    }
}
