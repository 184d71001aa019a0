//! Builtin module table for the Node.js runtime.

use phf::phf_set;

/// Modules supplied by Node.js itself.
///
/// Includes subpath builtins (`fs/promises`) and legacy names that older
/// programs still request (`sys`, `freelist`, `constants`).
static NODE_BUILTINS: phf::Set<&'static str> = phf_set! {
    "assert", "assert/strict", "async_hooks", "buffer", "child_process",
    "cluster", "console", "constants", "crypto", "dgram",
    "diagnostics_channel", "dns", "dns/promises", "domain", "events",
    "freelist", "fs", "fs/promises", "http", "http2", "https", "inspector",
    "inspector/promises", "module", "net", "os", "path", "path/posix",
    "path/win32", "perf_hooks", "process", "punycode", "querystring",
    "readline", "readline/promises", "repl", "stream", "stream/consumers",
    "stream/promises", "stream/web", "string_decoder", "sys", "timers",
    "timers/promises", "tls", "trace_events", "tty", "url", "util",
    "util/types", "v8", "vm", "wasi", "worker_threads", "zlib",
};

/// Scheme prefix that always denotes a builtin.
const NODE_SCHEME: &str = "node:";

/// Immutable lookup table of native module names.
///
/// Built once when the engine is constructed and passed to the resolver and
/// aggregator by value.
#[derive(Debug, Clone, Copy)]
pub struct NativeModules {
    table: &'static phf::Set<&'static str>,
}

impl NativeModules {
    /// Builtins of the Node.js runtime.
    pub fn node() -> Self {
        Self {
            table: &NODE_BUILTINS,
        }
    }

    /// Whether `specifier` names a native module.
    ///
    /// `node:`-prefixed specifiers are native regardless of the table so that
    /// scheme-only builtins (`node:test`, `node:sqlite`) are recognized.
    pub fn contains(&self, specifier: &str) -> bool {
        specifier.starts_with(NODE_SCHEME) || self.table.contains(specifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for NativeModules {
    fn default() -> Self {
        Self::node()
    }
}
