//! Specifier classification and package-name extraction.

use std::path::Path;

use super::native::NativeModules;

/// How an import specifier is interpreted by the module system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifierKind {
    /// Supplied by the runtime (`fs`, `node:path`).
    Native,
    /// Starts with `.` (`./lib/a`, `../b`, `.`).
    Relative,
    /// An absolute filesystem path.
    AbsolutePath,
    /// A bare specifier naming an installed package, with an optional subpath.
    Package { name: String, subpath: Option<String> },
}

impl SpecifierKind {
    /// Classify `specifier` without touching the filesystem.
    pub fn classify(specifier: &str, natives: &NativeModules) -> Self {
        if natives.contains(specifier) {
            return SpecifierKind::Native;
        }
        if specifier.starts_with('.') {
            return SpecifierKind::Relative;
        }
        if is_absolute(specifier) {
            return SpecifierKind::AbsolutePath;
        }

        let (name, subpath) = split_package_specifier(specifier);
        SpecifierKind::Package {
            name: name.to_string(),
            subpath: subpath.map(str::to_string),
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, SpecifierKind::Package { .. })
    }
}

fn is_absolute(specifier: &str) -> bool {
    specifier.starts_with('/')
        || specifier.starts_with(std::path::MAIN_SEPARATOR)
        || Path::new(specifier).is_absolute()
}

/// Extract the base package name from an npm import specifier.
///
/// Scoped packages keep their scope:
/// - `@foo/bar` -> `@foo/bar`
/// - `@foo/bar/baz` -> `@foo/bar`
/// - `lodash` -> `lodash`
/// - `socket.io/lib/utils` -> `socket.io`
///
/// ```
/// # use depscout::resolver::package_name;
/// assert_eq!(package_name("@babel/core/lib/index"), "@babel/core");
/// assert_eq!(package_name("lodash/fp"), "lodash");
/// ```
pub fn package_name(specifier: &str) -> &str {
    split_package_specifier(specifier).0
}

/// Split a bare specifier into its package name and subpath.
pub fn split_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    let name_end = if specifier.starts_with('@') {
        // Scoped packages span two segments (@org/package)
        specifier.find('/').and_then(|first| {
            specifier[first + 1..]
                .find('/')
                .map(|second| first + 1 + second)
        })
    } else {
        specifier.find('/')
    };

    match name_end {
        Some(end) => {
            let subpath = &specifier[end + 1..];
            (
                &specifier[..end],
                if subpath.is_empty() { None } else { Some(subpath) },
            )
        }
        None => (specifier, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("@babel/core"), "@babel/core");
        assert_eq!(package_name("@babel/core/lib/index"), "@babel/core");
        assert_eq!(package_name("@types/node/fs"), "@types/node");
        assert_eq!(package_name("lodash"), "lodash");
        assert_eq!(package_name("lodash/fp"), "lodash");
        assert_eq!(package_name("socket.io/lib/socket.io/utils"), "socket.io");

        assert_eq!(package_name(""), "");
        assert_eq!(package_name("@org"), "@org");
    }

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(split_package_specifier("a"), ("a", None));
        assert_eq!(split_package_specifier("a/b/c"), ("a", Some("b/c")));
        assert_eq!(split_package_specifier("@s/a/b"), ("@s/a", Some("b")));
        assert_eq!(split_package_specifier("a/"), ("a", None));
    }

    #[test]
    fn test_classify() {
        let natives = NativeModules::node();
        assert_eq!(SpecifierKind::classify("fs", &natives), SpecifierKind::Native);
        assert_eq!(SpecifierKind::classify("./a", &natives), SpecifierKind::Relative);
        assert_eq!(SpecifierKind::classify("..", &natives), SpecifierKind::Relative);
        assert_eq!(
            SpecifierKind::classify("/abs/a.js", &natives),
            SpecifierKind::AbsolutePath
        );
        assert_eq!(
            SpecifierKind::classify("socket.io/lib/utils", &natives),
            SpecifierKind::Package {
                name: "socket.io".to_string(),
                subpath: Some("lib/utils".to_string()),
            }
        );
    }
}
